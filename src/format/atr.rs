/*
    rawtrack
    https://github.com/dbalsom/rawtrack

    Copyright 2024-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/format/atr.rs

    Atari 8-bit ATR images. The 16-byte header encodes the image size in
    16-byte "paragraphs" and the sector size, which together disambiguate
    the SD/ED/DD layouts.
*/

use binrw::BinRead;

use crate::{
    image::RawImage,
    io::{ReadWriteSeek, SeekFrom},
    ImageError,
};

pub const ATR_MAGIC: u16 = 0x0296;

/// Original Atari drives (eg 1050) spin slightly slow (288rpm, -4%).
/// Later interfaces use normal-speed drives (300rpm) with a
/// faster-than-usual bit rate (eg XF551 drives its controller at 8.333MHz
/// rather than 8MHz (+4%)). We emulate that faster bitrate here.
/// Source: Atarimania FAQ, "How can I read/write Atari diskettes with my
/// other computer?"
const fn atr_rate(rate: u32) -> u32 {
    rate + rate / 25
}

/// Atari machines transfer floppy data via the slow SIO interface, capable
/// of moving only about 2 sectors per disk revolution, so a significant
/// sector interleave is required.
/// Source: atariage.com/forums/topic/269694-improved-sector-layout-cx8111
const fn atr_interleave(secs: u16) -> u8 {
    (secs / 2) as u8
}

#[derive(BinRead, Debug)]
#[br(little)]
struct AtrHeader {
    sig: u16,
    size_lo: u16,
    size_sec: u16,
    #[allow(dead_code)]
    size_hi: u16,
    #[allow(dead_code)]
    flags: u8,
    #[allow(dead_code)]
    unused: [u8; 7],
}

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    im.fp.seek(SeekFrom::Start(0))?;
    let Ok(header) = AtrHeader::read(&mut im.fp) else {
        return Ok(false);
    };
    if header.sig != ATR_MAGIC {
        return Ok(false);
    }

    let sz = (header.size_lo as u32) << 4;
    let no = (header.size_sec / 256) as u8; // 128 or 256 -> 0 or 1

    // 40-1-18, 256b/s, MFM
    let mut nr_sectors: u16 = 18;
    im.geom.nr_cyls = 40;
    im.geom.nr_sides = 1;
    let mut is_fm = false;
    let mut rate = atr_rate(250);
    if no == 0 {
        is_fm = sz < 130 * 1024;
        if is_fm {
            // 40-1-18, 128b/s, FM
            rate = atr_rate(125);
        }
        else {
            // 40-1-26, 128b/s, MFM
            nr_sectors = 26;
        }
    }
    else if sz >= 360 * 1024 - 3 * 128 {
        // 40-2-18, 256b/s, MFM
        im.geom.nr_sides = 2;
    }
    im.geom.base_off = 16;

    im.geom.init_track_map()?;

    // Create two track layouts: 0 -> Track 0; 1 -> All other tracks.
    for _ in 0..2 {
        let idx = im.geom.add_track_layout(nr_sectors as usize)?;
        let trk = &mut im.geom.tracks[idx];
        trk.has_iam = true;
        trk.is_fm = is_fm;
        trk.invert_data = true;
        trk.data_rate = Some(rate);
        trk.interleave = atr_interleave(nr_sectors);
        for (j, sec) in im.geom.track_sectors_mut(idx).iter_mut().enumerate() {
            sec.r = j as u8 + 1;
            sec.n = no;
        }
    }

    // Track 0 layout: the first three sectors are always 128 bytes.
    for sec in im.geom.track_sectors_mut(0).iter_mut().take(3) {
        sec.n = 0;
    }

    // Track map: special layout for the first track only.
    for (i, entry) in im.geom.track_map.iter_mut().enumerate() {
        *entry = (i != 0) as u8;
    }
    im.geom.finalise_track_map()?;

    Ok(true)
}
