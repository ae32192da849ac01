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

    src/format/trd.rs

    Spectrum TR-DOS images. Geometry is interrogated from the TR-DOS system
    area in track 0; images are 16 sectors of 256 bytes per track.
*/

use binrw::BinRead;

use crate::{
    geometry::{SimpleLayout, SIMPLE_EMPTY_TRACK},
    image::RawImage,
    io::{ReadWriteSeek, SeekFrom},
    ImageError,
};

/// File offset of the TR-DOS geometry block (sector 9 of track 0).
const TRD_INFO_OFFSET: u64 = 0x8E0;
/// Identity byte marking a valid TR-DOS system area.
const TRD_ID: u8 = 0x10;

#[derive(BinRead, Debug)]
#[br(little)]
struct TrdGeometry {
    #[allow(dead_code)]
    na: u8,
    free_sec: u8,
    free_trk: u8,
    disk_type: u8,
    #[allow(dead_code)]
    nr_files: u8,
    free_secs_lo: u8,
    free_secs_hi: u8,
    id: u8,
}

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    let layout = SimpleLayout {
        nr_sectors: 16,
        is_fm: false,
        has_iam: true,
        has_empty: true, // see trailing-cylinder comment below
        no: 1,           // 256-byte
        gap_3: Some(57),
        base: [1, 1],
        interleave: 1,
        ..SimpleLayout::default()
    };

    // Interrogate TR-DOS geometry info.
    im.fp.seek(SeekFrom::Start(TRD_INFO_OFFSET))?;
    let Ok(geometry) = TrdGeometry::read(&mut im.fp) else {
        return Ok(false);
    };
    if geometry.id != TRD_ID {
        return Ok(false);
    }

    // Use the type identifier as a geometry hint. Default to double sided.
    im.geom.nr_sides = match geometry.disk_type {
        0x18 | 0x19 => 1,
        _ => 2,
    };

    // Calculate total sectors on disk: first-free plus number-of-free.
    let mut tot_secs = geometry.free_sec as u32
        + geometry.free_trk as u32 * 16
        + geometry.free_secs_lo as u32
        + geometry.free_secs_hi as u32 * 256;
    if (tot_secs & 15) != 0 || tot_secs > 4096 {
        tot_secs = 0; // Invalid: too large or not a track multiple
    }

    // Consider the image size if the reported total is small or invalid.
    tot_secs = tot_secs.max((im.im_size() / 256) as u32);

    // Calculate total tracks and thus the number of cylinders.
    let tot_trks = tot_secs >> 4;
    im.geom.nr_cyls = ((tot_trks + im.geom.nr_sides as u32 - 1) / im.geom.nr_sides as u32) as u16;
    if im.geom.nr_cyls == 0 {
        return Ok(false);
    }

    im.geom.apply_simple_layout(&layout)?;

    // Some images do not fill the last cylinder. Mark the very last track
    // empty so it is neither emitted nor counted against the file.
    if tot_trks & (im.geom.nr_sides as u32 - 1) != 0 {
        if let Some(entry) = im.geom.track_map.get_mut(tot_trks as usize) {
            *entry = SIMPLE_EMPTY_TRACK;
        }
    }

    Ok(true)
}
