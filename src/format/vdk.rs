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

    src/format/vdk.rs

    Dragon VDK images: a small "dk" header carrying (cyls, heads) and the
    header length to skip.
*/

use binrw::BinRead;

use crate::{
    geometry::SimpleLayout,
    image::RawImage,
    io::{ReadWriteSeek, SeekFrom},
    ImageError,
};

#[derive(BinRead, Debug)]
#[br(little)]
struct VdkHeader {
    id: [u8; 2],
    hlen: u16,
    #[allow(dead_code)]
    misc: [u8; 4],
    cyls: u8,
    heads: u8,
    #[allow(dead_code)]
    flags: u8,
    #[allow(dead_code)]
    compression: u8,
}

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    let layout = SimpleLayout {
        nr_sectors: 18,
        is_fm: false,
        has_iam: true,
        no: 1, // 256-byte sectors
        gap_3: Some(20),
        gap_4a: Some(54),
        base: [1, 1],
        interleave: 2, // DDOS likes a 2:1 interleave (ref. xroar)
        ..SimpleLayout::default()
    };

    // Check the image header.
    im.fp.seek(SeekFrom::Start(0))?;
    let Ok(vdk) = VdkHeader::read(&mut im.fp) else {
        return Ok(false);
    };
    if &vdk.id != b"dk" || vdk.hlen < 12 {
        return Ok(false);
    }

    // Read (cyls, heads) geometry from the image header.
    im.geom.nr_cyls = vdk.cyls as u16;
    im.geom.nr_sides = vdk.heads;

    // Check the geometry.
    if !matches!(im.geom.nr_sides, 1 | 2) {
        return Ok(false);
    }

    im.geom.base_off = vdk.hlen as u32;

    im.geom.apply_simple_layout(&layout)?;
    Ok(true)
}
