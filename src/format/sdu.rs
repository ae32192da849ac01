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

    src/format/sdu.rs

    SAB Diskette Utility images: a 46-byte header carrying (cyls, heads,
    sectors), accepted only for the standard PC geometries.
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
struct SduHeader {
    #[allow(dead_code)]
    app: [u8; 21],
    #[allow(dead_code)]
    ver: [u8; 5],
    #[allow(dead_code)]
    flags: u16,
    #[allow(dead_code)]
    disk_type: u16,
    max_c: u16,
    max_h: u16,
    max_s: u16,
    #[allow(dead_code)]
    used_c: u16,
    #[allow(dead_code)]
    used_h: u16,
    #[allow(dead_code)]
    used_s: u16,
    #[allow(dead_code)]
    sec_size: u16,
    #[allow(dead_code)]
    trk_size: u16,
}

/// Size of the SDU file header skipped over by `base_off`.
const SDU_HEADER_SIZE: u32 = 46;

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    let mut layout = SimpleLayout::default();

    // Read basic (cyls, heads, spt) geometry from the image header.
    im.fp.seek(SeekFrom::Start(0))?;
    let Ok(header) = SduHeader::read(&mut im.fp) else {
        return Ok(false);
    };
    im.geom.nr_cyls = header.max_c;
    im.geom.nr_sides = header.max_h as u8;
    layout.nr_sectors = header.max_s;

    // Check the geometry. Accept 180k/360k/720k/1.44M/2.88M PC sizes.
    if !matches!(im.geom.nr_cyls, 40 | 80)
        || !matches!(im.geom.nr_sides, 1 | 2)
        || !matches!(layout.nr_sectors, 9 | 18 | 36)
    {
        return Ok(false);
    }

    // Fill in the rest of the geometry.
    layout.no = 2; // 512-byte sectors
    layout.gap_3 = Some(84); // standard gap3

    im.geom.base_off = SDU_HEADER_SIZE;

    im.geom.apply_simple_layout(&layout)?;
    Ok(true)
}
