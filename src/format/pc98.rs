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

    src/format/pc98.rs

    NEC PC-98 FDI images: a 32-byte header carrying geometry and density.
    The density byte separates the 300 RPM and 360 RPM variants.
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
struct FdiHeader {
    #[allow(dead_code)]
    zero: u32,
    density: u32,
    header_size: u32,
    #[allow(dead_code)]
    image_body_size: u32,
    sector_size_bytes: u32,
    nr_secs: u32,
    nr_sides: u32,
    cyls: u32,
}

pub(crate) fn open_fdi<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    let mut layout = SimpleLayout::default();

    im.fp.seek(SeekFrom::Start(0))?;
    let Ok(header) = FdiHeader::read(&mut im.fp) else {
        return Ok(false);
    };

    if header.density == 0x30 {
        layout.rpm = 300;
        layout.gap_3 = Some(84);
    }
    else {
        layout.rpm = 360;
        layout.gap_3 = Some(116);
    }
    layout.no = if header.sector_size_bytes == 512 { 2 } else { 3 };
    layout.nr_sectors = header.nr_secs as u16;
    im.geom.nr_cyls = header.cyls as u16;
    im.geom.nr_sides = header.nr_sides as u8;
    // Skip the 4096-byte header.
    im.geom.base_off = header.header_size;

    im.geom.apply_simple_layout(&layout)?;
    Ok(true)
}
