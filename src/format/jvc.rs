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

    src/format/jvc.rs

    Dragon/CoCo JVC images. The header length is the file size modulo 256;
    absent header bytes take default values.
*/

use crate::{
    geometry::SimpleLayout,
    image::RawImage,
    io::{Read, ReadWriteSeek, SeekFrom},
    types::sector_size,
    ImageError,
};

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    let mut layout = SimpleLayout::default();

    im.geom.base_off = (im.file_size & 255) as u32;

    // Check the image header. Fields beyond the header take defaults.
    let mut header = [18u8, 1, 1, 1, 0]; // spt, sides, ssize_code, sec_id, attr
    let hdr_len = (im.geom.base_off as usize).min(header.len());
    im.fp.seek(SeekFrom::Start(0))?;
    im.fp.read_exact(&mut header[..hdr_len])?;
    let [spt, sides, ssize_code, sec_id, attr] = header;

    if attr != 0 || !matches!(sides, 1 | 2) || spt == 0 {
        return Ok(false);
    }

    im.geom.nr_sides = sides;
    layout.interleave = 3; // RSDOS likes a 3:1 interleave (ref. xroar)

    layout.no = ssize_code & 3;
    layout.base = [sec_id, sec_id];
    layout.nr_sectors = spt as u16;
    layout.gap_3 = Some(20);
    layout.gap_4a = Some(54);

    // Calculate the number of cylinders.
    let bps = sector_size(layout.no) as u64;
    let mut bpc = bps * layout.nr_sectors as u64 * im.geom.nr_sides as u64;
    let mut nr_cyls = im.im_size() / bpc;
    if nr_cyls >= 88 && im.geom.nr_sides == 1 {
        im.geom.nr_sides = 2;
        nr_cyls /= 2;
        bpc *= 2;
    }
    if im.im_size() % bpc >= bps {
        nr_cyls += 1;
    }
    im.geom.nr_cyls = nr_cyls as u16;

    im.geom.apply_simple_layout(&layout)?;
    Ok(true)
}
