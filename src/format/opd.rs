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

    src/format/opd.rs

    Opus Discovery images. Recognized by exact file size; the Discovery's
    heavy 13:1 interleave is part of the format.
*/

use crate::{geometry::SimpleLayout, image::RawImage, io::ReadWriteSeek, ImageError};

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    let layout = SimpleLayout {
        nr_sectors: 18,
        is_fm: false,
        has_iam: true,
        no: 1, // 256-byte
        gap_3: Some(12),
        base: [0, 0],
        interleave: 13,
        cskew: 13,
        ..SimpleLayout::default()
    };

    match im.im_size() {
        184_320 => {
            im.geom.nr_cyls = 40;
            im.geom.nr_sides = 1;
        }
        737_280 => {
            im.geom.nr_cyls = 80;
            im.geom.nr_sides = 2;
        }
        _ => return Ok(false),
    }

    im.geom.apply_simple_layout(&layout)?;
    Ok(true)
}
