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

    src/format/dfs.rs

    Acorn DFS single/double-sided images: FM, 80 cylinders, ten 256-byte
    sectors per track. The extension (.ssd/.dsd) carries the side count.
*/

use crate::{geometry::SimpleLayout, image::RawImage, io::ReadWriteSeek, ImageError};

fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    let layout = SimpleLayout {
        nr_sectors: 10,
        is_fm: true,
        has_iam: false,
        no: 1, // 256-byte
        gap_3: Some(21),
        base: [0, 0],
        interleave: 1,
        cskew: 3,
        ..SimpleLayout::default()
    };

    im.geom.nr_cyls = 80;

    im.geom.apply_simple_layout(&layout)?;
    Ok(true)
}

pub(crate) fn open_ssd<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    im.geom.nr_sides = 1;
    open(im)
}

pub(crate) fn open_dsd<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    im.geom.nr_sides = 2;
    open(im)
}
