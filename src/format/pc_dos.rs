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

    src/format/pc_dos.rs

    PC-DOS raw images: geometry straight from the BIOS Parameter Block.
*/

use crate::{
    boot_sector::{BiosParameterBlock, BPB_SIGNATURE},
    geometry::SimpleLayout,
    image::RawImage,
    io::ReadWriteSeek,
    types::sector_size,
    ImageError,
    MAX_SIZE_CODE,
};

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    let mut layout = SimpleLayout::default();

    let bpb = BiosParameterBlock::read(&mut im.fp)?;

    if bpb.sig != BPB_SIGNATURE {
        return Ok(false);
    }

    let Some(no) = (0..=MAX_SIZE_CODE).find(|&no| sector_size(no) == bpb.bytes_per_sec as usize) else {
        return Ok(false);
    };
    layout.no = no;

    if bpb.sec_per_track == 0 || bpb.sec_per_track > 256 {
        return Ok(false);
    }
    layout.nr_sectors = bpb.sec_per_track;

    // 3.5-inch HD XDF images also carry a plausible BPB. Bail on a match:
    // our caller falls back to the XDF opener.
    if bpb.sec_per_track == 23 && bpb.xdf_check() {
        return Ok(false);
    }

    // Detect the MSDMF layout, which requires interleave and skew.
    if bpb.sec_per_track == 21 && no == 2 {
        layout.interleave = 2;
        layout.cskew = 3;
    }

    if !matches!(bpb.num_heads, 1 | 2) {
        return Ok(false);
    }
    im.geom.nr_sides = bpb.num_heads as u8;

    let spc = layout.nr_sectors as u32 * im.geom.nr_sides as u32;
    im.geom.nr_cyls = ((bpb.tot_sec as u32 + spc - 1) / spc) as u16;
    if im.geom.nr_cyls == 0 {
        return Ok(false);
    }

    im.geom.apply_simple_layout(&layout)?;
    Ok(true)
}
