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

    src/format/msx.rs

    MSX raw images. 320k and 360k files are ambiguous between 40- and
    80-cylinder layouts, so the boot sector is consulted first.
*/

use crate::{
    boot_sector::BiosParameterBlock,
    geometry::{tables, SimpleLayout},
    image::RawImage,
    io::ReadWriteSeek,
    ImageError,
};

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    // Try to disambiguate overloaded image sizes via the boot sector.
    if matches!(im.im_size(), 327_680 | 368_640) {
        // 80/1/8 or 40/2/8?  80/1/9 or 40/2/9?
        let bpb = BiosParameterBlock::read(&mut im.fp)?;
        // The boot signature is not valid in MSX-DOS so don't check it.
        if bpb.bytes_per_sec == 512
            && matches!(bpb.num_heads, 1 | 2)
            && bpb.tot_sec as u64 == im.im_size() / bpb.bytes_per_sec as u64
            && matches!(bpb.sec_per_track, 8 | 9)
        {
            let layout = SimpleLayout {
                no: 2,
                nr_sectors: bpb.sec_per_track,
                ..SimpleLayout::default()
            };
            im.geom.nr_sides = bpb.num_heads as u8;
            im.geom.nr_cyls = if im.geom.nr_sides == 1 { 80 } else { 40 };
            im.geom.apply_simple_layout(&layout)?;
            return Ok(true);
        }
    }

    // Use the MSX-specific list.
    im.reset_all_params();
    if im.open_from_table(tables::MSX_TYPES)? {
        return Ok(true);
    }

    // Caller falls back to the generic list.
    Ok(false)
}
