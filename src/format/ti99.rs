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

    src/format/ti99.rs

    TI-99/4A sector-dump images. Sizes are counted in 9-sectors-per-track
    units of 40 cylinders; overloaded sizes are disambiguated with the
    Volume Information Block in sector 0. Side 1 runs outward-in.
*/

use binrw::BinRead;

use crate::{
    geometry::SimpleLayout,
    image::RawImage,
    io::{ReadWriteSeek, SeekFrom},
    types::LayoutFlags,
    ImageError,
};

/// Volume Information Block, held in sector 0 of TI-99 disks.
#[derive(BinRead, Debug)]
#[br(big)]
struct Vib {
    #[allow(dead_code)]
    name: [u8; 10],
    #[allow(dead_code)]
    tot_secs: u16,
    #[allow(dead_code)]
    secs_per_track: u8,
    id: [u8; 3],
    #[allow(dead_code)]
    protection: u8,
    tracks_per_side: u8,
    sides: u8,
    #[allow(dead_code)]
    density: u8,
}

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    let mut fsize = im.im_size();

    // Must be a multiple of 256-byte sectors.
    if fsize % 256 != 0 {
        return Ok(false);
    }
    fsize /= 256;

    // Check for a 3-sector footer containing a bad sector map. We ignore it.
    if fsize % 10 == 3 {
        fsize -= 3;
    }

    // Main image must be non-zero size.
    if fsize == 0 {
        return Ok(false);
    }

    // Check for a Volume Information Block in sector 0.
    im.fp.seek(SeekFrom::Start(0))?;
    let vib = Vib::read(&mut im.fp).ok();
    let vib = vib.filter(|v| &v.id == b"DSK");

    let mut layout = SimpleLayout {
        interleave: 4,
        cskew: 3,
        no: 1,
        base: [0, 0],
        ..SimpleLayout::default()
    };
    im.geom.layout = LayoutFlags::SEQUENTIAL | LayoutFlags::REVERSE_SIDE_1;

    if fsize % (40 * 9) == 0 {
        // 9/18/36 sectors-per-track formats.
        match fsize / (40 * 9) {
            1 => {
                // SSSD
                im.geom.nr_cyls = 40;
                im.geom.nr_sides = 1;
                layout.nr_sectors = 9;
                layout.gap_3 = Some(44);
                layout.is_fm = true;
            }
            2 => {
                if vib.as_ref().is_some_and(|v| v.sides == 1) {
                    // Disambiguated: this is SSDD.
                    im.geom.nr_cyls = 40;
                    im.geom.nr_sides = 1;
                    layout.interleave = 5;
                    layout.nr_sectors = 18;
                    layout.gap_3 = Some(24);
                }
                else {
                    // Assume DSSD.
                    im.geom.nr_cyls = 40;
                    im.geom.nr_sides = 2;
                    layout.nr_sectors = 9;
                    layout.gap_3 = Some(44);
                    layout.is_fm = true;
                }
            }
            4 => {
                if vib.as_ref().is_some_and(|v| v.tracks_per_side == 80) {
                    // Disambiguated: this is DSSD80.
                    im.geom.nr_cyls = 80;
                    im.geom.nr_sides = 2;
                    layout.nr_sectors = 9;
                    layout.gap_3 = Some(44);
                    layout.is_fm = true;
                }
                else {
                    // Assume DSDD.
                    im.geom.nr_cyls = 40;
                    im.geom.nr_sides = 2;
                    layout.interleave = 5;
                    layout.nr_sectors = 18;
                    layout.gap_3 = Some(24);
                }
            }
            8 => {
                // DSDD80
                im.geom.nr_cyls = 80;
                im.geom.nr_sides = 2;
                layout.interleave = 5;
                layout.nr_sectors = 18;
                layout.gap_3 = Some(24);
            }
            16 => {
                // DSHD80
                im.geom.nr_cyls = 80;
                im.geom.nr_sides = 2;
                layout.interleave = 5;
                layout.nr_sectors = 36;
                layout.gap_3 = Some(24);
            }
            _ => return Ok(false),
        }
    }
    else if fsize % (40 * 16) == 0 {
        // SSDD/DSDD, 16 sectors
        let sides = fsize / (40 * 16);
        if sides > 2 {
            return Ok(false);
        }
        im.geom.nr_sides = sides as u8;
        im.geom.nr_cyls = 40;
        layout.interleave = 5;
        layout.nr_sectors = 16;
        layout.gap_3 = Some(44);
    }
    else {
        return Ok(false);
    }

    im.geom.apply_simple_layout(&layout)?;
    Ok(true)
}
