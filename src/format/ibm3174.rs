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

    src/format/ibm3174.rs

    IBM 3174 terminal controller diskettes. The 2.4MB extended-density
    format spins cylinder 0 at 360 RPM with 15 sectors and every other
    cylinder at 180 RPM with 30, so it needs two track layouts.
*/

use crate::{geometry::tables, image::RawImage, io::ReadWriteSeek, ImageError};

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    // Identify the image type (1.2MB vs 2.4MB).
    // Both are 512 bytes/sector at a 500kHz data rate.
    match im.im_size() {
        1_228_800 => {
            // 1.2MB high density: the default handler covers it.
            return im.open_from_table(tables::IMG_TYPES);
        }
        2_442_240 => {
            // 2.4MB extended density:
            //   1 cylinder, 15 sectors/track, 360 rpm
            //   79 cylinders, 30 sectors/track, 180 rpm
        }
        // No other disk formats are valid on the IBM 3174.
        _ => return Ok(false),
    }

    im.geom.nr_cyls = 80;
    im.geom.nr_sides = 2;

    im.geom.init_track_map()?;

    // Create the two track layouts.
    for i in 0..2usize {
        let nr_sectors = if i == 0 { 15 } else { 30 };
        let idx = im.geom.add_track_layout(nr_sectors)?;
        let trk = &mut im.geom.tracks[idx];
        trk.has_iam = true;
        trk.gap_3 = Some(104);
        trk.rpm = if i == 0 { 360 } else { 180 };
        for (j, sec) in im.geom.track_sectors_mut(idx).iter_mut().enumerate() {
            sec.r = j as u8 + 1;
            sec.n = 2;
        }
    }

    // Map each track to its respective layout; cylinder 0 uses layout 0.
    let nr_sides = im.geom.nr_sides as usize;
    for (i, entry) in im.geom.track_map.iter_mut().enumerate() {
        *entry = (i / nr_sides != 0) as u8;
    }

    im.geom.finalise_track_map()?;

    Ok(true)
}
