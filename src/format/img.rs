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

    src/format/img.rs

    The generic raw image opener: configuration file first, then the host
    hint's geometry table, then the default table. Also hosts the trivial
    wrappers that only select a different table or tweak a flag.
*/

use crate::{
    format::{cfg, ibm3174, msx, pc_dos, ti99, xdf},
    geometry::tables,
    image::RawImage,
    io::ReadWriteSeek,
    types::{HostSystem, LayoutFlags},
    ImageError,
};

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    if cfg::open(im)? {
        return Ok(true);
    }

    let table = match im.host {
        HostSystem::Akai | HostSystem::Gem => tables::AKAI_TYPES,
        HostSystem::Casio => tables::CASIO_TYPES,
        HostSystem::Dec => tables::DEC_TYPES,
        HostSystem::Ensoniq => tables::ENSONIQ_TYPES,
        HostSystem::Fluke => tables::FLUKE_TYPES,
        HostSystem::Ibm3174 => return ibm3174::open(im),
        HostSystem::Memotech => tables::MEMOTECH_TYPES,
        HostSystem::Msx => {
            if msx::open(im)? {
                return Ok(true);
            }
            return fallback(im);
        }
        HostSystem::Nascom => tables::NASCOM_TYPES,
        HostSystem::Pc98 => tables::PC98_TYPES,
        HostSystem::PcDos => {
            if pc_dos::open(im)? {
                return Ok(true);
            }
            // PC-DOS declines XDF images so that we can route them here.
            im.reset_all_params();
            if xdf::open(im)? {
                return Ok(true);
            }
            return fallback(im);
        }
        HostSystem::Ti99 => return ti99::open(im),
        HostSystem::Uknc => return open_uknc(im),
        HostSystem::Generic => tables::IMG_TYPES,
    };

    // Try specified host-specific geometries.
    if im.open_from_table(table)? {
        return Ok(true);
    }

    fallback(im)
}

/// Fall back to the default geometry list.
fn fallback<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    im.reset_all_params();
    im.open_from_table(tables::IMG_TYPES)
}

pub(crate) fn open_d81<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    im.geom.layout = LayoutFlags::SIDES_SWAPPED;
    im.open_from_table(tables::D81_TYPES)
}

pub(crate) fn open_st<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    im.open_from_table(&tables::st_types())
}

fn open_uknc<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    // All tracks have special extra sync marks.
    im.geom.post_crc_syncs = 1;

    if !im.open_from_table(tables::UKNC_TYPES)? {
        return Ok(false);
    }

    // All tracks have custom GAP2 and GAP4A.
    for side in 0..im.geom.nr_sides as usize {
        let trk = &mut im.geom.tracks[side];
        trk.gap_2 = Some(24);
        trk.gap_4a = Some(27);
    }

    Ok(true)
}
