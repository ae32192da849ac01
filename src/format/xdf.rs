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

    src/format/xdf.rs

    OS/2 Extended Density Format. XDF packs mixed-size sectors (0.5k to 8k)
    onto each track past cylinder 0 and scatters the filesystem structures
    of cylinder 0, so every track layout needs a per-sector table of image
    offsets. Head 1 is also rotationally shifted against head 0.

    The handling here is informed by xdfcopy.c in the fdutils distribution.
*/

use crate::{
    boot_sector::BiosParameterBlock,
    buffers::TrackBuffers,
    image::RawImage,
    io::ReadWriteSeek,
    ImageError,
};

struct XdfFormat {
    /// Sectors per track as reported by the FAT.
    logical_sec_per_track: u16,
    /// Physical sectors on cylinder 0 tracks.
    sec_per_track0: usize,
    /// Physical sectors on cylinder 1+ tracks.
    sec_per_track_n: usize,
    /// Rotational shift of head 1, effectively a head skew.
    head1_shift_bc: u32,
    /// (size code, byte offset into the cylinder's image data), per head,
    /// in on-disk sector order, for cylinders past 0.
    cyl_n_sec: [[(u8, u32); 4]; 2],
}

const FORMATS: &[XdfFormat] = &[
    // 3.5 HD.
    // Cyl 0, head 0: sectors 1-8 (aux FAT) then 129-139 (main FAT pt.1).
    // Cyl 0, head 1: 129 (main FAT pt.2), 130-143 (rootdir), 144-147 (data).
    // Cyl N: 1k/0.5k/2k/8k sectors, IDs 128+n, head 1 slipped ~10k bitcells.
    XdfFormat {
        logical_sec_per_track: 23,
        sec_per_track0: 19,
        sec_per_track_n: 4,
        head1_shift_bc: 10_000,
        cyl_n_sec: [
            [(3, 0x0000), (2, 0x2C00), (4, 0x0400), (6, 0x3000)], // Head 0
            [(4, 0x5000), (2, 0x2E00), (3, 0x5800), (6, 0x0C00)], // Head 1
        ],
    },
];

/// Per-sector image offset tables, one per track layout, selected at each
/// track setup.
#[derive(Clone, Debug)]
pub(crate) struct XdfInfo {
    /// C0H0, C0H1, CnH0, CnH1.
    pub offsets: [Vec<u32>; 4],
    /// Image bytes per cylinder.
    pub cyl_bytes: u32,
    pub head1_shift_bc: u32,
    /// Offset table in effect for the current track.
    pub sel: usize,
}

pub(crate) fn open<F: ReadWriteSeek>(im: &mut RawImage<F>) -> Result<bool, ImageError> {
    let bpb = BiosParameterBlock::read(&mut im.fp)?;
    if !bpb.xdf_check() {
        return Ok(false);
    }

    let Some(fmt) = FORMATS
        .iter()
        .find(|f| f.logical_sec_per_track == bpb.sec_per_track)
    else {
        return Ok(false);
    };

    let rootdir_secs = (bpb.rootdir_ents / 16) as usize;
    let fat_secs = bpb.fat_secs as usize;
    if /* Rootdir must fill a whole number of logical sectors */
        bpb.rootdir_ents % 16 != 0
        /* FAT and rootdir must fit in cylinder 0 */
        || (8 + 1 + fat_secs + rootdir_secs) > 2 * fmt.sec_per_track0
    {
        return Ok(false);
    }

    im.geom.nr_sides = 2;
    im.geom.nr_cyls = 80;

    im.geom.init_track_map()?;

    // Create four track layouts: C0H0 C0H1 CnH0 CnH1.
    for i in 0..2usize {
        let idx = im.geom.add_track_layout(fmt.sec_per_track0)?;
        im.geom.tracks[idx].interleave = 2;
        let mut aux_id = 1u8;
        let mut main_id = 129u8;
        for (j, sec) in im.geom.track_sectors_mut(idx).iter_mut().enumerate() {
            sec.r = if i == 0 && j < 8 {
                aux_id += 1;
                aux_id - 1
            }
            else {
                main_id += 1;
                main_id - 1
            };
            sec.n = 2;
        }
    }
    for head in 0..2usize {
        let idx = im.geom.add_track_layout(fmt.sec_per_track_n)?;
        im.geom.tracks[idx].interleave = 1;
        for (j, sec) in im.geom.track_sectors_mut(idx).iter_mut().enumerate() {
            let n = fmt.cyl_n_sec[head][j].0;
            sec.r = n + 128;
            sec.n = n;
        }
    }

    // Track map: cylinder 0 is special.
    for (i, entry) in im.geom.track_map.iter_mut().enumerate() {
        *entry = match i {
            0 => 0,
            1 => 1,
            _ => 2 + (i & 1) as u8,
        };
    }
    im.geom.finalise_track_map()?;

    // Cylinder 0 image layout (thanks to fdutils/xdfcopy!):
    //   FS   Desc.    #secs-in-image  #secs-on-disk
    //   MAIN Boot     1               1
    //   MAIN Fat      fat_secs        fat_secs
    //   AUX  Fat      fat_secs        8
    //   MAIN RootDir  rootdir_secs    rootdir_secs
    //   AUX  Fat      5               0
    //   MAIN Data     *               *
    // MAIN is sectors 129+ on head 0, then head 1; AUX is the dummy FAT on
    // sectors 1-8 of head 0. Order on disk is AUX then MAIN.
    let mut c0: Vec<u32> = Vec::with_capacity(2 * fmt.sec_per_track0);
    // 1. AUX FAT (limited to 8 sectors on disk).
    let mut img_curs = 1 + fat_secs; // skip MAIN boot + FAT
    for i in 0..8 {
        c0.push(((img_curs + i) as u32) << 9);
    }
    // 2. MAIN boot + FAT.
    for i in 0..(1 + fat_secs) {
        c0.push((i as u32) << 9);
    }
    // 3. MAIN root directory.
    img_curs += fat_secs; // skip the AUX FAT
    for _ in 0..rootdir_secs {
        c0.push((img_curs as u32) << 9);
        img_curs += 1;
    }
    // 4. MAIN data.
    img_curs += 5; // skip the AUX FAT duplicate
    while c0.len() < 2 * fmt.sec_per_track0 {
        c0.push((img_curs as u32) << 9);
        img_curs += 1;
    }
    let c0h1 = c0.split_off(fmt.sec_per_track0);

    // Cylinder N image layout: sectors are interleaved on disk and in the
    // image file, per the format's offset table.
    let cn_h0: Vec<u32> = fmt.cyl_n_sec[0].iter().map(|&(_, off)| off).collect();
    let cn_h1: Vec<u32> = fmt.cyl_n_sec[1].iter().map(|&(_, off)| off).collect();

    im.xdf = Some(XdfInfo {
        offsets: [c0, c0h1, cn_h0, cn_h1],
        cyl_bytes: fmt.logical_sec_per_track as u32 * 2 * 512,
        head1_shift_bc: fmt.head1_shift_bc,
        sel: 0,
    });

    Ok(true)
}

/// Select the track delay and file sector-offset table before handing over
/// to the generic routine.
pub(crate) fn setup_track<F: ReadWriteSeek>(
    im: &mut RawImage<F>,
    bufs: &mut TrackBuffers,
    track: u16,
    start_pos: Option<u32>,
) -> Result<Option<u32>, ImageError> {
    let params = im.xdf.as_ref().map(|x| (x.head1_shift_bc, x.cyl_bytes));
    if let Some((head1_shift_bc, cyl_bytes)) = params {
        let mut sel = (track & 1) as usize;
        let mut delay = 0;
        if track >> 1 != 0 {
            // Cylinder N.
            sel += 2;
            if track & 1 != 0 {
                delay = head1_shift_bc;
            }
        }
        im.track_delay_bc = delay;
        im.trk_off = (track >> 1) as u64 * cyl_bytes as u64;
        if let Some(x) = im.xdf.as_mut() {
            x.sel = sel;
        }
    }

    im.raw_setup_track(bufs, track, start_pos)
}
