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

    src/encoding/fm.rs

    IBM 3740 (FM) track preparation and bitstream emission. Structure
    mirrors the MFM encoder with the FM framing differences: shorter sync
    runs, 0xFF filler, single-word address marks, and a clock bit in every
    cell.
*/

use crate::{
    buffers::{BitcellRing, TrackBuffers},
    clock::{sysclk_stk, sysclk_us},
    encoding::{fm_sync, FM_DAM_CRC, FM_IAM_CLK, FM_SYNC_CLK, MFM_TABLE},
    image::{RawImage, ResolvedTrack},
    io::ReadWriteSeek,
    types::TrackEncoding,
    util::crc_ibm_3740,
    ImageError,
};

pub const FM_GAP_1: u32 = 26; // Post-IAM
pub const FM_GAP_2: u32 = 11; // Post-IDAM
pub const FM_GAP_SYNC: u32 = 6;

/// Largest useful GAP3, by sector size code.
const GAP_3_MAX: [u8; 8] = [27, 42, 58, 138, 255, 255, 255, 255];

struct FmEmitter<'a> {
    ring: &'a mut BitcellRing,
    p: u32,
}

impl FmEmitter<'_> {
    #[inline]
    fn raw(&mut self, r: u16) {
        self.ring.set(self.p, r);
        self.p += 1;
    }

    /// A data byte with a clock bit in every cell.
    #[inline]
    fn byte(&mut self, b: u8) {
        self.raw(MFM_TABLE[b as usize] | 0xAAAA);
    }
}

pub(crate) fn prep_track<F: ReadWriteSeek>(im: &mut RawImage<F>, rpm: u16) {
    let trk = im.geom.tracks[im.trk_idx].clone();
    let nr = trk.nr_sectors as u32;

    let gap_2 = trk.gap_2.map_or(FM_GAP_2, |g| g as u32);
    let auto_gap_3 = trk.gap_3.is_none();
    let mut gap_3 = trk.gap_3.map_or(0, |g| g as u32);
    // Default post-index gap size depends on whether the track format
    // includes IAM or not (see uPD765A/7265 Datasheet).
    let gap_4a = trk
        .gap_4a
        .map_or(if trk.has_iam { 40 } else { 16 }, |g| g as u32);

    let mut idx_sz = gap_4a;
    if trk.has_iam {
        idx_sz += FM_GAP_SYNC + 1 + FM_GAP_1;
    }
    let idam_sz = FM_GAP_SYNC + 5 + 2 + gap_2;
    let dam_sz_pre = FM_GAP_SYNC + 1;
    let mut dam_sz_post = 2 + gap_3;

    // Work out the minimum track length (with no pre-index track gap).
    let data_total: u32 = im
        .geom
        .track_sectors(&trk)
        .iter()
        .map(|s| s.data_size() as u32)
        .sum();
    let mut tracklen = idx_sz + nr * (idam_sz + dam_sz_pre + dam_sz_post) + data_total;
    tracklen *= 16;

    let mut data_rate = trk.data_rate.unwrap_or(0);
    if data_rate == 0 {
        // Infer the data rate:
        // Micro-diskette = 125kbps, 8-inch disk = 250kbps
        let mut i = 0;
        while i < 1 {
            let maxlen = ((50_000u32 * 300 / rpm as u32) << i) + 5_000;
            if tracklen < maxlen {
                break;
            }
            i += 1;
        }
        data_rate = 125 << i; // 125kbps or 250kbps
    }

    // Calculate standard track length from data rate and RPM.
    let mut tracklen_bc = data_rate * 400 * 300 / rpm as u32;

    // Calculate a suitable GAP3 if not specified.
    if nr != 0 && auto_gap_3 {
        let space = tracklen_bc.saturating_sub(tracklen);
        let no = im.geom.sectors[trk.sec_off].n;
        gap_3 = (space / (16 * nr)).min(GAP_3_MAX[no as usize & 7] as u32);
        dam_sz_post += gap_3;
        tracklen += 16 * nr * gap_3;
    }

    // Round the track length up to fit the data and be a multiple of 32.
    tracklen_bc = tracklen_bc.max(tracklen);
    tracklen_bc = (tracklen_bc + 31) & !31;

    im.tracklen_bc = tracklen_bc;
    im.ticks_per_cell = sysclk_stk(im.stk_per_rev) * 16 / tracklen_bc;
    im.write_bc_ticks = sysclk_us(500) / data_rate;

    im.res = ResolvedTrack {
        encoding: TrackEncoding::Fm,
        nr_sectors: nr as usize,
        sec_off: trk.sec_off,
        rpm,
        data_rate,
        gap_2,
        gap_3,
        gap_4a,
        gap_4: (tracklen_bc - tracklen) / 16,
        has_iam: trk.has_iam,
        invert_data: trk.invert_data,
        head: trk.head,
        idx_sz,
        idam_sz,
        dam_sz_pre,
        dam_sz_post,
    };

    im.dump_info();
}

/// Generate some FM if there is space in the raw-bitcell ring buffer.
pub(crate) fn read_track<F: ReadWriteSeek>(
    im: &mut RawImage<F>,
    bufs: &mut TrackBuffers,
) -> Result<bool, ImageError> {
    im.fetch_data(bufs)?;

    let TrackBuffers {
        read_data: rd,
        read_bc: bc,
        ..
    } = bufs;

    let bc_p = bc.prod / 16; // FM words
    let bc_c = bc.cons / 16; // FM words
    let bc_space = bc.word_len().saturating_sub(bc_p.wrapping_sub(bc_c));

    let mut em = FmEmitter {
        ring: &mut *bc,
        p: bc_p,
    };

    let nr = im.res.nr_sectors;
    if im.decode_pos == 0 {
        // Post-index track gap
        if bc_space < im.res.idx_sz {
            return Ok(false);
        }
        for _ in 0..im.res.gap_4a {
            em.byte(0xFF);
        }
        if im.res.has_iam {
            // IAM
            for _ in 0..FM_GAP_SYNC {
                em.byte(0x00);
            }
            em.raw(fm_sync(0xFC, FM_IAM_CLK));
            for _ in 0..FM_GAP_1 {
                em.byte(0xFF);
            }
        }
    }
    else if im.decode_pos == nr as i32 * 4 + 1 {
        // Pre-index track gap
        let mut sz = im.res.gap_4 - im.decode_data_pos * 1024;
        if bc_space < sz.min(1024) {
            return Ok(false);
        }
        if sz > 1024 {
            sz = 1024;
            im.decode_data_pos += 1;
            im.decode_pos -= 1;
        }
        else {
            im.decode_data_pos = 0;
            im.decode_pos = if im.res.idx_sz != 0 { -1 } else { 0 };
        }
        for _ in 0..sz {
            em.byte(0xFF);
        }
    }
    else {
        let slot = ((im.decode_pos - 1) >> 2) as usize;
        let sec = im.geom.sectors[im.res.sec_off + im.sec_map[slot] as usize];
        match (im.decode_pos - 1) & 3 {
            0 => {
                // IDAM
                let c = (im.cur_track / 2) as u8;
                let h = im.res.head.unwrap_or((im.cur_track & 1) as u8);
                let idam = [0xFE, c, h, sec.r, sec.n];
                if bc_space < im.res.idam_sz {
                    return Ok(false);
                }
                for _ in 0..FM_GAP_SYNC {
                    em.byte(0x00);
                }
                em.raw(fm_sync(idam[0], FM_SYNC_CLK));
                for b in &idam[1..] {
                    em.byte(*b);
                }
                let crc = crc_ibm_3740(&idam, None);
                em.byte((crc >> 8) as u8);
                em.byte(crc as u8);
                for _ in 0..im.res.gap_2 {
                    em.byte(0xFF);
                }
            }
            1 => {
                // DAM
                if bc_space < im.res.dam_sz_pre {
                    return Ok(false);
                }
                for _ in 0..FM_GAP_SYNC {
                    em.byte(0x00);
                }
                em.raw(fm_sync(0xFB, FM_SYNC_CLK));
                im.crc = FM_DAM_CRC;
            }
            2 => {
                // Data
                let mut sec_sz = sec.data_size() as u32 - im.decode_data_pos * 1024;
                if bc_space < sec_sz.min(1024) {
                    return Ok(false);
                }
                if sec_sz > 1024 {
                    sec_sz = 1024;
                    im.decode_data_pos += 1;
                    im.decode_pos -= 1;
                }
                else {
                    im.decode_data_pos = 0;
                }
                for b in &rd.data[..sec_sz as usize] {
                    em.byte(*b);
                }
                im.crc = crc_ibm_3740(&rd.data[..sec_sz as usize], Some(im.crc));
                rd.cons += 1;
            }
            _ => {
                // Post Data
                if bc_space < im.res.dam_sz_post {
                    return Ok(false);
                }
                let crc = im.crc;
                em.byte((crc >> 8) as u8);
                em.byte(crc as u8);
                for _ in 0..im.res.gap_3 {
                    em.byte(0xFF);
                }
            }
        }
    }

    im.decode_pos += 1;
    let bc_p = em.p;
    bc.prod = bc_p * 16;

    Ok(true)
}
