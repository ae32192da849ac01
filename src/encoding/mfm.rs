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

    src/encoding/mfm.rs

    IBM System 34 (MFM) track preparation and bitstream emission.
*/

use crate::{
    buffers::{BitcellRing, TrackBuffers},
    clock::{sysclk_stk, sysclk_us},
    encoding::{MFM_DAM_CRC, MFM_SYNC_A1, MFM_SYNC_C2, MFM_TABLE},
    image::{RawImage, ResolvedTrack},
    io::ReadWriteSeek,
    types::TrackEncoding,
    util::crc_ibm_3740,
    ImageError,
};

pub const MFM_GAP_1: u32 = 50; // Post-IAM
pub const MFM_GAP_2: u32 = 22; // Post-IDAM
pub const MFM_GAP_4A: u32 = 80; // Post-Index
pub const MFM_GAP_SYNC: u32 = 12;

/// Largest useful GAP3, by sector size code.
const GAP_3_MAX: [u8; 8] = [32, 54, 84, 116, 255, 255, 255, 255];

struct MfmEmitter<'a> {
    ring: &'a mut BitcellRing,
    p: u32,
    pr: u16,
}

impl MfmEmitter<'_> {
    /// Emit a raw word, suppressing the leading clock bit if the previous
    /// word ended in a one data bit.
    #[inline]
    fn raw(&mut self, r: u16) {
        self.ring.set(self.p, r & !(self.pr << 15));
        self.p += 1;
        self.pr = r;
    }

    #[inline]
    fn byte(&mut self, b: u8) {
        self.raw(MFM_TABLE[b as usize]);
    }
}

/// Resolve gaps and data rate for the current track and derive the encoded
/// field sizes and track length.
pub(crate) fn prep_track<F: ReadWriteSeek>(im: &mut RawImage<F>, rpm: u16) {
    let trk = im.geom.tracks[im.trk_idx].clone();
    let nr = trk.nr_sectors as u32;

    let auto_gap_2 = trk.gap_2.is_none();
    let mut gap_2 = trk.gap_2.map_or(MFM_GAP_2, |g| g as u32);
    let auto_gap_3 = trk.gap_3.is_none();
    // Auto GAP3 starts at zero and is sized to the leftover space below.
    let mut gap_3 = trk.gap_3.map_or(0, |g| g as u32);
    let gap_4a = trk.gap_4a.map_or(MFM_GAP_4A, |g| g as u32);

    let mut idx_sz = gap_4a;
    if trk.has_iam {
        idx_sz += MFM_GAP_SYNC + 4 + MFM_GAP_1;
    }
    let mut idam_sz = MFM_GAP_SYNC + 8 + 2 + gap_2;
    let dam_sz_pre = MFM_GAP_SYNC + 4;
    let mut dam_sz_post = 2 + gap_3;

    idam_sz += im.geom.post_crc_syncs as u32;
    dam_sz_post += im.geom.post_crc_syncs as u32;

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
        // Infer the data rate.
        let mut i = 1; // DD=1, HD=2, ED=3
        while i < 3 {
            let maxlen = ((50_000u32 * 300 / rpm as u32) << i) + 5_000;
            if tracklen < maxlen {
                break;
            }
            i += 1;
        }
        data_rate = 125 << i; // DD=250, HD=500, ED=1000
    }

    if auto_gap_2 && data_rate >= 1000 {
        // At the ED rate the default GAP2 is 41 bytes.
        let old_gap_2 = gap_2;
        gap_2 = 41;
        idam_sz += gap_2 - old_gap_2;
        tracklen += 16 * nr * (gap_2 - old_gap_2);
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
        encoding: TrackEncoding::Mfm,
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

/// Generate some MFM if there is space in the raw-bitcell ring buffer.
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

    let bc_p = bc.prod / 16; // MFM words
    let bc_c = bc.cons / 16; // MFM words
    let bc_space = bc.word_len().saturating_sub(bc_p.wrapping_sub(bc_c));

    let pr = bc.get(bc_p.wrapping_sub(1));
    let mut em = MfmEmitter {
        ring: &mut *bc,
        p: bc_p,
        pr,
    };

    let nr = im.res.nr_sectors;
    if im.decode_pos == 0 {
        // Post-index track gap
        if bc_space < im.res.idx_sz {
            return Ok(false);
        }
        for _ in 0..im.res.gap_4a {
            em.byte(0x4E);
        }
        if im.res.has_iam {
            // IAM
            for _ in 0..MFM_GAP_SYNC {
                em.byte(0x00);
            }
            for _ in 0..3 {
                em.raw(MFM_SYNC_C2);
            }
            em.byte(0xFC);
            for _ in 0..MFM_GAP_1 {
                em.byte(0x4E);
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
            em.byte(0x4E);
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
                let idam = [0xA1, 0xA1, 0xA1, 0xFE, c, h, sec.r, sec.n];
                if bc_space < im.res.idam_sz {
                    return Ok(false);
                }
                for _ in 0..MFM_GAP_SYNC {
                    em.byte(0x00);
                }
                for _ in 0..3 {
                    em.raw(MFM_SYNC_A1);
                }
                for b in &idam[3..] {
                    em.byte(*b);
                }
                let crc = crc_ibm_3740(&idam, None);
                em.byte((crc >> 8) as u8);
                em.byte(crc as u8);
                for _ in 0..im.geom.post_crc_syncs {
                    em.raw(MFM_SYNC_A1);
                }
                for _ in 0..im.res.gap_2 {
                    em.byte(0x4E);
                }
            }
            1 => {
                // DAM
                if bc_space < im.res.dam_sz_pre {
                    return Ok(false);
                }
                for _ in 0..MFM_GAP_SYNC {
                    em.byte(0x00);
                }
                for _ in 0..3 {
                    em.raw(MFM_SYNC_A1);
                }
                em.byte(0xFB);
                im.crc = MFM_DAM_CRC;
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
                for _ in 0..im.geom.post_crc_syncs {
                    em.raw(MFM_SYNC_A1);
                }
                for _ in 0..im.res.gap_3 {
                    em.byte(0x4E);
                }
            }
        }
    }

    im.decode_pos += 1;
    let bc_p = em.p;
    bc.prod = bc_p * 16;

    Ok(true)
}
