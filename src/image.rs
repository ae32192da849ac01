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
*/

//! The `image` module implements the generic track engine: the [`RawImage`]
//! object that ties the drive's rotational position to a file offset, the
//! interleaved sector order, and the emission/consumption cursors.
//!
//! The engine is cooperative and single-threaded. It makes progress only
//! when the host calls [`RawImage::setup_track`], [`RawImage::read_track`]
//! or [`RawImage::write_track`]; `read_track` returns `Ok(false)` without
//! error when the outgoing ring lacks space for the next structural unit,
//! and the host simply calls again later.

use crate::{
    buffers::{TrackBuffers, WriteCapture},
    clock::stk_ms,
    encoding::{self, fm, mfm, ring_to_bytes, FM_DAM_CRC, FM_SYNC_CLK, MFM_DAM_CRC, MFM_SYNC_A1},
    format::{xdf::XdfInfo, ImageFormat, OpenParams},
    geometry::{Geometry, SectorId},
    io::{ErrorKind, Read, ReadWriteSeek, SeekFrom},
    types::{HostSystem, LayoutFlags, TrackEncoding, WriteSector},
    util::{crc_ibm_3740, get_length, CRC_CCITT_INITIAL},
    ImageError,
};

/// Tolerance, in bitcells, when matching the start of an unaddressed write
/// to a sector's expected data position.
const WRITE_START_TOLERANCE_BC: i32 = 64;

/// Policy knobs for the write path.
#[derive(Copy, Clone, Debug, Default)]
pub struct WritePolicy {
    /// Drop sector payloads whose data CRC does not verify instead of
    /// persisting them. The default persists and logs, as a real controller
    /// writing through to media would; disks with intentionally bad CRCs
    /// rely on it.
    pub discard_bad_crc: bool,
}

/// Per-track parameters resolved by track preparation: auto gaps filled in,
/// data rate inferred, and the encoded field sizes (in data bytes) derived
/// from them.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedTrack {
    pub encoding: TrackEncoding,
    pub nr_sectors: usize,
    pub sec_off: usize,
    pub rpm: u16,
    /// Resolved data rate in kbps.
    pub data_rate: u32,
    pub gap_2: u32,
    pub gap_3: u32,
    pub gap_4a: u32,
    /// Pre-index filler, in bytes, taking the track out to `tracklen_bc`.
    pub gap_4: u32,
    pub has_iam: bool,
    pub invert_data: bool,
    pub head: Option<u8>,
    /// Post-index area size: GAP4A plus the IAM block if present.
    pub idx_sz: u32,
    /// Sync + IDAM + ID + CRC + GAP2 size.
    pub idam_sz: u32,
    /// Sync + DAM size.
    pub dam_sz_pre: u32,
    /// CRC + GAP3 size.
    pub dam_sz_post: u32,
}

impl Default for ResolvedTrack {
    fn default() -> Self {
        ResolvedTrack {
            encoding: TrackEncoding::Mfm,
            nr_sectors: 0,
            sec_off: 0,
            rpm: 300,
            data_rate: 0,
            gap_2: 0,
            gap_3: 0,
            gap_4a: 0,
            gap_4: 0,
            has_iam: false,
            invert_data: false,
            head: None,
            idx_sz: 0,
            idam_sz: 0,
            dam_sz_pre: 0,
            dam_sz_post: 0,
        }
    }
}

/// A raw sector image served as an FM/MFM track bitstream.
///
/// `F` is the filesystem collaborator - anything that can read, write and
/// seek. The engine holds it exclusively between open and drop.
pub struct RawImage<F> {
    pub(crate) fp: F,
    pub(crate) file_size: u64,
    pub(crate) format: ImageFormat,
    pub(crate) host: HostSystem,
    pub(crate) tag: Option<String>,
    pub(crate) config: Option<String>,
    pub(crate) policy: WritePolicy,

    pub(crate) geom: Geometry,
    pub(crate) xdf: Option<XdfInfo>,

    // Per-track state, rebuilt by seek_track().
    pub(crate) cur_track: u16,
    pub(crate) trk_idx: usize,
    pub(crate) res: ResolvedTrack,
    /// Rotational slot -> logical sector index.
    pub(crate) sec_map: Vec<u8>,
    pub(crate) trk_off: u64,
    pub(crate) track_delay_bc: u32,
    pub(crate) stk_per_rev: u32,
    pub(crate) tracklen_bc: u32,
    pub(crate) ticks_per_cell: u32,
    pub(crate) write_bc_ticks: u32,

    // Streaming cursors, reinitialized by setup_track().
    pub(crate) cur_bc: u32,
    pub(crate) cur_ticks: u32,
    pub(crate) decode_pos: i32,
    pub(crate) decode_data_pos: u32,
    pub(crate) trk_sec: usize,
    pub(crate) rd_sec_pos: u32,
    pub(crate) crc: u16,
    pub(crate) write_sector: WriteSector,

    wr_buf: Vec<u8>,
}

impl<F: ReadWriteSeek> RawImage<F> {
    /// Open `fp` as an image of the given family. Returns
    /// [`ImageError::UnknownFormat`] when the file does not match the
    /// family, so a caller holding several candidate formats can try the
    /// next one.
    pub fn open(mut fp: F, format: ImageFormat, params: OpenParams) -> Result<Self, ImageError> {
        let file_size = get_length(&mut fp)?;
        if file_size == 0 {
            return Err(ImageError::UnknownFormat);
        }

        let mut im = RawImage {
            fp,
            file_size,
            format,
            host: params.host,
            tag: params.tag.map(str::to_owned),
            config: params.config.map(str::to_owned),
            policy: params.policy,
            geom: Geometry::default(),
            xdf: None,
            cur_track: 0,
            trk_idx: 0,
            res: ResolvedTrack::default(),
            sec_map: Vec::new(),
            trk_off: 0,
            track_delay_bc: 0,
            stk_per_rev: 0,
            tracklen_bc: 0,
            ticks_per_cell: 0,
            write_bc_ticks: 0,
            cur_bc: 0,
            cur_ticks: 0,
            decode_pos: 0,
            decode_data_pos: 0,
            trk_sec: 0,
            rd_sec_pos: 0,
            crc: CRC_CCITT_INITIAL,
            write_sector: WriteSector::Idle,
            wr_buf: Vec::new(),
        };

        if !format.open(&mut im)? {
            return Err(ImageError::UnknownFormat);
        }
        im.finish_open()?;
        Ok(im)
    }

    /// Sector data length available in the file, past any header.
    pub(crate) fn im_size(&self) -> u64 {
        self.file_size.saturating_sub(self.geom.base_off as u64)
    }

    /// Discard any partially built geometry so another opener can start
    /// from scratch.
    pub(crate) fn reset_all_params(&mut self) {
        self.geom = Geometry::default();
        self.xdf = None;
    }

    /// Apply the step factor and prepare track 0, so rate-derived values
    /// are valid as soon as the open returns.
    pub(crate) fn finish_open(&mut self) -> Result<(), ImageError> {
        if self.geom.step == 0 {
            self.geom.step = 1;
        }
        self.geom.nr_cyls = (self.geom.nr_cyls as u32 * self.geom.step as u32).min(255) as u16;
        self.seek_track(0, 0, 0)
    }

    /// Materialize a matching entry of `table` (if any) into the geometry.
    pub(crate) fn open_from_table(&mut self, table: &[crate::geometry::tables::RawGeometry]) -> Result<bool, ImageError> {
        let Some((nr_cyls, nr_sides, entry)) = crate::geometry::tables::match_size(table, self.im_size()) else {
            return Ok(false);
        };
        self.geom.nr_cyls = nr_cyls;
        self.geom.nr_sides = nr_sides;
        self.geom.apply_simple_layout(&entry.layout())?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Accessors

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Release the underlying file.
    pub fn into_inner(self) -> F {
        self.fp
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geom
    }

    /// Total bitcells in the current track's revolution.
    pub fn tracklen_bc(&self) -> u32 {
        self.tracklen_bc
    }

    /// System-clock ticks per bitcell, scaled by 16.
    pub fn ticks_per_cell(&self) -> u32 {
        self.ticks_per_cell
    }

    /// System-clock ticks per written bitcell, for host write sampling.
    pub fn write_bc_ticks(&self) -> u32 {
        self.write_bc_ticks
    }

    /// Current bitcell position within the revolution.
    pub fn cur_bc(&self) -> u32 {
        self.cur_bc
    }

    pub fn encoding(&self) -> TrackEncoding {
        self.res.encoding
    }

    /// Resolved data rate of the current track, in kbps.
    pub fn data_rate(&self) -> u32 {
        self.res.data_rate
    }

    /// Resolved spindle speed of the current track.
    pub fn rpm(&self) -> u16 {
        self.res.rpm
    }

    /// Extra rotational delay applied to the current track, in bitcells.
    pub fn track_delay_bc(&self) -> u32 {
        self.track_delay_bc
    }

    /// File offset of the current track's sector data.
    pub fn track_offset(&self) -> u64 {
        self.trk_off
    }

    /// Rotational-to-logical sector order of the current track.
    pub fn sector_map(&self) -> &[u8] {
        &self.sec_map
    }

    /// The canonical file size implied by the geometry, for handlers that
    /// advertise image truncation/extension. `None` for families that do
    /// not.
    pub fn extend(&self) -> Option<u64> {
        self.format.supports_extend().then(|| self.extent())
    }

    /// The file size implied by the geometry: header plus every sector of
    /// every mapped track.
    pub fn extent(&self) -> u64 {
        let mut sz = self.geom.base_off as u64;
        for cyl in 0..self.geom.map_cyls() {
            for side in 0..self.geom.nr_sides as usize {
                if let Some(trk_idx) = self.geom.map_entry(cyl, side) {
                    let trk = &self.geom.tracks[trk_idx];
                    sz += self
                        .geom
                        .track_sectors(trk)
                        .iter()
                        .map(|s| s.data_size() as u64)
                        .sum::<u64>();
                }
            }
        }
        sz
    }

    // ------------------------------------------------------------------
    // Track engine

    /// Encoded size of one sector, in data bytes, at the current track's
    /// resolved gap sizes.
    pub(crate) fn enc_sec_sz(&self, sec: &SectorId) -> u32 {
        self.res.idam_sz + self.res.dam_sz_pre + sec.data_size() as u32 + self.res.dam_sz_post
    }

    /// Position in file-track order of (cyl, side), per the layout flags.
    pub(crate) fn file_idx(&self, cyl: usize, side: usize) -> usize {
        let cyls = self.geom.map_cyls();
        let sides = self.geom.nr_sides as usize;
        let c = if self.geom.layout.contains(LayoutFlags::reverse_side(side as u8)) {
            cyls - cyl - 1
        }
        else {
            cyl
        };
        let s = if self.geom.layout.contains(LayoutFlags::SIDES_SWAPPED) {
            side ^ (sides - 1)
        }
        else {
            side
        };
        if self.geom.layout.contains(LayoutFlags::SEQUENTIAL) {
            s * cyls + c
        }
        else {
            c * sides + s
        }
    }

    pub(crate) fn seek_track(&mut self, track: u16, cyl: usize, side: usize) -> Result<(), ImageError> {
        let trk_idx = self.geom.map_entry(cyl, side).ok_or(ImageError::SeekError)?;
        if trk_idx >= self.geom.tracks.len() {
            return Err(ImageError::BadImage);
        }
        self.cur_track = track;
        self.trk_idx = trk_idx;

        let trk = &self.geom.tracks[trk_idx];
        let rpm = if trk.rpm == 0 { 300 } else { trk.rpm };
        self.stk_per_rev = stk_ms(200) * 300 / rpm as u32;

        // Create the logical sector map in rotational order.
        let nr = trk.nr_sectors as usize;
        let interleave = trk.interleave.max(1) as usize;
        self.sec_map = vec![0xFF; nr];
        if nr != 0 {
            let mut pos = (cyl * trk.cskew as usize + side * trk.hskew as usize) % nr;
            for i in 0..nr {
                while self.sec_map[pos] != 0xFF {
                    pos = (pos + 1) % nr;
                }
                self.sec_map[pos] = i as u8;
                pos = (pos + interleave) % nr;
            }
        }

        if self.geom.tracks[trk_idx].is_fm {
            fm::prep_track(self, rpm);
        }
        else {
            mfm::prep_track(self, rpm);
        }

        if self.xdf.is_none() {
            // Find the offset of this track's data in the image file.
            let idx = self.file_idx(cyl, side);
            let mut off = self.geom.base_off as u64;
            for i in 0..self.geom.map_cyls() {
                for j in 0..self.geom.nr_sides as usize {
                    if self.file_idx(i, j) >= idx {
                        continue;
                    }
                    if let Some(t) = self.geom.map_entry(i, j) {
                        let trk = &self.geom.tracks[t];
                        off += self
                            .geom
                            .track_sectors(trk)
                            .iter()
                            .map(|s| s.data_size() as u64)
                            .sum::<u64>();
                    }
                }
            }
            self.trk_off = off;
        }

        Ok(())
    }

    /// Derive the decoder cursor from the current bitcell position, so the
    /// next emitted byte continues exactly from the drive's rotational
    /// angle. Returns the byte offset into the current structural unit.
    pub(crate) fn calc_start_pos(&mut self) -> u32 {
        let mut bc = self.cur_bc as i32 - self.track_delay_bc as i32;
        if bc < 0 {
            bc += self.tracklen_bc as i32;
        }

        self.crc = CRC_CCITT_INITIAL;
        self.trk_sec = 0;
        self.rd_sec_pos = 0;
        self.decode_data_pos = 0;

        let mut decode_off = bc as u32 / 16;
        if decode_off < self.res.idx_sz {
            // Post-index track gap
            self.decode_pos = 0;
            return decode_off;
        }
        decode_off -= self.res.idx_sz;

        let nr = self.res.nr_sectors;
        let mut entered = None;
        for i in 0..nr {
            let sec = self.geom.sectors[self.res.sec_off + self.sec_map[i] as usize];
            let ess = self.enc_sec_sz(&sec);
            if decode_off < ess {
                entered = Some((i, sec));
                break;
            }
            decode_off -= ess;
        }

        match entered {
            Some((i, sec)) => {
                // IDAM
                self.trk_sec = i;
                self.decode_pos = i as i32 * 4 + 1;
                if decode_off >= self.res.idam_sz {
                    // DAM
                    decode_off -= self.res.idam_sz;
                    self.decode_pos += 1;
                    if decode_off >= self.res.dam_sz_pre {
                        // Data or Post Data
                        decode_off -= self.res.dam_sz_pre;
                        self.decode_pos += 1;
                        if decode_off < sec.data_size() as u32 {
                            // Data
                            self.rd_sec_pos = decode_off / 1024;
                            self.decode_data_pos = self.rd_sec_pos;
                            decode_off %= 1024;
                        }
                        else {
                            // Post Data
                            decode_off -= sec.data_size() as u32;
                            self.decode_pos += 1;
                            // Start fetch at next sector.
                            self.trk_sec = (i + 1) % nr;
                        }
                    }
                }
            }
            None => {
                // Pre-index track gap
                self.decode_pos = nr as i32 * 4 + 1;
                self.decode_data_pos = decode_off / 1024;
                decode_off %= 1024;
            }
        }

        decode_off
    }

    /// Position the cursor on `track`. `start_pos`, when given, is the
    /// rotational position in system-clock ticks; the read pipeline is
    /// primed and the position echoed back.
    pub fn setup_track(
        &mut self,
        bufs: &mut TrackBuffers,
        track: u16,
        start_pos: Option<u32>,
    ) -> Result<Option<u32>, ImageError> {
        // XDF geometry can also arrive via the generic opener's host
        // routing, so dispatch on the XDF state rather than the format.
        if self.xdf.is_some() {
            crate::format::xdf::setup_track(self, bufs, track, start_pos)
        }
        else {
            self.raw_setup_track(bufs, track, start_pos)
        }
    }

    pub(crate) fn raw_setup_track(
        &mut self,
        bufs: &mut TrackBuffers,
        track: u16,
        start_pos: Option<u32>,
    ) -> Result<Option<u32>, ImageError> {
        let sys_ticks = start_pos.unwrap_or(0);
        let cyl = (track / (2 * self.geom.step as u16)) as usize;
        let side = (track & (self.geom.nr_sides as u16 - 1)) as usize;

        let track = (cyl * 2 + side) as u16;
        if track != self.cur_track {
            self.seek_track(track, cyl, side)?;
        }

        self.write_sector = WriteSector::Idle;

        self.cur_bc = sys_ticks * 16 / self.ticks_per_cell;
        self.cur_bc &= !15;
        if self.cur_bc >= self.tracklen_bc {
            self.cur_bc = 0;
        }
        self.cur_ticks = self.cur_bc * self.ticks_per_cell;

        let decode_off = self.calc_start_pos();

        bufs.read_data.reset();
        bufs.read_bc.reset();

        if start_pos.is_some() {
            self.read_track(bufs)?;
            bufs.read_bc.cons = decode_off * 16;
            Ok(Some(sys_ticks))
        }
        else {
            Ok(None)
        }
    }

    /// Emit one structural unit of the track bitstream into the outgoing
    /// ring. Returns `Ok(false)` without side effects when the ring lacks
    /// space; call again once the host has consumed bitcells.
    pub fn read_track(&mut self, bufs: &mut TrackBuffers) -> Result<bool, ImageError> {
        match self.res.encoding {
            TrackEncoding::Fm => fm::read_track(self, bufs),
            TrackEncoding::Mfm => mfm::read_track(self, bufs),
        }
    }

    /// Refill the staging buffer with the next chunk of sector data, in
    /// rotational order.
    pub(crate) fn fetch_data(&mut self, bufs: &mut TrackBuffers) -> Result<(), ImageError> {
        let rd = &mut bufs.read_data;
        if self.res.nr_sectors == 0 || rd.prod != rd.cons {
            return Ok(());
        }

        let sec_i = self.sec_map[self.trk_sec] as usize;
        let sec = self.geom.sectors[self.res.sec_off + sec_i];

        let mut off = self.sector_file_off(sec_i);
        let mut len = sec.data_size() as u32;

        off += self.rd_sec_pos as u64 * 1024;
        len -= self.rd_sec_pos * 1024;

        if len > 1024 {
            len = 1024;
            self.rd_sec_pos += 1;
        }
        else {
            self.rd_sec_pos = 0;
            self.trk_sec += 1;
            if self.trk_sec >= self.res.nr_sectors {
                self.trk_sec = 0;
            }
        }

        let len = len as usize;
        // The file may be shorter than the geometry implies; the missing
        // tail reads as zeros.
        rd.data[..len].fill(0);
        self.fp.seek(SeekFrom::Start(self.trk_off + off))?;
        read_upto(&mut self.fp, &mut rd.data[..len])?;
        if self.res.invert_data {
            invert(&mut rd.data[..len]);
        }

        rd.prod += 1;
        Ok(())
    }

    /// Byte offset of logical sector `sec_i` within the current track's
    /// file data.
    fn sector_file_off(&self, sec_i: usize) -> u64 {
        if let Some(xdf) = &self.xdf {
            return xdf.offsets[xdf.sel][sec_i] as u64;
        }
        self.geom.sectors[self.res.sec_off..self.res.sec_off + sec_i]
            .iter()
            .map(|s| s.data_size() as u64)
            .sum()
    }

    /// Infer which sector an unaddressed write belongs to from the track
    /// angle at which the write gate opened.
    fn find_first_write_sector(&self, write: &WriteCapture) -> WriteSector {
        let mut base = (write.start * 16 / self.ticks_per_cell) as i32; // in bitcells
        base -= self.track_delay_bc as i32;
        if base < 0 {
            base += self.tracklen_bc as i32;
        }

        // Convert the write offset to a rotational slot.
        base -= 16 * (self.res.idx_sz + self.res.idam_sz) as i32;
        for slot in 0..self.res.nr_sectors {
            // Within a small range of the expected data start?
            if (-WRITE_START_TOLERANCE_BC..=WRITE_START_TOLERANCE_BC).contains(&base) {
                return WriteSector::Logical(self.sec_map[slot] as usize);
            }
            let sec = self.geom.sectors[self.res.sec_off + self.sec_map[slot] as usize];
            base -= 16 * self.enc_sec_sz(&sec) as i32;
        }

        log::warn!("IMG bad write offset: {}", base);
        WriteSector::Unresolved
    }

    /// Consume captured raw bitcells from the incoming ring, decoding IDAM
    /// and DAM structures and persisting sector payloads. Returns whether
    /// the final (flush) phase has been reached.
    pub fn write_track(&mut self, bufs: &mut TrackBuffers, write: &WriteCapture) -> Result<bool, ImageError> {
        let flush = write.flush;
        let wr = &mut bufs.write_bc;

        let mut c = wr.cons / 16;
        let mut p = wr.prod / 16;
        // If we are processing final data then use the end index, rounded up.
        if flush {
            p = (write.bc_end + 15) / 16;
        }

        'parse: while (p.wrapping_sub(c) as i32) > 128 {
            let sc = c;
            let x;

            match self.res.encoding {
                TrackEncoding::Fm => {
                    let w = wr.get(c);
                    c += 1;
                    if w != 0xAAAA {
                        continue;
                    }
                    let sync = wr.get(c);
                    if encoding::raw_to_byte(sync >> 1) != FM_SYNC_CLK {
                        continue;
                    }
                    x = encoding::raw_to_byte(sync);
                    c += 1;
                }
                TrackEncoding::Mfm => {
                    if wr.get(c) != MFM_SYNC_A1 {
                        c += 1;
                        continue;
                    }
                    c += 1;
                    x = encoding::raw_to_byte(wr.get(c));
                    if x == 0xA1 {
                        continue;
                    }
                    c += 1;
                }
            }

            match x {
                0xFE => {
                    // IDAM
                    let mut hdr = [0u8; 10];
                    let (len, idam_r) = match self.res.encoding {
                        TrackEncoding::Fm => {
                            hdr[0] = x;
                            for b in hdr[1..7].iter_mut() {
                                *b = encoding::raw_to_byte(wr.get(c));
                                c += 1;
                            }
                            (7, hdr[3])
                        }
                        TrackEncoding::Mfm => {
                            hdr[..3].fill(0xA1);
                            hdr[3] = x;
                            for b in hdr[4..10].iter_mut() {
                                *b = encoding::raw_to_byte(wr.get(c));
                                c += 1;
                            }
                            (10, hdr[6])
                        }
                    };
                    let crc = crc_ibm_3740(&hdr[..len], None);
                    if crc != 0 {
                        log::warn!("IMG IDAM bad CRC: {:04x}, {}", crc, idam_r);
                        continue;
                    }
                    // Search by sector ID for this sector's logical order.
                    let secs = &self.geom.sectors[self.res.sec_off..self.res.sec_off + self.res.nr_sectors];
                    self.write_sector = match secs.iter().position(|s| s.r == idam_r) {
                        Some(i) => WriteSector::Logical(i),
                        None => {
                            log::warn!("IMG IDAM bad sector: {:02x}", idam_r);
                            WriteSector::Unresolved
                        }
                    };
                }
                0xFB => {
                    // DAM
                    let sec_nr = match self.write_sector {
                        WriteSector::Logical(i) => Some(i),
                        WriteSector::Idle => match self.find_first_write_sector(write) {
                            WriteSector::Logical(i) => Some(i),
                            _ => None,
                        },
                        WriteSector::Unresolved => None,
                    };
                    let Some(sec_nr) = sec_nr else {
                        log::warn!("IMG DAM unknown");
                        self.write_sector = WriteSector::Unresolved;
                        continue;
                    };

                    let sec = self.geom.sectors[self.res.sec_off + sec_nr];
                    let sec_sz = sec.data_size();

                    // The payload may straddle the end of the captured
                    // window; rewind to the mark and await more data.
                    if (p.wrapping_sub(c) as i32) < (sec_sz + 2) as i32 {
                        c = sc;
                        break 'parse;
                    }

                    let mut crc = match self.res.encoding {
                        TrackEncoding::Fm => FM_DAM_CRC,
                        TrackEncoding::Mfm => MFM_DAM_CRC,
                    };

                    log::debug!("IMG write {}[{:02x}]/{}", sec_nr, sec.r, self.res.nr_sectors);

                    let off = self.sector_file_off(sec_nr);

                    self.wr_buf.resize(sec_sz, 0);
                    ring_to_bytes(wr, c, &mut self.wr_buf);
                    c += sec_sz as u32;
                    crc = crc_ibm_3740(&self.wr_buf, Some(crc));

                    let mut crc_bytes = [0u8; 2];
                    ring_to_bytes(wr, c, &mut crc_bytes);
                    c += 2;
                    crc = crc_ibm_3740(&crc_bytes, Some(crc));
                    if crc != 0 {
                        log::warn!("IMG bad CRC: {:04x}, {}[{:02x}]", crc, sec_nr, sec.r);
                    }

                    if crc == 0 || !self.policy.discard_bad_crc {
                        if self.res.invert_data {
                            invert(&mut self.wr_buf);
                        }
                        self.fp.seek(SeekFrom::Start(self.trk_off + off))?;
                        self.fp.write_all(&self.wr_buf)?;
                    }

                    self.write_sector = WriteSector::Unresolved;
                }
                _ => {
                    // Other marks (DDAM etc.) are ignored.
                }
            }
        }

        wr.cons = c * 16;
        Ok(flush)
    }

    pub(crate) fn dump_info(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        let trk = &self.geom.tracks[self.trk_idx];
        log::debug!(
            "C{} S{}:: {} {}-{}-{} step={}:",
            self.cur_track / 2,
            self.cur_track & 1,
            self.res.encoding,
            self.geom.nr_cyls,
            self.geom.nr_sides,
            self.res.nr_sectors,
            self.geom.step
        );
        log::debug!(
            " rpm: {}, tracklen: {}, datarate: {}",
            self.res.rpm,
            self.tracklen_bc,
            self.res.data_rate
        );
        log::debug!(
            " gap2: {}, gap3: {}, gap4a: {}, gap4: {}",
            self.res.gap_2,
            self.res.gap_3,
            self.res.gap_4a,
            self.res.gap_4
        );
        log::debug!(
            " ticks_per_cell: {}, write_bc_ticks: {}, has_iam: {}",
            self.ticks_per_cell,
            self.write_bc_ticks,
            self.res.has_iam
        );
        log::debug!(
            " interleave: {}, cskew {}, hskew {}",
            trk.interleave,
            trk.cskew,
            trk.hskew
        );
        log::debug!(" file-layout: {:x}", self.geom.layout.bits());
        for slot in &self.sec_map {
            let sec = &self.geom.sectors[self.res.sec_off + *slot as usize];
            let hd = self.res.head.unwrap_or((self.cur_track & 1) as u8);
            log::trace!("{{{},{},{},{}}}", self.cur_track / 2, hd, sec.r, sec.n);
        }
    }
}

pub(crate) fn invert(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        *b = !*b;
    }
}

fn read_upto<F: Read>(fp: &mut F, mut buf: &mut [u8]) -> Result<(), crate::io::Error> {
    while !buf.is_empty() {
        match fp.read(buf) {
            Ok(0) => break,
            Ok(n) => buf = &mut buf[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
