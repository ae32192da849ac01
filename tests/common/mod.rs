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

    tests/common/mod.rs

    Common support routines for tests: in-memory image construction, track
    draining, and a software decoder for the emitted bitstreams.
*/

use hex::encode;
use sha1::{Digest, Sha1};

use rawtrack::{
    encoding::{fm_sync, raw_to_byte, FM_SYNC_CLK, MFM_SYNC_A1},
    io::ReadWriteSeek,
    util::crc_ibm_3740,
    RawImage,
    TrackBuffers,
};

#[allow(dead_code)]
pub fn compute_slice_hash(slice: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(slice);
    let result = hasher.finalize();

    encode(result)
}

/// A deterministic, non-repeating byte pattern for image payloads.
#[allow(dead_code)]
pub fn patterned(size: usize) -> Vec<u8> {
    (0..size).map(|i| ((i * 7) ^ (i >> 8) ^ (i >> 13)) as u8).collect()
}

/// Standard host buffers large enough to hold a full HD track.
#[allow(dead_code)]
pub fn buffers() -> TrackBuffers {
    TrackBuffers::new(16384, 16384)
}

/// Set up `track` and pull exactly one revolution of raw words out of the
/// engine.
#[allow(dead_code)]
pub fn drain_revolution<F: ReadWriteSeek>(
    im: &mut RawImage<F>,
    bufs: &mut TrackBuffers,
    track: u16,
) -> Vec<u16> {
    im.setup_track(bufs, track, None).unwrap();
    while bufs.read_bc.prod < im.tracklen_bc() {
        assert!(
            im.read_track(bufs).unwrap(),
            "bitcell ring filled up before one revolution was emitted"
        );
    }
    assert_eq!(bufs.read_bc.prod, im.tracklen_bc());
    (0..im.tracklen_bc() / 16).map(|i| bufs.read_bc.get(i)).collect()
}

#[allow(dead_code)]
#[derive(Debug)]
pub struct ScannedSector {
    pub c: u8,
    pub h: u8,
    pub r: u8,
    pub n: u8,
    pub data: Vec<u8>,
    pub id_crc_ok: bool,
    pub data_crc_ok: bool,
}

/// Decode the sectors of an emitted MFM track.
#[allow(dead_code)]
pub fn scan_mfm(words: &[u16]) -> Vec<ScannedSector> {
    let mut out = Vec::new();
    let mut id: Option<(u8, u8, u8, u8, bool)> = None;
    let mut i = 0;
    while i + 4 <= words.len() {
        if words[i] != MFM_SYNC_A1 || words[i + 1] != MFM_SYNC_A1 || words[i + 2] != MFM_SYNC_A1 {
            i += 1;
            continue;
        }
        match raw_to_byte(words[i + 3]) {
            0xFE if i + 10 <= words.len() => {
                let mut hdr = [0xA1, 0xA1, 0xA1, 0xFE, 0, 0, 0, 0, 0, 0];
                for (k, b) in hdr[4..].iter_mut().enumerate() {
                    *b = raw_to_byte(words[i + 4 + k]);
                }
                let ok = crc_ibm_3740(&hdr, None) == 0;
                id = Some((hdr[4], hdr[5], hdr[6], hdr[7], ok));
                i += 10;
            }
            0xFB => {
                let Some((c, h, r, n, id_crc_ok)) = id.take() else {
                    i += 4;
                    continue;
                };
                let len = 128usize << n;
                if i + 4 + len + 2 > words.len() {
                    break;
                }
                let mut field = vec![0xA1, 0xA1, 0xA1, 0xFB];
                field.extend((0..len + 2).map(|k| raw_to_byte(words[i + 4 + k])));
                let data_crc_ok = crc_ibm_3740(&field, None) == 0;
                let data = field[4..4 + len].to_vec();
                out.push(ScannedSector {
                    c,
                    h,
                    r,
                    n,
                    data,
                    id_crc_ok,
                    data_crc_ok,
                });
                i += 4 + len + 2;
            }
            _ => i += 4,
        }
    }
    out
}

/// Decode the sectors of an emitted FM track.
#[allow(dead_code)]
pub fn scan_fm(words: &[u16]) -> Vec<ScannedSector> {
    let idam = fm_sync(0xFE, FM_SYNC_CLK);
    let dam = fm_sync(0xFB, FM_SYNC_CLK);

    let mut out = Vec::new();
    let mut id: Option<(u8, u8, u8, u8, bool)> = None;
    let mut i = 0;
    while i < words.len() {
        if words[i] == idam {
            if i + 7 > words.len() {
                break;
            }
            let mut hdr = [0xFE, 0, 0, 0, 0, 0, 0];
            for (k, b) in hdr[1..].iter_mut().enumerate() {
                *b = raw_to_byte(words[i + 1 + k]);
            }
            let ok = crc_ibm_3740(&hdr, None) == 0;
            id = Some((hdr[1], hdr[2], hdr[3], hdr[4], ok));
            i += 7;
        }
        else if words[i] == dam {
            let Some((c, h, r, n, id_crc_ok)) = id.take() else {
                i += 1;
                continue;
            };
            let len = 128usize << n;
            if i + 1 + len + 2 > words.len() {
                break;
            }
            let mut field = vec![0xFB];
            field.extend((0..len + 2).map(|k| raw_to_byte(words[i + 1 + k])));
            let data_crc_ok = crc_ibm_3740(&field, None) == 0;
            let data = field[1..1 + len].to_vec();
            out.push(ScannedSector {
                c,
                h,
                r,
                n,
                data,
                id_crc_ok,
                data_crc_ok,
            });
            i += 1 + len + 2;
        }
        else {
            i += 1;
        }
    }
    out
}
