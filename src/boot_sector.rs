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

    src/boot_sector.rs

    Routines for reading the BIOS Parameter Block. The fields we care about
    are scattered across the boot sector rather than contiguous, so each is
    read at its own offset.
*/

use crate::{
    io::{Read, Seek, SeekFrom},
    ImageError,
};

/// Boot sector signature expected in the last two bytes of sector 0.
pub const BPB_SIGNATURE: u16 = 0xAA55;

/// The BPB fields consulted for geometry detection, in read order.
#[derive(Debug, Default, Clone, Copy)]
pub struct BiosParameterBlock {
    pub sig: u16,
    pub bytes_per_sec: u16,
    pub sec_per_track: u16,
    pub num_heads: u16,
    pub tot_sec: u16,
    pub rootdir_ents: u16,
    pub fat_secs: u16,
}

/// Byte offsets of each field of [`BiosParameterBlock`], little-endian.
const BPB_FIELD_OFFSETS: [u64; 7] = [510, 11, 24, 26, 19, 17, 22];

impl BiosParameterBlock {
    pub fn read<RS: Read + Seek>(fp: &mut RS) -> Result<Self, ImageError> {
        let mut fields = [0u16; 7];
        let mut buf = [0u8; 2];
        for (field, &off) in fields.iter_mut().zip(BPB_FIELD_OFFSETS.iter()) {
            fp.seek(SeekFrom::Start(off))?;
            fp.read_exact(&mut buf)?;
            *field = u16::from_le_bytes(buf);
        }
        Ok(BiosParameterBlock {
            sig: fields[0],
            bytes_per_sec: fields[1],
            sec_per_track: fields[2],
            num_heads: fields[3],
            tot_sec: fields[4],
            rootdir_ents: fields[5],
            fat_secs: fields[6],
        })
    }

    /// A simple check for 3.5-inch HD XDF images, which report a logical
    /// track of 23 512-byte sectors across 80 cylinders.
    pub fn xdf_check(&self) -> bool {
        self.sig == BPB_SIGNATURE
            && self.bytes_per_sec == 512
            && self.num_heads == 2
            && self.tot_sec == 2 * 80 * self.sec_per_track
    }
}
