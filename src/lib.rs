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

//! # rawtrack
//!
//! rawtrack is a Rust library for serving raw sector images - plain
//! concatenations of sector payloads - to a floppy drive emulator as
//! bit-exact IBM System 34 (MFM) or IBM 3740 (FM) track bitstreams.
//!
//! The engine behaves as a real floppy disk controller would: it generates
//! address marks, CRCs and gaps, honors interleave and skew, and on writes
//! parses the same structures back into sector payloads which are persisted
//! to the image file.
//!
//! The main interface is the [`image::RawImage`] object, created by opening
//! a sector image with one of the [`format::ImageFormat`] family openers.
//! The host owns the streaming buffers ([`buffers::TrackBuffers`]) and calls
//! [`image::RawImage::setup_track`] to position the virtual head, then
//! [`image::RawImage::read_track`] / [`image::RawImage::write_track`] to
//! move bitcells in and out of them. Physical I/O, timers and file selection
//! are host concerns and stay outside this crate.

pub mod buffers;
pub mod clock;
pub mod encoding;
pub mod format;
pub mod geometry;
pub mod image;
pub mod io;
pub mod types;
pub mod util;

mod boot_sector;

use thiserror::Error;

/// The largest sector payload the engine will handle (size code 6).
pub const MAX_SECTOR_SIZE: usize = 8192;
/// The largest legal sector size code. Size in bytes is `128 << n`.
pub const MAX_SIZE_CODE: u8 = 6;
/// Sector payloads are fetched from and written to the image file in chunks
/// of at most this many bytes.
pub const DATA_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("An IO error occurred reading or writing the image: {0}")]
    IoError(String),
    #[error("The image did not match any requested format")]
    UnknownFormat,
    #[error("The image file is corrupt or its geometry is invalid")]
    BadImage,
    #[error("The requested track is outside the image geometry")]
    SeekError,
    #[error("An invalid function parameter was supplied")]
    ParameterError,
}

impl From<io::Error> for ImageError {
    fn from(err: io::Error) -> Self {
        ImageError::IoError(err.to_string())
    }
}

impl From<binrw::Error> for ImageError {
    fn from(err: binrw::Error) -> Self {
        ImageError::IoError(err.to_string())
    }
}

pub use crate::{
    buffers::{BitcellRing, ReadBuffer, TrackBuffers, WriteCapture},
    format::{ImageFormat, OpenParams},
    geometry::{Geometry, SectorId, SimpleLayout, TrackLayout},
    image::{RawImage, WritePolicy},
    types::{HostSystem, LayoutFlags, TrackEncoding},
};
