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

//! The `format` module implements one opener per image family. An opener
//! sniffs the file's header and/or size, populates the geometry tables, and
//! answers `Ok(true)`; `Ok(false)` means the file does not belong to the
//! family and the caller may try the next one. Structural violations found
//! while building the geometry are hard errors.

pub(crate) mod atr;
pub(crate) mod cfg;
pub(crate) mod dfs;
pub(crate) mod ibm3174;
pub(crate) mod img;
pub(crate) mod jvc;
pub(crate) mod msx;
pub(crate) mod opd;
pub(crate) mod pc98;
pub(crate) mod pc_dos;
pub(crate) mod sdu;
pub(crate) mod ti99;
pub(crate) mod trd;
pub(crate) mod vdk;
pub(crate) mod xdf;

use crate::{
    geometry::tables,
    image::{RawImage, WritePolicy},
    io::ReadWriteSeek,
    types::HostSystem,
    ImageError,
};

/// The flux-generation strategy a family's read stream calls for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RdataFlux {
    /// The stream is a ring of raw bitcell words; the host clocks flux
    /// transitions out of it at `ticks_per_cell`.
    Bitcell,
}

/// Options supplied by the host at open time.
#[derive(Clone, Debug, Default)]
pub struct OpenParams<'a> {
    /// Host hint selecting the geometry table consulted first for raw
    /// images.
    pub host: HostSystem,
    /// Tag matched against configuration file sections; conventionally the
    /// image's filename extension.
    pub tag: Option<&'a str>,
    /// Contents of the image configuration file, if the host found one.
    pub config: Option<&'a str>,
    pub policy: WritePolicy,
}

/// The image families the engine understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display, strum::EnumIter, strum::IntoStaticStr)]
pub enum ImageFormat {
    /// Generic raw sector image; geometry from config file, host hint
    /// tables, or the default table.
    Img,
    /// Acorn ADFS.
    Adfs,
    /// Atari 8-bit ATR.
    Atr,
    /// Commodore 1581.
    D81,
    /// Acorn DFS, single-sided.
    Ssd,
    /// Acorn DFS, double-sided.
    Dsd,
    /// Dragon/CoCo JVC.
    Jvc,
    /// Philips MBD.
    Mbd,
    /// SAM Coupe MGT.
    Mgt,
    /// Opus Discovery OPD.
    Opd,
    /// NEC PC-98 FDI.
    Pc98Fdi,
    /// NEC PC-98 HDM.
    Pc98Hdm,
    /// SAB Diskette Utility SDU.
    Sdu,
    /// Atari ST.
    St,
    /// Spectrum TR-DOS TRD.
    Trd,
    /// TI-99/4A sector dump.
    Ti99,
    /// Dragon VDK.
    Vdk,
    /// OS/2 Extended Density Format.
    Xdf,
}

impl ImageFormat {
    /// File extensions conventionally carrying each family.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ImageFormat::Img => &["img", "ima", "dsk"],
            ImageFormat::Adfs => &["adl", "adm", "ads"],
            ImageFormat::Atr => &["atr"],
            ImageFormat::D81 => &["d81"],
            ImageFormat::Ssd => &["ssd"],
            ImageFormat::Dsd => &["dsd"],
            ImageFormat::Jvc => &["jvc"],
            ImageFormat::Mbd => &["mbd"],
            ImageFormat::Mgt => &["mgt"],
            ImageFormat::Opd => &["opd"],
            ImageFormat::Pc98Fdi => &["fdi"],
            ImageFormat::Pc98Hdm => &["hdm"],
            ImageFormat::Sdu => &["sdu"],
            ImageFormat::St => &["st"],
            ImageFormat::Trd => &["trd"],
            ImageFormat::Ti99 => &["v9t9"],
            ImageFormat::Vdk => &["vdk"],
            ImageFormat::Xdf => &["xdf"],
        }
    }

    /// Map a filename extension to a family. Case-insensitive. Returns
    /// `None` for unknown extensions.
    pub fn from_extension(ext: &str) -> Option<ImageFormat> {
        let ext = ext.to_lowercase();
        use strum::IntoEnumIterator;
        ImageFormat::iter().find(|f| f.extensions().contains(&ext.as_str()))
    }

    /// Whether this family advertises the canonical-size operation used for
    /// image truncation/extension.
    pub fn supports_extend(&self) -> bool {
        matches!(self, ImageFormat::Trd | ImageFormat::Ssd | ImageFormat::Dsd)
    }

    /// How the host should turn this family's read stream into flux
    /// transitions. Every raw-image family emits raw bitcells.
    pub fn rdata_flux(&self) -> RdataFlux {
        RdataFlux::Bitcell
    }

    pub(crate) fn open<F: ReadWriteSeek>(&self, im: &mut RawImage<F>) -> Result<bool, ImageError> {
        match self {
            ImageFormat::Img => img::open(im),
            ImageFormat::Adfs => im.open_from_table(tables::ADFS_TYPES),
            ImageFormat::Atr => atr::open(im),
            ImageFormat::D81 => img::open_d81(im),
            ImageFormat::Ssd => dfs::open_ssd(im),
            ImageFormat::Dsd => dfs::open_dsd(im),
            ImageFormat::Jvc => jvc::open(im),
            ImageFormat::Mbd => im.open_from_table(tables::MBD_TYPES),
            ImageFormat::Mgt => im.open_from_table(tables::IMG_TYPES),
            ImageFormat::Opd => opd::open(im),
            ImageFormat::Pc98Fdi => pc98::open_fdi(im),
            ImageFormat::Pc98Hdm => im.open_from_table(tables::PC98_TYPES),
            ImageFormat::Sdu => sdu::open(im),
            ImageFormat::St => img::open_st(im),
            ImageFormat::Trd => trd::open(im),
            ImageFormat::Ti99 => ti99::open(im),
            ImageFormat::Vdk => vdk::open(im),
            ImageFormat::Xdf => xdf::open(im),
        }
    }
}
