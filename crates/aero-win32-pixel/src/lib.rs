//! Conversion between guest pixel buffers and host rasters.
//!
//! Guest pixel buffers follow the Windows DIB conventions:
//! - scanlines are stored bottom-up (raster row 0 is the *last* row in memory);
//! - every scanline starts on a 4-byte boundary (see [`pitch`]);
//! - 4/8-bit pixels are palette indices (one byte per pixel), 16-bit pixels are RGB565, 24-bit
//!   pixels are packed `B, G, R` triples and 32-bit pixels are little-endian `0xAARRGGBB`.
//!
//! The codec is stateless: [`decode`] materializes a [`Raster`], [`encode`] writes one back and
//! [`copy`] chains the two with an optional resample in between.

#![forbid(unsafe_code)]

mod codec;
mod raster;
mod rect;

use aero_win32_mem::GuestMemoryError;
use thiserror::Error;

pub use codec::{copy, decode, encode, pitch, PixelRegion};
pub use raster::{Pixels, Raster, RasterFormat};
pub use rect::Rect;

/// Largest palette an indexed raster can carry.
pub const MAX_PALETTE_ENTRIES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PixelError {
    /// The bit depth has no decoder/encoder at all. Callers treat this as a configuration error.
    #[error("unsupported pixel depth: {0} bits per pixel")]
    UnsupportedDepth(u32),
    #[error("{0} is not implemented yet")]
    NotImplemented(&'static str),
    #[error("{bpp}-bit pixels require a palette")]
    MissingPalette { bpp: u32 },
    #[error("palette has {0} entries (at most 256 are allowed)")]
    PaletteTooLarge(usize),
    #[error("raster is {actual_width}x{actual_height} but {width}x{height} was requested")]
    SizeMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("pixel buffer dimensions {width}x{height} at {bpp} bpp overflow the address space")]
    TooLarge { width: u32, height: u32, bpp: u32 },
    #[error(transparent)]
    Memory(#[from] GuestMemoryError),
}

impl PixelError {
    /// Whether the error reflects a pixel layout the codec cannot model at all, as opposed to a
    /// bad argument or a missing feature.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PixelError::UnsupportedDepth(_))
    }
}

pub type Result<T> = std::result::Result<T, PixelError>;
