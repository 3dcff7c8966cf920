use aero_win32_mem::GuestMemory;

use crate::raster::pack_direct;
use crate::{PixelError, Pixels, Raster, RasterFormat, Result, MAX_PALETTE_ENTRIES};

/// Byte stride of one scanline: whole bytes per pixel, rounded up to a dword boundary.
///
/// Saturates (to the largest dword multiple) instead of overflowing for absurd widths.
pub fn pitch(width: u32, bpp: u32) -> u32 {
    checked_pitch(width, bpp).unwrap_or(u32::MAX & !3)
}

fn checked_pitch(width: u32, bpp: u32) -> Option<u32> {
    let bytes = u64::from(width) * u64::from(bpp.div_ceil(8));
    u32::try_from((bytes + 3) / 4 * 4).ok()
}

fn region_len(width: u32, height: u32, bpp: u32) -> Result<usize> {
    checked_pitch(width, bpp)
        .and_then(|p| p.checked_mul(height))
        .map(|len| len as usize)
        .ok_or(PixelError::TooLarge { width, height, bpp })
}

fn format_for_depth(bpp: u32) -> Result<RasterFormat> {
    match bpp {
        4 => Ok(RasterFormat::Indexed4),
        8 => Ok(RasterFormat::Indexed8),
        other => RasterFormat::direct_for_depth(other).ok_or(PixelError::UnsupportedDepth(other)),
    }
}

/// Decodes a bottom-up guest pixel buffer at `addr` into a top-down [`Raster`].
///
/// 4/8-bit buffers need `palette` (`0x00RRGGBB`, at most 256 entries). Besides the documented
/// 4/8/16/24/32-bit layouts, 15-bit 5-5-5 buffers are accepted as well.
pub fn decode<M: GuestMemory + ?Sized>(
    mem: &M,
    addr: u32,
    bpp: u32,
    palette: Option<&[u32]>,
    width: u32,
    height: u32,
) -> Result<Raster> {
    let format = format_for_depth(bpp)?;
    let palette = if format.is_indexed() {
        let palette = palette.ok_or(PixelError::MissingPalette { bpp })?;
        if palette.len() > MAX_PALETTE_ENTRIES {
            return Err(PixelError::PaletteTooLarge(palette.len()));
        }
        palette.to_vec()
    } else {
        Vec::new()
    };

    let stride = pitch(width, bpp) as usize;
    let mut buf = vec![0u8; region_len(width, height, bpp)?];
    mem.read_into(addr, &mut buf)?;

    let (w, h) = (width as usize, height as usize);
    let count = w * h;
    // Raster row `y` lives at memory row `height - 1 - y`.
    let rows = (0..h).map(|y| &buf[(h - 1 - y) * stride..][..stride]);

    let pixels = match format {
        RasterFormat::Indexed4 | RasterFormat::Indexed8 => {
            let mask = if format == RasterFormat::Indexed4 { 0x0F } else { 0xFF };
            let mut out = Vec::with_capacity(count);
            for row in rows {
                out.extend(row[..w].iter().map(|b| b & mask));
            }
            Pixels::Index(out)
        }
        RasterFormat::Rgb555 | RasterFormat::Rgb565 => {
            let mut out = Vec::with_capacity(count);
            for row in rows {
                out.extend(
                    row[..w * 2]
                        .chunks_exact(2)
                        .map(|c| u16::from_le_bytes([c[0], c[1]])),
                );
            }
            Pixels::Word(out)
        }
        RasterFormat::Rgb888 => {
            let mut out = Vec::with_capacity(count);
            for row in rows {
                out.extend(
                    row[..w * 3]
                        .chunks_exact(3)
                        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], 0])),
                );
            }
            Pixels::Dword(out)
        }
        RasterFormat::Argb8888 => {
            let mut out = Vec::with_capacity(count);
            for row in rows {
                out.extend(
                    row[..w * 4]
                        .chunks_exact(4)
                        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
                );
            }
            Pixels::Dword(out)
        }
    };

    Ok(Raster::from_parts(width, height, format, palette, pixels))
}

/// Writes `raster` into the bottom-up guest buffer at `addr`, converting to `bpp` (15, 16, 24 or
/// 32). Scanline padding bytes are left untouched.
pub fn encode<M: GuestMemory + ?Sized>(
    mem: &mut M,
    addr: u32,
    raster: &Raster,
    bpp: u32,
    width: u32,
    height: u32,
) -> Result<()> {
    let format = format_for_depth(bpp)?;
    if format.is_indexed() {
        return Err(PixelError::NotImplemented("encoding into indexed pixel buffers"));
    }
    if raster.width() != width || raster.height() != height {
        return Err(PixelError::SizeMismatch {
            width,
            height,
            actual_width: raster.width(),
            actual_height: raster.height(),
        });
    }

    let stride = pitch(width, bpp) as usize;
    let mut buf = vec![0u8; region_len(width, height, bpp)?];
    mem.read_into(addr, &mut buf)?;

    let verbatim = raster.format() == format;
    let bytes_pp = bpp.div_ceil(8) as usize;
    for y in 0..height {
        let row = &mut buf[(height - 1 - y) as usize * stride..][..stride];
        for x in 0..width {
            let value = if verbatim {
                raster.raw(x, y)
            } else {
                pack_direct(format, raster.argb(x, y))
            };
            let at = x as usize * bytes_pp;
            row[at..at + bytes_pp].copy_from_slice(&value.to_le_bytes()[..bytes_pp]);
        }
    }

    mem.write_from(addr, &buf)?;
    Ok(())
}

/// One side of a [`copy`]: a guest pixel buffer and how to interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion<'a> {
    pub addr: u32,
    pub bpp: u32,
    pub palette: Option<&'a [u32]>,
    pub width: u32,
    pub height: u32,
}

impl<'a> PixelRegion<'a> {
    pub fn new(addr: u32, bpp: u32, width: u32, height: u32) -> Self {
        Self {
            addr,
            bpp,
            palette: None,
            width,
            height,
        }
    }

    pub fn with_palette(mut self, palette: &'a [u32]) -> Self {
        self.palette = Some(palette);
        self
    }
}

/// Converts the pixels of `src` into `dst`, stretching with nearest-neighbour sampling when the
/// dimensions differ.
pub fn copy<M: GuestMemory + ?Sized>(
    mem: &mut M,
    src: &PixelRegion<'_>,
    dst: &PixelRegion<'_>,
) -> Result<()> {
    let source = decode(mem, src.addr, src.bpp, src.palette, src.width, src.height)?;
    let mut target = match dst.bpp {
        8 => decode(mem, dst.addr, dst.bpp, dst.palette, dst.width, dst.height)?,
        bpp => match RasterFormat::direct_for_depth(bpp) {
            Some(format) => Raster::new(dst.width, dst.height, format),
            None => return Err(PixelError::UnsupportedDepth(bpp)),
        },
    };

    if source.width() == target.width() && source.height() == target.height() {
        target.blit(&source, source.bounds(), 0, 0);
    } else {
        let bounds = target.bounds();
        target.stretch_blit(&source, source.bounds(), bounds);
    }

    encode(mem, dst.addr, &target, dst.bpp, dst.width, dst.height)
}
