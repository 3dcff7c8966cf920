use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::{PixelError, Rect, Result, MAX_PALETTE_ENTRIES};

/// Pixel layout of a [`Raster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterFormat {
    /// Palette index in the low nibble of each byte.
    Indexed4,
    /// Palette index per byte.
    Indexed8,
    /// `0RRRRRGGGGGBBBBB`.
    Rgb555,
    /// `RRRRRGGGGGGBBBBB`.
    Rgb565,
    /// `0x00RRGGBB`, alpha is implicitly opaque.
    Rgb888,
    /// `0xAARRGGBB`.
    Argb8888,
}

impl RasterFormat {
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Indexed4 => 4,
            Self::Indexed8 => 8,
            Self::Rgb555 => 15,
            Self::Rgb565 => 16,
            Self::Rgb888 => 24,
            Self::Argb8888 => 32,
        }
    }

    pub fn is_indexed(self) -> bool {
        matches!(self, Self::Indexed4 | Self::Indexed8)
    }

    /// Direct-colour format used for a fresh raster of the given guest depth.
    pub fn direct_for_depth(bpp: u32) -> Option<Self> {
        match bpp {
            15 => Some(Self::Rgb555),
            16 => Some(Self::Rgb565),
            24 => Some(Self::Rgb888),
            32 => Some(Self::Argb8888),
            _ => None,
        }
    }

    fn palette_limit(self) -> usize {
        match self {
            Self::Indexed4 => 16,
            _ => MAX_PALETTE_ENTRIES,
        }
    }
}

/// Backing store of a raster, one element per pixel, row-major and top-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pixels {
    Index(Vec<u8>),
    Word(Vec<u16>),
    Dword(Vec<u32>),
}

impl Default for Pixels {
    fn default() -> Self {
        Pixels::Dword(Vec::new())
    }
}

/// Device-independent image decoded from (or destined for) a guest pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    format: RasterFormat,
    /// `0x00RRGGBB` entries; empty for direct-colour formats.
    palette: Vec<u32>,
    pixels: Pixels,
}

impl Default for Raster {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            format: RasterFormat::Argb8888,
            palette: Vec::new(),
            pixels: Pixels::default(),
        }
    }
}

impl Raster {
    /// Creates a zeroed direct-colour raster. Indexed formats get an all-black 256-entry palette;
    /// use [`Raster::indexed`] to supply a real one.
    pub fn new(width: u32, height: u32, format: RasterFormat) -> Self {
        let palette = if format.is_indexed() {
            vec![0; format.palette_limit()]
        } else {
            Vec::new()
        };
        let count = (width as usize) * (height as usize);
        let pixels = match format {
            RasterFormat::Indexed4 | RasterFormat::Indexed8 => Pixels::Index(vec![0; count]),
            RasterFormat::Rgb555 | RasterFormat::Rgb565 => Pixels::Word(vec![0; count]),
            RasterFormat::Rgb888 | RasterFormat::Argb8888 => Pixels::Dword(vec![0; count]),
        };
        Self {
            width,
            height,
            format,
            palette,
            pixels,
        }
    }

    /// Creates a zeroed indexed raster using `palette` (`0x00RRGGBB` entries).
    pub fn indexed(
        width: u32,
        height: u32,
        format: RasterFormat,
        palette: Vec<u32>,
    ) -> Result<Self> {
        if !format.is_indexed() {
            return Err(PixelError::UnsupportedDepth(format.bits_per_pixel()));
        }
        if palette.len() > MAX_PALETTE_ENTRIES {
            return Err(PixelError::PaletteTooLarge(palette.len()));
        }
        let mut raster = Self::new(width, height, format);
        raster.palette = palette;
        Ok(raster)
    }

    pub(crate) fn from_parts(
        width: u32,
        height: u32,
        format: RasterFormat,
        palette: Vec<u32>,
        pixels: Pixels,
    ) -> Self {
        Self {
            width,
            height,
            format,
            palette,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> RasterFormat {
        self.format
    }

    pub fn palette(&self) -> &[u32] {
        &self.palette
    }

    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y as usize) * (self.width as usize) + x as usize)
    }

    /// Stored pixel value without any colour conversion; 0 outside the raster.
    pub fn raw(&self, x: u32, y: u32) -> u32 {
        let Some(i) = self.index(x, y) else {
            return 0;
        };
        match &self.pixels {
            Pixels::Index(p) => u32::from(p[i]),
            Pixels::Word(p) => u32::from(p[i]),
            Pixels::Dword(p) => p[i],
        }
    }

    /// Stores a pixel value in the raster's own format. Out-of-bounds writes are ignored.
    pub fn set_raw(&mut self, x: u32, y: u32, value: u32) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        match &mut self.pixels {
            Pixels::Index(p) => p[i] = value as u8,
            Pixels::Word(p) => p[i] = value as u16,
            Pixels::Dword(p) => p[i] = value,
        }
    }

    /// Pixel at (`x`, `y`) as `0xAARRGGBB`.
    pub fn argb(&self, x: u32, y: u32) -> u32 {
        let raw = self.raw(x, y);
        match self.format {
            RasterFormat::Indexed4 | RasterFormat::Indexed8 => {
                let idx = if self.format == RasterFormat::Indexed4 {
                    raw & 0x0F
                } else {
                    raw
                };
                0xFF00_0000 | (self.palette.get(idx as usize).copied().unwrap_or(0) & 0x00FF_FFFF)
            }
            RasterFormat::Rgb555 => {
                let r = ((raw >> 10) & 0x1F) as u8;
                let g = ((raw >> 5) & 0x1F) as u8;
                let b = (raw & 0x1F) as u8;
                pack_argb(0xFF, expand5(r), expand5(g), expand5(b))
            }
            RasterFormat::Rgb565 => {
                let r = ((raw >> 11) & 0x1F) as u8;
                let g = ((raw >> 5) & 0x3F) as u8;
                let b = (raw & 0x1F) as u8;
                pack_argb(0xFF, expand5(r), (g << 2) | (g >> 4), expand5(b))
            }
            RasterFormat::Rgb888 => 0xFF00_0000 | (raw & 0x00FF_FFFF),
            RasterFormat::Argb8888 => raw,
        }
    }

    /// Stores an `0xAARRGGBB` colour, converting it to the raster's format. Indexed rasters pick
    /// the closest palette entry.
    pub fn set_argb(&mut self, x: u32, y: u32, argb: u32) {
        let value = if self.format.is_indexed() {
            let limit = self.format.palette_limit().min(self.palette.len());
            u32::from(nearest_index(&self.palette[..limit], argb))
        } else {
            pack_direct(self.format, argb)
        };
        self.set_raw(x, y, value);
    }

    /// Copies `src_rect` of `src` so that its top-left corner lands on (`dx`, `dy`), clipped to
    /// both rasters. Pixels are copied verbatim when the formats (and palettes) agree.
    pub fn blit(&mut self, src: &Raster, src_rect: Rect, dx: i32, dy: i32) {
        let Some(s) = src_rect.intersect(&src.bounds()) else {
            return;
        };
        let shift_x = dx.saturating_sub(src_rect.left);
        let shift_y = dy.saturating_sub(src_rect.top);
        let Some(d) = s.offset(shift_x, shift_y).intersect(&self.bounds()) else {
            return;
        };
        let same_layout = self.format == src.format && self.palette == src.palette;

        for y in d.top..d.bottom {
            let sy = (y - shift_y) as u32;
            for x in d.left..d.right {
                let sx = (x - shift_x) as u32;
                if same_layout {
                    self.set_raw(x as u32, y as u32, src.raw(sx, sy));
                } else {
                    self.set_argb(x as u32, y as u32, src.argb(sx, sy));
                }
            }
        }
    }

    /// Scales `src_rect` of `src` onto `dst_rect` using nearest-neighbour sampling.
    pub fn stretch_blit(&mut self, src: &Raster, src_rect: Rect, dst_rect: Rect) {
        if src_rect.width() == dst_rect.width() && src_rect.height() == dst_rect.height() {
            self.blit(src, src_rect, dst_rect.left, dst_rect.top);
            return;
        }
        if dst_rect.is_empty() {
            return;
        }
        let Some(s) = src_rect.intersect(&src.bounds()) else {
            return;
        };

        let region = src.region_to_rgba(s);
        let scaled = imageops::resize(
            &region,
            dst_rect.width() as u32,
            dst_rect.height() as u32,
            FilterType::Nearest,
        );
        for (x, y, px) in scaled.enumerate_pixels() {
            let tx = i64::from(dst_rect.left) + i64::from(x);
            let ty = i64::from(dst_rect.top) + i64::from(y);
            if tx < 0 || ty < 0 {
                continue;
            }
            let Rgba([r, g, b, a]) = *px;
            self.set_argb(tx as u32, ty as u32, pack_argb(a, r, g, b));
        }
    }

    /// Non-premultiplied RGBA8 copy of the whole raster, for presentation.
    pub fn to_rgba_image(&self) -> RgbaImage {
        self.region_to_rgba(self.bounds())
    }

    fn region_to_rgba(&self, rect: Rect) -> RgbaImage {
        let (left, top) = (rect.left.max(0) as u32, rect.top.max(0) as u32);
        RgbaImage::from_fn(rect.width().max(0) as u32, rect.height().max(0) as u32, |x, y| {
            let [b, g, r, a] = self.argb(left + x, top + y).to_le_bytes();
            Rgba([r, g, b, a])
        })
    }
}

/// Packs `0xAARRGGBB` into a direct-colour format. Indexed formats yield 0.
pub(crate) fn pack_direct(format: RasterFormat, argb: u32) -> u32 {
    let [b, g, r, _] = argb.to_le_bytes();
    match format {
        RasterFormat::Indexed4 | RasterFormat::Indexed8 => 0,
        RasterFormat::Rgb555 => {
            (u32::from(r >> 3) << 10) | (u32::from(g >> 3) << 5) | u32::from(b >> 3)
        }
        RasterFormat::Rgb565 => {
            (u32::from(r >> 3) << 11) | (u32::from(g >> 2) << 5) | u32::from(b >> 3)
        }
        RasterFormat::Rgb888 => argb & 0x00FF_FFFF,
        RasterFormat::Argb8888 => argb,
    }
}

fn expand5(v: u8) -> u8 {
    (v << 3) | (v >> 2)
}

fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    u32::from_le_bytes([b, g, r, a])
}

fn nearest_index(palette: &[u32], argb: u32) -> u8 {
    let target = argb & 0x00FF_FFFF;
    if let Some(i) = palette.iter().position(|c| c & 0x00FF_FFFF == target) {
        return i as u8;
    }
    let [tb, tg, tr, _] = argb.to_le_bytes();
    palette
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| {
            let [b, g, r, _] = c.to_le_bytes();
            let d = |a: u8, b: u8| {
                let d = i32::from(a) - i32::from(b);
                d * d
            };
            d(r, tr) + d(g, tg) + d(b, tb)
        })
        .map(|(i, _)| i as u8)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb565_expands_to_full_range() {
        let mut r = Raster::new(1, 1, RasterFormat::Rgb565);
        r.set_raw(0, 0, 0xFFFF);
        assert_eq!(r.argb(0, 0), 0xFFFF_FFFF);
        r.set_raw(0, 0, 0xF800);
        assert_eq!(r.argb(0, 0), 0xFFFF_0000);

        r.set_argb(0, 0, 0xFF00_FF00);
        assert_eq!(r.raw(0, 0), 0x07E0);
    }

    #[test]
    fn indexed_lookup_and_nearest_match() {
        let mut r =
            Raster::indexed(2, 1, RasterFormat::Indexed8, vec![0x000000, 0xFF0000, 0x0000F0])
                .unwrap();
        r.set_raw(1, 0, 2);
        assert_eq!(r.argb(1, 0), 0xFF00_00F0);

        r.set_argb(0, 0, 0xFFF0_1010);
        assert_eq!(r.raw(0, 0), 1);
        r.set_argb(0, 0, 0xFF00_00F0);
        assert_eq!(r.raw(0, 0), 2);
    }

    #[test]
    fn palette_limit_is_enforced() {
        let err = Raster::indexed(1, 1, RasterFormat::Indexed8, vec![0; 257]).unwrap_err();
        assert_eq!(err, PixelError::PaletteTooLarge(257));
    }

    #[test]
    fn blit_clips_against_both_rasters() {
        let mut src = Raster::new(4, 4, RasterFormat::Argb8888);
        for y in 0..4 {
            for x in 0..4 {
                src.set_raw(x, y, y * 4 + x);
            }
        }
        let mut dst = Raster::new(3, 3, RasterFormat::Argb8888);
        dst.blit(&src, Rect::new(1, 1, 4, 4), 1, -1);

        assert_eq!(dst.raw(0, 0), 0);
        assert_eq!(dst.raw(1, 0), 2 * 4 + 1);
        assert_eq!(dst.raw(2, 0), 2 * 4 + 2);
        assert_eq!(dst.raw(1, 1), 3 * 4 + 1);
        assert_eq!(dst.raw(1, 2), 0);
    }

    #[test]
    fn blit_converts_between_formats() {
        let mut src = Raster::new(1, 1, RasterFormat::Rgb888);
        src.set_raw(0, 0, 0x00FF_0000);
        let mut dst = Raster::new(1, 1, RasterFormat::Rgb565);
        dst.blit(&src, src.bounds(), 0, 0);
        assert_eq!(dst.raw(0, 0), 0xF800);
    }

    #[test]
    fn stretch_doubles_with_nearest_sampling() {
        let mut src = Raster::new(2, 1, RasterFormat::Argb8888);
        src.set_raw(0, 0, 0xFF11_2233);
        src.set_raw(1, 0, 0xFF44_5566);
        let mut dst = Raster::new(4, 2, RasterFormat::Argb8888);
        dst.stretch_blit(&src, src.bounds(), dst.bounds());

        for y in 0..2 {
            assert_eq!(dst.raw(0, y), 0xFF11_2233);
            assert_eq!(dst.raw(1, y), 0xFF11_2233);
            assert_eq!(dst.raw(2, y), 0xFF44_5566);
            assert_eq!(dst.raw(3, y), 0xFF44_5566);
        }
    }

    #[test]
    fn rgba_image_is_non_premultiplied_rgba() {
        let mut r = Raster::new(1, 1, RasterFormat::Argb8888);
        r.set_raw(0, 0, 0x8011_2233);
        let img = r.to_rgba_image();
        assert_eq!(img.get_pixel(0, 0).0, [0x11, 0x22, 0x33, 0x80]);
    }
}
