//! `DDSURFACEDESC` / `DDSURFACEDESC2` and `DDPIXELFORMAT` wire layout.
//!
//! Guest code reads and writes these records directly, so everything here is an explicit offset
//! into guest memory.

use aero_win32_mem::{GuestMemory, GuestMemoryResult};

use super::caps::{DescFlags, PixelFormatFlags, SurfaceCaps};

/// `sizeof(DDSURFACEDESC)`.
pub const SIZE: u32 = 0x6C;
/// `sizeof(DDSURFACEDESC2)`.
pub const SIZE2: u32 = 0x7C;

pub const OFFSET_SIZE: u32 = 0x00;
pub const OFFSET_FLAGS: u32 = 0x04;
pub const OFFSET_HEIGHT: u32 = 0x08;
pub const OFFSET_WIDTH: u32 = 0x0C;
pub const OFFSET_PITCH: u32 = 0x10;
pub const OFFSET_BACK_BUFFER_COUNT: u32 = 0x14;
pub const OFFSET_REFRESH_RATE: u32 = 0x18;
pub const OFFSET_ALPHA_BIT_DEPTH: u32 = 0x1C;
pub const OFFSET_SURFACE: u32 = 0x24;
pub const OFFSET_CK_DEST_OVERLAY: u32 = 0x28;
pub const OFFSET_CK_DEST_BLT: u32 = 0x30;
pub const OFFSET_CK_SRC_OVERLAY: u32 = 0x38;
pub const OFFSET_CK_SRC_BLT: u32 = 0x40;
pub const OFFSET_PIXEL_FORMAT: u32 = 0x48;
pub const OFFSET_CAPS: u32 = 0x68;
/// `dwCaps2`..`dwCaps4`, extended layout only.
pub const OFFSET_CAPS_EX: u32 = 0x6C;
pub const OFFSET_TEXTURE_STAGE: u32 = 0x78;

/// `sizeof(DDSCAPS2)`.
pub const CAPS2_SIZE: u32 = 16;

pub fn size_for(extended: bool) -> u32 {
    if extended {
        SIZE2
    } else {
        SIZE
    }
}

/// `DDPIXELFORMAT`, 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub flags: PixelFormatFlags,
    pub bit_count: u32,
    pub r_mask: u32,
    pub g_mask: u32,
    pub b_mask: u32,
    pub a_mask: u32,
}

impl PixelFormat {
    pub const SIZE: u32 = 32;

    const OFFSET_FLAGS: u32 = 0x04;
    const OFFSET_BIT_COUNT: u32 = 0x0C;
    const OFFSET_R_MASK: u32 = 0x10;
    const OFFSET_G_MASK: u32 = 0x14;
    const OFFSET_B_MASK: u32 = 0x18;
    const OFFSET_A_MASK: u32 = 0x1C;

    /// Format of a surface on a display running at `bpp`.
    pub fn for_depth(bpp: u32) -> Option<Self> {
        let rgb = |bit_count, r_mask, g_mask, b_mask, a_mask| Self {
            flags: PixelFormatFlags::RGB,
            bit_count,
            r_mask,
            g_mask,
            b_mask,
            a_mask,
        };
        Some(match bpp {
            8 => Self {
                flags: PixelFormatFlags::RGB | PixelFormatFlags::PALETTEINDEXED8,
                ..rgb(8, 0, 0, 0, 0)
            },
            16 => rgb(16, 0xF800, 0x07E0, 0x001F, 0),
            24 => rgb(24, 0xFF_0000, 0x00_FF00, 0x00_00FF, 0),
            32 => rgb(32, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000),
            _ => return None,
        })
    }

    pub fn write<M: GuestMemory + ?Sized>(&self, mem: &mut M, addr: u32) -> GuestMemoryResult<()> {
        mem.fill(addr, Self::SIZE as usize, 0)?;
        mem.write_u32(addr, Self::SIZE)?;
        mem.write_u32(addr + Self::OFFSET_FLAGS, self.flags.bits())?;
        mem.write_u32(addr + Self::OFFSET_BIT_COUNT, self.bit_count)?;
        mem.write_u32(addr + Self::OFFSET_R_MASK, self.r_mask)?;
        mem.write_u32(addr + Self::OFFSET_G_MASK, self.g_mask)?;
        mem.write_u32(addr + Self::OFFSET_B_MASK, self.b_mask)?;
        mem.write_u32(addr + Self::OFFSET_A_MASK, self.a_mask)
    }

    pub fn read<M: GuestMemory + ?Sized>(mem: &M, addr: u32) -> GuestMemoryResult<Self> {
        Ok(Self {
            flags: PixelFormatFlags::from_bits_retain(mem.read_u32(addr + Self::OFFSET_FLAGS)?),
            bit_count: mem.read_u32(addr + Self::OFFSET_BIT_COUNT)?,
            r_mask: mem.read_u32(addr + Self::OFFSET_R_MASK)?,
            g_mask: mem.read_u32(addr + Self::OFFSET_G_MASK)?,
            b_mask: mem.read_u32(addr + Self::OFFSET_B_MASK)?,
            a_mask: mem.read_u32(addr + Self::OFFSET_A_MASK)?,
        })
    }
}

/// The fields of a creation request the engine looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceRequest {
    pub size: u32,
    pub flags: DescFlags,
    pub width: u32,
    pub height: u32,
    pub back_buffer_count: u32,
    pub caps: SurfaceCaps,
}

impl SurfaceRequest {
    pub fn read<M: GuestMemory + ?Sized>(mem: &M, addr: u32) -> GuestMemoryResult<Self> {
        Ok(Self {
            size: mem.read_u32(addr + OFFSET_SIZE)?,
            flags: DescFlags::from_bits_retain(mem.read_u32(addr + OFFSET_FLAGS)?),
            width: mem.read_u32(addr + OFFSET_WIDTH)?,
            height: mem.read_u32(addr + OFFSET_HEIGHT)?,
            back_buffer_count: mem.read_u32(addr + OFFSET_BACK_BUFFER_COUNT)?,
            caps: SurfaceCaps::from_bits_retain(mem.read_u32(addr + OFFSET_CAPS)?),
        })
    }
}

/// Everything the engine writes into a freshly created surface's mirrored descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceLayout {
    pub extended: bool,
    pub flags: DescFlags,
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub back_buffer_count: u32,
    pub pixel_format: PixelFormat,
    pub caps: SurfaceCaps,
}

impl SurfaceLayout {
    /// Writes a complete descriptor at `addr`. `lpSurface` stays null; `Lock` patches it into the
    /// caller's copy.
    pub fn write<M: GuestMemory + ?Sized>(&self, mem: &mut M, addr: u32) -> GuestMemoryResult<()> {
        let size = size_for(self.extended);
        mem.fill(addr, size as usize, 0)?;
        mem.write_u32(addr + OFFSET_SIZE, size)?;
        mem.write_u32(addr + OFFSET_FLAGS, self.flags.bits())?;
        mem.write_u32(addr + OFFSET_HEIGHT, self.height)?;
        mem.write_u32(addr + OFFSET_WIDTH, self.width)?;
        mem.write_u32(addr + OFFSET_PITCH, self.pitch)?;
        mem.write_u32(addr + OFFSET_BACK_BUFFER_COUNT, self.back_buffer_count)?;
        self.pixel_format.write(mem, addr + OFFSET_PIXEL_FORMAT)?;
        mem.write_u32(addr + OFFSET_CAPS, self.caps.bits())
    }
}
