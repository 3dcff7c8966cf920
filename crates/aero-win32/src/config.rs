use aero_win32_pixel::pitch;

use crate::ddraw::SurfaceCaps;

/// First handle value issued by a fresh [`crate::HandleTable`].
pub const DEFAULT_HANDLE_BASE: u32 = 0x2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub bpp: u32,
}

impl Default for DisplayMode {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            bpp: 32,
        }
    }
}

impl DisplayMode {
    pub fn pitch(&self) -> u32 {
        pitch(self.width, self.bpp)
    }

    /// Bytes needed for one full frame, `None` if it does not fit the guest address space.
    pub fn frame_size(&self) -> Option<u32> {
        self.pitch().checked_mul(self.height)
    }
}

/// Capability bits rewritten when a complex surface grows a back buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipChainCaps {
    /// Cleared on the back buffer after copying the parent's caps.
    pub child_clear: SurfaceCaps,
    /// Set on the back buffer.
    pub child_set: SurfaceCaps,
    /// Set on the front buffer that owns the chain.
    pub parent_set: SurfaceCaps,
}

impl Default for FlipChainCaps {
    fn default() -> Self {
        Self {
            child_clear: SurfaceCaps::VISIBLE
                | SurfaceCaps::COMPLEX
                | SurfaceCaps::PRIMARYSURFACE
                | SurfaceCaps::FRONTBUFFER,
            child_set: SurfaceCaps::BACKBUFFER | SurfaceCaps::FLIP,
            parent_set: SurfaceCaps::FRONTBUFFER | SurfaceCaps::FLIP,
        }
    }
}

impl FlipChainCaps {
    pub fn child_caps(&self, parent: SurfaceCaps) -> SurfaceCaps {
        (parent - self.child_clear) | self.child_set
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Win32Config {
    pub handle_base: u32,
    pub display: DisplayMode,
    pub flip_chain: FlipChainCaps,
}

impl Default for Win32Config {
    fn default() -> Self {
        Self {
            handle_base: DEFAULT_HANDLE_BASE,
            display: DisplayMode::default(),
            flip_chain: FlipChainCaps::default(),
        }
    }
}
