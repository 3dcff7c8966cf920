//! DirectDraw surfaces and palettes.
//!
//! Every surface and palette is a COM object living in guest memory:
//!
//! | offset | surface                      | palette                       |
//! |--------|------------------------------|-------------------------------|
//! | 0x00   | vtable pointer               | vtable pointer                |
//! | 0x04   | kernel handle                | kernel handle                 |
//! | 0x08   | mirrored `DDSURFACEDESC(2)`  | 256 × `0x00RRGGBB`            |
//!
//! Interface pointers handed to guest code are block addresses. Entry points map them back to a
//! handle through offset 0x04 and only accept the handle if its object points back at the block.

mod api;
mod blit;
pub mod caps;
pub mod desc;
mod lock;
mod palette;
mod surface;
mod vtable;

use aero_win32_mem::GuestMemory;
use tracing::debug;

use crate::config::{DisplayMode, FlipChainCaps};
use crate::error::{Result, Win32Error};
use crate::handle::{Handle, HandleError, ObjectData, ObjectKind};
use crate::hresult::HResult;
use crate::Win32System;

pub use caps::{
    BltFastFlags, DescFlags, LockFlags, PaletteCaps, PixelFormatFlags, SurfaceCaps, SurfaceFlags,
};
pub use palette::Palette;
pub use surface::Surface;
pub use vtable::{Method, PaletteMethod, SurfaceMethod};

pub const OFFSET_VTABLE: u32 = 0x00;
pub const OFFSET_HANDLE: u32 = 0x04;
pub const OFFSET_DATA: u32 = 0x08;

/// Display-wide DirectDraw state: the current mode, its framebuffer and the shared vtables.
#[derive(Debug)]
pub struct DirectDraw {
    display: DisplayMode,
    flip_chain: FlipChainCaps,
    framebuffer: Option<u32>,
    vtables: vtable::Vtables,
}

impl DirectDraw {
    pub fn new(display: DisplayMode, flip_chain: FlipChainCaps) -> Self {
        Self {
            display,
            flip_chain,
            framebuffer: None,
            vtables: vtable::Vtables::default(),
        }
    }

    pub fn display(&self) -> DisplayMode {
        self.display
    }

    pub fn flip_chain(&self) -> FlipChainCaps {
        self.flip_chain
    }

    /// Guest address of the mapped framebuffer, if any surface needed it yet.
    pub fn framebuffer(&self) -> Option<u32> {
        self.framebuffer
    }
}

impl<M: GuestMemory> Win32System<M> {
    /// `IDirectDraw::SetDisplayMode`. Refused with `DDERR_SURFACEBUSY` while a primary surface
    /// still lives in the framebuffer. Otherwise the old framebuffer is unmapped and the next
    /// primary surface maps a new one.
    pub fn set_display_mode(&mut self, width: u32, height: u32, bpp: u32) -> Result<()> {
        const ENTRY: &str = "IDirectDraw::SetDisplayMode";

        if !matches!(bpp, 8 | 16 | 24 | 32) {
            return Err(Win32Error::Unsupported {
                entry: ENTRY,
                detail: format!("{bpp} bits per pixel"),
            });
        }
        if width == 0 || height == 0 {
            return Err(Win32Error::InvalidArgument {
                entry: ENTRY,
                status: HResult::DDERR_INVALIDPARAMS,
            });
        }

        let framebuffer = self.ddraw.framebuffer;
        let busy = framebuffer.is_some()
            && self
                .handles
                .handles_of(ObjectKind::Surface)
                .filter_map(|h| self.handles.surface(h))
                .any(|s| Some(s.memory) == framebuffer);
        if busy {
            return Err(Win32Error::Failed {
                entry: ENTRY,
                status: HResult::DDERR_SURFACEBUSY,
            });
        }

        if let Some(fb) = self.ddraw.framebuffer.take() {
            self.video.unmap(fb)?;
        }
        self.ddraw.display = DisplayMode { width, height, bpp };
        debug!(width, height, bpp, "display mode changed");
        Ok(())
    }

    /// Maps (and clears) the framebuffer for the current display mode on first use.
    pub(crate) fn map_framebuffer(&mut self, entry: &'static str) -> Result<u32> {
        if let Some(fb) = self.ddraw.framebuffer {
            return Ok(fb);
        }
        let mode = self.ddraw.display;
        let size = mode.frame_size().ok_or_else(|| Win32Error::Unsupported {
            entry,
            detail: format!("{}x{}x{} framebuffer", mode.width, mode.height, mode.bpp),
        })?;
        let fb = self.video.map(size)?;
        self.mem.fill(fb, size as usize, 0)?;
        self.ddraw.framebuffer = Some(fb);
        debug!(addr = fb, size, "framebuffer mapped");
        Ok(fb)
    }

    /// Maps a guest interface pointer to the handle of the object it belongs to.
    fn resolve(&self, entry: &'static str, this: u32, kind: ObjectKind) -> Result<Handle> {
        let handle = this
            .checked_add(OFFSET_HANDLE)
            .filter(|_| this != 0)
            .and_then(|addr| self.mem.read_u32(addr).ok())
            .map(Handle::from_raw)
            .unwrap_or(Handle::NULL);

        let object = match self.handles.get(handle).map(|o| &o.data) {
            Some(ObjectData::Surface(s)) if kind == ObjectKind::Surface => Some(s.object()),
            Some(ObjectData::Palette(p)) if kind == ObjectKind::Palette => Some(p.object()),
            _ => None,
        };
        if object == Some(this) {
            Ok(handle)
        } else {
            Err(Win32Error::UnknownHandle { entry, handle })
        }
    }

    pub(crate) fn surface_handle(&self, entry: &'static str, this: u32) -> Result<Handle> {
        self.resolve(entry, this, ObjectKind::Surface)
    }

    pub(crate) fn palette_handle(&self, entry: &'static str, this: u32) -> Result<Handle> {
        self.resolve(entry, this, ObjectKind::Palette)
    }

    /// Copy of the surface state behind `handle`.
    pub fn surface(&self, handle: Handle) -> Result<Surface> {
        self.handles
            .surface(handle)
            .copied()
            .ok_or(Win32Error::Handle(HandleError::InvalidHandle(handle)))
    }

    pub(crate) fn surface_mut(&mut self, handle: Handle) -> Result<&mut Surface> {
        self.handles
            .surface_mut(handle)
            .ok_or(Win32Error::Handle(HandleError::InvalidHandle(handle)))
    }

    /// Handle behind a surface interface pointer, for hosts and tests that hold guest pointers.
    pub fn surface_for(&self, this: u32) -> Option<Handle> {
        self.surface_handle("surface_for", this).ok()
    }

    /// Handle behind a palette interface pointer.
    pub fn palette_for(&self, this: u32) -> Option<Handle> {
        self.palette_handle("palette_for", this).ok()
    }
}
