use aero_win32_mem::GuestMemory;

use super::caps::{SurfaceCaps, SurfaceFlags};
use super::desc::{self, PixelFormat};
use super::surface::{invalid_params, null_pointer};
use crate::error::{Result, Win32Error};
use crate::handle::HandleError;
use crate::hresult::HResult;
use crate::Win32System;

impl<M: GuestMemory> Win32System<M> {
    /// `IUnknown::AddRef` on a surface.
    pub fn surface_add_ref(&mut self, this: u32) -> Result<u32> {
        let handle = self.surface_handle("IDirectDrawSurface::AddRef", this)?;
        Ok(self.handles.add_ref(handle)?)
    }

    /// `IUnknown::Release` on a surface. The last release tears the surface down.
    pub fn surface_release(&mut self, this: u32) -> Result<u32> {
        let handle = self.surface_handle("IDirectDrawSurface::Release", this)?;
        Ok(self.handles.release(handle)?)
    }

    /// `IDirectDrawSurface::GetSurfaceDesc`.
    pub fn get_surface_desc(&mut self, this: u32, out: u32) -> Result<()> {
        const ENTRY: &str = "IDirectDrawSurface::GetSurfaceDesc";

        let s = self.surface(self.surface_handle(ENTRY, this)?)?;
        if out == 0 || self.mem.read_u32(out)? != s.desc_size() {
            return Err(invalid_params(ENTRY));
        }
        self.mem
            .copy_within(s.desc_addr(), out, s.desc_size() as usize)?;
        Ok(())
    }

    /// `IDirectDrawSurface::GetCaps`. Extended surfaces fill a whole `DDSCAPS2`.
    pub fn get_caps(&mut self, this: u32, out: u32) -> Result<()> {
        const ENTRY: &str = "IDirectDrawSurface::GetCaps";

        let s = self.surface(self.surface_handle(ENTRY, this)?)?;
        if out == 0 {
            return Err(null_pointer(ENTRY));
        }
        let len = if s.flags.contains(SurfaceFlags::CAPS2) {
            desc::CAPS2_SIZE
        } else {
            4
        };
        self.mem
            .copy_within(s.desc_addr() + desc::OFFSET_CAPS, out, len as usize)?;
        Ok(())
    }

    /// `IDirectDrawSurface::GetPixelFormat`.
    pub fn get_pixel_format(&mut self, this: u32, out: u32) -> Result<()> {
        const ENTRY: &str = "IDirectDrawSurface::GetPixelFormat";

        let s = self.surface(self.surface_handle(ENTRY, this)?)?;
        if out == 0 {
            return Err(null_pointer(ENTRY));
        }
        if self.mem.read_u32(out)? != PixelFormat::SIZE {
            return Err(invalid_params(ENTRY));
        }
        self.mem.copy_within(
            s.desc_addr() + desc::OFFSET_PIXEL_FORMAT,
            out,
            PixelFormat::SIZE as usize,
        )?;
        Ok(())
    }

    /// `IDirectDrawSurface::GetAttachedSurface`. Only back buffer lookups are modelled; the
    /// returned surface carries a new reference.
    pub fn get_attached_surface(&mut self, this: u32, caps: u32, out: u32) -> Result<u32> {
        const ENTRY: &str = "IDirectDrawSurface::GetAttachedSurface";

        let s = self.surface(self.surface_handle(ENTRY, this)?)?;
        if caps == 0 || out == 0 {
            return Err(null_pointer(ENTRY));
        }
        let wanted = SurfaceCaps::from_bits_retain(self.mem.read_u32(caps)?);
        if !wanted.contains(SurfaceCaps::BACKBUFFER) {
            return Err(Win32Error::Unsupported {
                entry: ENTRY,
                detail: format!("attached surface lookup by {wanted:?}"),
            });
        }

        let Some(child) = s.back_buffer else {
            return Err(Win32Error::Failed {
                entry: ENTRY,
                status: HResult::DDERR_NOTFOUND,
            });
        };
        self.handles.add_ref(child)?;
        let object = self.surface(child)?.object;
        self.mem.write_u32(out, object)?;
        Ok(object)
    }

    /// `IDirectDrawSurface::GetPalette`. The returned palette carries a new reference.
    pub fn get_palette(&mut self, this: u32, out: u32) -> Result<u32> {
        const ENTRY: &str = "IDirectDrawSurface::GetPalette";

        let s = self.surface(self.surface_handle(ENTRY, this)?)?;
        if out == 0 {
            return Err(null_pointer(ENTRY));
        }
        let palette = s.palette.ok_or(Win32Error::Failed {
            entry: ENTRY,
            status: HResult::DDERR_NOPALETTEATTACHED,
        })?;
        let object = self
            .handles
            .palette(palette)
            .map(|p| p.object())
            .ok_or(HandleError::InvalidHandle(palette))?;
        self.handles.add_ref(palette)?;
        self.mem.write_u32(out, object)?;
        Ok(object)
    }

    /// `IDirectDrawSurface::SetPalette`. Attaching takes a reference on the palette and drops the
    /// one held on the previous palette; the raster cache is retired since it was decoded with
    /// the old colours.
    pub fn set_palette(&mut self, this: u32, palette: u32) -> Result<()> {
        const ENTRY: &str = "IDirectDrawSurface::SetPalette";

        let handle = self.surface_handle(ENTRY, this)?;
        if palette == 0 {
            return Err(null_pointer(ENTRY));
        }
        let palette = self.palette_handle(ENTRY, palette)?;
        if self.surface(handle)?.palette == Some(palette) {
            return Ok(());
        }

        self.retire_cache(handle)?;
        self.handles.add_ref(palette)?;
        let previous = self.surface_mut(handle)?.palette.replace(palette);
        if let Some(previous) = previous {
            self.handles.release(previous)?;
        }
        Ok(())
    }

    /// `IDirectDrawSurface::Restore`. Surface memory is never evicted, so there is nothing to do.
    pub fn restore(&mut self, this: u32) -> Result<()> {
        self.surface_handle("IDirectDrawSurface::Restore", this)?;
        Ok(())
    }

    /// `IDirectDrawSurface::IsLost`. Surfaces are never lost.
    pub fn is_lost(&mut self, this: u32) -> Result<()> {
        self.surface_handle("IDirectDrawSurface::IsLost", this)?;
        Ok(())
    }

    /// `IDirectDrawSurface::GetBltStatus`. Blits complete synchronously.
    pub fn get_blt_status(&mut self, this: u32, _flags: u32) -> Result<()> {
        self.surface_handle("IDirectDrawSurface::GetBltStatus", this)?;
        Ok(())
    }

    /// `IDirectDrawSurface::GetFlipStatus`. Flips complete synchronously.
    pub fn get_flip_status(&mut self, this: u32, _flags: u32) -> Result<()> {
        self.surface_handle("IDirectDrawSurface::GetFlipStatus", this)?;
        Ok(())
    }

    /// `IDirectDrawSurface::Initialize`. Surfaces come out of `CreateSurface` initialized.
    pub fn initialize_surface(&mut self, this: u32) -> Result<()> {
        const ENTRY: &str = "IDirectDrawSurface::Initialize";

        self.surface_handle(ENTRY, this)?;
        Err(Win32Error::Failed {
            entry: ENTRY,
            status: HResult::DDERR_ALREADYINITIALIZED,
        })
    }
}
