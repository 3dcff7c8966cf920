use aero_win32_mem::GuestMemory;
use tracing::trace;

use super::caps::LockFlags;
use super::desc;
use super::surface::{invalid_params, null_pointer};
use crate::error::{Result, Win32Error};
use crate::gdi::DeviceContext;
use crate::handle::{Handle, ObjectData};
use crate::Win32System;

impl<M: GuestMemory> Win32System<M> {
    /// `IDirectDrawSurface::Lock`. The rectangle hint is ignored; the whole surface is locked.
    pub fn lock(
        &mut self,
        this: u32,
        _rect: u32,
        desc_out: u32,
        flags: u32,
        _event: u32,
    ) -> Result<()> {
        const ENTRY: &str = "IDirectDrawSurface::Lock";

        let handle = self.surface_handle(ENTRY, this)?;
        let flags = LockFlags::from_bits_retain(flags);
        let unsupported = flags & LockFlags::UNSUPPORTED;
        if !unsupported.is_empty() {
            return Err(Win32Error::Unsupported {
                entry: ENTRY,
                detail: format!("lock flags {unsupported:?}"),
            });
        }
        if desc_out == 0 {
            return Err(null_pointer(ENTRY));
        }

        let s = self.surface(handle)?;
        let size = s.desc_size();
        if self.mem.read_u32(desc_out)? != size {
            return Err(invalid_params(ENTRY));
        }
        self.mem
            .copy_within(s.desc_addr(), desc_out, size as usize)?;
        self.mem
            .write_u32(desc_out + desc::OFFSET_SURFACE, s.memory)?;

        self.retire_cache(handle)?;
        self.surface_mut(handle)?.locked = true;
        trace!(%handle, ?flags, "surface locked");
        Ok(())
    }

    /// `IDirectDrawSurface::Unlock`. The raster cache is rebuilt lazily by the next reader.
    pub fn unlock(&mut self, this: u32, _rect: u32) -> Result<()> {
        let handle = self.surface_handle("IDirectDrawSurface::Unlock", this)?;
        self.surface_mut(handle)?.locked = false;
        trace!(%handle, "surface unlocked");
        Ok(())
    }

    /// `IDirectDrawSurface::GetDC`. Locks the surface like [`Win32System::lock`] does.
    pub fn get_dc(&mut self, this: u32, hdc_out: u32) -> Result<Handle> {
        const ENTRY: &str = "IDirectDrawSurface::GetDC";

        let handle = self.surface_handle(ENTRY, this)?;
        if hdc_out == 0 {
            return Err(invalid_params(ENTRY));
        }

        // The surface owns one reference to its context; each GetDC adds one for the caller.
        let dc = match self.surface(handle)?.dc {
            Some(dc) => dc,
            None => {
                let dc = self
                    .handles
                    .create(ObjectData::DeviceContext(DeviceContext::for_surface(handle)))?;
                self.surface_mut(handle)?.dc = Some(dc);
                dc
            }
        };
        self.handles.add_ref(dc)?;
        self.mem.write_u32(hdc_out, dc.raw())?;

        self.retire_cache(handle)?;
        self.surface_mut(handle)?.locked = true;
        Ok(dc)
    }

    /// `IDirectDrawSurface::ReleaseDC`. Only the context issued by `GetDC` is accepted.
    pub fn release_dc(&mut self, this: u32, hdc: u32) -> Result<()> {
        const ENTRY: &str = "IDirectDrawSurface::ReleaseDC";

        let handle = self.surface_handle(ENTRY, this)?;
        let s = self.surface(handle)?;
        match s.dc {
            Some(dc) if dc.raw() == hdc && hdc != 0 => {
                if self.handles.get(dc).map_or(0, |o| o.ref_count()) > 1 {
                    self.handles.release(dc)?;
                }
                self.surface_mut(handle)?.locked = false;
                Ok(())
            }
            _ => Err(invalid_params(ENTRY)),
        }
    }
}
