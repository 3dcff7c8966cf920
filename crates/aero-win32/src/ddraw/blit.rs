use aero_win32_mem::GuestMemory;
use aero_win32_pixel::Rect;
use tracing::trace;

use super::caps::{BltFastFlags, SurfaceCaps};
use super::surface::invalid_params;
use crate::error::{Result, Win32Error};
use crate::handle::Handle;
use crate::Win32System;

impl<M: GuestMemory> Win32System<M> {
    /// `IDirectDrawSurface::BltFast`: copies `src_rect` (whole source when null) of `src` to
    /// (`x`, `y`), clipped to both surfaces.
    pub fn blt_fast(
        &mut self,
        this: u32,
        x: u32,
        y: u32,
        src: u32,
        src_rect: u32,
        trans: u32,
    ) -> Result<()> {
        const ENTRY: &str = "IDirectDrawSurface::BltFast";

        let dest = self.surface_handle(ENTRY, this)?;
        if src == 0 {
            return Err(invalid_params(ENTRY));
        }
        let source = self.surface_handle(ENTRY, src)?;

        let trans = BltFastFlags::from_bits_retain(trans);
        if trans.intersects(BltFastFlags::SRCCOLORKEY | BltFastFlags::DESTCOLORKEY) {
            return Err(Win32Error::NotImplemented(
                "IDirectDrawSurface::BltFast with colour keys",
            ));
        }

        let image = self.surface_raster(source)?;
        let rect = if src_rect == 0 {
            image.bounds()
        } else {
            Rect::read(&self.mem, src_rect)?
        };
        let (dx, dy) = (x as i32, y as i32);
        trace!(%dest, %source, ?rect, dx, dy, "BltFast");

        self.draw_surface(dest, |target| target.blit(&image, rect, dx, dy))?;
        self.present_if_visible(dest)
    }

    /// `IDirectDrawSurface::Flip`: presents the back buffer (or `target` when given).
    pub fn flip(&mut self, this: u32, target: u32, _flags: u32) -> Result<()> {
        const ENTRY: &str = "IDirectDrawSurface::Flip";

        let front = self.surface_handle(ENTRY, this)?;
        let shown = if target != 0 {
            self.surface_handle(ENTRY, target)?
        } else {
            self.surface(front)?.back_buffer.unwrap_or(front)
        };

        let frame = self.surface_raster(shown)?;
        trace!(%front, %shown, "Flip");
        self.present(&frame);
        Ok(())
    }

    pub(super) fn present_if_visible(&mut self, handle: Handle) -> Result<()> {
        if self.surface(handle)?.caps.contains(SurfaceCaps::VISIBLE) {
            let frame = self.surface_raster(handle)?;
            self.present(&frame);
        }
        Ok(())
    }
}
