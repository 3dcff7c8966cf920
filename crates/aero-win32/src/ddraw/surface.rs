use aero_win32_mem::GuestMemory;
use aero_win32_pixel::{decode, encode, pitch, PixelError, Raster};
use tracing::{debug, warn};

use super::caps::{DescFlags, SurfaceCaps, SurfaceFlags};
use super::desc::{self, PixelFormat, SurfaceLayout, SurfaceRequest};
use super::{OFFSET_DATA, OFFSET_HANDLE, OFFSET_VTABLE};
use crate::error::{Result, Win32Error};
use crate::handle::{CachedRaster, Handle, HandleError, ObjectData, Teardown};
use crate::hresult::HResult;
use crate::Win32System;

/// Bytes of guest memory behind a surface interface pointer.
pub const SURFACE_OBJECT_SIZE: u32 = OFFSET_DATA + desc::SIZE2;

/// Host-side state of a DirectDraw surface. The authoritative descriptor is the mirror in guest
/// memory; the fields here are the ones the engine needs without a memory round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub(crate) object: u32,
    pub(crate) flags: SurfaceFlags,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) bpp: u32,
    pub(crate) pitch: u32,
    pub(crate) caps: SurfaceCaps,
    pub(crate) memory: u32,
    pub(crate) palette: Option<Handle>,
    pub(crate) back_buffer: Option<Handle>,
    pub(crate) dc: Option<Handle>,
    pub(crate) cache: Option<Handle>,
    pub(crate) locked: bool,
}

impl Surface {
    /// Guest address of the COM object (the interface pointer).
    pub fn object(&self) -> u32 {
        self.object
    }

    /// Guest address of the mirrored descriptor.
    pub fn desc_addr(&self) -> u32 {
        self.object + OFFSET_DATA
    }

    pub fn desc_size(&self) -> u32 {
        desc::size_for(self.flags.contains(SurfaceFlags::DESC2))
    }

    pub fn flags(&self) -> SurfaceFlags {
        self.flags
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bpp(&self) -> u32 {
        self.bpp
    }

    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    pub fn caps(&self) -> SurfaceCaps {
        self.caps
    }

    /// Guest address of the pixel storage.
    pub fn memory(&self) -> u32 {
        self.memory
    }

    pub fn palette(&self) -> Option<Handle> {
        self.palette
    }

    pub fn back_buffer(&self) -> Option<Handle> {
        self.back_buffer
    }

    pub fn device_context(&self) -> Option<Handle> {
        self.dc
    }

    pub fn cache(&self) -> Option<Handle> {
        self.cache
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn teardown(&self) -> Vec<Teardown> {
        let mut steps = Vec::new();
        steps.extend(self.palette.map(Teardown::Release));
        steps.extend(self.back_buffer.map(Teardown::Release));
        steps.extend(self.dc.map(Teardown::Close));
        steps.extend(self.cache.map(Teardown::Close));
        steps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backing {
    Framebuffer,
    Heap,
}

/// A validated creation request. Building one allocates nothing.
#[derive(Debug, Clone, Copy)]
struct SurfacePlan {
    flags: SurfaceFlags,
    width: u32,
    height: u32,
    bpp: u32,
    caps: SurfaceCaps,
    backing: Backing,
    back_buffer: bool,
}

impl<M: GuestMemory> Win32System<M> {
    /// `IDirectDraw::CreateSurface`. Writes the new interface pointer to `out` and returns it.
    pub fn create_surface(&mut self, desc_addr: u32, out: u32) -> Result<u32> {
        const ENTRY: &str = "IDirectDraw::CreateSurface";

        if desc_addr == 0 || out == 0 {
            return Err(invalid_params(ENTRY));
        }
        let request = SurfaceRequest::read(&self.mem, desc_addr)?;
        let plan = self.plan_surface(ENTRY, &request)?;
        let handle = self.build_surface(ENTRY, &plan)?;

        let this = self.surface(handle)?.object;
        self.mem.write_u32(out, this)?;
        Ok(this)
    }

    fn plan_surface(&self, entry: &'static str, request: &SurfaceRequest) -> Result<SurfacePlan> {
        let unsupported = |detail: String| Win32Error::Unsupported { entry, detail };

        let flags = match request.size {
            desc::SIZE => SurfaceFlags::empty(),
            desc::SIZE2 => SurfaceFlags::DESC2 | SurfaceFlags::CAPS2,
            _ => return Err(invalid_params(entry)),
        };

        let unknown = request.caps - SurfaceCaps::CREATABLE;
        if !unknown.is_empty() {
            return Err(unsupported(format!("capabilities {unknown:?}")));
        }

        let display = self.ddraw.display();
        let primary = request.caps.contains(SurfaceCaps::PRIMARYSURFACE);
        let offscreen = request.caps.contains(SurfaceCaps::OFFSCREENPLAIN);

        let (width, height, mut caps, backing) = match (primary, offscreen) {
            (true, true) => {
                return Err(unsupported(
                    "PRIMARYSURFACE and OFFSCREENPLAIN are mutually exclusive".into(),
                ))
            }
            (false, false) => {
                return Err(unsupported(
                    "one of PRIMARYSURFACE or OFFSCREENPLAIN is required".into(),
                ))
            }
            (true, false) => (
                display.width,
                display.height,
                request.caps
                    | SurfaceCaps::VIDEOMEMORY
                    | SurfaceCaps::VISIBLE
                    | SurfaceCaps::LOCALVIDMEM,
                Backing::Framebuffer,
            ),
            (false, true) => {
                if !request.flags.contains(DescFlags::WIDTH | DescFlags::HEIGHT)
                    || request.width == 0
                    || request.height == 0
                {
                    return Err(invalid_params(entry));
                }
                if request.flags.contains(DescFlags::BACKBUFFERCOUNT) {
                    return Err(unsupported(
                        "DDSD_BACKBUFFERCOUNT on an OFFSCREENPLAIN surface".into(),
                    ));
                }
                let mut caps = request.caps - SurfaceCaps::VISIBLE;
                if !caps.contains(SurfaceCaps::SYSTEMMEMORY) {
                    caps |= SurfaceCaps::VIDEOMEMORY | SurfaceCaps::LOCALVIDMEM;
                }
                (request.width, request.height, caps, Backing::Heap)
            }
        };

        if PixelFormat::for_depth(display.bpp).is_none() {
            return Err(unsupported(format!("{} bits per pixel", display.bpp)));
        }
        if display.bpp == 8 {
            caps |= SurfaceCaps::PALETTE;
        }

        let back_buffer = match (
            request.flags.contains(DescFlags::BACKBUFFERCOUNT),
            request.back_buffer_count,
        ) {
            (false, _) | (true, 0) => false,
            (true, 1) if caps.contains(SurfaceCaps::COMPLEX) => true,
            (true, 1) => return Err(unsupported("a back buffer without COMPLEX".into())),
            (true, n) => return Err(unsupported(format!("{n} back buffers"))),
        };
        if back_buffer {
            caps |= self.ddraw.flip_chain().parent_set;
        }

        Ok(SurfacePlan {
            flags,
            width,
            height,
            bpp: display.bpp,
            caps,
            backing,
            back_buffer,
        })
    }

    fn build_surface(&mut self, entry: &'static str, plan: &SurfacePlan) -> Result<Handle> {
        let back_buffer = if plan.back_buffer {
            let child = SurfacePlan {
                caps: self.ddraw.flip_chain().child_caps(plan.caps),
                backing: Backing::Heap,
                back_buffer: false,
                ..*plan
            };
            Some(self.build_surface(entry, &child)?)
        } else {
            None
        };

        match self.build_single(entry, plan, back_buffer) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                if let Some(child) = back_buffer {
                    if let Err(close_err) = self.handles.close(child) {
                        warn!(%child, %close_err, "back buffer of a failed surface not closed");
                    }
                }
                Err(err)
            }
        }
    }

    fn build_single(
        &mut self,
        entry: &'static str,
        plan: &SurfacePlan,
        back_buffer: Option<Handle>,
    ) -> Result<Handle> {
        let pitch = pitch(plan.width, plan.bpp);
        let len = pitch
            .checked_mul(plan.height)
            .ok_or(PixelError::TooLarge {
                width: plan.width,
                height: plan.height,
                bpp: plan.bpp,
            })?;
        let pixel_format = PixelFormat::for_depth(plan.bpp).ok_or(Win32Error::Unsupported {
            entry,
            detail: format!("{} bits per pixel", plan.bpp),
        })?;

        let memory = match plan.backing {
            Backing::Framebuffer => self.map_framebuffer(entry)?,
            Backing::Heap => self.heap.alloc(&mut self.mem, len, true)?,
        };
        let vtable = self.surface_vtable()?;
        let object = self.heap.alloc(&mut self.mem, SURFACE_OBJECT_SIZE, true)?;

        let mut desc_flags = DescFlags::CAPS
            | DescFlags::HEIGHT
            | DescFlags::WIDTH
            | DescFlags::PITCH
            | DescFlags::PIXELFORMAT;
        if back_buffer.is_some() {
            desc_flags |= DescFlags::BACKBUFFERCOUNT;
        }
        let layout = SurfaceLayout {
            extended: plan.flags.contains(SurfaceFlags::DESC2),
            flags: desc_flags,
            width: plan.width,
            height: plan.height,
            pitch,
            back_buffer_count: u32::from(back_buffer.is_some()),
            pixel_format,
            caps: plan.caps,
        };
        layout.write(&mut self.mem, object + OFFSET_DATA)?;

        let handle = self.handles.create(ObjectData::Surface(Surface {
            object,
            flags: plan.flags,
            width: plan.width,
            height: plan.height,
            bpp: plan.bpp,
            pitch,
            caps: plan.caps,
            memory,
            palette: None,
            back_buffer,
            dc: None,
            cache: None,
            locked: false,
        }))?;
        self.mem.write_u32(object + OFFSET_VTABLE, vtable)?;
        self.mem.write_u32(object + OFFSET_HANDLE, handle.raw())?;

        debug!(
            %handle,
            object,
            memory,
            width = plan.width,
            height = plan.height,
            bpp = plan.bpp,
            caps = ?plan.caps,
            "surface created"
        );
        Ok(handle)
    }

    /// Decodes the surface's pixel memory with its current palette.
    pub(crate) fn decode_surface(&self, handle: Handle) -> Result<Raster> {
        let s = self.surface(handle)?;
        let palette = s
            .palette
            .and_then(|p| self.handles.palette(p))
            .map(|p| p.entries());
        Ok(decode(
            &self.mem, s.memory, s.bpp, palette, s.width, s.height,
        )?)
    }

    /// Returns the surface's raster cache, creating it from pixel memory when `force` is set.
    ///
    /// A locked surface never gets a cache attached; `Ok(None)` is returned instead.
    pub fn materialize(&mut self, handle: Handle, force: bool) -> Result<Option<Handle>> {
        let s = self.surface(handle)?;
        if s.cache.is_some() {
            return Ok(s.cache);
        }
        if !force || s.locked {
            return Ok(None);
        }

        let raster = self.decode_surface(handle)?;
        let cache = self.handles.create(ObjectData::CachedRaster(CachedRaster {
            owner: handle,
            raster,
            dirty: false,
        }))?;
        self.surface_mut(handle)?.cache = Some(cache);
        Ok(Some(cache))
    }

    /// Drops the raster cache without writing it back.
    pub fn invalidate(&mut self, handle: Handle) -> Result<()> {
        if let Some(cache) = self.surface_mut(handle)?.cache.take() {
            self.handles.close(cache)?;
        }
        Ok(())
    }

    /// Writes pending raster cache edits back into pixel memory.
    pub fn flush(&mut self, handle: Handle) -> Result<()> {
        let s = self.surface(handle)?;
        let Some(cache) = s.cache else {
            return Ok(());
        };
        let cached = self
            .handles
            .cached_raster_mut(cache)
            .ok_or(HandleError::InvalidHandle(cache))?;
        if cached.dirty {
            encode(
                &mut self.mem,
                s.memory,
                &cached.raster,
                s.bpp,
                s.width,
                s.height,
            )?;
            cached.dirty = false;
        }
        Ok(())
    }

    /// Flush, then invalidate: the cache goes away without losing edits.
    pub(crate) fn retire_cache(&mut self, handle: Handle) -> Result<()> {
        self.flush(handle)?;
        self.invalidate(handle)
    }

    /// Current surface contents, from the cache when there is one.
    pub fn surface_raster(&mut self, handle: Handle) -> Result<Raster> {
        if let Some(cache) = self.materialize(handle, true)? {
            if let Some(cached) = self.handles.cached_raster(cache) {
                return Ok(cached.raster.clone());
            }
        }
        self.decode_surface(handle)
    }

    /// Applies `draw` to the surface contents. Unlocked surfaces are drawn through their cache;
    /// locked ones are decoded, drawn and written straight back.
    pub(crate) fn draw_surface(
        &mut self,
        handle: Handle,
        draw: impl FnOnce(&mut Raster),
    ) -> Result<()> {
        match self.materialize(handle, true)? {
            Some(cache) => {
                let cached = self
                    .handles
                    .cached_raster_mut(cache)
                    .ok_or(HandleError::InvalidHandle(cache))?;
                draw(&mut cached.raster);
                cached.dirty = true;
            }
            None => {
                let s = self.surface(handle)?;
                let mut raster = self.decode_surface(handle)?;
                draw(&mut raster);
                encode(&mut self.mem, s.memory, &raster, s.bpp, s.width, s.height)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn invalid_params(entry: &'static str) -> Win32Error {
    Win32Error::InvalidArgument {
        entry,
        status: HResult::DDERR_INVALIDPARAMS,
    }
}

pub(crate) fn null_pointer(entry: &'static str) -> Win32Error {
    Win32Error::InvalidArgument {
        entry,
        status: HResult::E_POINTER,
    }
}
