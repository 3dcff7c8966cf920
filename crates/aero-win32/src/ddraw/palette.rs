use aero_win32_mem::GuestMemory;
use tracing::debug;

use super::caps::PaletteCaps;
use super::surface::{invalid_params, null_pointer};
use super::{OFFSET_DATA, OFFSET_HANDLE, OFFSET_VTABLE};
use crate::error::{Result, Win32Error};
use crate::handle::{Handle, HandleError, ObjectData, ObjectKind};
use crate::hresult::HResult;
use crate::Win32System;

/// Colour slots reserved in every palette block, whatever the palette size.
const MIRROR_ENTRIES: u32 = 256;

/// Bytes of guest memory behind a palette interface pointer.
pub const PALETTE_OBJECT_SIZE: u32 = OFFSET_DATA + MIRROR_ENTRIES * 4;

/// `PALETTEENTRY` is four bytes: red, green, blue, flags.
const ENTRY_SIZE: u32 = 4;

/// Host-side state of a DirectDraw palette. Colours are `0x00RRGGBB` and are mirrored into the
/// palette block after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub(crate) object: u32,
    pub(crate) caps: PaletteCaps,
    pub(crate) entries: Vec<u32>,
}

impl Palette {
    /// Guest address of the COM object.
    pub fn object(&self) -> u32 {
        self.object
    }

    pub fn caps(&self) -> PaletteCaps {
        self.caps
    }

    pub fn entries(&self) -> &[u32] {
        &self.entries
    }
}

fn entry_to_rgb(bytes: [u8; 4]) -> u32 {
    let [r, g, b, _flags] = bytes;
    u32::from_be_bytes([0, r, g, b])
}

fn rgb_to_entry(rgb: u32) -> [u8; 4] {
    let [_, r, g, b] = rgb.to_be_bytes();
    [r, g, b, 0]
}

impl<M: GuestMemory> Win32System<M> {
    /// `IDirectDraw::CreatePalette`. Writes the new interface pointer to `out` and returns it.
    pub fn create_palette(&mut self, flags: u32, color_table: u32, out: u32) -> Result<u32> {
        const ENTRY: &str = "IDirectDraw::CreatePalette";

        if color_table == 0 || out == 0 {
            return Err(invalid_params(ENTRY));
        }
        let caps = PaletteCaps::from_bits_retain(flags);
        if caps.contains(PaletteCaps::EIGHTBITENTRIES) {
            return Err(Win32Error::Unsupported {
                entry: ENTRY,
                detail: "DDPCAPS_8BITENTRIES".into(),
            });
        }
        let len = if caps.contains(PaletteCaps::EIGHTBIT) {
            256
        } else if caps.contains(PaletteCaps::FOURBIT) {
            16
        } else {
            return Err(Win32Error::Unsupported {
                entry: ENTRY,
                detail: format!("palette caps {caps:?}"),
            });
        };

        let mut entries = Vec::with_capacity(len as usize);
        for i in 0..len {
            let mut bytes = [0; 4];
            self.mem.read_into(color_table + i * ENTRY_SIZE, &mut bytes)?;
            entries.push(entry_to_rgb(bytes));
        }

        let vtable = self.palette_vtable()?;
        let object = self.heap.alloc(&mut self.mem, PALETTE_OBJECT_SIZE, true)?;
        let palette = Palette {
            object,
            caps,
            entries,
        };
        self.mirror_palette(&palette)?;

        let handle = self.handles.create(ObjectData::Palette(palette))?;
        self.mem.write_u32(object + OFFSET_VTABLE, vtable)?;
        self.mem.write_u32(object + OFFSET_HANDLE, handle.raw())?;
        self.mem.write_u32(out, object)?;

        debug!(%handle, object, entries = len, "palette created");
        Ok(object)
    }

    fn mirror_palette(&mut self, palette: &Palette) -> Result<()> {
        for (i, rgb) in (0..MIRROR_ENTRIES).zip(&palette.entries) {
            self.mem
                .write_u32(palette.object + OFFSET_DATA + i * 4, *rgb)?;
        }
        Ok(())
    }

    fn palette_state(&self, handle: Handle) -> Result<&Palette> {
        self.handles
            .palette(handle)
            .ok_or(Win32Error::Handle(HandleError::InvalidHandle(handle)))
    }

    /// Validates `start..start + count` against the palette size.
    fn palette_range(
        &self,
        entry: &'static str,
        handle: Handle,
        start: u32,
        count: u32,
        buffer: u32,
    ) -> Result<std::ops::Range<usize>> {
        let len = self.palette_state(handle)?.entries.len();
        match start.checked_add(count) {
            Some(end) if buffer != 0 && end as usize <= len => Ok(start as usize..end as usize),
            _ => Err(invalid_params(entry)),
        }
    }

    /// `IDirectDrawPalette::GetEntries`.
    pub fn palette_get_entries(
        &mut self,
        this: u32,
        _flags: u32,
        start: u32,
        count: u32,
        out: u32,
    ) -> Result<()> {
        const ENTRY: &str = "IDirectDrawPalette::GetEntries";

        let handle = self.palette_handle(ENTRY, this)?;
        let range = self.palette_range(ENTRY, handle, start, count, out)?;
        let colours = self.palette_state(handle)?.entries[range].to_vec();
        for (addr, rgb) in (0..).map(|i| out + i * ENTRY_SIZE).zip(colours) {
            self.mem.write_from(addr, &rgb_to_entry(rgb))?;
        }
        Ok(())
    }

    /// `IDirectDrawPalette::SetEntries`. Every surface drawing with the palette drops its raster
    /// cache, and visible ones are presented again with the new colours.
    pub fn palette_set_entries(
        &mut self,
        this: u32,
        _flags: u32,
        start: u32,
        count: u32,
        src: u32,
    ) -> Result<()> {
        const ENTRY: &str = "IDirectDrawPalette::SetEntries";

        let handle = self.palette_handle(ENTRY, this)?;
        let range = self.palette_range(ENTRY, handle, start, count, src)?;

        let users: Vec<Handle> = self
            .handles
            .handles_of(ObjectKind::Surface)
            .filter(|s| self.handles.surface(*s).and_then(|s| s.palette) == Some(handle))
            .collect();
        // Pending edits were made against the old colours.
        for &surface in &users {
            self.retire_cache(surface)?;
        }

        let mut colours = Vec::with_capacity(range.len());
        for i in 0..count {
            let mut bytes = [0; 4];
            self.mem.read_into(src + i * ENTRY_SIZE, &mut bytes)?;
            colours.push(entry_to_rgb(bytes));
        }
        let palette = self
            .handles
            .palette_mut(handle)
            .ok_or(HandleError::InvalidHandle(handle))?;
        palette.entries[range].copy_from_slice(&colours);
        let palette = palette.clone();
        self.mirror_palette(&palette)?;

        for surface in users {
            self.present_if_visible(surface)?;
        }
        Ok(())
    }

    /// `IDirectDrawPalette::GetCaps`.
    pub fn palette_get_caps(&mut self, this: u32, out: u32) -> Result<()> {
        const ENTRY: &str = "IDirectDrawPalette::GetCaps";

        let handle = self.palette_handle(ENTRY, this)?;
        if out == 0 {
            return Err(null_pointer(ENTRY));
        }
        let caps = self.palette_state(handle)?.caps;
        self.mem.write_u32(out, caps.bits())?;
        Ok(())
    }

    /// `IUnknown::AddRef` on a palette.
    pub fn palette_add_ref(&mut self, this: u32) -> Result<u32> {
        let handle = self.palette_handle("IDirectDrawPalette::AddRef", this)?;
        Ok(self.handles.add_ref(handle)?)
    }

    /// `IUnknown::Release` on a palette.
    pub fn palette_release(&mut self, this: u32) -> Result<u32> {
        let handle = self.palette_handle("IDirectDrawPalette::Release", this)?;
        Ok(self.handles.release(handle)?)
    }

    /// `IDirectDrawPalette::Initialize`.
    pub fn palette_initialize(&mut self, this: u32) -> Result<()> {
        const ENTRY: &str = "IDirectDrawPalette::Initialize";

        self.palette_handle(ENTRY, this)?;
        Err(Win32Error::Failed {
            entry: ENTRY,
            status: HResult::DDERR_ALREADYINITIALIZED,
        })
    }
}
