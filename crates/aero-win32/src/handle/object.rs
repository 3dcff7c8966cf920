use std::fmt;

use aero_win32_pixel::Raster;

use crate::ddraw::{Palette, Surface};
use crate::gdi::DeviceContext;

/// Opaque 32-bit identifier of a kernel object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Handle(u32);

impl Handle {
    pub const NULL: Handle = Handle(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Surface,
    Palette,
    DeviceContext,
    Event,
    Window,
    FileMapping,
    Mutex,
    Thread,
    Process,
    Brush,
    Pen,
    Region,
    Font,
    Bitmap,
    Menu,
    Cursor,
    Icon,
    FindFile,
    WaitObject,
    CachedRaster,
}

/// Decoded image attached to a surface while it is unlocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRaster {
    pub owner: Handle,
    pub raster: Raster,
    /// Set once the raster holds edits that are not in guest memory yet.
    pub dirty: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Event {
    pub manual_reset: bool,
    pub signaled: bool,
}

impl Event {
    pub fn new(manual_reset: bool, signaled: bool) -> Self {
        Self {
            manual_reset,
            signaled,
        }
    }

    pub fn set(&mut self) {
        self.signaled = true;
    }

    pub fn reset(&mut self) {
        self.signaled = false;
    }

    /// Satisfies one wait. Auto-reset events drop back to non-signaled.
    pub fn try_wait(&mut self) -> bool {
        let signaled = self.signaled;
        if signaled && !self.manual_reset {
            self.signaled = false;
        }
        signaled
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mutex {
    pub owner: Option<u32>,
    pub recursion: u32,
}

impl Mutex {
    /// Acquires on behalf of `thread`; re-acquiring from the owner nests.
    pub fn try_acquire(&mut self, thread: u32) -> bool {
        match self.owner {
            Some(owner) if owner != thread => false,
            _ => {
                self.owner = Some(thread);
                self.recursion += 1;
                true
            }
        }
    }

    /// Returns `false` if `thread` does not own the mutex.
    pub fn release(&mut self, thread: u32) -> bool {
        if self.owner != Some(thread) {
            return false;
        }
        self.recursion -= 1;
        if self.recursion == 0 {
            self.owner = None;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileMapping {
    /// File the mapping was created from; `None` for pagefile-backed mappings.
    pub file: Option<Handle>,
    pub size: u32,
}

/// Per-kind payload of a [`super::KernelObject`].
#[derive(Debug)]
pub enum ObjectData {
    Surface(Surface),
    Palette(Palette),
    DeviceContext(DeviceContext),
    CachedRaster(CachedRaster),
    Event(Event),
    Mutex(Mutex),
    FileMapping(FileMapping),
    /// Objects owned by subsystems outside this crate; only their handle lives here.
    Opaque(ObjectKind),
}

/// Work left over once an object has been removed from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    Release(Handle),
    Close(Handle),
}

impl ObjectData {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectData::Surface(_) => ObjectKind::Surface,
            ObjectData::Palette(_) => ObjectKind::Palette,
            ObjectData::DeviceContext(_) => ObjectKind::DeviceContext,
            ObjectData::CachedRaster(_) => ObjectKind::CachedRaster,
            ObjectData::Event(_) => ObjectKind::Event,
            ObjectData::Mutex(_) => ObjectKind::Mutex,
            ObjectData::FileMapping(_) => ObjectKind::FileMapping,
            ObjectData::Opaque(kind) => *kind,
        }
    }

    pub(crate) fn teardown(&self) -> Vec<Teardown> {
        match self {
            ObjectData::Surface(surface) => surface.teardown(),
            ObjectData::FileMapping(mapping) => {
                mapping.file.map(Teardown::Release).into_iter().collect()
            }
            _ => Vec::new(),
        }
    }
}
