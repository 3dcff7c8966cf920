//! Process-wide kernel object table.
//!
//! Handles are issued from a monotonically increasing counter and are never recycled, so a stale
//! handle can only ever miss, never alias a newer object. Objects that own other objects (a surface
//! owns its back buffer, its device context and its raster cache, and holds a reference on its
//! palette) describe that ownership as a [`Teardown`] list which the table runs after the owner has
//! left both maps.

mod object;

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, warn};

use crate::ddraw::{Palette, Surface};
use crate::gdi::DeviceContext;

pub use object::{
    CachedRaster, Event, FileMapping, Handle, Mutex, ObjectData, ObjectKind, Teardown,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("invalid handle {0}")]
    InvalidHandle(Handle),
    #[error("an object named {name:?} already exists ({existing})")]
    NameInUse { name: String, existing: Handle },
    #[error("handle {handle} is a {actual:?}, expected a {expected:?}")]
    WrongKind {
        handle: Handle,
        expected: ObjectKind,
        actual: ObjectKind,
    },
    #[error("handle space exhausted")]
    Exhausted,
}

pub type Result<T> = std::result::Result<T, HandleError>;

#[derive(Debug)]
pub struct KernelObject {
    handle: Handle,
    name: Option<String>,
    ref_count: u32,
    pub data: ObjectData,
}

impl KernelObject {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn kind(&self) -> ObjectKind {
        self.data.kind()
    }
}

#[derive(Debug)]
pub struct HandleTable {
    next: u32,
    objects: BTreeMap<Handle, KernelObject>,
    named: HashMap<String, Handle>,
}

macro_rules! typed_accessors {
    ($($get:ident, $get_mut:ident => $variant:ident($ty:ty);)*) => {
        $(
            pub fn $get(&self, handle: Handle) -> Option<&$ty> {
                match self.objects.get(&handle).map(|o| &o.data) {
                    Some(ObjectData::$variant(v)) => Some(v),
                    _ => None,
                }
            }

            pub fn $get_mut(&mut self, handle: Handle) -> Option<&mut $ty> {
                match self.objects.get_mut(&handle).map(|o| &mut o.data) {
                    Some(ObjectData::$variant(v)) => Some(v),
                    _ => None,
                }
            }
        )*
    };
}

impl HandleTable {
    pub fn new(base: u32) -> Self {
        Self {
            next: base.max(1),
            objects: BTreeMap::new(),
            named: HashMap::new(),
        }
    }

    /// Registers an anonymous object with a reference count of one.
    pub fn create(&mut self, data: ObjectData) -> Result<Handle> {
        self.insert(None, data)
    }

    /// Registers a named object. A live object with the same name is reported through
    /// [`HandleError::NameInUse`] so callers can open it instead.
    pub fn create_named(&mut self, name: &str, data: ObjectData) -> Result<Handle> {
        if let Some(&existing) = self.named.get(name) {
            return Err(HandleError::NameInUse {
                name: name.to_owned(),
                existing,
            });
        }
        self.insert(Some(name.to_owned()), data)
    }

    fn insert(&mut self, name: Option<String>, data: ObjectData) -> Result<Handle> {
        let handle = Handle::from_raw(self.next);
        self.next = self.next.checked_add(1).ok_or(HandleError::Exhausted)?;

        debug!(%handle, kind = ?data.kind(), name = name.as_deref(), "kernel object created");
        if let Some(name) = &name {
            self.named.insert(name.clone(), handle);
        }
        self.objects.insert(
            handle,
            KernelObject {
                handle,
                name,
                ref_count: 1,
                data,
            },
        );
        Ok(handle)
    }

    pub fn get(&self, handle: Handle) -> Option<&KernelObject> {
        self.objects.get(&handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut KernelObject> {
        self.objects.get_mut(&handle)
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&KernelObject> {
        self.named.get(name).and_then(|h| self.objects.get(h))
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.objects.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Live handles of the given kind, in issue order.
    pub fn handles_of(&self, kind: ObjectKind) -> impl Iterator<Item = Handle> + '_ {
        self.objects
            .values()
            .filter(move |o| o.kind() == kind)
            .map(|o| o.handle)
    }

    /// Like [`HandleTable::get`], but an unknown handle or another kind of object is an error.
    pub fn expect_kind(&self, handle: Handle, expected: ObjectKind) -> Result<&KernelObject> {
        let object = self
            .objects
            .get(&handle)
            .ok_or(HandleError::InvalidHandle(handle))?;
        if object.kind() != expected {
            return Err(HandleError::WrongKind {
                handle,
                expected,
                actual: object.kind(),
            });
        }
        Ok(object)
    }

    typed_accessors! {
        surface, surface_mut => Surface(Surface);
        palette, palette_mut => Palette(Palette);
        device_context, device_context_mut => DeviceContext(DeviceContext);
        cached_raster, cached_raster_mut => CachedRaster(CachedRaster);
        event, event_mut => Event(Event);
        mutex, mutex_mut => Mutex(Mutex);
    }

    pub fn add_ref(&mut self, handle: Handle) -> Result<u32> {
        let object = self
            .objects
            .get_mut(&handle)
            .ok_or(HandleError::InvalidHandle(handle))?;
        object.ref_count = object.ref_count.saturating_add(1);
        Ok(object.ref_count)
    }

    /// Drops one reference and closes the object once none are left. Returns the remaining count.
    pub fn release(&mut self, handle: Handle) -> Result<u32> {
        let object = self
            .objects
            .get_mut(&handle)
            .ok_or(HandleError::InvalidHandle(handle))?;
        object.ref_count = object.ref_count.saturating_sub(1);
        let remaining = object.ref_count;
        if remaining == 0 {
            self.close(handle)?;
        }
        Ok(remaining)
    }

    /// Removes the object regardless of its reference count and runs its teardown.
    pub fn close(&mut self, handle: Handle) -> Result<()> {
        let object = self
            .objects
            .remove(&handle)
            .ok_or(HandleError::InvalidHandle(handle))?;
        if let Some(name) = &object.name {
            self.named.remove(name);
        }
        debug!(%handle, kind = ?object.kind(), "kernel object closed");

        for step in object.data.teardown() {
            let outcome = match step {
                Teardown::Release(owned) => self.release(owned).map(drop),
                Teardown::Close(owned) => self.close(owned),
            };
            if let Err(err) = outcome {
                warn!(%handle, ?step, %err, "teardown of owned object failed");
            }
        }
        Ok(())
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_HANDLE_BASE)
    }
}
