use crate::handle::Handle;

/// GDI device context. Drawing primitives live in the GDI subsystem; the core only tracks which
/// surface a context renders into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceContext {
    pub surface: Option<Handle>,
}

impl DeviceContext {
    pub fn for_surface(surface: Handle) -> Self {
        Self {
            surface: Some(surface),
        }
    }
}
