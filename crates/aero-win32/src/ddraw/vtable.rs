//! COM vtables for surfaces and palettes and the dispatch from host stubs back to entry points.
//!
//! Each vtable slot holds the address of a host stub. When guest code calls through a slot the
//! CPU traps into the host with the stub address and the stdcall arguments (`this` first), which
//! [`Win32System::call_stub`] routes to the matching entry point. The callee pops
//! [`Method::arg_count`] dwords.

use std::collections::HashMap;

use aero_win32_mem::GuestMemory;
use tracing::{debug, error, warn};

use crate::error::{Disposition, Result, Win32Error};
use crate::hresult::HResult;
use crate::Win32System;

macro_rules! methods {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident($iface:literal) {
            $($variant:ident = $argc:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            /// Every method in vtable order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => concat!($iface, "::", stringify!($variant)),)*
                }
            }

            /// Number of stdcall arguments, `this` included.
            pub fn arg_count(self) -> usize {
                match self {
                    $($name::$variant => $argc,)*
                }
            }
        }
    };
}

methods! {
    /// `IUnknown` followed by `IDirectDrawSurface`, in declaration order.
    pub enum SurfaceMethod("IDirectDrawSurface") {
        QueryInterface = 3,
        AddRef = 1,
        Release = 1,
        AddAttachedSurface = 2,
        AddOverlayDirtyRect = 2,
        Blt = 6,
        BltBatch = 4,
        BltFast = 6,
        DeleteAttachedSurface = 3,
        EnumAttachedSurfaces = 3,
        EnumOverlayZOrders = 4,
        Flip = 3,
        GetAttachedSurface = 3,
        GetBltStatus = 2,
        GetCaps = 2,
        GetClipper = 2,
        GetColorKey = 3,
        GetDC = 2,
        GetFlipStatus = 2,
        GetOverlayPosition = 3,
        GetPalette = 2,
        GetPixelFormat = 2,
        GetSurfaceDesc = 2,
        Initialize = 3,
        IsLost = 1,
        Lock = 5,
        ReleaseDC = 2,
        Restore = 1,
        SetClipper = 2,
        SetColorKey = 3,
        SetOverlayPosition = 3,
        SetPalette = 2,
        Unlock = 2,
        UpdateOverlay = 6,
        UpdateOverlayDisplay = 2,
        UpdateOverlayZOrder = 3,
    }
}

methods! {
    /// `IUnknown` followed by `IDirectDrawPalette`, in declaration order.
    pub enum PaletteMethod("IDirectDrawPalette") {
        QueryInterface = 3,
        AddRef = 1,
        Release = 1,
        GetCaps = 2,
        GetEntries = 5,
        Initialize = 4,
        SetEntries = 5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Surface(SurfaceMethod),
    Palette(PaletteMethod),
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Surface(m) => m.name(),
            Method::Palette(m) => m.name(),
        }
    }

    pub fn arg_count(self) -> usize {
        match self {
            Method::Surface(m) => m.arg_count(),
            Method::Palette(m) => m.arg_count(),
        }
    }
}

/// Guest addresses of the shared vtables, built on first use.
#[derive(Debug, Default)]
pub(crate) struct Vtables {
    surface: Option<u32>,
    palette: Option<u32>,
    methods: HashMap<u32, Method>,
}

impl<M: GuestMemory> Win32System<M> {
    /// Guest address of the surface vtable.
    pub fn surface_vtable(&mut self) -> Result<u32> {
        if let Some(vtable) = self.ddraw.vtables.surface {
            return Ok(vtable);
        }
        let vtable = self.install_vtable(SurfaceMethod::ALL.iter().copied().map(Method::Surface))?;
        self.ddraw.vtables.surface = Some(vtable);
        Ok(vtable)
    }

    /// Guest address of the palette vtable.
    pub fn palette_vtable(&mut self) -> Result<u32> {
        if let Some(vtable) = self.ddraw.vtables.palette {
            return Ok(vtable);
        }
        let vtable = self.install_vtable(PaletteMethod::ALL.iter().copied().map(Method::Palette))?;
        self.ddraw.vtables.palette = Some(vtable);
        Ok(vtable)
    }

    fn install_vtable(&mut self, methods: impl ExactSizeIterator<Item = Method>) -> Result<u32> {
        let slots = methods.len() as u32;
        let vtable = self.heap.alloc(&mut self.mem, slots * 4, true)?;
        for (slot, method) in (0..slots).zip(methods) {
            let stub = self.stubs.register_stub(method.name())?;
            self.mem.write_u32(vtable + slot * 4, stub)?;
            self.ddraw.vtables.methods.insert(stub, method);
        }
        debug!(vtable, slots, "vtable installed");
        Ok(vtable)
    }

    /// Method a host stub address was registered for.
    pub fn method_at(&self, stub: u32) -> Option<Method> {
        self.ddraw.vtables.methods.get(&stub).copied()
    }

    /// Handles a trap on a vtable stub. Returns the value for EAX.
    pub fn call_stub(&mut self, stub: u32, args: &[u32]) -> Result<u32> {
        let method = self.method_at(stub).ok_or_else(|| Win32Error::Unsupported {
            entry: "vtable dispatch",
            detail: format!("no method registered at stub {stub:#x}"),
        })?;
        self.dispatch(method, args)
    }

    /// Runs `method` and converts recoverable errors to the status code guest code sees. Only fatal
    /// errors come back as `Err`.
    pub fn dispatch(&mut self, method: Method, args: &[u32]) -> Result<u32> {
        match self.invoke_method(method, args) {
            Ok(eax) => Ok(eax),
            Err(err) => match err.disposition() {
                Disposition::Status(status) => {
                    warn!(method = method.name(), %status, %err, "call failed");
                    Ok(status.raw())
                }
                Disposition::Fatal => {
                    error!(method = method.name(), %err, "unsupported call, stopping");
                    Err(err)
                }
            },
        }
    }

    fn invoke_method(&mut self, method: Method, args: &[u32]) -> Result<u32> {
        if args.len() != method.arg_count() {
            return Err(Win32Error::Unsupported {
                entry: method.name(),
                detail: format!(
                    "called with {} arguments, expected {}",
                    args.len(),
                    method.arg_count()
                ),
            });
        }
        let ok = |r: Result<()>| r.map(|()| HResult::DD_OK.raw());

        match method {
            Method::Surface(m) => {
                use SurfaceMethod as S;
                match m {
                    S::AddRef => self.surface_add_ref(args[0]),
                    S::Release => self.surface_release(args[0]),
                    S::BltFast => ok(self.blt_fast(args[0], args[1], args[2], args[3], args[4], args[5])),
                    S::Flip => ok(self.flip(args[0], args[1], args[2])),
                    S::GetAttachedSurface => self
                        .get_attached_surface(args[0], args[1], args[2])
                        .map(|_| HResult::DD_OK.raw()),
                    S::GetBltStatus => ok(self.get_blt_status(args[0], args[1])),
                    S::GetCaps => ok(self.get_caps(args[0], args[1])),
                    S::GetDC => self.get_dc(args[0], args[1]).map(|_| HResult::DD_OK.raw()),
                    S::GetFlipStatus => ok(self.get_flip_status(args[0], args[1])),
                    S::GetPalette => self
                        .get_palette(args[0], args[1])
                        .map(|_| HResult::DD_OK.raw()),
                    S::GetPixelFormat => ok(self.get_pixel_format(args[0], args[1])),
                    S::GetSurfaceDesc => ok(self.get_surface_desc(args[0], args[1])),
                    S::Initialize => ok(self.initialize_surface(args[0])),
                    S::IsLost => ok(self.is_lost(args[0])),
                    S::Lock => ok(self.lock(args[0], args[1], args[2], args[3], args[4])),
                    S::ReleaseDC => ok(self.release_dc(args[0], args[1])),
                    S::Restore => ok(self.restore(args[0])),
                    S::SetPalette => ok(self.set_palette(args[0], args[1])),
                    S::Unlock => ok(self.unlock(args[0], args[1])),
                    S::QueryInterface
                    | S::AddAttachedSurface
                    | S::AddOverlayDirtyRect
                    | S::Blt
                    | S::BltBatch
                    | S::DeleteAttachedSurface
                    | S::EnumAttachedSurfaces
                    | S::EnumOverlayZOrders
                    | S::GetClipper
                    | S::GetColorKey
                    | S::GetOverlayPosition
                    | S::SetClipper
                    | S::SetColorKey
                    | S::SetOverlayPosition
                    | S::UpdateOverlay
                    | S::UpdateOverlayDisplay
                    | S::UpdateOverlayZOrder => Err(Win32Error::NotImplemented(m.name())),
                }
            }
            Method::Palette(m) => {
                use PaletteMethod as P;
                match m {
                    P::AddRef => self.palette_add_ref(args[0]),
                    P::Release => self.palette_release(args[0]),
                    P::GetCaps => ok(self.palette_get_caps(args[0], args[1])),
                    P::GetEntries => {
                        ok(self.palette_get_entries(args[0], args[1], args[2], args[3], args[4]))
                    }
                    P::Initialize => ok(self.palette_initialize(args[0])),
                    P::SetEntries => {
                        ok(self.palette_set_entries(args[0], args[1], args[2], args[3], args[4]))
                    }
                    P::QueryInterface => Err(Win32Error::NotImplemented(m.name())),
                }
            }
        }
    }
}
