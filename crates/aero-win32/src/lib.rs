//! Win32 core services for running 32-bit Windows binaries on an emulated x86 CPU.
//!
//! - [`handle`]: the process-wide kernel object table.
//! - [`trampoline`]: synchronous calls from host code into guest code.
//! - [`ddraw`]: DirectDraw surfaces, palettes and their COM entry points.
//!
//! Guest structures are never overlaid with Rust structs; they are read and written field by field
//! at fixed offsets through [`aero_win32_mem::GuestMemory`].

#![forbid(unsafe_code)]

pub mod config;
pub mod ddraw;
pub mod error;
pub mod gdi;
pub mod handle;
pub mod host;
pub mod hresult;
mod system;
pub mod trampoline;

pub use config::{DisplayMode, FlipChainCaps, Win32Config};
pub use error::{Disposition, Win32Error};
pub use handle::{Handle, HandleError, HandleTable, KernelObject, ObjectData, ObjectKind};
pub use host::{HostServices, HostStubs, NullPresenter, PresentSink, StubError, StubTable};
pub use hresult::HResult;
pub use system::Win32System;
pub use trampoline::{GuestMachine, GuestRegs, MachineFault, Trampoline, TrampolineError};
