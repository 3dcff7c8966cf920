//! Guest linear memory for hosted 32-bit Windows processes.
//!
//! A hosted process sees a flat 32-bit address space. Everything the Win32 layer mirrors into the
//! guest (COM objects, surface descriptors, pixel storage) is addressed through [`GuestMemory`]
//! rather than through host pointers, so layouts stay bit-exact regardless of host endianness or
//! struct packing.
//!
//! [`ProcessHeap`] and [`VideoMemory`] model the two places pixel storage can come from: the
//! owning process's heap and the display framebuffer aperture.

#![forbid(unsafe_code)]

mod alloc;
mod guest;

pub use alloc::{BumpHeap, ProcessHeap, VideoMemory, VideoRamWindow};
pub use guest::{FlatMemory, GuestMemory, GuestMemoryError, GuestMemoryResult};
