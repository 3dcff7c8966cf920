//! Narrow interfaces to the parts of the emulator that live outside the Win32 core.

use std::collections::BTreeMap;

use aero_win32_mem::{ProcessHeap, VideoMemory};
use aero_win32_pixel::Raster;
use thiserror::Error;

/// Receives finished frames (flip, blits onto the visible surface).
pub trait PresentSink {
    fn present(&mut self, frame: &Raster);
}

impl<F: FnMut(&Raster)> PresentSink for F {
    fn present(&mut self, frame: &Raster) {
        self(frame)
    }
}

/// Drops every frame. Useful for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl PresentSink for NullPresenter {
    fn present(&mut self, _frame: &Raster) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StubError {
    #[error("no room left for host stub {name}")]
    Exhausted { name: &'static str },
}

/// Hands out guest code addresses that trap back into the host when executed.
pub trait HostStubs {
    fn register_stub(&mut self, name: &'static str) -> Result<u32, StubError>;
}

/// [`HostStubs`] over a reserved range of the emulated code region, one slot per stub.
#[derive(Debug, Clone)]
pub struct StubTable {
    next: u32,
    end: u32,
    names: BTreeMap<u32, &'static str>,
}

impl StubTable {
    /// Bytes reserved per stub; enough for a trap opcode plus `ret imm16`.
    pub const SLOT_SIZE: u32 = 8;

    pub fn new(base: u32, size: u32) -> Self {
        Self {
            next: base,
            end: base.saturating_add(size),
            names: BTreeMap::new(),
        }
    }

    /// Name a stub address was registered under.
    pub fn lookup(&self, addr: u32) -> Option<&'static str> {
        self.names.get(&addr).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl HostStubs for StubTable {
    fn register_stub(&mut self, name: &'static str) -> Result<u32, StubError> {
        let addr = self.next;
        let next = addr
            .checked_add(Self::SLOT_SIZE)
            .filter(|next| *next <= self.end)
            .ok_or(StubError::Exhausted { name })?;
        self.next = next;
        self.names.insert(addr, name);
        Ok(addr)
    }
}

/// Collaborators a [`crate::Win32System`] is built from.
pub struct HostServices {
    pub heap: Box<dyn ProcessHeap>,
    pub video: Box<dyn VideoMemory>,
    pub stubs: Box<dyn HostStubs>,
    pub presenter: Box<dyn PresentSink>,
}
