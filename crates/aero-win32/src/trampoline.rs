//! Synchronous host → guest calls.
//!
//! Host code sometimes needs to run a guest function to completion before it can continue (window
//! procedures, enumeration callbacks). The [`Trampoline`] builds a call frame on the guest stack
//! whose return address is a host stub, then re-enters the instruction loop until that stub is
//! reached. Guest code running inside the nested loop may call back into the host, which may in
//! turn invoke the trampoline again.

use std::cell::Cell;

use aero_win32_mem::{GuestMemory, GuestMemoryError};
use thiserror::Error;
use tracing::trace;

use crate::host::{HostStubs, StubError};

/// 32-bit general purpose registers plus `EIP`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuestRegs {
    pub eax: u32,
    pub ecx: u32,
    pub edx: u32,
    pub ebx: u32,
    pub esp: u32,
    pub ebp: u32,
    pub esi: u32,
    pub edi: u32,
    pub eip: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("guest faulted at eip=0x{eip:08x}: {reason}")]
pub struct MachineFault {
    pub eip: u32,
    pub reason: String,
}

/// The instruction-emulation loop, as far as this crate is concerned.
pub trait GuestMachine: HostStubs {
    type Memory: GuestMemory + ?Sized;

    fn regs(&self) -> &GuestRegs;
    fn regs_mut(&mut self) -> &mut GuestRegs;
    fn memory_mut(&mut self) -> &mut Self::Memory;

    /// Executes guest instructions until `EIP == stop_eip`.
    fn run_until(&mut self, stop_eip: u32) -> Result<(), MachineFault>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrampolineError {
    #[error("failed to register the trampoline return stub: {0}")]
    Stub(#[from] StubError),
    #[error("guest call to 0x{target:08x} failed: {fault}")]
    Fault { target: u32, fault: MachineFault },
    #[error("failed to build the guest call frame: {0}")]
    Stack(#[from] GuestMemoryError),
}

/// Shared by every nested invocation; only ever touched from the emulation thread.
#[derive(Debug, Default)]
pub struct Trampoline {
    return_stub: Cell<Option<u32>>,
    depth: Cell<u32>,
}

impl Trampoline {
    pub const RETURN_STUB: &'static str = "trampoline_return";

    pub fn new() -> Self {
        Self::default()
    }

    /// Number of guest calls currently in flight.
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    pub fn return_stub(&self) -> Option<u32> {
        self.return_stub.get()
    }

    /// Calls the guest function at `target` with `args` (pushed right to left) and returns `EAX`.
    ///
    /// `EIP` and `ESP` are restored to their values at entry whether the callee cleaned up its
    /// arguments or not, and also when the instruction loop faults.
    pub fn invoke<G: GuestMachine + ?Sized>(
        &self,
        machine: &mut G,
        target: u32,
        args: &[u32],
    ) -> Result<u32, TrampolineError> {
        let stub = match self.return_stub.get() {
            Some(stub) => stub,
            None => {
                let stub = machine.register_stub(Self::RETURN_STUB)?;
                self.return_stub.set(Some(stub));
                stub
            }
        };

        let saved = *machine.regs();
        let result = self.enter(machine, stub, target, args);

        let eax = machine.regs().eax;
        let regs = machine.regs_mut();
        regs.eip = saved.eip;
        regs.esp = saved.esp;

        result.map(|()| eax)
    }

    fn enter<G: GuestMachine + ?Sized>(
        &self,
        machine: &mut G,
        stub: u32,
        target: u32,
        args: &[u32],
    ) -> Result<(), TrampolineError> {
        let mut esp = machine.regs().esp;
        for &arg in args.iter().rev().chain(std::iter::once(&stub)) {
            esp = esp.wrapping_sub(4);
            machine.memory_mut().write_u32(esp, arg)?;
        }

        let regs = machine.regs_mut();
        regs.esp = esp;
        regs.eip = target;

        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        trace!(eip = target, argc = args.len(), depth, "guest call");

        let outcome = machine.run_until(stub);
        self.depth.set(depth - 1);
        outcome.map_err(|fault| TrampolineError::Fault { target, fault })
    }
}
