use std::collections::HashMap;
use std::rc::Rc;

use aero_win32::{
    GuestMachine, GuestRegs, HostStubs, MachineFault, StubError, StubTable, Trampoline,
    TrampolineError,
};
use aero_win32_mem::{FlatMemory, GuestMemory};

const STACK_TOP: u32 = 0x0002_0000;

const ADD3_CDECL: u32 = 0x0040_1000;
const ADD3_STDCALL: u32 = 0x0040_2000;
const OUTER: u32 = 0x0040_3000;
const FAULTS: u32 = 0x0040_4000;

#[derive(Clone, Copy)]
enum Callee {
    /// Sums its arguments; the caller pops them.
    Cdecl { argc: u32 },
    /// Sums its arguments and pops them itself.
    Stdcall { argc: u32 },
    /// Calls `ADD3_STDCALL` through the trampoline and returns its result plus one.
    Nested,
    Fault,
}

/// Just enough of an x86 machine to execute calls to a few host-modelled functions.
struct ScriptedMachine {
    regs: GuestRegs,
    mem: FlatMemory,
    stubs: StubTable,
    functions: HashMap<u32, Callee>,
    trampoline: Rc<Trampoline>,
    /// `(function, esp at entry, depth)` for every call executed.
    calls: Vec<(u32, u32, u32)>,
}

impl ScriptedMachine {
    fn new(trampoline: Rc<Trampoline>) -> Self {
        let functions = HashMap::from([
            (ADD3_CDECL, Callee::Cdecl { argc: 3 }),
            (ADD3_STDCALL, Callee::Stdcall { argc: 3 }),
            (OUTER, Callee::Nested),
            (FAULTS, Callee::Fault),
        ]);
        Self {
            regs: GuestRegs {
                esp: STACK_TOP,
                eip: 0x0040_0000,
                ..GuestRegs::default()
            },
            mem: FlatMemory::new(0x0001_0000, 0x1_0000),
            stubs: StubTable::new(0x7000_0000, 0x100),
            functions,
            trampoline,
            calls: Vec::new(),
        }
    }

    fn args(&self, argc: u32) -> Vec<u32> {
        (0..argc)
            .map(|i| self.mem.read_u32(self.regs.esp + 4 + i * 4).unwrap())
            .collect()
    }

    fn ret(&mut self, value: u32, popped: u32) {
        let ret = self.mem.read_u32(self.regs.esp).unwrap();
        self.regs.eax = value;
        self.regs.esp += 4 + popped * 4;
        self.regs.eip = ret;
    }
}

impl HostStubs for ScriptedMachine {
    fn register_stub(&mut self, name: &'static str) -> Result<u32, StubError> {
        self.stubs.register_stub(name)
    }
}

impl GuestMachine for ScriptedMachine {
    type Memory = FlatMemory;

    fn regs(&self) -> &GuestRegs {
        &self.regs
    }

    fn regs_mut(&mut self) -> &mut GuestRegs {
        &mut self.regs
    }

    fn memory_mut(&mut self) -> &mut FlatMemory {
        &mut self.mem
    }

    fn run_until(&mut self, stop_eip: u32) -> Result<(), MachineFault> {
        while self.regs.eip != stop_eip {
            let eip = self.regs.eip;
            let callee = self.functions.get(&eip).copied().ok_or(MachineFault {
                eip,
                reason: "no code here".into(),
            })?;
            self.calls
                .push((eip, self.regs.esp, self.trampoline.depth()));

            match callee {
                Callee::Cdecl { argc } => {
                    let sum = self.args(argc).iter().sum();
                    self.ret(sum, 0);
                }
                Callee::Stdcall { argc } => {
                    let sum = self.args(argc).iter().sum();
                    self.ret(sum, argc);
                }
                Callee::Nested => {
                    let trampoline = Rc::clone(&self.trampoline);
                    let inner = trampoline
                        .invoke(self, ADD3_STDCALL, &[10, 20, 30])
                        .map_err(|err| MachineFault {
                            eip,
                            reason: err.to_string(),
                        })?;
                    self.ret(inner + 1, 0);
                }
                Callee::Fault => {
                    // Leave the stack half unwound to prove the trampoline restores it.
                    self.regs.esp -= 0x40;
                    return Err(MachineFault {
                        eip,
                        reason: "invalid opcode".into(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn machine() -> (Rc<Trampoline>, ScriptedMachine) {
    let trampoline = Rc::new(Trampoline::new());
    let machine = ScriptedMachine::new(Rc::clone(&trampoline));
    (trampoline, machine)
}

#[test]
fn builds_the_frame_right_to_left_with_the_stub_on_top() {
    let (trampoline, mut m) = machine();
    assert_eq!(trampoline.invoke(&mut m, ADD3_CDECL, &[1, 2, 3]), Ok(6));

    let stub = trampoline.return_stub().unwrap();
    assert_eq!(m.stubs.lookup(stub), Some(Trampoline::RETURN_STUB));

    let (_, entry_esp, depth) = m.calls[0];
    assert_eq!(entry_esp, STACK_TOP - 16);
    assert_eq!(depth, 1);
    assert_eq!(m.mem.read_u32(entry_esp).unwrap(), stub);
    assert_eq!(m.mem.read_u32(entry_esp + 4).unwrap(), 1);
    assert_eq!(m.mem.read_u32(entry_esp + 12).unwrap(), 3);
}

#[test]
fn restores_esp_and_eip_for_cdecl_and_stdcall() {
    let (trampoline, mut m) = machine();
    let before = *m.regs();

    assert_eq!(trampoline.invoke(&mut m, ADD3_CDECL, &[1, 2, 3]), Ok(6));
    assert_eq!(m.regs().esp, before.esp);
    assert_eq!(m.regs().eip, before.eip);

    assert_eq!(trampoline.invoke(&mut m, ADD3_STDCALL, &[4, 5, 6]), Ok(15));
    assert_eq!(m.regs().esp, before.esp);
    assert_eq!(m.regs().eip, before.eip);
    assert_eq!(trampoline.depth(), 0);
}

#[test]
fn the_return_stub_is_registered_once() {
    let (trampoline, mut m) = machine();
    trampoline.invoke(&mut m, ADD3_CDECL, &[0, 0, 0]).unwrap();
    trampoline.invoke(&mut m, ADD3_STDCALL, &[0, 0, 0]).unwrap();
    assert_eq!(m.stubs.len(), 1);
}

#[test]
fn nested_calls_unwind_in_order() {
    let (trampoline, mut m) = machine();
    let before = *m.regs();

    assert_eq!(trampoline.invoke(&mut m, OUTER, &[]), Ok(61));
    assert_eq!(m.regs().esp, before.esp);
    assert_eq!(trampoline.depth(), 0);

    let depths: Vec<_> = m.calls.iter().map(|(f, _, d)| (*f, *d)).collect();
    assert_eq!(depths, vec![(OUTER, 1), (ADD3_STDCALL, 2)]);
}

#[test]
fn a_fault_still_restores_registers() {
    let (trampoline, mut m) = machine();
    let before = *m.regs();

    let err = trampoline.invoke(&mut m, FAULTS, &[7]).unwrap_err();
    assert!(matches!(
        err,
        TrampolineError::Fault { target: FAULTS, ref fault } if fault.eip == FAULTS
    ));
    assert_eq!(m.regs().esp, before.esp);
    assert_eq!(m.regs().eip, before.eip);
    assert_eq!(trampoline.depth(), 0);
}

#[test]
fn a_stack_outside_memory_is_reported() {
    let (trampoline, mut m) = machine();
    m.regs_mut().esp = 0x10;
    let err = trampoline.invoke(&mut m, ADD3_CDECL, &[1, 2, 3]).unwrap_err();
    assert!(matches!(err, TrampolineError::Stack(_)));
    assert_eq!(m.regs().esp, 0x10);
}
