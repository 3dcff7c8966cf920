use aero_win32_mem::{GuestMemory, ProcessHeap, VideoMemory};
use aero_win32_pixel::Raster;

use crate::config::{DisplayMode, Win32Config};
use crate::ddraw::DirectDraw;
use crate::handle::HandleTable;
use crate::host::{HostServices, HostStubs, PresentSink};

/// One emulated Win32 process: its guest memory, kernel objects and DirectDraw state.
///
/// Everything runs on the emulation thread; entry points run to completion before the
/// instruction loop resumes.
pub struct Win32System<M: GuestMemory> {
    pub mem: M,
    pub handles: HandleTable,
    pub(crate) heap: Box<dyn ProcessHeap>,
    pub(crate) video: Box<dyn VideoMemory>,
    pub(crate) stubs: Box<dyn HostStubs>,
    pub(crate) presenter: Box<dyn PresentSink>,
    pub(crate) ddraw: DirectDraw,
}

impl<M: GuestMemory> Win32System<M> {
    pub fn new(config: Win32Config, mem: M, host: HostServices) -> Self {
        Self {
            mem,
            handles: HandleTable::new(config.handle_base),
            heap: host.heap,
            video: host.video,
            stubs: host.stubs,
            presenter: host.presenter,
            ddraw: DirectDraw::new(config.display, config.flip_chain),
        }
    }

    pub fn ddraw(&self) -> &DirectDraw {
        &self.ddraw
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.ddraw.display()
    }

    pub(crate) fn present(&mut self, frame: &Raster) {
        self.presenter.present(frame);
    }
}
