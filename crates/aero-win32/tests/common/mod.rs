#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use aero_win32::ddraw::{desc, DescFlags, SurfaceCaps};
use aero_win32::{
    DisplayMode, Handle, HostServices, StubTable, Win32Config, Win32Error, Win32System,
};
use aero_win32_mem::{BumpHeap, FlatMemory, GuestMemory, VideoRamWindow};
use aero_win32_pixel::Raster;

pub const MEM_BASE: u32 = 0x0001_0000;
pub const MEM_SIZE: u32 = 0x0080_0000;
/// Guest-side buffers the tests hand to entry points.
pub const SCRATCH: u32 = 0x0001_0000;
pub const HEAP_BASE: u32 = 0x0010_0000;
pub const VRAM_BASE: u32 = 0x0040_0000;
pub const STUB_BASE: u32 = 0x7F00_0000;

pub const DESC: u32 = SCRATCH;
pub const OUT: u32 = SCRATCH + 0x200;
pub const LOCKED: u32 = SCRATCH + 0x300;
pub const BUF: u32 = SCRATCH + 0x400;

pub type Frames = Rc<RefCell<Vec<Raster>>>;

pub struct Rig {
    pub sys: Win32System<FlatMemory>,
    pub frames: Frames,
}

pub fn rig(width: u32, height: u32, bpp: u32) -> Rig {
    rig_with_vram(width, height, bpp, 0x0040_0000)
}

pub fn rig_with_vram(width: u32, height: u32, bpp: u32, vram_size: u32) -> Rig {
    let frames = Frames::default();
    let sink = Rc::clone(&frames);
    let host = HostServices {
        heap: Box::new(BumpHeap::new(HEAP_BASE, VRAM_BASE - HEAP_BASE)),
        video: Box::new(VideoRamWindow::new(VRAM_BASE, vram_size)),
        stubs: Box::new(StubTable::new(STUB_BASE, 0x1000)),
        presenter: Box::new(move |frame: &Raster| sink.borrow_mut().push(frame.clone())),
    };
    let config = Win32Config {
        display: DisplayMode {
            width,
            height,
            bpp,
        },
        ..Win32Config::default()
    };
    Rig {
        sys: Win32System::new(config, FlatMemory::new(MEM_BASE, MEM_SIZE), host),
        frames,
    }
}

/// Writes a creation request at [`DESC`].
pub fn request(
    sys: &mut Win32System<FlatMemory>,
    size: u32,
    flags: DescFlags,
    width: u32,
    height: u32,
    back_buffers: u32,
    caps: SurfaceCaps,
) {
    sys.mem.fill(DESC, desc::SIZE2 as usize, 0).unwrap();
    sys.mem.write_u32(DESC + desc::OFFSET_SIZE, size).unwrap();
    sys.mem.write_u32(DESC + desc::OFFSET_FLAGS, flags.bits()).unwrap();
    sys.mem.write_u32(DESC + desc::OFFSET_HEIGHT, height).unwrap();
    sys.mem.write_u32(DESC + desc::OFFSET_WIDTH, width).unwrap();
    sys.mem
        .write_u32(DESC + desc::OFFSET_BACK_BUFFER_COUNT, back_buffers)
        .unwrap();
    sys.mem.write_u32(DESC + desc::OFFSET_CAPS, caps.bits()).unwrap();
}

pub fn create_primary(sys: &mut Win32System<FlatMemory>) -> Result<u32, Win32Error> {
    request(
        sys,
        desc::SIZE,
        DescFlags::CAPS,
        0,
        0,
        0,
        SurfaceCaps::PRIMARYSURFACE,
    );
    sys.create_surface(DESC, OUT)
}

pub fn create_flip_chain(sys: &mut Win32System<FlatMemory>) -> Result<u32, Win32Error> {
    request(
        sys,
        desc::SIZE,
        DescFlags::CAPS | DescFlags::BACKBUFFERCOUNT,
        0,
        0,
        1,
        SurfaceCaps::PRIMARYSURFACE | SurfaceCaps::COMPLEX | SurfaceCaps::FLIP,
    );
    sys.create_surface(DESC, OUT)
}

pub fn create_offscreen(
    sys: &mut Win32System<FlatMemory>,
    width: u32,
    height: u32,
) -> Result<u32, Win32Error> {
    request(
        sys,
        desc::SIZE,
        DescFlags::CAPS | DescFlags::WIDTH | DescFlags::HEIGHT,
        width,
        height,
        0,
        SurfaceCaps::OFFSCREENPLAIN,
    );
    sys.create_surface(DESC, OUT)
}

pub fn handle_of(sys: &Win32System<FlatMemory>, this: u32) -> Handle {
    sys.surface_for(this).expect("live surface")
}

/// Locks `this` and returns `lpSurface`.
pub fn lock(sys: &mut Win32System<FlatMemory>, this: u32) -> u32 {
    let size = sys.surface(handle_of(sys, this)).unwrap().desc_size();
    sys.mem.write_u32(LOCKED, size).unwrap();
    sys.lock(this, 0, LOCKED, 0, 0).unwrap();
    sys.mem.read_u32(LOCKED + desc::OFFSET_SURFACE).unwrap()
}

/// Writes a 4-entry `PALETTEENTRY` table at [`BUF`] and creates an 8-bit palette from it; the
/// remaining 252 entries are black.
pub fn create_palette(sys: &mut Win32System<FlatMemory>, colours: [[u8; 3]; 4]) -> u32 {
    sys.mem.fill(BUF, 256 * 4, 0).unwrap();
    for (i, [r, g, b]) in colours.into_iter().enumerate() {
        sys.mem.write_from(BUF + i as u32 * 4, &[r, g, b, 0]).unwrap();
    }
    sys.create_palette(0x44, BUF, OUT).unwrap()
}
