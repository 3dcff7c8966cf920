use std::collections::BTreeMap;

use tracing::debug;

use crate::guest::{GuestMemory, GuestMemoryError, GuestMemoryResult};

/// Per-process heap the Win32 layer carves guest objects and system-memory surfaces out of.
pub trait ProcessHeap {
    /// Allocates `size` bytes and returns the guest address. When `zero_fill` is set the block is
    /// cleared through `mem` before it is handed out.
    fn alloc(
        &mut self,
        mem: &mut dyn GuestMemory,
        size: u32,
        zero_fill: bool,
    ) -> GuestMemoryResult<u32>;
}

/// Maps ranges of the display framebuffer aperture into the guest address space.
///
/// Unlike heap memory, a mapping may be what the user is looking at, so it is kept separate from
/// [`ProcessHeap`].
pub trait VideoMemory {
    fn map(&mut self, size: u32) -> GuestMemoryResult<u32>;
    fn unmap(&mut self, addr: u32) -> GuestMemoryResult<()>;
}

const HEAP_ALIGN: u32 = 16;

fn align_up(value: u32, align: u32) -> Option<u32> {
    value.checked_add(align - 1).map(|v| v & !(align - 1))
}

/// Monotonic bump allocator over `[base, base + size)`. Blocks are never reused.
#[derive(Debug, Clone)]
pub struct BumpHeap {
    base: u32,
    end: u32,
    next: u32,
}

impl BumpHeap {
    pub fn new(base: u32, size: u32) -> Self {
        Self {
            base,
            end: base.saturating_add(size),
            next: base,
        }
    }

    /// Bytes handed out so far, including alignment padding.
    pub fn used(&self) -> u32 {
        self.next - self.base
    }
}

impl ProcessHeap for BumpHeap {
    fn alloc(
        &mut self,
        mem: &mut dyn GuestMemory,
        size: u32,
        zero_fill: bool,
    ) -> GuestMemoryResult<u32> {
        let exhausted = GuestMemoryError::Exhausted {
            region: "process heap",
            requested: size,
            available: self.end - self.next,
        };
        let addr = self.next;
        let next = addr
            .checked_add(size.max(1))
            .and_then(|end| align_up(end, HEAP_ALIGN))
            .filter(|end| *end <= self.end)
            .ok_or(exhausted)?;
        if zero_fill {
            mem.fill(addr, size as usize, 0)?;
        }
        self.next = next;
        Ok(addr)
    }
}

/// Framebuffer aperture that hands out page-aligned mappings.
///
/// Unmapping the most recent mapping returns its space to the window; older holes are not
/// reused.
#[derive(Debug, Clone)]
pub struct VideoRamWindow {
    base: u32,
    end: u32,
    next: u32,
    mapped: BTreeMap<u32, u32>,
}

impl VideoRamWindow {
    const PAGE: u32 = 4096;

    pub fn new(base: u32, size: u32) -> Self {
        Self {
            base,
            end: base.saturating_add(size),
            next: base,
            mapped: BTreeMap::new(),
        }
    }

    pub fn is_mapped(&self, addr: u32) -> bool {
        self.mapped.contains_key(&addr)
    }

    pub fn mapping_count(&self) -> usize {
        self.mapped.len()
    }

    pub fn base(&self) -> u32 {
        self.base
    }
}

impl VideoMemory for VideoRamWindow {
    fn map(&mut self, size: u32) -> GuestMemoryResult<u32> {
        let addr = self.next;
        let next = addr
            .checked_add(size.max(1))
            .and_then(|end| align_up(end, Self::PAGE))
            .filter(|end| *end <= self.end)
            .ok_or(GuestMemoryError::Exhausted {
                region: "video memory",
                requested: size,
                available: self.end - self.next,
            })?;
        self.next = next;
        self.mapped.insert(addr, next - addr);
        debug!(addr = format_args!("0x{addr:08x}"), size, "mapped video memory");
        Ok(addr)
    }

    fn unmap(&mut self, addr: u32) -> GuestMemoryResult<()> {
        let len = self
            .mapped
            .remove(&addr)
            .ok_or(GuestMemoryError::UnknownAllocation {
                region: "video memory",
                addr,
            })?;
        if addr + len == self.next {
            self.next = addr;
        }
        debug!(addr = format_args!("0x{addr:08x}"), "unmapped video memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatMemory;

    #[test]
    fn heap_blocks_are_aligned_disjoint_and_zeroed() {
        let mut mem = FlatMemory::new(0x10_0000, 0x1000);
        mem.fill(0x10_0000, 0x1000, 0xCC).unwrap();
        let mut heap = BumpHeap::new(0x10_0000, 0x1000);

        let a = heap.alloc(&mut mem, 5, true).unwrap();
        let b = heap.alloc(&mut mem, 40, false).unwrap();
        assert_eq!(a, 0x10_0000);
        assert_eq!(b % HEAP_ALIGN, 0);
        assert!(b >= a + 5);

        let mut buf = [0xFFu8; 5];
        mem.read_into(a, &mut buf).unwrap();
        assert_eq!(buf, [0; 5]);
        assert_eq!(mem.read_u8(b).unwrap(), 0xCC, "zero_fill=false must not touch memory");
    }

    #[test]
    fn heap_exhaustion_is_an_error() {
        let mut mem = FlatMemory::new(0, 0x100);
        let mut heap = BumpHeap::new(0, 0x100);
        heap.alloc(&mut mem, 0xF0, true).unwrap();
        let err = heap.alloc(&mut mem, 0x20, true).unwrap_err();
        assert!(matches!(err, GuestMemoryError::Exhausted { .. }));
        assert_eq!(heap.used(), 0xF0);
    }

    #[test]
    fn video_window_maps_pages_and_reclaims_tail() {
        let mut vram = VideoRamWindow::new(0xE000_0000, 0x10_0000);
        let a = vram.map(100).unwrap();
        let b = vram.map(0x1000).unwrap();
        assert_eq!(a, 0xE000_0000);
        assert_eq!(b, 0xE000_1000);

        vram.unmap(b).unwrap();
        assert!(!vram.is_mapped(b));
        assert_eq!(vram.map(0x2000).unwrap(), b, "tail mapping space is reused");

        assert!(matches!(
            vram.unmap(0x1234),
            Err(GuestMemoryError::UnknownAllocation { .. })
        ));
        assert_eq!(vram.mapping_count(), 2);
    }
}
