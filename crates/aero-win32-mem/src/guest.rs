use thiserror::Error;

/// Errors returned by guest memory backends and allocators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuestMemoryError {
    /// The requested address range is not backed by guest memory.
    #[error("guest memory access out of range: addr=0x{addr:08x} len={len}")]
    OutOfRange { addr: u32, len: usize },
    /// An allocator ran out of address space.
    #[error("{region} exhausted: requested {requested} bytes, {available} available")]
    Exhausted {
        region: &'static str,
        requested: u32,
        available: u32,
    },
    /// An address handed back to an allocator was never issued by it.
    #[error("{region}: 0x{addr:08x} is not a live allocation")]
    UnknownAllocation { region: &'static str, addr: u32 },
}

pub type GuestMemoryResult<T> = Result<T, GuestMemoryError>;

/// Guest *linear* memory as seen by a 32-bit process.
///
/// Multi-byte accessors are little-endian and unaligned accesses are allowed, matching what x86
/// code expects.
pub trait GuestMemory {
    /// Reads bytes starting at `addr` into `dst`.
    fn read_into(&self, addr: u32, dst: &mut [u8]) -> GuestMemoryResult<()>;

    /// Writes `src` starting at `addr`.
    fn write_from(&mut self, addr: u32, src: &[u8]) -> GuestMemoryResult<()>;

    fn read_u8(&self, addr: u32) -> GuestMemoryResult<u8> {
        let mut buf = [0u8; 1];
        self.read_into(addr, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&self, addr: u32) -> GuestMemoryResult<u16> {
        let mut buf = [0u8; 2];
        self.read_into(addr, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&self, addr: u32) -> GuestMemoryResult<u32> {
        let mut buf = [0u8; 4];
        self.read_into(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn write_u8(&mut self, addr: u32, value: u8) -> GuestMemoryResult<()> {
        self.write_from(addr, &[value])
    }

    fn write_u16(&mut self, addr: u32, value: u16) -> GuestMemoryResult<()> {
        self.write_from(addr, &value.to_le_bytes())
    }

    fn write_u32(&mut self, addr: u32, value: u32) -> GuestMemoryResult<()> {
        self.write_from(addr, &value.to_le_bytes())
    }

    /// Sets `len` bytes starting at `addr` to `value`.
    fn fill(&mut self, addr: u32, len: usize, value: u8) -> GuestMemoryResult<()> {
        const CHUNK: usize = 4096;
        let block = [value; CHUNK];
        let mut done = 0usize;
        while done < len {
            let take = CHUNK.min(len - done);
            let at = offset_addr(addr, done, len)?;
            self.write_from(at, &block[..take])?;
            done += take;
        }
        Ok(())
    }

    /// Copies `len` bytes from `src` to `dst`. Overlapping ranges behave like `memmove`.
    fn copy_within(&mut self, src: u32, dst: u32, len: usize) -> GuestMemoryResult<()> {
        let mut tmp = vec![0u8; len];
        self.read_into(src, &mut tmp)?;
        self.write_from(dst, &tmp)
    }
}

fn offset_addr(base: u32, offset: usize, len: usize) -> GuestMemoryResult<u32> {
    u32::try_from(offset)
        .ok()
        .and_then(|off| base.checked_add(off))
        .ok_or(GuestMemoryError::OutOfRange { addr: base, len })
}

/// A contiguous window `[base, base + len)` of guest linear memory backed by a host buffer.
///
/// Accesses outside the window fail with [`GuestMemoryError::OutOfRange`]; nothing wraps around
/// the top of the 32-bit address space.
#[derive(Debug, Clone)]
pub struct FlatMemory {
    base: u32,
    data: Box<[u8]>,
}

impl FlatMemory {
    pub fn new(base: u32, len: u32) -> Self {
        Self {
            base,
            data: vec![0u8; len as usize].into_boxed_slice(),
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Host view of the window, mostly useful to tests and debuggers.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn range(&self, addr: u32, len: usize) -> GuestMemoryResult<(usize, usize)> {
        let err = GuestMemoryError::OutOfRange { addr, len };
        let start = addr.checked_sub(self.base).ok_or(err.clone())? as usize;
        let end = start.checked_add(len).ok_or(err.clone())?;
        if end > self.data.len() {
            return Err(err);
        }
        Ok((start, end))
    }
}

impl GuestMemory for FlatMemory {
    fn read_into(&self, addr: u32, dst: &mut [u8]) -> GuestMemoryResult<()> {
        let (start, end) = self.range(addr, dst.len())?;
        dst.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn write_from(&mut self, addr: u32, src: &[u8]) -> GuestMemoryResult<()> {
        let (start, end) = self.range(addr, src.len())?;
        self.data[start..end].copy_from_slice(src);
        Ok(())
    }

    fn fill(&mut self, addr: u32, len: usize, value: u8) -> GuestMemoryResult<()> {
        let (start, end) = self.range(addr, len)?;
        self.data[start..end].fill(value);
        Ok(())
    }

    fn copy_within(&mut self, src: u32, dst: u32, len: usize) -> GuestMemoryResult<()> {
        let (src_start, src_end) = self.range(src, len)?;
        let (dst_start, _) = self.range(dst, len)?;
        self.data.copy_within(src_start..src_end, dst_start);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_primitives_are_little_endian() {
        let mut mem = FlatMemory::new(0x1000, 64);

        mem.write_u16(0x1002, 0x1122).unwrap();
        mem.write_u32(0x1004, 0x3344_5566).unwrap();

        assert_eq!(mem.read_u16(0x1002).unwrap(), 0x1122);
        assert_eq!(mem.read_u32(0x1004).unwrap(), 0x3344_5566);
        assert_eq!(mem.read_u8(0x1004).unwrap(), 0x66);
        assert_eq!(&mem.as_slice()[4..8], &[0x66, 0x55, 0x44, 0x33]);
    }

    #[test]
    fn unaligned_dword_access() {
        let mut mem = FlatMemory::new(0, 16);
        mem.write_u32(1, 0xdead_beef).unwrap();
        assert_eq!(mem.read_u32(1).unwrap(), 0xdead_beef);
    }

    #[test]
    fn accesses_outside_the_window_fail_without_panicking() {
        let mut mem = FlatMemory::new(0x1000, 16);

        assert!(matches!(
            mem.read_u32(0x0ffe),
            Err(GuestMemoryError::OutOfRange { .. })
        ));
        assert!(matches!(
            mem.read_u32(0x100e),
            Err(GuestMemoryError::OutOfRange { .. })
        ));
        assert!(matches!(
            mem.write_u8(0x1010, 0),
            Err(GuestMemoryError::OutOfRange { .. })
        ));
        assert!(matches!(
            mem.read_into(u32::MAX, &mut [0u8; 2]),
            Err(GuestMemoryError::OutOfRange { .. })
        ));
    }

    #[test]
    fn fill_and_overlapping_copy() {
        let mut mem = FlatMemory::new(0, 16);
        mem.write_from(0, &[1, 2, 3, 4, 5, 6]).unwrap();
        mem.copy_within(0, 2, 4).unwrap();
        assert_eq!(&mem.as_slice()[..6], &[1, 2, 1, 2, 3, 4]);

        mem.fill(8, 8, 0xAA).unwrap();
        assert!(mem.as_slice()[8..].iter().all(|b| *b == 0xAA));
        assert!(mem.fill(12, 8, 0).is_err());
    }

    /// The provided trait methods must behave the same as the `FlatMemory` overrides.
    struct ByteAtATime(FlatMemory);

    impl GuestMemory for ByteAtATime {
        fn read_into(&self, addr: u32, dst: &mut [u8]) -> GuestMemoryResult<()> {
            self.0.read_into(addr, dst)
        }

        fn write_from(&mut self, addr: u32, src: &[u8]) -> GuestMemoryResult<()> {
            self.0.write_from(addr, src)
        }
    }

    #[test]
    fn default_fill_and_copy_match_overrides() {
        let mut mem = ByteAtATime(FlatMemory::new(0, 10_000));
        mem.fill(10, 9_000, 0x5A).unwrap();
        assert!(mem.0.as_slice()[10..9_010].iter().all(|b| *b == 0x5A));
        assert_eq!(mem.0.as_slice()[9_010], 0);

        mem.write_from(0, &[9, 8, 7]).unwrap();
        mem.copy_within(0, 1, 3).unwrap();
        assert_eq!(&mem.0.as_slice()[..4], &[9, 9, 8, 7]);
    }
}
