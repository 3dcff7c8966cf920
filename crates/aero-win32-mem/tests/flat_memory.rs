use aero_win32_mem::{FlatMemory, GuestMemory};
use proptest::prelude::*;

const BASE: u32 = 0x0040_0000;
const LEN: u32 = 256;

proptest! {
    #[test]
    fn copy_within_matches_memmove(
        init in proptest::collection::vec(any::<u8>(), LEN as usize),
        src in 0u32..LEN,
        dst in 0u32..LEN,
        len in 0u32..LEN,
    ) {
        let len = len.min(LEN - src).min(LEN - dst);
        let mut mem = FlatMemory::new(BASE, LEN);
        mem.write_from(BASE, &init).unwrap();

        let mut expected = init.clone();
        expected.copy_within(src as usize..(src + len) as usize, dst as usize);

        mem.copy_within(BASE + src, BASE + dst, len as usize).unwrap();
        prop_assert_eq!(mem.as_slice(), expected.as_slice());
    }

    #[test]
    fn dword_writes_read_back_at_any_offset(offset in 0u32..(LEN - 4), value in any::<u32>()) {
        let mut mem = FlatMemory::new(BASE, LEN);
        mem.write_u32(BASE + offset, value).unwrap();
        prop_assert_eq!(mem.read_u32(BASE + offset).unwrap(), value);
        prop_assert_eq!(mem.read_u16(BASE + offset).unwrap(), value as u16);
        prop_assert_eq!(mem.read_u8(BASE + offset + 3).unwrap(), (value >> 24) as u8);
    }
}
