//! Tests for the checked memory accessors.

use kmon_core::error::KmonError;
use kmon_core::memory::{MemoryAccess, MemorySnapshot};
use kmon_core::types::Address;

#[test]
fn test_snapshot_reads_little_endian_words()
{
    let snapshot = MemorySnapshot::new(Address::new(0x1000), vec![1, 0, 0, 0, 0, 0, 0, 0x80]);
    assert_eq!(snapshot.read_u64(Address::new(0x1000)).unwrap(), 0x8000_0000_0000_0001);
    assert_eq!(snapshot.len(), 8);
    assert_eq!(snapshot.end(), Address::new(0x1008));
}

#[test]
fn test_snapshot_refuses_bad_reads()
{
    let snapshot = MemorySnapshot::from_words(Address::new(0x1000), &[1, 2]);

    assert!(matches!(
        snapshot.read_u64(Address::new(0x0ff8)),
        Err(KmonError::OutOfRange { .. })
    ));
    assert!(matches!(
        snapshot.read_u64(Address::new(0x1010)),
        Err(KmonError::OutOfRange { .. })
    ));
    assert!(matches!(
        snapshot.read_u64(Address::new(0x1004)),
        Err(KmonError::Unaligned { .. })
    ));
    assert!(matches!(
        snapshot.read_u64(Address::new(u64::MAX - 7)),
        Err(KmonError::OutOfRange { .. })
    ));

    let empty = MemorySnapshot::new(Address::new(0x1000), Vec::new());
    assert!(empty.is_empty());
    assert!(empty.read_u64(Address::new(0x1000)).is_err());
}

#[test]
fn test_snapshot_load_from_file()
{
    let path = std::env::temp_dir().join(format!("kmon-stack-{}.bin", std::process::id()));
    let words: Vec<u8> = [0xf011_0000u64, 0xf010_0068].iter().flat_map(|w| w.to_le_bytes()).collect();
    std::fs::write(&path, &words).unwrap();

    let snapshot = MemorySnapshot::load(&path, Address::new(0xf010_ff00));
    std::fs::remove_file(&path).ok();
    let snapshot = snapshot.unwrap();

    assert_eq!(snapshot.base(), Address::new(0xf010_ff00));
    assert_eq!(snapshot.read_u64(Address::new(0xf010_ff08)).unwrap(), 0xf010_0068);
}

#[test]
fn test_snapshot_load_missing_file()
{
    let result = MemorySnapshot::load("/nonexistent/kmon/stack.bin", Address::ZERO);
    assert!(matches!(result, Err(KmonError::Io(_))));
}

#[cfg(target_os = "linux")]
#[test]
fn test_live_stack_bounds()
{
    use kmon_core::memory::LiveStack;

    let local = 0x5eed_u64;
    let here = Address::new(std::ptr::addr_of!(local) as u64 & !7);

    let stack = LiveStack::containing(here).unwrap();
    assert_eq!(stack.range().start, here);
    assert!(stack.range().end > here);
    assert!(stack.read_u64(here).is_ok());
    assert!(matches!(
        stack.read_u64(Address::new(here.value() - 8)),
        Err(KmonError::OutOfRange { .. })
    ));

    assert!(LiveStack::containing(Address::new(8)).is_err());
}
