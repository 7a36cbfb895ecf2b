//! Tests for the kernel layout report.

use kmon_core::error::KmonError;
use kmon_core::layout::KernelLayout;
use kmon_core::types::Address;

fn jos_layout() -> KernelLayout
{
    KernelLayout {
        start: Address::new(0x0010_000c),
        entry: Address::new(0xf010_000c),
        etext: Address::new(0xf010_1a75),
        edata: Address::new(0xf011_2300),
        end: Address::new(0xf011_2960),
        kernbase: Address::new(0xf000_0000),
    }
}

#[test]
fn test_report_format()
{
    let mut out = Vec::new();
    jos_layout().write_report(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(
        text,
        "Special kernel symbols:\n\
         \x20 _start                  000000000010000c (phys)\n\
         \x20 entry  00000000f010000c (virt)  000000000010000c (phys)\n\
         \x20 etext  00000000f0101a75 (virt)  0000000000101a75 (phys)\n\
         \x20 edata  00000000f0112300 (virt)  0000000000112300 (phys)\n\
         \x20 end    00000000f0112960 (virt)  0000000000112960 (phys)\n\
         Kernel executable memory footprint: 75KB\n"
    );
}

#[test]
fn test_footprint_rounds_up()
{
    let mut layout = jos_layout();
    layout.end = layout.entry + 1024;
    assert_eq!(layout.footprint_kib(), 1);
    layout.end = layout.entry + 1025;
    assert_eq!(layout.footprint_kib(), 2);
    layout.end = layout.entry;
    assert_eq!(layout.footprint_kib(), 0);
    // A nonsensical layout does not underflow.
    layout.end = layout.entry - 1;
    assert_eq!(layout.footprint_kib(), 0);
}

#[test]
fn test_from_elf_rejects_garbage()
{
    let result = KernelLayout::from_elf(b"\x7fELF but not really", 0, Address::ZERO);
    assert!(matches!(result, Err(KmonError::ImageParse(_))));
}

#[test]
fn test_from_elf_own_executable()
{
    let path = std::env::current_exe().unwrap();
    let data = std::fs::read(path).unwrap();
    let layout = KernelLayout::from_elf(&data, 0, Address::ZERO).unwrap();

    assert!(layout.entry < layout.end, "{layout:?}");
    assert!(layout.start <= layout.end, "{layout:?}");
    assert!(layout.footprint_kib() > 0);

    let biased = KernelLayout::from_elf(&data, 0x1000, Address::ZERO).unwrap();
    assert_eq!(biased.entry, layout.entry + 0x1000);
    assert_eq!(biased.end, layout.end + 0x1000);
}
