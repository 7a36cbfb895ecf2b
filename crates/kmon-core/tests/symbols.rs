//! Tests for the symbol resolvers.

use kmon_core::error::KmonError;
use kmon_core::symbols::{DwarfResolver, NullResolver, SymbolEntry, SymbolResolver, SymbolTable};
use kmon_core::types::{Address, FunctionName};

const LISTING: &str = "\
f0100000 T _start
f010000c T entry
f0100040 t test_backtrace\t/src/kern/init.c:13
f01000a0 T i386_init\t/src/kern/init.c:24
f0100100 D edata_marker
f0100200 W weak_handler
";

#[test]
fn test_null_resolver()
{
    for address in [0, 1, 0xf010_0000, u64::MAX] {
        assert!(NullResolver.resolve(Address::new(address)).is_unknown());
    }
}

#[test]
fn test_table_lookup_respects_sizes()
{
    let table = SymbolTable::new(vec![
        SymbolEntry::new(Address::new(0x2000), FunctionName::new("second")).with_size(0x10),
        SymbolEntry::new(Address::new(0x1000), FunctionName::new("first")).with_size(0x100),
    ]);

    assert_eq!(table.len(), 2);
    assert_eq!(table.iter().next().unwrap().name.as_str(), "first");

    let info = table.resolve(Address::new(0x1050));
    assert_eq!(info.function.unwrap().as_str(), "first");
    assert_eq!(info.function_start, Some(Address::new(0x1000)));

    // Between the two functions.
    assert!(table.resolve(Address::new(0x1100)).is_unknown());
    // Before the first one.
    assert!(table.resolve(Address::new(0x0fff)).is_unknown());
    // Past the end of the last one.
    assert!(table.resolve(Address::new(0x2010)).is_unknown());
    assert!(table.resolve(Address::new(0x200f)).function.is_some());
}

#[test]
fn test_table_line_lookup()
{
    let table: SymbolTable = [SymbolEntry::new(Address::new(0x1000), FunctionName::new("f"))
        .with_file("f.c")
        .with_line(Address::new(0x1020), 12)
        .with_line(Address::new(0x1000), 10)
        .with_line(Address::new(0x1010), 11)]
    .into_iter()
    .collect();

    let line = |address: u64| table.resolve(Address::new(address)).line;
    assert_eq!(line(0x1000), Some(10));
    assert_eq!(line(0x100f), Some(10));
    assert_eq!(line(0x1010), Some(11));
    assert_eq!(line(0x1fff), Some(12));
    assert_eq!(table.resolve(Address::new(0x1000)).file.as_deref(), Some("f.c"));
}

#[test]
fn test_parse_nm_listing()
{
    let table = SymbolTable::parse_nm(LISTING).unwrap();
    // The data symbol is skipped.
    assert_eq!(table.len(), 5);

    let info = table.resolve(Address::new(0xf010_0050));
    assert_eq!(info.function.as_ref().unwrap().as_str(), "test_backtrace");
    assert_eq!(info.file.as_deref(), Some("/src/kern/init.c"));
    assert_eq!(info.line, Some(13));
    assert_eq!(info.offset_of(Address::new(0xf010_0050)), Some(0x10));

    // Sizes run to the next text symbol, so the gap left by the data symbol
    // still belongs to i386_init.
    let info = table.resolve(Address::new(0xf010_0150));
    assert_eq!(info.function.unwrap().as_str(), "i386_init");

    // The last symbol is unbounded.
    let info = table.resolve(Address::new(0xf020_0000));
    assert_eq!(info.function.unwrap().as_str(), "weak_handler");
    assert_eq!(info.file, None);
}

#[test]
fn test_parse_nm_demangles_rust_names()
{
    let table = SymbolTable::parse_nm("0000000000401000 T _ZN4kmon4main17h0123456789abcdefE\n").unwrap();
    let info = table.resolve(Address::new(0x401004));
    assert_eq!(info.function.unwrap().as_str(), "kmon::main");
}

#[test]
fn test_parse_nm_reports_bad_lines()
{
    let err = SymbolTable::parse_nm("f0100000 T entry\nnothex T broken\n").unwrap_err();
    match err {
        KmonError::InvalidArgument(message) => assert!(message.contains("line 2"), "{message}"),
        other => panic!("unexpected error {other:?}"),
    }

    // Short and blank lines are ignored rather than rejected.
    let table = SymbolTable::parse_nm("\nf0100000\n  \nf0100000 T entry\n").unwrap();
    assert_eq!(table.len(), 1);
}

#[test]
fn test_parse_nm_aliases_share_a_start()
{
    let table = SymbolTable::parse_nm("1000 T alias_a\n1000 T alias_b\n1100 T next\n").unwrap();
    let info = table.resolve(Address::new(0x1010));
    let name = info.function.unwrap();
    assert!(name.as_str() == "alias_a" || name.as_str() == "alias_b");
}

#[test]
fn test_dwarf_load_missing_file()
{
    let result = DwarfResolver::load("/nonexistent/kmon/kernel.elf", 0);
    assert!(matches!(result, Err(KmonError::Io(_))));
}

#[test]
fn test_dwarf_load_rejects_non_elf()
{
    let path = std::env::temp_dir().join(format!("kmon-not-elf-{}", std::process::id()));
    std::fs::write(&path, b"definitely not an object file").unwrap();
    let result = DwarfResolver::load(&path, 0);
    std::fs::remove_file(&path).ok();
    assert!(matches!(result, Err(KmonError::ImageParse(_))));
}

#[cfg(target_os = "linux")]
#[inline(never)]
fn kmon_resolver_marker() -> u64
{
    std::hint::black_box(42)
}

#[cfg(target_os = "linux")]
#[test]
fn test_dwarf_resolves_own_function()
{
    assert_eq!(kmon_resolver_marker(), 42);

    let resolver = DwarfResolver::current_executable().unwrap();
    let start = Address::new(kmon_resolver_marker as usize as u64);
    let inside = start + 1;

    assert!(resolver.contains(inside));
    let info = resolver.resolve(inside);
    let name = info.function.as_ref().expect("marker has a symbol");
    assert!(name.as_str().contains("kmon_resolver_marker"), "{name}");
    assert_eq!(info.function_start, Some(start));
    assert_eq!(info.offset_of(inside), Some(1));
    assert!(
        info.file.as_deref().is_some_and(|file| file.ends_with("symbols.rs")),
        "{info:?}"
    );
    assert!(info.line.is_some());
}

#[cfg(target_os = "linux")]
#[test]
fn test_dwarf_outside_image_is_unknown()
{
    let resolver = DwarfResolver::current_executable().unwrap();
    assert!(resolver.resolve(Address::ZERO).is_unknown());
    assert!(resolver.resolve(Address::new(u64::MAX)).is_unknown());
}
