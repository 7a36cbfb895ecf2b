//! Tests for the plain data types.

use kmon_core::types::{Address, FunctionName, SymbolInfo, TrapFrame, UNKNOWN};
use kmon_core::KmonError;

#[test]
fn test_address_parse_hex_and_decimal()
{
    assert_eq!("0x1000".parse::<Address>().unwrap(), Address::new(0x1000));
    assert_eq!("0XFFFF".parse::<Address>().unwrap(), Address::new(0xffff));
    assert_eq!("4096".parse::<Address>().unwrap(), Address::new(4096));
    assert_eq!("0xffff_8000_0000_0000".parse::<Address>().unwrap(), Address::new(0xffff_8000_0000_0000));
}

#[test]
fn test_address_parse_rejects_garbage()
{
    assert!(matches!("zz".parse::<Address>(), Err(KmonError::InvalidArgument(_))));
    assert!("0x".parse::<Address>().is_err());
    assert!("0x1_0000_0000_0000_0000".parse::<Address>().is_err());
}

#[test]
fn test_address_display()
{
    assert_eq!(Address::new(0x1000).to_string(), "0x0000000000001000");
    assert_eq!(format!("{:016x}", Address::new(0xdead)), "000000000000dead");
}

#[test]
fn test_address_word_arithmetic()
{
    let fp = Address::new(0x1000);
    assert_eq!(fp.word(0), Some(fp));
    assert_eq!(fp.word(1), Some(Address::new(0x1008)));
    assert_eq!(fp.word(6), Some(Address::new(0x1030)));
    assert_eq!(Address::new(u64::MAX - 7).word(1), None);
    assert!(fp.is_word_aligned());
    assert!(!Address::new(0x1004).is_word_aligned());
    assert_eq!(Address::new(0x1010).offset_from(fp), Some(0x10));
    assert_eq!(fp.offset_from(Address::new(0x1010)), None);
}

#[test]
fn test_function_name_lengths()
{
    let stab = FunctionName::stab("mon_backtrace:F(0,1)");
    assert_eq!(stab.as_str(), "mon_backtrace");
    assert_eq!(stab.len(), 13);
    assert_eq!(stab.raw(), "mon_backtrace:F(0,1)");

    let plain = FunctionName::new("i386_init");
    assert_eq!(plain.as_str(), "i386_init");

    let clipped = FunctionName::with_len("entry", 100);
    assert_eq!(clipped.as_str(), "entry");

    // Never split a multi-byte character.
    let utf8 = FunctionName::with_len("héllo", 2);
    assert_eq!(utf8.as_str(), "h");

    assert!(FunctionName::with_len("x", 0).is_empty());
}

#[test]
fn test_symbol_info_unknown_and_offset()
{
    let unknown = SymbolInfo::unknown();
    assert!(unknown.is_unknown());
    assert_eq!(unknown.offset_of(Address::new(0x10)), None);

    let info = SymbolInfo {
        function_start: Some(Address::new(0x4000)),
        ..SymbolInfo::unknown()
    };
    assert!(!info.is_unknown());
    assert_eq!(info.offset_of(Address::new(0x4042)), Some(0x42));
    assert_eq!(info.offset_of(Address::new(0x3fff)), None);
    assert_eq!(UNKNOWN, "<unknown>");
}

#[test]
fn test_trapframe_display()
{
    let tf = TrapFrame {
        pc: Address::new(0x0040_1000),
        sp: Address::new(0x7fff_0000),
        fp: Address::new(0x7fff_0040),
        trap: Some(3),
    };
    let text = tf.to_string();
    assert!(text.starts_with("TRAP frame\n"));
    assert!(text.contains("  pc   0000000000401000\n"));
    assert!(text.contains("  fp   000000007fff0040\n"));
    assert!(text.ends_with("  trap 0x00000003"));

    let no_trap = TrapFrame { trap: None, ..tf };
    assert!(no_trap.to_string().ends_with("  trap <none>"));
}
