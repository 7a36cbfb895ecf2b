//! Tests for backtrace formatting.

use kmon_core::backtrace::{render_symbol, write_backtrace, write_frame};
use kmon_core::error::KmonError;
use kmon_core::memory::MemorySnapshot;
use kmon_core::symbols::{NullResolver, SymbolEntry, SymbolTable};
use kmon_core::types::{Address, FrameRecord, FunctionName, SymbolInfo};
use kmon_core::unwind::{FramePointerUnwinder, UnwindLimits};

fn frame(fp: u64, ra: u64) -> FrameRecord
{
    FrameRecord {
        frame_pointer: Address::new(fp),
        return_address: Address::new(ra),
        args: [1, 2, 3, 4, 5],
    }
}

fn monitor_table() -> SymbolTable
{
    SymbolTable::new(vec![
        SymbolEntry::new(Address::new(0x4000), FunctionName::stab("mon_backtrace:F(0,1)"))
            .with_size(0x100)
            .with_file("kern/monitor.c")
            .with_line(Address::new(0x4000), 61)
            .with_line(Address::new(0x4040), 70),
        SymbolEntry::new(Address::new(0x5000), FunctionName::new("i386_init"))
            .with_size(0x80)
            .with_file("kern/init.c")
            .with_line(Address::new(0x5000), 24),
    ])
}

fn render(frames: Vec<Result<FrameRecord, KmonError>>) -> String
{
    let mut out = Vec::new();
    write_backtrace(&mut out, frames, &monitor_table()).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_frame_line_format()
{
    let mut out = Vec::new();
    write_frame(&mut out, &frame(0x7fff_0040, 0x4042)).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "  fp 000000007fff0040  ra 0000000000004042  args 0000000000000001 0000000000000002 \
         0000000000000003 0000000000000004 0000000000000005\n"
    );
}

#[test]
fn test_full_symbol_rendering()
{
    let text = render(vec![Ok(frame(0x7fff_0040, 0x4042)), Ok(frame(0x7fff_0080, 0x5010))]);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "Stack backtrace:");
    assert!(lines[1].starts_with("  fp 000000007fff0040  ra 0000000000004042"));
    assert_eq!(lines[2], "         kern/monitor.c:70: mon_backtrace+66");
    assert!(lines[3].starts_with("  fp 000000007fff0080  ra 0000000000005010"));
    assert_eq!(lines[4], "         kern/init.c:24: i386_init+16");
}

#[test]
fn test_unknown_fields()
{
    let text = render(vec![Ok(frame(0x7fff_0040, 0x9999))]);
    assert_eq!(
        text.lines().nth(2),
        Some("         <unknown>:<unknown>: <unknown>+<unknown>")
    );

    let mut out = Vec::new();
    write_backtrace(&mut out, [Ok(frame(0x10, 0x20))], &NullResolver).unwrap();
    assert!(String::from_utf8(out).unwrap().ends_with("<unknown>:<unknown>: <unknown>+<unknown>\n"));
}

#[test]
fn test_partial_info()
{
    let info = SymbolInfo {
        function: Some(FunctionName::new("entry")),
        function_start: Some(Address::new(0x1000)),
        ..SymbolInfo::unknown()
    };
    assert_eq!(render_symbol(&info, Address::new(0x100c)), "<unknown>:<unknown>: entry+12");

    let info = SymbolInfo {
        file: Some("kern/entry.S".into()),
        line: Some(47),
        ..SymbolInfo::unknown()
    };
    assert_eq!(
        render_symbol(&info, Address::new(0x100c)),
        "kern/entry.S:47: <unknown>+<unknown>"
    );
}

#[test]
fn test_error_stops_listing()
{
    let text = render(vec![
        Ok(frame(0x7fff_0040, 0x4042)),
        Err(KmonError::FrameLimitExceeded { limit: 1 }),
        Ok(frame(0x7fff_0080, 0x5010)),
    ]);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[3], "  <backtrace stopped: frame chain exceeds 1 frames>");
}

#[test]
fn test_empty_backtrace_is_just_the_header()
{
    assert_eq!(render(Vec::new()), "Stack backtrace:\n");
}

#[test]
fn test_unwinder_into_formatter()
{
    let base = 0x7fff_0000u64;
    let words = [base + 0x40, 0x4042, 1, 2, 3, 4, 5, 0, 0, 0x5010, 6, 7, 8, 9, 10];
    let stack = MemorySnapshot::from_words(Address::new(base), &words);
    let unwinder = FramePointerUnwinder::new(&stack, UnwindLimits::default());

    let mut out = Vec::new();
    write_backtrace(&mut out, unwinder.frames(Address::new(base)), &monitor_table()).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("         kern/monitor.c:70: mon_backtrace+66\n"));
    assert!(text.contains("  fp 000000007fff0040  ra 0000000000005010  args 0000000000000006"));
    assert!(text.ends_with("         kern/init.c:24: i386_init+16\n"));
}
