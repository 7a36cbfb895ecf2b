//! Tests for the command line tokenizer.

use kmon_core::error::KmonError;
use kmon_core::monitor::{tokenize, MAX_ARGS};

#[test]
fn test_tokens_borrow_the_line()
{
    let line = String::from("backtrace 3");
    let argv = tokenize(&line).unwrap();
    assert_eq!(argv.len(), 2);
    // Tokens point into the input, no copies.
    assert!(std::ptr::eq(argv[0].as_ptr(), line.as_ptr()));
}

#[test]
fn test_separator_runs_collapse()
{
    for (line, joined) in [
        ("help", "help"),
        ("  help  ", "help"),
        ("a  b\t\tc", "a b c"),
        ("\r\nkerninfo\r\n", "kerninfo"),
        ("x \t\r\n y", "x y"),
    ] {
        let argv = tokenize(line).unwrap();
        assert!(argv.iter().all(|token| !token.is_empty()));
        assert_eq!(argv.join(" "), joined, "line {line:?}");
    }
}

#[test]
fn test_empty_and_blank_lines()
{
    for line in ["", " ", "\t\t", "\r\n", " \t\r\n "] {
        let argv = tokenize(line).unwrap();
        assert!(argv.is_empty(), "line {line:?}");
        assert_eq!(argv.command(), None);
    }
}

#[test]
fn test_case_is_preserved()
{
    let argv = tokenize("HELP Help").unwrap();
    assert_eq!(&*argv, &["HELP", "Help"]);
}

#[test]
fn test_overflow_yields_no_tokens()
{
    let line = (0..MAX_ARGS).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
    match tokenize(&line) {
        Err(KmonError::TooManyArguments { max }) => assert_eq!(max, MAX_ARGS),
        other => panic!("expected overflow, got {other:?}"),
    }

    // Trailing separators do not count as tokens.
    let fits = format!("{} ", vec!["t"; MAX_ARGS - 1].join(" "));
    assert_eq!(tokenize(&fits).unwrap().len(), MAX_ARGS - 1);
}
