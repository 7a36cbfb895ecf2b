//! # kmon-core
//!
//! Command dispatch, frame-pointer unwinding and symbol resolution for the
//! kmon kernel monitor.
//!
//! This crate provides:
//! - A line tokenizer and an ordered command registry
//! - The monitor loop with pluggable line sources
//! - A bounded frame-pointer unwinder over checked memory accessors
//! - Symbol resolvers (embedded tables, `nm` listings, ELF + DWARF)
//! - The backtrace and `kerninfo` formatters
//!
//! ## Why unsafe code is needed
//!
//! Walking the live stack means reading the frame pointer register and
//! dereferencing raw stack addresses. Both are confined to [`arch`] and
//! [`memory::LiveStack`], which only read words inside the current thread's
//! stack mapping.

#![allow(unsafe_code)] // Register access and live stack reads

pub mod arch;
pub mod backtrace;
pub mod error;
pub mod layout;
pub mod memory;
pub mod monitor;
pub mod prelude;
pub mod symbols;
pub mod types;
pub mod unwind;

pub use error::{KmonError, KmonResult};
pub use monitor::{Monitor, MonitorConfig, Registry, Status, Target};
