//! Statistics source for the Linux `/proc` filesystem.
//!
//! This module provides parsers for the `/proc` files the collector reads and
//! [`ProcfsStats`], the [`SystemStats`](crate::collector::SystemStats)
//! implementation built on them.

pub mod parser;
pub mod system;

pub use system::ProcfsStats;
