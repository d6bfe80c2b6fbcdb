//! Conditional breakpoints for a 68000 + DSP56001 emulator debugger.

#![warn(missing_docs)]

pub mod breakpoint;
pub mod command;
pub mod cond;
pub mod config;
pub mod debugger;
pub mod eval;
pub mod machine;
pub mod number;
pub mod symbols;
pub mod vars;
