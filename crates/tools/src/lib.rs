//! Small building blocks shared by the parsing and rewriting crates.

pub mod mem;
pub mod utf8;
