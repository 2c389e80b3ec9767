//! # Leader election test cases
//!
//! This subproject runs election scenarios against the in-memory backends.

#[macro_use]
extern crate log;
