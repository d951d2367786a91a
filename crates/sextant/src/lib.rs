//! Sextant command line library.
//!
//! This library exposes the input loading and report rendering used by the
//! `sextant` binary, so they can be tested without spawning it.

pub mod input;
pub mod report;
