//! Test harness for the `sextant` command line.
//!
//! The regression tests in [`cli`] run the built binary against the shared
//! fixtures in `tests/fixtures/` at the workspace root.

#[cfg(test)]
pub mod cli;
