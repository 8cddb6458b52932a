//! Integration test crate for Ambimix.
//!
//! This crate exists solely to hold cross-crate integration tests.

#[cfg(test)]
mod support;

#[cfg(test)]
mod modes;

#[cfg(test)]
mod presets;

#[cfg(test)]
mod audio;
