//! Integration test crate for Wavecut.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on multiple wavecut crates to verify they work together.

#[cfg(test)]
mod support;

#[cfg(test)]
mod editing;

#[cfg(test)]
mod scheduling;

#[cfg(test)]
mod playback;
