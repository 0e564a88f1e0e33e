//! Command implementations for the Chirp CLI

pub mod check;
pub mod serve;
