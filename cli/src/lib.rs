//! puzzler-cli library: modules exposed for the binary and unit tests.

pub mod app;
pub mod commands;
pub mod render;
