pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod runner;
pub mod util;
