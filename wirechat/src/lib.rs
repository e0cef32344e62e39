//! `WireChat`: command-line chat protocol client library.

pub mod client;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod queue;
pub mod render;
pub mod roster;
pub mod session;
pub mod store;
