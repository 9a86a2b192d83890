pub mod app;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod identity;
pub mod label;
pub mod model;
pub mod monitor;
pub mod presenter;
pub mod schedule;
