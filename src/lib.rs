pub mod adapter;
pub mod config;
pub mod driver;
pub mod engine;
pub mod logging;
