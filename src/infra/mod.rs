//! Infrastructure layer: adapters for config, storage, and the terminal.

pub mod config;
pub mod contracts;
pub mod error;
pub mod json_store;
pub mod logging;
pub mod storage_layout;
pub mod stubs;
