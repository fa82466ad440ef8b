//! Use case layer: the chat engine and the workflows it composes.

pub mod access;
pub mod engine;
pub mod ledger;
pub mod login_prompt;
pub mod rooms;
