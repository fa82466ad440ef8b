//! Domain layer: core entities and business rules.

pub mod admin;
pub mod context;
pub mod identity;
pub mod message;
pub mod room;
