//! Case data models
//!
//! Case records have no fixed schema: every entity type carries its own set
//! of fields, so records are kept as ordered JSON maps.

pub mod entity;
pub mod record;

pub use entity::EntityKind;
pub use record::{EntityData, Record};
