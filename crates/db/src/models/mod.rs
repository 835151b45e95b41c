//! Database row structs and their mappings into engine-side views.

pub mod quiz;
pub mod reference;
