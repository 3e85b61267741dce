//! Scoped edits and deletions of recurring series

pub mod ports;
pub mod series;

pub use ports::{IdGenerator, SequentialIdGenerator, UuidGenerator};
pub use series::{delete_series, update_series, SeriesMutator};
