//! Port interfaces for series mutation

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Trait for minting ids of new overrides and split-off series
pub trait IdGenerator: Send + Sync {
    /// Produce an id not used by any existing event
    fn next_id(&self) -> String;
}

/// Time-ordered UUID v7 ids
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// Deterministic `${prefix}-${n}` ids, handy for reproducible output
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), next: AtomicU64::new(1) }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIdGenerator::new("evt");
        assert_eq!(ids.next_id(), "evt-1");
        assert_eq!(ids.next_id(), "evt-2");
    }

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(UuidGenerator.next_id(), UuidGenerator.next_id());
    }

    #[test]
    fn uuid_ids_are_version_seven() {
        let id = Uuid::parse_str(&UuidGenerator.next_id()).unwrap();
        assert_eq!(id.get_version_num(), 7);
    }
}
