//! Identity generation.
//!
//! The parser and exporter never call a random number generator directly;
//! they take a [`UidGenerator`] so tests can pass deterministic identities.

/// Produces fresh identity tokens.
pub trait UidGenerator: Send {
    fn next_uid(&mut self) -> String;
}

/// Random v4 UUIDs. The production generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUidGenerator;

impl UidGenerator for RandomUidGenerator {
    fn next_uid(&mut self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// `<prefix>-1`, `<prefix>-2`, ... Reproducible across runs.
#[derive(Debug, Clone)]
pub struct SequentialUidGenerator {
    prefix: String,
    next: u64,
}

impl SequentialUidGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        SequentialUidGenerator {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl UidGenerator for SequentialUidGenerator {
    fn next_uid(&mut self) -> String {
        let uid = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        uid
    }
}
