//! Specification data for recognized cars.
//!
//! A predicted class label like `"Acura RL Sedan 2012"` resolves to a
//! structured specification record: from the keyed store when seeded,
//! or from a deterministic parse of the label itself when not. Records
//! are written once by the seeding tool and read-only afterwards.

pub mod dataset;
pub mod record;
pub mod store;

pub use record::{fallback_record, sanitize_key, SpecRecord, SpecSheet, UNAVAILABLE};
pub use store::{lookup, MemorySpecStore, RedisSpecStore, SpecStore};
