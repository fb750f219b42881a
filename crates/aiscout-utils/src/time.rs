//! Time helpers shared by the state store, cache, and adapters.

use chrono::{DateTime, Utc};

/// `Utc::now()`, as a seam so tests can be deterministic if ever needed.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
