//! PlanStore - generic persistent JSON record storage
//!
//! Records are opaque JSON bodies grouped into named collections and keyed by
//! a time-ordered UUID. The store knows nothing about the shape of what it
//! keeps; callers serialize their own domain types.
//!
//! # Example
//!
//! ```ignore
//! use planstore::Store;
//!
//! let store = Store::open("plans.db")?;
//! let id = store.insert("study_plans", Some("session-1"), &plan)?;
//! let record = store.get::<StudyPlan>("study_plans", &id)?;
//! ```

mod error;
mod store;

pub use error::StoreError;
pub use store::{Store, StoredRecord};

/// Current time as unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
