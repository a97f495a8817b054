//! Persistence for receipts, purchase items, groups and sessions.
//!
//! Handlers and the ingestion workflow depend on the traits in [`store`];
//! [`db`] holds the Postgres implementations and [`mock`] (feature `mock`)
//! holds in-memory doubles for tests.

pub mod db;
pub mod store;

#[cfg(feature = "mock")]
pub mod mock;

pub use db::{GroupRepository, PoolHealth, ReceiptRepository, SessionRepository};
pub use store::{GroupStore, HealthProbe, ReceiptStore, ReceiptTransaction, SessionStore};
