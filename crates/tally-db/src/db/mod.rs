pub mod group;
pub mod health;
pub mod receipt;
pub mod session;
pub mod transaction;

pub use group::GroupRepository;
pub use health::PoolHealth;
pub use receipt::{PgReceiptTransaction, ReceiptRepository};
pub use session::SessionRepository;
pub use transaction::TransactionGuard;
