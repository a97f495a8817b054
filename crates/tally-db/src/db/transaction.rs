//! Database transaction utilities
//!
//! [`TransactionGuard`] owns one Postgres transaction for a multi-step
//! operation. It is committed or rolled back explicitly; if it is dropped
//! first (early return, cancelled request), sqlx rolls it back when the
//! connection returns to the pool.

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tally_core::AppError;

pub struct TransactionGuard {
    transaction: Option<Transaction<'static, Postgres>>,
    label: &'static str,
}

impl TransactionGuard {
    /// Begin a new database transaction
    pub async fn begin(pool: &PgPool, label: &'static str) -> Result<Self, AppError> {
        let transaction = pool.begin().await?;
        tracing::trace!(label, "Transaction started");

        Ok(Self {
            transaction: Some(transaction),
            label,
        })
    }

    /// Connection to run statements on. Fails once the transaction is finished.
    pub fn connection(&mut self) -> Result<&mut PgConnection, AppError> {
        let label = self.label;
        self.transaction.as_deref_mut().ok_or_else(|| {
            AppError::Internal(format!("Transaction '{}' was already finished", label))
        })
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
            tracing::trace!(label = self.label, "Transaction committed");
        }
        Ok(())
    }

    /// Rollback the transaction
    pub async fn rollback(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await?;
            tracing::debug!(label = self.label, "Transaction rolled back");
        }
        Ok(())
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!(
                label = self.label,
                "Transaction was dropped without explicit commit or rollback - rolling back"
            );
        }
    }
}
