use thiserror::Error;

use crate::{
    db_types::{Fields, QueryError, Wallet},
    traits::data_objects::{BalanceExpression, RecordFilter},
};

#[derive(Debug, Clone, Error)]
pub enum WalletApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Wallet {0} does not exist")]
    WalletNotFound(i64),
    #[error("No wallet matches the condition")]
    NoMatchingWallet,
    #[error("Invalid wallet query. {0}")]
    QueryError(#[from] QueryError),
}

impl From<sqlx::Error> for WalletApiError {
    fn from(e: sqlx::Error) -> Self {
        WalletApiError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    async fn fetch_wallets(&self, fields: &Fields, filter: &RecordFilter) -> Result<Vec<Wallet>, WalletApiError>;

    /// Like [`WalletManagement::fetch_wallets`], but returns the first match only.
    async fn fetch_wallet(&self, fields: &Fields, filter: &RecordFilter) -> Result<Option<Wallet>, WalletApiError>;

    async fn fetch_wallet_by_id(&self, id: i64) -> Result<Option<Wallet>, WalletApiError>;

    /// Applies the balance expression to the wallet, in the database. Returns the number of rows affected.
    async fn apply_balance_expression(&self, id: i64, expr: &BalanceExpression) -> Result<u64, WalletApiError>;
}
