//! Condition-based wallet reads and database-side balance edits for internal services.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Fields, Wallet, WALLET_COLUMNS},
    traits::{
        data_objects::{BalanceExpression, RecordFilter},
        WalletApiError,
        WalletManagement,
    },
};

pub struct WalletApi<B> {
    db: B,
}

impl<B: Debug> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi ({:?})", self.db)
    }
}

impl<B> WalletApi<B>
where B: WalletManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Returns the wallets matching `cond`, restricted to `fields` (`*` or a comma separated column list).
    pub async fn get_by_cond(&self, fields: &str, cond: &str) -> Result<Vec<Wallet>, WalletApiError> {
        let fields = Fields::parse(fields, &WALLET_COLUMNS)?;
        let filter = RecordFilter::parse(cond, &WALLET_COLUMNS)?;
        self.db.fetch_wallets(&fields, &filter).await
    }

    pub async fn get_single_by_cond(&self, fields: &str, cond: &str) -> Result<Wallet, WalletApiError> {
        let fields = Fields::parse(fields, &WALLET_COLUMNS)?;
        let filter = RecordFilter::parse(cond, &WALLET_COLUMNS)?;
        self.db.fetch_wallet(&fields, &filter).await?.ok_or(WalletApiError::NoMatchingWallet)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Wallet, WalletApiError> {
        self.db.fetch_wallet_by_id(id).await?.ok_or(WalletApiError::WalletNotFound(id))
    }

    /// Applies a `balance ± amount` expression to the wallet. Returns the number of rows affected.
    pub async fn edit_by_id_ex(&self, id: i64, balance: &str) -> Result<u64, WalletApiError> {
        let expr = BalanceExpression::parse(balance)?;
        let rows = self.db.apply_balance_expression(id, &expr).await?;
        info!("🗃️ Applied '{expr}' to wallet {id}. {rows} rows affected");
        Ok(rows)
    }
}
