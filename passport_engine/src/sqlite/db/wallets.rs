use log::*;
use passport_common::helpers::unix_now;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Fields, Wallet, WALLET_COLUMNS},
    traits::{
        data_objects::{BalanceExpression, RecordFilter, SqlValue},
        WalletApiError,
    },
};

/// Fetches the wallets matching the filter, selecting only the requested columns.
pub async fn fetch_wallets(
    fields: &Fields,
    filter: &RecordFilter,
    limit: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Wallet>, WalletApiError> {
    let columns = fields.select_list(&WALLET_COLUMNS)?;
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {columns} FROM wallets WHERE "));
    {
        let mut where_clause = builder.separated(" AND ");
        for predicate in filter.predicates() {
            where_clause.push(predicate.column.as_str());
            where_clause.push_unseparated(predicate.op.as_sql());
            match &predicate.value {
                SqlValue::Int(v) => where_clause.push_bind_unseparated(*v),
                SqlValue::Text(v) => where_clause.push_bind_unseparated(v.clone()),
            };
        }
    }
    builder.push(" ORDER BY id");
    if let Some(limit) = limit {
        builder.push(" LIMIT ").push_bind(limit);
    }
    trace!("🗃️ Wallet query: {}", builder.sql());
    let wallets = builder.build_query_as::<Wallet>().fetch_all(conn).await?;
    Ok(wallets)
}

pub async fn fetch_wallet_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Wallet>, WalletApiError> {
    let wallet =
        sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(wallet)
}

pub async fn apply_balance_expression(
    id: i64,
    expr: &BalanceExpression,
    conn: &mut SqliteConnection,
) -> Result<u64, WalletApiError> {
    let rows = sqlx::query("UPDATE wallets SET balance = balance + $1, update_time = $2 WHERE id = $3")
        .bind(expr.delta())
        .bind(unix_now())
        .bind(id)
        .execute(conn)
        .await?
        .rows_affected();
    debug!("🗃️ Wallet #{id}: applied '{expr}', {rows} rows affected");
    Ok(rows)
}
