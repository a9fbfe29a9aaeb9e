//! Passport Engine
//!
//! The Passport Engine holds the core logic of the passport identity service: users and their access tokens,
//! administrative sessions, brands and wallets. It is independent of the HTTP delivery layer.
//!
//! The library is divided into these main sections:
//! 1. The backend traits ([`mod@traits`]) and their SQLite implementation ([`SqliteDatabase`]). The data types stored
//!    in the database are defined in the [`mod@db_types`] module and are public.
//! 2. The cache ([`mod@cache`]). The relational store is the system of record; the cache holds derived copies of users,
//!    token indices, daily login sets and administrative sessions, all of which can be regenerated.
//! 3. The public API ([`mod@passport_api`]). [`UserApi`], [`BrandApi`] and [`WalletApi`] are constructed from the
//!    backends they need and implement the passport usecases.
//!
//! [`TenantDatabases`] resolves tenant ids to the database cluster that holds their data.
pub mod cache;
pub mod db_types;
pub mod helpers;
mod passport_api;
#[cfg(feature = "sqlite")]
pub mod shards;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

pub use passport_api::{
    brand_api::BrandApi,
    user_api::{UserApi, WX_H5_TOKEN_TTL},
    user_objects,
    wallet_api::WalletApi,
};
#[cfg(feature = "sqlite")]
pub use shards::{ShardConfig, ShardError, TenantDatabases};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
