//! # Repository and cache contracts.
//!
//! This module defines the interfaces that backends must expose in order to be used by the passport APIs.
//!
//! * [`UserManagement`] covers users, administrative accounts and the relations used for permission checks.
//! * [`BrandManagement`] covers brands, their memberships and their lease records.
//! * [`WalletManagement`] covers wallet lookups and database-side balance updates.
//! * [`PassportDatabase`] bundles the three repositories behind one connection handle.
//! * [`KeyValueStore`] is the string-keyed cache (Redis in production) that backs the session layer.
mod brand_management;
mod key_value_store;
mod passport_database;
mod user_management;
mod wallet_management;

pub mod data_objects;

pub use brand_management::{BrandApiError, BrandManagement};
pub use data_objects::{BalanceExpression, ComparisonOp, Predicate, RecordFilter, RegistrationOutcome, SqlValue};
pub use key_value_store::{CacheError, KeyValueStore};
pub use passport_database::PassportDatabase;
pub use user_management::{UserApiError, UserManagement};
pub use wallet_management::{WalletApiError, WalletManagement};
