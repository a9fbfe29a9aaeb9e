//! # Passport public API
//!
//! The `passport_api` module exposes the usecases of the passport service. Each API is created by supplying backends
//! that implement the traits it needs, so the APIs can be mixed and matched (or pointed at different shards).
//!
//! * [`user_api`] logs users and administrators in, checks their tokens and binds WeChat accounts. It needs a
//!   [`UserManagement`](crate::traits::UserManagement) backend and a [`KeyValueStore`](crate::traits::KeyValueStore).
//! * [`brand_api`] reads brands, memberships and leases.
//! * [`wallet_api`] serves condition-based wallet reads and balance edits to internal callers.
//!
//! ```rust,ignore
//! use passport_engine::{cache::RedisStore, SqliteDatabase, UserApi};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let store = RedisStore::connect("redis://127.0.0.1/").await?;
//! let api = UserApi::new(db, store);
//! let user = api.check_b_user_login(token).await?;
//! ```

pub mod brand_api;
pub mod user_api;
pub mod user_objects;
pub mod wallet_api;
