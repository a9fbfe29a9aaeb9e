//! SQLite backend for the passport engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
