//! Small helpers shared between the passport engine and the passport server.
pub mod helpers;
mod secret;

pub use secret::Secret;
