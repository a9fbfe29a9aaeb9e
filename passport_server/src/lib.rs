//! # Passport server
//! This crate hosts the HTTP delivery layer of the passport identity service. It is responsible for:
//! * Loading the configuration and opening the database, tenant shard and cache connections.
//! * Exposing the user, administrator, brand and internal wallet endpoints on top of the engine's usecase APIs.
//! * Rendering every result in the `{code, message, data, request_id}` response envelope.
//!
//! ## Configuration
//! The server is configured with a TOML file and a few environment overrides. See [config](config/index.html).
//!
//! ## Routes
//! * `/system/healthcheck`: A health check route.
//! * `/v1/user/...`, `/v1/mis/...`, `/v1/brand/...`: Public routes. Most require an `X-Access-Token`.
//! * `/_inner/v1/...`: Routes for services inside the deployment, guarded by the shared `X-Token`.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
