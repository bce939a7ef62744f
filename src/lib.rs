//! Redisflare Library
//!
//! A minimal authenticated REST facade over a pluggable key-value store. Clients read,
//! write, delete and enumerate string records over HTTP, gated by static bearer tokens
//! with two privilege levels (read-only, read-write).
//!
//! ## Architecture Modules
//! - **`auth`**: The immutable token registry and token extraction rules.
//! - **`config`**: Command line / environment configuration of the server binary.
//! - **`server`**: The request dispatcher. Routing, authorization, CRUD preconditions,
//!   the response envelope and the error-to-status mapping all live here.
//! - **`storage`**: The storage port (`StorageInterface`) and the in-memory and local
//!   disk backends that implement it.
//! - **`client`**: An HTTP client for talking to a running server.

pub mod auth;
pub mod client;
pub mod config;
pub mod server;
pub mod storage;
