//! JSON-RPC API Layer
//!
//! Exposes the Testorch coordinator's client- and agent-facing RPC
//! surface over `jsonrpsee`.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::RpcServer;
