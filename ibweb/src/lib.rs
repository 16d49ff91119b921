// ibweb/src/lib.rs
// Main entry point for the Client Portal Web API client library

//! # ibweb — Interactive Brokers Client Portal Web API client
//!
//! A synchronous Rust wrapper for the Client Portal gateway that provides:
//!
//! - Session bootstrap against the gateway (optionally through the ibeam
//!   auth-helper sidecar)
//! - Accounts, positions, trades, and PnL queries
//! - Market data history, snapshots, and realtime subscription commands
//! - Option chain retrieval and strike matching
//! - Bracket / exit-strategy order builders and order submission, including
//!   the gateway's interactive confirmation handshake

mod base;
pub mod account;
pub mod client;
pub mod conn;
pub mod contract;
pub mod data;
pub mod fields;
pub mod order;
pub mod order_builder;

pub use base::GatewayError;
pub use client::{AutoConfirm, ConfirmationPolicy, GatewayClient, GatewayConfig};
pub use order_builder::{build_bracket_order, build_exit_strategy};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
