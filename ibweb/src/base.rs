// ibweb/src/base.rs
// Base types and error definitions for the Client Portal gateway client

use thiserror::Error;

/// Errors that can occur when talking to the Client Portal gateway
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
  #[error("Gateway request failed: status={status}, body='{body}'")]
  RequestFailed { status: u16, body: String },

  #[error("Connection failed: {0}")]
  ConnectionFailed(String),

  #[error("Gateway not ready")]
  GatewayNotReady,

  #[error("WebSocket error: {0}")]
  WebSocketError(String),

  #[error("Response parse error: {0}")]
  ParseError(String),

  #[error("Invalid order parameters: {0}")]
  InvalidOrderParameters(String),

  #[error("No strike at or below {0}")]
  StrikeNotFound(f64),

  #[error("Invalid account: {0}")]
  InvalidAccount(String),
}
