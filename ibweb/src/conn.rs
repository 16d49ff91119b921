// ibweb/src/conn.rs
// HTTP and WebSocket transport for the Client Portal gateway

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::base::GatewayError;

/// Per-request connect timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Per-request read timeout.
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for the auth-helper health probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Blocking HTTP transport with fixed timeouts.
///
/// The gateway serves a self-signed certificate, so peer verification is
/// disabled. Every call is a single request; retries are the caller's
/// business.
pub struct HttpTransport {
  client: reqwest::blocking::Client,
  api_url: String,
}

impl HttpTransport {
  pub fn new(api_url: String) -> Result<Self, GatewayError> {
    let client = reqwest::blocking::Client::builder()
      .danger_accept_invalid_certs(true)
      .connect_timeout(CONNECT_TIMEOUT)
      .timeout(READ_TIMEOUT)
      .build()
      .map_err(|e| GatewayError::ConnectionFailed(format!("building HTTP client: {}", e)))?;
    Ok(HttpTransport { client, api_url })
  }

  pub fn api_url(&self) -> &str {
    &self.api_url
  }

  /// GET `{api_url}{path}` and decode the JSON response.
  pub fn get<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T, GatewayError> {
    let request = self.client.get(format!("{}{}", self.api_url, path)).query(query);
    self.execute(path, request)
  }

  /// POST a JSON body to `{api_url}{path}` and decode the JSON response.
  pub fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, GatewayError> {
    let request = self.client.post(format!("{}{}", self.api_url, path)).json(body);
    self.execute(path, request)
  }

  fn execute<T: DeserializeOwned>(
    &self,
    path: &str,
    request: reqwest::blocking::RequestBuilder,
  ) -> Result<T, GatewayError> {
    let response = request
      .send()
      .map_err(|e| GatewayError::ConnectionFailed(format!("request to {}: {}", path, e)))?;
    let status = response.status();
    let body = response
      .text()
      .map_err(|e| GatewayError::ConnectionFailed(format!("reading {} response: {}", path, e)))?;
    if !status.is_success() {
      warn!("{} returned {}: '{}'", path, status, body);
      return Err(GatewayError::RequestFailed { status: status.as_u16(), body });
    }
    serde_json::from_str(&body)
      .map_err(|e| GatewayError::ParseError(format!("decoding {} response: {}", path, e)))
  }

  /// One-shot probe of a sidecar health endpoint. Connect failures and
  /// timeouts mean "not ready" rather than an error.
  pub fn probe(&self, url: &str) -> bool {
    match self.client.get(url).timeout(PROBE_TIMEOUT).send() {
      Ok(response) => response.status() == reqwest::StatusCode::OK,
      Err(e) => {
        warn!("Probe of {} failed: {}", url, e);
        false
      }
    }
  }
}

/// Resolve a logical service name to its first address, IPv4 preferred.
pub fn resolve_host(name: &str) -> Result<String, GatewayError> {
  let addrs: Vec<_> = (name, 0u16)
    .to_socket_addrs()
    .map_err(|e| GatewayError::ConnectionFailed(format!("resolving {}: {}", name, e)))?
    .collect();
  addrs
    .iter()
    .find(|a| a.is_ipv4())
    .or_else(|| addrs.first())
    .map(|a| a.ip().to_string())
    .ok_or_else(|| GatewayError::ConnectionFailed(format!("no addresses for {}", name)))
}

/// Send a batch of text commands over a short-lived WebSocket session.
///
/// The gateway greets new connections with two frames before accepting
/// commands; both are read and logged. The connection is closed afterwards;
/// subscriptions survive on the gateway session.
pub fn send_ws_commands(ws_url: &str, commands: &[String]) -> Result<(), GatewayError> {
  let url = url::Url::parse(ws_url)
    .map_err(|e| GatewayError::WebSocketError(format!("invalid url {}: {}", ws_url, e)))?;
  let host = url
    .host_str()
    .ok_or_else(|| GatewayError::WebSocketError(format!("no host in {}", ws_url)))?;
  let port = url.port_or_known_default().unwrap_or(443);

  let stream = TcpStream::connect((host, port))
    .map_err(|e| GatewayError::ConnectionFailed(format!("connecting to {}:{}: {}", host, port, e)))?;
  stream
    .set_read_timeout(Some(READ_TIMEOUT))
    .map_err(|e| GatewayError::ConnectionFailed(format!("setting read timeout: {}", e)))?;

  // Self-signed gateway certificate, same as the HTTP side.
  let tls = native_tls::TlsConnector::builder()
    .danger_accept_invalid_certs(true)
    .danger_accept_invalid_hostnames(true)
    .build()
    .map_err(|e| GatewayError::WebSocketError(format!("building TLS connector: {}", e)))?;

  let (mut socket, _response) = tungstenite::client_tls_with_config(
    ws_url,
    stream,
    None,
    Some(tungstenite::Connector::NativeTls(tls)),
  )
  .map_err(|e| GatewayError::WebSocketError(format!("websocket handshake: {}", e)))?;

  for _ in 0..2 {
    let greeting = socket
      .read()
      .map_err(|e| GatewayError::WebSocketError(format!("reading greeting: {}", e)))?;
    debug!("[ws] {}", greeting);
  }

  for command in commands {
    socket
      .send(tungstenite::Message::text(command.clone()))
      .map_err(|e| GatewayError::WebSocketError(format!("sending '{}': {}", command, e)))?;
    debug!("[ws] sent {}", command);
  }

  socket.close(None).ok();
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resolve_localhost() {
    let ip = resolve_host("localhost").unwrap();
    assert!(ip == "127.0.0.1" || ip == "::1");
  }

  #[test]
  fn test_resolve_unknown_host_fails() {
    assert!(matches!(
      resolve_host("no-such-host.invalid"),
      Err(GatewayError::ConnectionFailed(_))
    ));
  }
}
