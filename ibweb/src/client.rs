// ibweb/src/client.rs
// High-level client for the Client Portal gateway

use std::collections::{HashMap, VecDeque};

use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::account::{
  AccountsInfo, GatewayStatus, PnlPartition, PortfolioAccount, Position, Trade, UserProfile,
};
use crate::base::GatewayError;
use crate::conn::{self, HttpTransport};
use crate::contract::{ContractInfo, FuturesContract, SecType, SecurityMatch};
use crate::data::{self, MarketHistory, OptionChain, OptionInfo, OptionStrikes, SnapshotRecord};
use crate::fields::{self, MarketDataField};
use crate::order::{LiveOrder, OrderPayload, OrderQuestion, SubmitItem};

/// REST/WebSocket API port of the gateway process.
pub const API_PORT: u16 = 5000;
/// Health-probe port of the auth-helper sidecar.
pub const PROBE_PORT: u16 = 5001;

const AUTH_HELPER_HOST: &str = "ibeam";
const DIRECT_HOST: &str = "localhost";

/// Decides how to answer the gateway's yes/no order confirmation prompts
/// (price constraints, margin impact, and similar warnings).
#[cfg_attr(test, mockall::automock)]
pub trait ConfirmationPolicy {
  /// Return `true` to confirm the prompt, `false` to decline it.
  fn confirm(&self, question: &OrderQuestion) -> bool;
}

/// Accepts every prompt without inspecting it, matching the gateway's
/// interactive "yes to all" flow. Use a custom [`ConfirmationPolicy`] to veto
/// risk warnings instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl ConfirmationPolicy for AutoConfirm {
  fn confirm(&self, _question: &OrderQuestion) -> bool {
    true
  }
}

/// Connection settings for [`GatewayClient`]
#[derive(Debug, Clone)]
pub struct GatewayConfig {
  /// Gateway host. Defaults to the auth-helper service name when
  /// `use_auth_helper` is set, `localhost` otherwise.
  pub host: Option<String>,
  /// Resolve the host through DNS and require the auth-helper readiness
  /// probe to pass before bootstrapping.
  pub use_auth_helper: bool,
}

impl Default for GatewayConfig {
  fn default() -> Self {
    GatewayConfig { host: None, use_auth_helper: true }
  }
}

impl GatewayConfig {
  /// Talk to a gateway on `host` directly, without the auth-helper sidecar.
  pub fn direct(host: &str) -> Self {
    GatewayConfig { host: Some(host.to_string()), use_auth_helper: false }
  }
}

/// Synchronous client for the Client Portal gateway.
///
/// One instance owns one gateway session context (connection pool plus the
/// default account id). It is not meant to be shared across threads.
///
/// ```no_run
/// use ibweb::client::{GatewayClient, GatewayConfig};
///
/// fn main() -> Result<(), ibweb::GatewayError> {
///     let client = GatewayClient::connect(GatewayConfig::default())?;
///     for position in client.get_positions(None)? {
///         println!("{} x {}", position.conid, position.position);
///     }
///     Ok(())
/// }
/// ```
pub struct GatewayClient {
  http: HttpTransport,
  ws_url: String,
  ready_url: String,
  live_url: String,
  use_auth_helper: bool,
  confirmation_policy: Box<dyn ConfirmationPolicy>,
  account_id: String,
}

impl GatewayClient {
  /// Connect and bootstrap with the default auto-confirming policy.
  pub fn connect(config: GatewayConfig) -> Result<Self, GatewayError> {
    Self::connect_with_policy(config, Box::new(AutoConfirm))
  }

  /// Connect and bootstrap: resolve the host, require readiness when the
  /// auth helper is in use, then fetch user profile, accounts, and portfolio
  /// accounts, selecting the first portfolio account as the default context.
  ///
  /// A failed readiness probe or an empty portfolio account list fails
  /// construction; there is no partially initialized client.
  pub fn connect_with_policy(
    config: GatewayConfig,
    confirmation_policy: Box<dyn ConfirmationPolicy>,
  ) -> Result<Self, GatewayError> {
    let host = if config.use_auth_helper {
      let name = config.host.as_deref().unwrap_or(AUTH_HELPER_HOST);
      let ip = conn::resolve_host(name)?;
      debug!("Auth helper {} resolved to {}", name, ip);
      ip
    } else {
      config.host.unwrap_or_else(|| DIRECT_HOST.to_string())
    };

    let http = HttpTransport::new(format!("https://{}:{}/v1/api/", host, API_PORT))?;
    let mut client = GatewayClient {
      http,
      ws_url: format!("wss://{}:{}/v1/api/ws", host, API_PORT),
      ready_url: format!("http://{}:{}/readyz", host, PROBE_PORT),
      live_url: format!("http://{}:{}/livez", host, PROBE_PORT),
      use_auth_helper: config.use_auth_helper,
      confirmation_policy,
      account_id: String::new(),
    };

    if client.use_auth_helper {
      debug!("Testing gateway...");
      if !client.is_gateway_ready() {
        warn!("Gateway not ready");
        return Err(GatewayError::GatewayNotReady);
      }
    }

    let user = client.get_user()?;
    debug!("Username = {}, paper = {}", user.username, user.is_paper);
    // Listing brokerage accounts initializes server-side session state;
    // portfolio and order endpoints misbehave without it.
    client.get_accounts()?;
    let portfolio = client.get_portfolio_accounts()?;
    let first = portfolio
      .first()
      .ok_or_else(|| GatewayError::InvalidAccount("no portfolio accounts".to_string()))?;
    client.account_id = first.account_id.clone();
    info!("Using account {}", client.account_id);
    Ok(client)
  }

  /// The account id used when an operation is not given one explicitly.
  pub fn account_id(&self) -> &str {
    &self.account_id
  }

  /// Override the default account id.
  pub fn set_account_id(&mut self, account_id: impl Into<String>) {
    self.account_id = account_id.into();
  }

  /// Is the gateway running and authenticated? Meaningful only with the auth
  /// helper; assumed `true` otherwise.
  pub fn is_gateway_ready(&self) -> bool {
    if !self.use_auth_helper {
      return true;
    }
    self.http.probe(&self.ready_url)
  }

  /// Is the gateway process alive? Meaningful only with the auth helper;
  /// assumed `true` otherwise.
  pub fn is_gateway_live(&self) -> bool {
    if !self.use_auth_helper {
      return true;
    }
    self.http.probe(&self.live_url)
  }

  /// Ping the gateway to keep the session alive.
  pub fn ping_gateway(&self) -> Result<GatewayStatus, GatewayError> {
    let status: GatewayStatus = self.http.get("tickle", &[])?;
    if !status.connected() || !status.authenticated() {
      warn!(
        "Gateway session degraded: connected={}, authenticated={}",
        status.connected(),
        status.authenticated()
      );
    }
    debug!(
      "Connected = {}, authenticated = {}",
      status.connected(),
      status.authenticated()
    );
    Ok(status)
  }

  pub fn get_user(&self) -> Result<UserProfile, GatewayError> {
    self.http.get("one/user", &[])
  }

  pub fn get_accounts(&self) -> Result<AccountsInfo, GatewayError> {
    self.http.get("iserver/accounts", &[])
  }

  pub fn get_portfolio_accounts(&self) -> Result<Vec<PortfolioAccount>, GatewayError> {
    self.http.get("portfolio/accounts", &[])
  }

  pub fn get_pnl(&self) -> Result<PnlPartition, GatewayError> {
    self.http.get("iserver/account/pnl/partitioned", &[])
  }

  pub fn get_trades(&self) -> Result<Vec<Trade>, GatewayError> {
    self.http.get("iserver/account/trades", &[])
  }

  /// Positions for `account_id`, defaulting to the bootstrap-selected
  /// account.
  pub fn get_positions(&self, account_id: Option<&str>) -> Result<Vec<Position>, GatewayError> {
    let account = account_id.unwrap_or(&self.account_id);
    self.http.get(&format!("portfolio/{}/positions", account), &[])
  }

  /// Futures contracts for the given symbols, across maturities.
  pub fn search_futures(
    &self,
    symbols: &[&str],
  ) -> Result<HashMap<String, Vec<FuturesContract>>, GatewayError> {
    self.http.get("trsrv/futures", &[("symbols", symbols.join(","))])
  }

  pub fn search_security(
    &self,
    symbol: &str,
    sec_type: SecType,
  ) -> Result<Vec<SecurityMatch>, GatewayError> {
    self.http.get(
      "iserver/secdef/search",
      &[("symbol", symbol.to_string()), ("secType", sec_type.to_string())],
    )
  }

  pub fn get_contract_info(&self, conid: i64) -> Result<ContractInfo, GatewayError> {
    self.http.get(&format!("iserver/contract/{}/info", conid), &[])
  }

  /// Option instruments for a contract and exact expiration date
  /// (`YYYYMMDD`). Set `strike` to `0.0` to get all strikes.
  ///
  /// The gateway query is month-granular; results maturing on a different
  /// date of the same month are filtered out.
  pub fn get_options_info(
    &self,
    conid: i64,
    expiration: &str,
    strike: f64,
  ) -> Result<Vec<OptionInfo>, GatewayError> {
    let month = data::expiration_to_month(expiration)?;
    let options: Vec<OptionInfo> = self.http.get(
      "iserver/secdef/info",
      &[
        ("conid", conid.to_string()),
        ("secType", SecType::Option.to_string()),
        ("month", month),
        ("strike", strike.to_string()),
      ],
    )?;
    Ok(data::options_maturing_on(options, expiration))
  }

  pub fn get_option_strikes(
    &self,
    conid: i64,
    expiration: &str,
  ) -> Result<OptionStrikes, GatewayError> {
    let month = data::expiration_to_month(expiration)?;
    self.http.get(
      "iserver/secdef/strikes",
      &[
        ("conid", conid.to_string()),
        ("secType", SecType::Option.to_string()),
        ("month", month),
      ],
    )
  }

  /// The full call/put chain for one expiration, keyed by strike.
  pub fn get_option_chain(
    &self,
    conid: i64,
    expiration: &str,
  ) -> Result<OptionChain, GatewayError> {
    let options = self.get_options_info(conid, expiration, 0.0)?;
    Ok(OptionChain::from_options(options))
  }

  /// Nearest strike at or below `value` in an ascending strike list.
  pub fn get_closest_strike(
    strikes: &[f64],
    value: f64,
  ) -> Result<(usize, f64), GatewayError> {
    data::closest_strike_at_or_below(strikes, value)
  }

  pub fn get_market_history(
    &self,
    conid: i64,
    period: &str,
    bar: &str,
    exchange: Option<&str>,
    outside_rth: bool,
  ) -> Result<MarketHistory, GatewayError> {
    let mut query = vec![
      ("conid", conid.to_string()),
      ("period", period.to_string()),
      ("bar", bar.to_string()),
      ("outsideRth", outside_rth.to_string()),
    ];
    if let Some(exchange) = exchange {
      query.push(("exchange", exchange.to_string()));
    }
    let history: MarketHistory = self.http.get("iserver/marketdata/history", &query)?;
    debug!("{} candles received", history.data.len());
    Ok(history)
  }

  /// Subscribe to realtime market data for the given contract ids.
  ///
  /// Subscription commands go through the WebSocket; once accepted, the feed
  /// is also served by the REST snapshot endpoint. Pick `fields` from
  /// [`fields::default_equity_fields`] / [`fields::default_option_fields`]
  /// or assemble a custom set.
  pub fn subscribe_market_data(
    &self,
    conids: &[i64],
    fields: &[MarketDataField],
  ) -> Result<(), GatewayError> {
    let codes: Vec<&str> = fields.iter().map(|f| f.code()).collect();
    let params = json!({ "fields": codes });
    let commands: Vec<String> =
      conids.iter().map(|conid| format!("smd+{}+{}", conid, params)).collect();
    conn::send_ws_commands(&self.ws_url, &commands)
  }

  /// Cancel every market data subscription on the session.
  pub fn unsubscribe_all_market_data(&self) -> Result<bool, GatewayError> {
    #[derive(Deserialize)]
    struct Unsubscribed {
      #[serde(default)]
      unsubscribed: bool,
    }
    let response: Unsubscribed = self.http.get("iserver/marketdata/unsubscribeall", &[])?;
    Ok(response.unsubscribed)
  }

  /// Snapshot of previously subscribed market data, with field codes
  /// renamed to semantic names.
  pub fn get_market_data_snapshot(
    &self,
    conids: &[i64],
  ) -> Result<Vec<SnapshotRecord>, GatewayError> {
    let joined = conids.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(",");
    let records: Vec<SnapshotRecord> =
      self.http.get("iserver/marketdata/snapshot", &[("conids", joined)])?;
    Ok(records.iter().map(fields::rename_snapshot_keys).collect())
  }

  /// Open orders. The gateway sometimes answers with an empty list even when
  /// orders exist, so an empty first response is re-queried once.
  pub fn get_orders(&self) -> Result<Vec<LiveOrder>, GatewayError> {
    fetch_orders_with_retry(|| self.http.get("iserver/account/orders", &[]))
  }

  /// Submit a batch of order payloads and drive the confirmation handshake
  /// to completion, answering prompts through the configured
  /// [`ConfirmationPolicy`]. Returns the confirmed order ids in
  /// acknowledgment order.
  pub fn submit_order(
    &self,
    orders: &[OrderPayload],
    account_id: Option<&str>,
  ) -> Result<Vec<String>, GatewayError> {
    let account = account_id.unwrap_or(&self.account_id);
    let initial: Vec<SubmitItem> = self
      .http
      .post(&format!("iserver/account/{}/orders", account), &json!({ "orders": orders }))?;
    drive_order_confirmations(initial, self.confirmation_policy.as_ref(), |reply_id, confirmed| {
      self.http.post(&format!("iserver/reply/{}", reply_id), &json!({ "confirmed": confirmed }))
    })
  }
}

#[derive(Debug, Default, Deserialize)]
struct OrdersEnvelope {
  #[serde(default)]
  orders: Vec<LiveOrder>,
}

fn fetch_orders_with_retry<F>(mut fetch: F) -> Result<Vec<LiveOrder>, GatewayError>
where
  F: FnMut() -> Result<OrdersEnvelope, GatewayError>,
{
  let first = fetch()?;
  if !first.orders.is_empty() {
    return Ok(first.orders);
  }
  // An empty answer is often spurious; ask once more before believing it.
  debug!("Empty order list, re-querying once");
  Ok(fetch()?.orders)
}

// Worklist over submit-response items, FIFO, with reply items appended to
// the back. Bounded by however many questions the gateway raises.
fn drive_order_confirmations<F>(
  initial: Vec<SubmitItem>,
  policy: &dyn ConfirmationPolicy,
  mut reply: F,
) -> Result<Vec<String>, GatewayError>
where
  F: FnMut(&str, bool) -> Result<Vec<SubmitItem>, GatewayError>,
{
  let mut worklist: VecDeque<SubmitItem> = initial.into();
  let mut order_ids = Vec::new();

  while let Some(item) = worklist.pop_front() {
    match item {
      SubmitItem::Question(question) => {
        let text = question.joined_message();
        debug!("Question submitting order: {}", text);
        let confirmed = policy.confirm(&question);
        if !confirmed {
          warn!("Declining order prompt {}: {}", question.id, text);
        }
        let followups = reply(&question.id, confirmed)?;
        worklist.extend(followups);
      }
      SubmitItem::Ack(ack) => {
        info!(
          "Order {} {}: {}",
          ack.order_id,
          ack.order_status.as_deref().unwrap_or("(no status)"),
          ack.text.as_deref().unwrap_or("")
        );
        order_ids.push(ack.order_id);
      }
      SubmitItem::Other(value) => {
        error!("Cannot parse order response item: '{}'", value);
      }
    }
  }

  Ok(order_ids)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::order::OrderAck;
  use std::cell::RefCell;

  fn question(id: &str) -> SubmitItem {
    SubmitItem::Question(OrderQuestion {
      id: id.to_string(),
      message: vec!["Price exceeds\nthe Percentage constraint of 3%.".to_string()],
      is_suppressed: false,
      message_ids: vec!["o163".to_string()],
    })
  }

  fn ack(order_id: &str) -> SubmitItem {
    SubmitItem::Ack(OrderAck {
      order_id: order_id.to_string(),
      order_status: Some("Submitted".to_string()),
      text: None,
      warning_message: None,
      encrypt_message: None,
    })
  }

  #[test]
  fn test_handshake_chained_questions() {
    // Submit -> [question A]; reply(A) -> [ack 1, question B]; reply(B) -> [ack 2].
    let replies = RefCell::new(HashMap::from([
      ("A".to_string(), vec![ack("1"), question("B")]),
      ("B".to_string(), vec![ack("2")]),
    ]));
    let calls = RefCell::new(Vec::new());

    let order_ids = drive_order_confirmations(vec![question("A")], &AutoConfirm, |id, confirmed| {
      calls.borrow_mut().push((id.to_string(), confirmed));
      Ok(replies.borrow_mut().remove(id).expect("unexpected reply id"))
    })
    .unwrap();

    assert_eq!(order_ids, vec!["1", "2"]);
    assert_eq!(
      calls.into_inner(),
      vec![("A".to_string(), true), ("B".to_string(), true)]
    );
  }

  #[test]
  fn test_handshake_acks_only() {
    let order_ids = drive_order_confirmations(vec![ack("10"), ack("11")], &AutoConfirm, |_, _| {
      panic!("no questions expected")
    })
    .unwrap();
    assert_eq!(order_ids, vec!["10", "11"]);
  }

  #[test]
  fn test_handshake_drops_unparseable_items() {
    let items = vec![
      SubmitItem::Other(serde_json::json!({"something": "else"})),
      ack("7"),
    ];
    let order_ids =
      drive_order_confirmations(items, &AutoConfirm, |_, _| Ok(vec![])).unwrap();
    assert_eq!(order_ids, vec!["7"]);
  }

  #[test]
  fn test_handshake_reply_error_propagates() {
    let result = drive_order_confirmations(vec![question("A")], &AutoConfirm, |_, _| {
      Err(GatewayError::RequestFailed { status: 500, body: "boom".to_string() })
    });
    assert!(matches!(result, Err(GatewayError::RequestFailed { status: 500, .. })));
  }

  #[test]
  fn test_handshake_declining_policy() {
    let mut policy = MockConfirmationPolicy::new();
    policy.expect_confirm().times(1).returning(|_| false);

    let calls = RefCell::new(Vec::new());
    let order_ids = drive_order_confirmations(vec![question("A")], &policy, |id, confirmed| {
      calls.borrow_mut().push((id.to_string(), confirmed));
      Ok(vec![])
    })
    .unwrap();

    assert!(order_ids.is_empty());
    assert_eq!(calls.into_inner(), vec![("A".to_string(), false)]);
  }

  fn envelope(json: &str) -> OrdersEnvelope {
    serde_json::from_str(json).unwrap()
  }

  #[test]
  fn test_get_orders_retries_once_on_empty() {
    let calls = RefCell::new(0);
    let orders = fetch_orders_with_retry(|| {
      *calls.borrow_mut() += 1;
      Ok(envelope(r#"{"orders": []}"#))
    })
    .unwrap();
    assert!(orders.is_empty());
    assert_eq!(calls.into_inner(), 2);
  }

  #[test]
  fn test_get_orders_no_retry_when_populated() {
    let calls = RefCell::new(0);
    let orders = fetch_orders_with_retry(|| {
      *calls.borrow_mut() += 1;
      Ok(envelope(
        r#"{"orders": [{
          "acct": "DU1",
          "conid": 265598,
          "orderId": 1,
          "orderType": "Limit",
          "side": "BUY",
          "status": "Submitted"
        }]}"#,
      ))
    })
    .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(calls.into_inner(), 1);
  }

  #[test]
  fn test_get_orders_retry_result_used() {
    let calls = RefCell::new(0);
    let orders = fetch_orders_with_retry(|| {
      let n = {
        let mut calls = calls.borrow_mut();
        *calls += 1;
        *calls
      };
      if n == 1 {
        Ok(envelope("{}"))
      } else {
        Ok(envelope(
          r#"{"orders": [{
            "acct": "DU1",
            "conid": 265598,
            "orderId": 2,
            "orderType": "Limit",
            "side": "SELL",
            "status": "Filled"
          }]}"#,
        ))
      }
    })
    .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_id, 2);
    assert_eq!(calls.into_inner(), 2);
  }

  #[test]
  fn test_subscription_command_shape() {
    // The command must carry compact JSON (no spaces) after the conid.
    let codes = vec!["31", "84"];
    let params = json!({ "fields": codes });
    let command = format!("smd+{}+{}", 265598, params);
    assert_eq!(command, r#"smd+265598+{"fields":["31","84"]}"#);
  }
}
