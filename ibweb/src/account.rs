// ibweb/src/account.rs
// Session and account data structures for the Client Portal gateway

use std::collections::HashMap;

use serde::Deserialize;

use crate::contract::SecType;

/// Authentication status nested inside the tickle response
#[derive(Debug, Clone, Deserialize)]
pub struct AuthStatus {
  pub authenticated: bool,
  #[serde(default)]
  pub competing: bool,
  pub connected: bool,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(rename = "MAC", default)]
  pub mac: Option<String>,
  #[serde(rename = "serverInfo", default)]
  pub server_info: Option<ServerInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
  #[serde(default)]
  pub server_name: Option<String>,
  #[serde(default)]
  pub server_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IserverStatus {
  #[serde(rename = "authStatus")]
  pub auth_status: AuthStatus,
}

/// Gateway session status from `GET tickle`
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayStatus {
  pub session: String,
  #[serde(rename = "ssoExpires", default)]
  pub sso_expires: i64,
  #[serde(default)]
  pub collission: bool,
  #[serde(rename = "userId", default)]
  pub user_id: i64,
  pub iserver: IserverStatus,
}

impl GatewayStatus {
  pub fn connected(&self) -> bool {
    self.iserver.auth_status.connected
  }

  pub fn authenticated(&self) -> bool {
    self.iserver.auth_status.authenticated
  }
}

/// Feature flags from the user profile
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFeatures {
  #[serde(default)]
  pub env: Option<String>,
  #[serde(default)]
  pub realtime: bool,
  #[serde(default)]
  pub bond: bool,
  #[serde(default)]
  pub option_chains: bool,
  #[serde(default)]
  pub calendar: bool,
}

/// User profile from `GET one/user`
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
  pub username: String,
  #[serde(rename = "ispaper", default)]
  pub is_paper: bool,
  #[serde(rename = "islite", default)]
  pub is_lite: bool,
  #[serde(rename = "has2fa", default)]
  pub has_two_factor: bool,
  #[serde(default)]
  pub features: Option<UserFeatures>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountServerInfo {
  #[serde(default)]
  pub server_name: Option<String>,
  #[serde(default)]
  pub server_version: Option<String>,
}

/// Brokerage accounts from `GET iserver/accounts`. Fetching this also
/// initializes server-side session state, so it runs during bootstrap.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsInfo {
  pub accounts: Vec<String>,
  #[serde(default)]
  pub selected_account: Option<String>,
  #[serde(default)]
  pub aliases: HashMap<String, String>,
  #[serde(default)]
  pub session_id: Option<String>,
  #[serde(default)]
  pub server_info: Option<AccountServerInfo>,
}

/// One portfolio account from `GET portfolio/accounts`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAccount {
  pub account_id: String,
  #[serde(default)]
  pub account_van: Option<String>,
  #[serde(default)]
  pub account_title: Option<String>,
  #[serde(default)]
  pub account_alias: Option<String>,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub currency: Option<String>,
  #[serde(default)]
  pub desc: Option<String>,
  #[serde(rename = "ibEntity", default)]
  pub ib_entity: Option<String>,
  #[serde(default)]
  pub trading_type: Option<String>,
  #[serde(rename = "type", default)]
  pub account_type: Option<String>,
  #[serde(default)]
  pub faclient: bool,
  #[serde(default)]
  pub covestor: bool,
}

/// One portfolio position from `GET portfolio/{acct}/positions`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
  pub acct_id: String,
  pub conid: i64,
  #[serde(default)]
  pub contract_desc: Option<String>,
  pub position: f64,
  #[serde(default)]
  pub mkt_price: f64,
  #[serde(default)]
  pub mkt_value: f64,
  #[serde(default)]
  pub currency: Option<String>,
  #[serde(default)]
  pub avg_cost: f64,
  #[serde(default)]
  pub avg_price: f64,
  #[serde(default)]
  pub realized_pnl: f64,
  #[serde(default)]
  pub unrealized_pnl: f64,
  #[serde(default)]
  pub exchs: Option<String>,
  #[serde(default)]
  pub expiry: Option<String>,
  #[serde(default)]
  pub put_or_call: Option<String>,
  #[serde(default)]
  pub multiplier: Option<f64>,
  #[serde(default)]
  pub strike: f64,
  #[serde(default)]
  pub exercise_style: Option<String>,
  pub asset_class: SecType,
  #[serde(default)]
  pub und_conid: i64,
}

impl Position {
  /// Short positions have negative quantity.
  pub fn is_short(&self) -> bool {
    self.position < 0.0
  }
}

/// One execution from `GET iserver/account/trades`. The gateway mixes
/// snake_case and camelCase keys in this record.
#[derive(Debug, Clone, Deserialize)]
pub struct Trade {
  pub account: String,
  #[serde(rename = "accountCode", default)]
  pub account_code: Option<String>,
  pub conid: i64,
  #[serde(rename = "conidEx", default)]
  pub conid_ex: Option<String>,
  pub execution_id: String,
  #[serde(default)]
  pub company_name: Option<String>,
  #[serde(default)]
  pub contract_description_1: Option<String>,
  #[serde(default)]
  pub contract_description_2: Option<String>,
  #[serde(default)]
  pub exchange: Option<String>,
  #[serde(default)]
  pub directed_exchange: Option<String>,
  #[serde(default)]
  pub clearing_id: Option<String>,
  #[serde(default)]
  pub clearing_name: Option<String>,
  #[serde(default)]
  pub commission: Option<String>,
  #[serde(default)]
  pub net_amount: f64,
  #[serde(default)]
  pub open_close: Option<String>,
  #[serde(default)]
  pub order_description: Option<String>,
  pub price: String,
  #[serde(default)]
  pub sec_type: Option<String>,
  pub side: String,
  pub size: f64,
  pub symbol: String,
  #[serde(default)]
  pub liquidation_trade: Option<String>,
  #[serde(default)]
  pub trade_time: Option<String>,
  #[serde(rename = "trade_time_r", default)]
  pub trade_time_unix: Option<i64>,
}

/// One row of the partitioned PnL response
#[derive(Debug, Clone, Deserialize)]
pub struct PnlRow {
  #[serde(rename = "rowType", default)]
  pub row_type: i64,
  /// Daily PnL.
  #[serde(default)]
  pub dpl: f64,
  /// Net liquidation value.
  #[serde(default)]
  pub nl: f64,
  /// Unrealized PnL.
  #[serde(default)]
  pub upl: f64,
  /// Excess liquidity.
  #[serde(default)]
  pub el: f64,
  /// Market value.
  #[serde(default)]
  pub mv: f64,
}

/// Partitioned PnL from `GET iserver/account/pnl/partitioned`, keyed by
/// `{acctId}.{modelId}`
#[derive(Debug, Clone, Deserialize)]
pub struct PnlPartition {
  #[serde(default)]
  pub upnl: HashMap<String, PnlRow>,
}
