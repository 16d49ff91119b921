// ibweb/src/data.rs
// Market data and option chain structures for the Client Portal gateway

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::base::GatewayError;
use crate::contract::OptionRight;

/// A market data snapshot record with field codes renamed to semantic names.
pub type SnapshotRecord = Map<String, Value>;

/// One OHLCV candle
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Bar {
  #[serde(rename = "o")]
  pub open: f64,
  #[serde(rename = "c")]
  pub close: f64,
  #[serde(rename = "h")]
  pub high: f64,
  #[serde(rename = "l")]
  pub low: f64,
  #[serde(rename = "v")]
  pub volume: f64,
  /// Bar start, Unix milliseconds.
  #[serde(rename = "t")]
  pub time: i64,
}

/// Market history from `GET iserver/marketdata/history`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketHistory {
  #[serde(default)]
  pub symbol: Option<String>,
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub data: Vec<Bar>,
  #[serde(default)]
  pub bar_length: i64,
  #[serde(default)]
  pub start_time: Option<String>,
  #[serde(default)]
  pub time_period: Option<String>,
  #[serde(default)]
  pub outside_rth: bool,
  #[serde(default)]
  pub mkt_data_delay: i64,
  #[serde(default)]
  pub md_availability: Option<String>,
  #[serde(default)]
  pub price_factor: Option<i64>,
  #[serde(default)]
  pub volume_factor: Option<i64>,
  #[serde(default)]
  pub points: i64,
  #[serde(default)]
  pub travel_time: i64,
  #[serde(default)]
  pub server_id: Option<String>,
  #[serde(default)]
  pub message_version: i64,
}

/// One option instrument from `GET iserver/secdef/info`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionInfo {
  pub conid: i64,
  pub symbol: String,
  pub sec_type: String,
  pub exchange: String,
  #[serde(default)]
  pub listing_exchange: Option<String>,
  pub right: OptionRight,
  pub strike: f64,
  pub currency: String,
  #[serde(default)]
  pub cusip: Option<String>,
  #[serde(default)]
  pub coupon: Option<String>,
  #[serde(default)]
  pub desc1: Option<String>,
  #[serde(default)]
  pub desc2: Option<String>,
  /// Exact expiration date, `YYYYMMDD`.
  pub maturity_date: String,
  #[serde(default)]
  pub multiplier: Option<String>,
  #[serde(default)]
  pub trading_class: Option<String>,
  #[serde(default)]
  pub valid_exchanges: Option<String>,
}

/// Available strikes for one expiration, ascending, from
/// `GET iserver/secdef/strikes`
#[derive(Debug, Clone, Deserialize)]
pub struct OptionStrikes {
  pub call: Vec<f64>,
  pub put: Vec<f64>,
}

/// Call/put option instruments for one expiration, keyed by strike.
/// Built once per query, not cached.
#[derive(Debug, Clone, Default)]
pub struct OptionChain {
  pub calls: BTreeMap<Decimal, OptionInfo>,
  pub puts: BTreeMap<Decimal, OptionInfo>,
}

impl OptionChain {
  /// Partition option instruments into call/put maps keyed by strike.
  pub fn from_options(options: Vec<OptionInfo>) -> OptionChain {
    let mut chain = OptionChain::default();
    for option in options {
      let Some(strike) = Decimal::from_f64_retain(option.strike) else {
        warn!("Dropping option {} with unusable strike {}", option.conid, option.strike);
        continue;
      };
      match option.right {
        OptionRight::Call => chain.calls.insert(strike, option),
        OptionRight::Put => chain.puts.insert(strike, option),
      };
    }
    chain
  }

  pub fn call(&self, strike: f64) -> Option<&OptionInfo> {
    Decimal::from_f64_retain(strike).and_then(|s| self.calls.get(&s))
  }

  pub fn put(&self, strike: f64) -> Option<&OptionInfo> {
    Decimal::from_f64_retain(strike).and_then(|s| self.puts.get(&s))
  }

  /// Call strikes, ascending.
  pub fn call_strikes(&self) -> Vec<f64> {
    self.calls.values().map(|o| o.strike).collect()
  }

  /// Put strikes, ascending.
  pub fn put_strikes(&self) -> Vec<f64> {
    self.puts.values().map(|o| o.strike).collect()
  }
}

/// Convert an expiration date to the gateway's month token.
///
/// Example: `20220822` => `AUG22`.
pub fn expiration_to_month(datestr: &str) -> Result<String, GatewayError> {
  let date = NaiveDate::parse_from_str(datestr, "%Y%m%d")
    .map_err(|e| GatewayError::ParseError(format!("expiration '{}': {}", datestr, e)))?;
  Ok(date.format("%b%y").to_string().to_uppercase())
}

/// Keep only the options maturing exactly on `expiration`. The secdef query
/// is month-granular, so the server may return neighboring maturities.
pub fn options_maturing_on(options: Vec<OptionInfo>, expiration: &str) -> Vec<OptionInfo> {
  options.into_iter().filter(|o| o.maturity_date == expiration).collect()
}

/// Find the nearest strike at or below `value` in an ascending strike list.
/// Returns the `(index, strike)` pair, scanning from the highest strike
/// downward.
pub fn closest_strike_at_or_below(
  strikes: &[f64],
  value: f64,
) -> Result<(usize, f64), GatewayError> {
  for (idx, strike) in strikes.iter().enumerate().rev() {
    if *strike <= value {
      return Ok((idx, *strike));
    }
  }
  Err(GatewayError::StrikeNotFound(value))
}
