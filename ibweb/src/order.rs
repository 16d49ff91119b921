// ibweb/src/order.rs
// Order data structures for the Client Portal gateway

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::base::GatewayError;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
  #[serde(rename = "BUY")]
  Buy,
  #[serde(rename = "SELL")]
  Sell,
}

impl OrderSide {
  /// The side that closes a position opened on this side.
  pub fn opposite(self) -> OrderSide {
    match self {
      OrderSide::Buy => OrderSide::Sell,
      OrderSide::Sell => OrderSide::Buy,
    }
  }
}

impl fmt::Display for OrderSide {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OrderSide::Buy => write!(f, "BUY"),
      OrderSide::Sell => write!(f, "SELL"),
    }
  }
}

impl FromStr for OrderSide {
  type Err = GatewayError;

  fn from_str(s: &str) -> Result<Self, GatewayError> {
    match s {
      "BUY" => Ok(OrderSide::Buy),
      "SELL" => Ok(OrderSide::Sell),
      _ => Err(GatewayError::ParseError(format!("Unknown order side: {}", s))),
    }
  }
}

/// Order type codes accepted by the gateway's order endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
  #[serde(rename = "LMT")]
  Limit,
  #[serde(rename = "MKT")]
  Market,
  #[serde(rename = "STP")]
  Stop,
  #[serde(rename = "STOP_LIMIT")]
  StopLimit,
  #[serde(rename = "MIDPRICE")]
  Midprice,
  #[serde(rename = "TRAIL")]
  TrailingStop,
  #[serde(rename = "TRAILLMT")]
  TrailingStopLimit,
}

impl fmt::Display for OrderType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      OrderType::Limit => "LMT",
      OrderType::Market => "MKT",
      OrderType::Stop => "STP",
      OrderType::StopLimit => "STOP_LIMIT",
      OrderType::Midprice => "MIDPRICE",
      OrderType::TrailingStop => "TRAIL",
      OrderType::TrailingStopLimit => "TRAILLMT",
    };
    write!(f, "{}", s)
  }
}

impl FromStr for OrderType {
  type Err = GatewayError;

  fn from_str(s: &str) -> Result<Self, GatewayError> {
    match s {
      "LMT" => Ok(OrderType::Limit),
      "MKT" => Ok(OrderType::Market),
      "STP" => Ok(OrderType::Stop),
      "STOP_LIMIT" => Ok(OrderType::StopLimit),
      "MIDPRICE" => Ok(OrderType::Midprice),
      "TRAIL" => Ok(OrderType::TrailingStop),
      "TRAILLMT" => Ok(OrderType::TrailingStopLimit),
      _ => Err(GatewayError::ParseError(format!("Unknown order type: {}", s))),
    }
  }
}

/// Time in force for orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
  #[serde(rename = "DAY")]
  Day,
  #[serde(rename = "GTC")]
  GoodTillCancelled,
  #[serde(rename = "OPG")]
  OpenPriceGuarantee,
  #[serde(rename = "IOC")]
  ImmediateOrCancel,
  #[serde(rename = "CLOSE")]
  Close,
}

impl fmt::Display for TimeInForce {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      TimeInForce::Day => "DAY",
      TimeInForce::GoodTillCancelled => "GTC",
      TimeInForce::OpenPriceGuarantee => "OPG",
      TimeInForce::ImmediateOrCancel => "IOC",
      TimeInForce::Close => "CLOSE",
    };
    write!(f, "{}", s)
  }
}

/// Order status as reported by the gateway's open-order endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
  PendingSubmit,
  PendingCancel,
  PreSubmitted,
  Submitted,
  Filled,
  Cancelled,
  Inactive,
}

impl OrderStatus {
  /// Whether the order is still working at the exchange.
  pub fn is_open(self) -> bool {
    matches!(self, OrderStatus::PreSubmitted | OrderStatus::Submitted)
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      OrderStatus::PendingSubmit => "PendingSubmit",
      OrderStatus::PendingCancel => "PendingCancel",
      OrderStatus::PreSubmitted => "PreSubmitted",
      OrderStatus::Submitted => "Submitted",
      OrderStatus::Filled => "Filled",
      OrderStatus::Cancelled => "Cancelled",
      OrderStatus::Inactive => "Inactive",
    };
    write!(f, "{}", s)
  }
}

/// One order of a submission batch, serialized to the gateway's JSON only at
/// the transport boundary. Field spellings follow the gateway exactly
/// (`cOID`, `outsideRTH`, `isSingleGroup`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPayload {
  pub conid: i64,
  #[serde(rename = "cOID", skip_serializing_if = "Option::is_none")]
  pub client_order_id: Option<String>,
  #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
  pub parent_id: Option<String>,
  #[serde(rename = "orderType")]
  pub order_type: OrderType,
  #[serde(rename = "listingExchange", skip_serializing_if = "Option::is_none")]
  pub listing_exchange: Option<String>,
  #[serde(rename = "isSingleGroup", skip_serializing_if = "Option::is_none")]
  pub single_group: Option<bool>,
  #[serde(rename = "outsideRTH")]
  pub outside_rth: bool,
  pub price: f64,
  pub side: OrderSide,
  pub tif: TimeInForce,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub referrer: Option<String>,
  pub quantity: f64,
}

/// An open order as returned by `iserver/account/orders`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveOrder {
  pub acct: String,
  pub conid: i64,
  #[serde(default)]
  pub conidex: Option<String>,
  pub order_id: i64,
  pub order_type: String,
  #[serde(default)]
  pub orig_order_type: Option<String>,
  #[serde(default)]
  pub price: Option<String>,
  pub side: OrderSide,
  pub status: OrderStatus,
  pub quantity: Option<f64>,
  #[serde(default)]
  pub filled_quantity: f64,
  #[serde(default)]
  pub remaining_quantity: f64,
  #[serde(default)]
  pub ticker: Option<String>,
  #[serde(default)]
  pub company_name: Option<String>,
  #[serde(default)]
  pub sec_type: Option<String>,
  #[serde(default)]
  pub listing_exchange: Option<String>,
  #[serde(default)]
  pub order_desc: Option<String>,
  #[serde(default)]
  pub time_in_force: Option<String>,
  #[serde(default)]
  pub last_execution_time: Option<String>,
  #[serde(rename = "lastExecutionTime_r", default)]
  pub last_execution_time_unix: Option<i64>,
  #[serde(default)]
  pub size_and_fills: Option<String>,
}

impl LiveOrder {
  pub fn is_open(&self) -> bool {
    self.status.is_open()
  }
}

/// A confirmation question raised during order submission. Answering it (via
/// `iserver/reply/{id}`) may raise further questions.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderQuestion {
  pub id: String,
  pub message: Vec<String>,
  #[serde(rename = "isSuppressed", default)]
  pub is_suppressed: bool,
  #[serde(rename = "messageIds", default)]
  pub message_ids: Vec<String>,
}

impl OrderQuestion {
  /// All message lines joined into one human-readable line.
  pub fn joined_message(&self) -> String {
    self.message.join(" ").replace('\n', " ").replace("  ", " ")
  }
}

/// Terminal acknowledgment of a submitted order
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAck {
  pub order_id: String,
  #[serde(default)]
  pub order_status: Option<String>,
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub warning_message: Option<String>,
  #[serde(default)]
  pub encrypt_message: Option<String>,
}

/// One element of an order submission (or reply) response. The gateway mixes
/// acknowledgments and questions in the same list, so the variants are told
/// apart by their distinguishing fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubmitItem {
  Question(OrderQuestion),
  Ack(OrderAck),
  Other(serde_json::Value),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_submit_item_question() {
    let json = r#"{
      "id": "74d457e7-4225-47a2-a4aa-2660fdb307d9",
      "isSuppressed": false,
      "message": ["The following order \"BUY 1 AAPL NASDAQ.NMS @ 100.00\" price exceeds \nthe Percentage constraint of 3%.\nAre you sure you want to submit this order?"],
      "messageIds": ["o163"]
    }"#;
    let item: SubmitItem = serde_json::from_str(json).unwrap();
    match item {
      SubmitItem::Question(q) => {
        assert_eq!(q.id, "74d457e7-4225-47a2-a4aa-2660fdb307d9");
        assert_eq!(q.message_ids, vec!["o163"]);
        assert!(!q.joined_message().contains('\n'));
      }
      other => panic!("Expected question, got {:?}", other),
    }
  }

  #[test]
  fn test_submit_item_ack() {
    let json = r#"{
      "encrypt_message": "1",
      "order_id": "884472628",
      "order_status": "Submitted",
      "text": "Order BUY 1 AAPL NASDAQ.NMS Limit 100.00 will be automatically canceled at 20230101 06:00:00 MET",
      "warning_message": "118"
    }"#;
    let item: SubmitItem = serde_json::from_str(json).unwrap();
    match item {
      SubmitItem::Ack(ack) => {
        assert_eq!(ack.order_id, "884472628");
        assert_eq!(ack.order_status.as_deref(), Some("Submitted"));
      }
      other => panic!("Expected ack, got {:?}", other),
    }
  }

  #[test]
  fn test_submit_item_unparseable() {
    let item: SubmitItem = serde_json::from_str(r#"{"something": "else"}"#).unwrap();
    assert!(matches!(item, SubmitItem::Other(_)));
  }

  #[test]
  fn test_live_order_roundtrip() {
    let json = r#"{
      "acct": "DU123456",
      "conid": 265598,
      "conidex": "265598",
      "orderId": 1083610844,
      "orderType": "Limit",
      "origOrderType": "LIMIT",
      "price": "100.00",
      "side": "BUY",
      "status": "Submitted",
      "quantity": 1.0,
      "filledQuantity": 0.0,
      "remainingQuantity": 1.0,
      "ticker": "AAPL",
      "companyName": "APPLE INC",
      "secType": "STK",
      "listingExchange": "NASDAQ.NMS",
      "orderDesc": "Buy 1 Limit 100.00 GTC",
      "timeInForce": "GTC",
      "lastExecutionTime": "220827093055",
      "lastExecutionTime_r": 1661592655000,
      "sizeAndFills": "0/1"
    }"#;
    let order: LiveOrder = serde_json::from_str(json).unwrap();
    assert_eq!(order.order_id, 1083610844);
    assert_eq!(order.side, OrderSide::Buy);
    assert!(order.is_open());
    assert_eq!(order.last_execution_time_unix, Some(1661592655000));
  }

  #[test]
  fn test_order_status_open() {
    assert!(OrderStatus::Submitted.is_open());
    assert!(OrderStatus::PreSubmitted.is_open());
    assert!(!OrderStatus::Filled.is_open());
    assert!(!OrderStatus::Cancelled.is_open());
    assert!(!OrderStatus::Inactive.is_open());
  }

  #[test]
  fn test_side_opposite() {
    assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
    assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
  }
}
