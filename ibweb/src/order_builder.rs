// ibweb/src/order_builder.rs
// Builders for bracket and exit-strategy order payloads

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use log::debug;

use crate::base::GatewayError;
use crate::order::{OrderPayload, OrderSide, OrderType, TimeInForce};

/// Referrer tag carried by take-profit legs.
pub const TAKE_PROFIT_REFERRER: &str = "TakeProfitOrder";
/// Referrer tag carried by stop-loss legs.
pub const STOP_LOSS_REFERRER: &str = "StopLossOrder";

static COID_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generate a client order id from the wall clock plus an in-process
/// sequence number. Unique within this process; there is no cross-process
/// guarantee.
pub fn generate_client_order_id() -> String {
  let seq = COID_SEQ.fetch_add(1, Ordering::Relaxed);
  format!("ord-{}-{}", Utc::now().format("%Y%m%d%H%M%S%3f"), seq)
}

// Exit prices must sit on the profitable/protective side of the entry.
// Getting this wrong is a programming error in the caller, caught before any
// payload is built.
fn check_bracket_prices(
  side: OrderSide,
  price: f64,
  price_profit: Option<f64>,
  price_loss: Option<f64>,
) -> Result<(), GatewayError> {
  match side {
    OrderSide::Buy => {
      if let Some(profit) = price_profit {
        if profit <= price {
          return Err(GatewayError::InvalidOrderParameters(format!(
            "take-profit {} must be above entry {} for a buy", profit, price)));
        }
      }
      if let Some(loss) = price_loss {
        if loss >= price {
          return Err(GatewayError::InvalidOrderParameters(format!(
            "stop-loss {} must be below entry {} for a buy", loss, price)));
        }
      }
    }
    OrderSide::Sell => {
      if let Some(profit) = price_profit {
        if profit >= price {
          return Err(GatewayError::InvalidOrderParameters(format!(
            "take-profit {} must be below entry {} for a sell", profit, price)));
        }
      }
      if let Some(loss) = price_loss {
        if loss <= price {
          return Err(GatewayError::InvalidOrderParameters(format!(
            "stop-loss {} must be above entry {} for a sell", loss, price)));
        }
      }
    }
  }
  Ok(())
}

/// Build a bracket order: a limit entry plus linked take-profit and/or
/// stop-loss exit legs. Passing `None` for an exit price skips that leg.
///
/// The exit legs are children of the entry: they carry the entry's client
/// order id as `parentId` and no client order id of their own.
#[allow(clippy::too_many_arguments)]
pub fn build_bracket_order(
  conid: i64,
  side: OrderSide,
  price: f64,
  quantity: f64,
  price_profit: Option<f64>,
  price_loss: Option<f64>,
  client_order_id: Option<String>,
  outside_rth: bool,
  tif: TimeInForce,
) -> Result<Vec<OrderPayload>, GatewayError> {
  check_bracket_prices(side, price, price_profit, price_loss)?;

  let coid = client_order_id.unwrap_or_else(generate_client_order_id);
  let close_side = side.opposite();

  let entry = OrderPayload {
    conid,
    client_order_id: Some(coid.clone()),
    parent_id: None,
    order_type: OrderType::Limit,
    listing_exchange: None,
    single_group: None,
    outside_rth,
    price,
    side,
    tif,
    referrer: None,
    quantity,
  };

  let mut orders = Vec::with_capacity(3);
  orders.push(entry);

  if let Some(profit) = price_profit {
    let mut take_profit = orders[0].clone();
    take_profit.order_type = OrderType::Limit;
    take_profit.price = profit;
    take_profit.side = close_side;
    take_profit.referrer = Some(TAKE_PROFIT_REFERRER.to_string());
    take_profit.parent_id = Some(coid.clone());
    take_profit.client_order_id = None;
    orders.push(take_profit);
  }

  if let Some(loss) = price_loss {
    let mut stop_loss = orders[0].clone();
    stop_loss.order_type = OrderType::Stop;
    stop_loss.price = loss;
    stop_loss.side = close_side;
    stop_loss.referrer = Some(STOP_LOSS_REFERRER.to_string());
    stop_loss.parent_id = Some(coid.clone());
    stop_loss.client_order_id = None;
    orders.push(stop_loss);
  }

  debug!("Built bracket order with {} leg(s), coid={}", orders.len(), coid);
  Ok(orders)
}

/// Build standalone closing orders for a position that was not opened through
/// the bracket flow. The legs have no parent linkage; when both are present
/// they are grouped one-cancels-all via `isSingleGroup`.
///
/// Client order ids must be unique per order, so with two legs each derives
/// its own id from the base (`-tp` / `-sl`); a single leg uses it as-is.
#[allow(clippy::too_many_arguments)]
pub fn build_exit_strategy(
  conid: i64,
  closing_side: OrderSide,
  quantity: f64,
  price_profit: Option<f64>,
  price_loss: Option<f64>,
  client_order_id: Option<String>,
  outside_rth: bool,
  tif: TimeInForce,
) -> Result<Vec<OrderPayload>, GatewayError> {
  if price_profit.is_none() && price_loss.is_none() {
    return Err(GatewayError::InvalidOrderParameters(
      "exit strategy needs at least one of take-profit or stop-loss".to_string()));
  }

  let coid = client_order_id.unwrap_or_else(generate_client_order_id);
  let both = price_profit.is_some() && price_loss.is_some();
  let single_group = both.then_some(true);

  let mut orders = Vec::with_capacity(2);

  if let Some(profit) = price_profit {
    let leg_coid = if both { format!("{}-tp", coid) } else { coid.clone() };
    orders.push(OrderPayload {
      conid,
      client_order_id: Some(leg_coid),
      parent_id: None,
      order_type: OrderType::Limit,
      listing_exchange: None,
      single_group,
      outside_rth,
      price: profit,
      side: closing_side,
      tif,
      referrer: Some(TAKE_PROFIT_REFERRER.to_string()),
      quantity,
    });
  }

  if let Some(loss) = price_loss {
    let leg_coid = if both { format!("{}-sl", coid) } else { coid.clone() };
    orders.push(OrderPayload {
      conid,
      client_order_id: Some(leg_coid),
      parent_id: None,
      order_type: OrderType::Stop,
      listing_exchange: None,
      single_group,
      outside_rth,
      price: loss,
      side: closing_side,
      tif,
      referrer: Some(STOP_LOSS_REFERRER.to_string()),
      quantity,
    });
  }

  debug!("Built exit strategy with {} leg(s), oca={}", orders.len(), both);
  Ok(orders)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn buy_bracket(
    profit: Option<f64>,
    loss: Option<f64>,
  ) -> Result<Vec<OrderPayload>, GatewayError> {
    build_bracket_order(
      265598,
      OrderSide::Buy,
      100.0,
      1.0,
      profit,
      loss,
      Some("test_coid".to_string()),
      false,
      TimeInForce::Day,
    )
  }

  #[test]
  fn test_bracket_full() {
    let orders = buy_bracket(Some(110.0), Some(95.0)).unwrap();
    assert_eq!(orders.len(), 3);

    let entry = &orders[0];
    assert_eq!(entry.side, OrderSide::Buy);
    assert_eq!(entry.order_type, OrderType::Limit);
    assert_eq!(entry.client_order_id.as_deref(), Some("test_coid"));
    assert_eq!(entry.parent_id, None);

    let take_profit = &orders[1];
    assert_eq!(take_profit.order_type, OrderType::Limit);
    assert_eq!(take_profit.price, 110.0);
    assert_eq!(take_profit.side, OrderSide::Sell);
    assert_eq!(take_profit.parent_id.as_deref(), Some("test_coid"));
    assert_eq!(take_profit.client_order_id, None);
    assert_eq!(take_profit.referrer.as_deref(), Some(TAKE_PROFIT_REFERRER));

    let stop_loss = &orders[2];
    assert_eq!(stop_loss.order_type, OrderType::Stop);
    assert_eq!(stop_loss.price, 95.0);
    assert_eq!(stop_loss.side, OrderSide::Sell);
    assert_eq!(stop_loss.parent_id.as_deref(), Some("test_coid"));
    assert_eq!(stop_loss.client_order_id, None);
    assert_eq!(stop_loss.referrer.as_deref(), Some(STOP_LOSS_REFERRER));
  }

  #[test]
  fn test_bracket_leg_counts() {
    assert_eq!(buy_bracket(Some(110.0), Some(95.0)).unwrap().len(), 3);
    assert_eq!(buy_bracket(Some(110.0), None).unwrap().len(), 2);
    assert_eq!(buy_bracket(None, Some(95.0)).unwrap().len(), 2);
    assert_eq!(buy_bracket(None, None).unwrap().len(), 1);
  }

  #[test]
  fn test_bracket_buy_price_checks() {
    // Profit below entry, loss above entry: both invalid for a buy.
    assert!(matches!(
      buy_bracket(Some(99.0), Some(95.0)),
      Err(GatewayError::InvalidOrderParameters(_))
    ));
    assert!(matches!(
      buy_bracket(Some(110.0), Some(101.0)),
      Err(GatewayError::InvalidOrderParameters(_))
    ));
    // Skipped legs bypass their check.
    assert!(buy_bracket(None, Some(95.0)).is_ok());
    assert!(buy_bracket(Some(110.0), None).is_ok());
  }

  #[test]
  fn test_bracket_sell_price_checks() {
    let sell = |profit, loss| {
      build_bracket_order(
        265598, OrderSide::Sell, 100.0, 1.0, profit, loss, None, false, TimeInForce::Day)
    };
    assert!(sell(Some(90.0), Some(105.0)).is_ok());
    assert!(matches!(
      sell(Some(105.0), None),
      Err(GatewayError::InvalidOrderParameters(_))
    ));
    assert!(matches!(
      sell(None, Some(95.0)),
      Err(GatewayError::InvalidOrderParameters(_))
    ));
    // Sell exits close with a buy.
    let orders = sell(Some(90.0), Some(105.0)).unwrap();
    assert_eq!(orders[1].side, OrderSide::Buy);
    assert_eq!(orders[2].side, OrderSide::Buy);
  }

  #[test]
  fn test_bracket_generates_coid() {
    let orders =
      build_bracket_order(1, OrderSide::Buy, 10.0, 1.0, Some(11.0), None, None, false,
                          TimeInForce::GoodTillCancelled)
        .unwrap();
    let coid = orders[0].client_order_id.clone().unwrap();
    assert!(!coid.is_empty());
    assert_eq!(orders[1].parent_id.as_deref(), Some(coid.as_str()));
  }

  #[test]
  fn test_generated_coids_unique() {
    let a = generate_client_order_id();
    let b = generate_client_order_id();
    assert_ne!(a, b);
  }

  #[test]
  fn test_exit_strategy_oca_grouping() {
    let both = build_exit_strategy(
      1, OrderSide::Sell, 2.0, Some(120.0), Some(80.0), Some("x".to_string()), false,
      TimeInForce::GoodTillCancelled)
      .unwrap();
    assert_eq!(both.len(), 2);
    assert_eq!(both[0].single_group, Some(true));
    assert_eq!(both[1].single_group, Some(true));
    // Distinct client ids, no parent linkage.
    assert_ne!(both[0].client_order_id, both[1].client_order_id);
    assert_eq!(both[0].parent_id, None);
    assert_eq!(both[1].parent_id, None);

    let single = build_exit_strategy(
      1, OrderSide::Sell, 2.0, Some(120.0), None, Some("x".to_string()), false,
      TimeInForce::GoodTillCancelled)
      .unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].single_group, None);
    assert_eq!(single[0].client_order_id.as_deref(), Some("x"));
  }

  #[test]
  fn test_exit_strategy_empty_rejected() {
    assert!(matches!(
      build_exit_strategy(1, OrderSide::Sell, 1.0, None, None, None, false, TimeInForce::Day),
      Err(GatewayError::InvalidOrderParameters(_))
    ));
  }

  #[test]
  fn test_exit_strategy_leg_types() {
    let orders = build_exit_strategy(
      1, OrderSide::Buy, 1.0, Some(50.0), Some(70.0), None, true, TimeInForce::Day)
      .unwrap();
    assert_eq!(orders[0].order_type, OrderType::Limit);
    assert_eq!(orders[0].price, 50.0);
    assert_eq!(orders[1].order_type, OrderType::Stop);
    assert_eq!(orders[1].price, 70.0);
    assert!(orders.iter().all(|o| o.outside_rth));
    assert!(orders.iter().all(|o| o.side == OrderSide::Buy));
  }
}
