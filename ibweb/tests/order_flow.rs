// ibweb/tests/order_flow.rs
// End-to-end checks of the builder output against the gateway's wire format.

use anyhow::Result;
use serde_json::{json, Value};

use ibweb::order::{OrderSide, TimeInForce};
use ibweb::{build_bracket_order, build_exit_strategy};

fn init_logging() {
  let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn bracket_order_wire_format() -> Result<()> {
  init_logging();

  let orders = build_bracket_order(
    265598,
    OrderSide::Buy,
    100.0,
    1.0,
    Some(110.0),
    Some(95.0),
    Some("my_order_1".to_string()),
    false,
    TimeInForce::GoodTillCancelled,
  )?;
  let wire = serde_json::to_value(&orders)?;

  // The gateway is picky about key spellings; check them verbatim.
  assert_eq!(
    wire,
    json!([
      {
        "conid": 265598,
        "cOID": "my_order_1",
        "orderType": "LMT",
        "outsideRTH": false,
        "price": 100.0,
        "side": "BUY",
        "tif": "GTC",
        "quantity": 1.0
      },
      {
        "conid": 265598,
        "parentId": "my_order_1",
        "orderType": "LMT",
        "outsideRTH": false,
        "price": 110.0,
        "side": "SELL",
        "tif": "GTC",
        "referrer": "TakeProfitOrder",
        "quantity": 1.0
      },
      {
        "conid": 265598,
        "parentId": "my_order_1",
        "orderType": "STP",
        "outsideRTH": false,
        "price": 95.0,
        "side": "SELL",
        "tif": "GTC",
        "referrer": "StopLossOrder",
        "quantity": 1.0
      }
    ])
  );
  Ok(())
}

#[test]
fn bracket_children_never_carry_their_own_coid() -> Result<()> {
  init_logging();

  let orders = build_bracket_order(
    1,
    OrderSide::Sell,
    50.0,
    10.0,
    Some(45.0),
    Some(55.0),
    None,
    true,
    TimeInForce::Day,
  )?;
  let wire = serde_json::to_value(&orders)?;
  let legs = wire.as_array().unwrap();

  let entry_coid = legs[0].get("cOID").and_then(Value::as_str).unwrap().to_string();
  for child in &legs[1..] {
    assert!(child.get("cOID").is_none());
    assert_eq!(child.get("parentId").and_then(Value::as_str), Some(entry_coid.as_str()));
  }
  Ok(())
}

#[test]
fn exit_strategy_wire_format() -> Result<()> {
  init_logging();

  let orders = build_exit_strategy(
    577123126,
    OrderSide::Sell,
    2.0,
    Some(120.0),
    Some(80.0),
    Some("close_spx".to_string()),
    false,
    TimeInForce::GoodTillCancelled,
  )?;
  let wire = serde_json::to_value(&orders)?;
  let legs = wire.as_array().unwrap();
  assert_eq!(legs.len(), 2);

  for leg in legs {
    assert_eq!(leg.get("isSingleGroup"), Some(&json!(true)));
    assert!(leg.get("parentId").is_none());
  }
  assert_eq!(legs[0].get("orderType"), Some(&json!("LMT")));
  assert_eq!(legs[1].get("orderType"), Some(&json!("STP")));
  assert_ne!(legs[0].get("cOID"), legs[1].get("cOID"));
  Ok(())
}

#[test]
fn single_leg_exit_has_no_group_flag() -> Result<()> {
  init_logging();

  let orders = build_exit_strategy(
    1,
    OrderSide::Buy,
    1.0,
    None,
    Some(70.0),
    None,
    false,
    TimeInForce::Day,
  )?;
  let wire = serde_json::to_value(&orders)?;
  let legs = wire.as_array().unwrap();
  assert_eq!(legs.len(), 1);
  assert!(legs[0].get("isSingleGroup").is_none());
  Ok(())
}
