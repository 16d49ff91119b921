// ibweb/src/contract.rs
// Contract data structures for the Client Portal gateway

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::base::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecType {
  #[serde(rename = "STK")]
  Stock,
  #[serde(rename = "OPT")]
  Option,
  #[serde(rename = "FUT")]
  Future,
  #[serde(rename = "CASH")]
  Forex,
  #[serde(rename = "BOND")]
  Bond,
  #[serde(rename = "CFD")]
  Cfd,
  #[serde(rename = "FOP")]
  FutureOption,
  #[serde(rename = "WAR")]
  Warrant,
  #[serde(rename = "IOPT")]
  IndexOption,
  #[serde(rename = "BAG")]
  Combo,
  #[serde(rename = "IND")]
  Index,
  #[serde(rename = "BILL")]
  Bill,
  #[serde(rename = "FUND")]
  Fund,
  #[serde(rename = "SLB")]
  Slb,
  #[serde(rename = "CMDTY")]
  Commodity,
  #[serde(rename = "ICU")]
  Icu,
  #[serde(rename = "ICS")]
  Ics,
  #[serde(rename = "PHYSS")]
  PhysicalMetal,
  #[serde(rename = "CRYPTO")]
  Crypto,
}

impl fmt::Display for SecType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      SecType::Stock => "STK",
      SecType::Option => "OPT",
      SecType::Future => "FUT",
      SecType::Forex => "CASH",
      SecType::Bond => "BOND",
      SecType::Cfd => "CFD",
      SecType::FutureOption => "FOP",
      SecType::Warrant => "WAR",
      SecType::IndexOption => "IOPT",
      SecType::Combo => "BAG",
      SecType::Index => "IND",
      SecType::Bill => "BILL",
      SecType::Fund => "FUND",
      SecType::Slb => "SLB",
      SecType::Commodity => "CMDTY",
      SecType::Icu => "ICU",
      SecType::Ics => "ICS",
      SecType::PhysicalMetal => "PHYSS",
      SecType::Crypto => "CRYPTO",
    };
    write!(f, "{}", s)
  }
}

impl FromStr for SecType {
  type Err = GatewayError;

  fn from_str(s: &str) -> Result<Self, GatewayError> {
    match s {
      "STK" => Ok(SecType::Stock),
      "OPT" => Ok(SecType::Option),
      "FUT" => Ok(SecType::Future),
      "CASH" => Ok(SecType::Forex),
      "BOND" => Ok(SecType::Bond),
      "CFD" => Ok(SecType::Cfd),
      "FOP" => Ok(SecType::FutureOption),
      "WAR" => Ok(SecType::Warrant),
      "IOPT" => Ok(SecType::IndexOption),
      "BAG" => Ok(SecType::Combo),
      "IND" => Ok(SecType::Index),
      "BILL" => Ok(SecType::Bill),
      "FUND" => Ok(SecType::Fund),
      "SLB" => Ok(SecType::Slb),
      "CMDTY" => Ok(SecType::Commodity),
      "ICU" => Ok(SecType::Icu),
      "ICS" => Ok(SecType::Ics),
      "PHYSS" => Ok(SecType::PhysicalMetal),
      "CRYPTO" => Ok(SecType::Crypto),
      _ => Err(GatewayError::ParseError(format!("Unknown security type: {}", s))),
    }
  }
}

/// Option right. The gateway uses both the short ("C"/"P") and long
/// ("CALL"/"PUT") spellings depending on the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionRight {
  #[serde(rename = "C", alias = "CALL", alias = "Call")]
  Call,
  #[serde(rename = "P", alias = "PUT", alias = "Put")]
  Put,
}

impl fmt::Display for OptionRight {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OptionRight::Call => write!(f, "C"),
      OptionRight::Put => write!(f, "P"),
    }
  }
}

impl FromStr for OptionRight {
  type Err = GatewayError;

  fn from_str(s: &str) -> Result<Self, GatewayError> {
    // Match case-insensitively for robustness
    match s.trim().to_uppercase().as_str() {
      "C" | "CALL" => Ok(OptionRight::Call),
      "P" | "PUT" => Ok(OptionRight::Put),
      _ => Err(GatewayError::ParseError(format!("Unknown option right: {}", s))),
    }
  }
}

/// Detailed contract information from `iserver/contract/{conid}/info`
#[derive(Debug, Clone, Deserialize)]
pub struct ContractInfo {
  pub con_id: i64,
  pub symbol: String,
  pub instrument_type: SecType,
  pub exchange: String,
  pub valid_exchanges: String,
  pub currency: String,
  pub company_name: String,
  #[serde(default)]
  pub local_symbol: Option<String>,
  #[serde(default)]
  pub trading_class: Option<String>,
  #[serde(default)]
  pub cfi_code: Option<String>,
  #[serde(default)]
  pub cusip: Option<String>,
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub multiplier: Option<String>,
  #[serde(default)]
  pub strike: Option<String>,
  #[serde(default)]
  pub right: Option<String>,
  #[serde(default)]
  pub expiry_full: Option<String>,
  #[serde(default)]
  pub maturity_date: Option<String>,
  #[serde(default)]
  pub contract_month: Option<String>,
  #[serde(default)]
  pub underlying_con_id: Option<i64>,
  #[serde(default)]
  pub underlying_issuer: Option<String>,
  #[serde(rename = "r_t_h", default)]
  pub regular_trading_hours: bool,
  #[serde(default)]
  pub allow_sell_long: bool,
  #[serde(default)]
  pub is_zero_commission_security: bool,
  #[serde(default)]
  pub smart_available: Option<bool>,
}

impl ContractInfo {
  /// The option right, when this contract is an option.
  pub fn option_right(&self) -> Option<OptionRight> {
    self.right.as_deref().and_then(|r| r.parse().ok())
  }
}

/// One section of a security search result (per instrument type)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySection {
  pub sec_type: String,
  #[serde(default)]
  pub months: Option<String>,
  #[serde(default)]
  pub exchange: Option<String>,
}

/// One match from `iserver/secdef/search`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityMatch {
  pub conid: i64,
  pub symbol: String,
  #[serde(default)]
  pub company_header: Option<String>,
  #[serde(default)]
  pub company_name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  // Semicolon-separated option/warrant expirations (YYYYMMDD).
  #[serde(default)]
  pub opt: Option<String>,
  #[serde(default)]
  pub war: Option<String>,
  #[serde(default)]
  pub sections: Vec<SecuritySection>,
}

impl SecurityMatch {
  /// Available option expirations, split out of the `opt` list.
  pub fn option_expirations(&self) -> Vec<&str> {
    self.opt.as_deref().map(|s| s.split(';').collect()).unwrap_or_default()
  }
}

/// One futures contract from `trsrv/futures`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesContract {
  pub conid: i64,
  pub symbol: String,
  #[serde(default)]
  pub underlying_conid: Option<i64>,
  #[serde(default)]
  pub expiration_date: Option<i64>,
  #[serde(default)]
  pub ltd: Option<i64>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sec_type_roundtrip() {
    for code in ["STK", "OPT", "FUT", "CASH", "IND", "CRYPTO"] {
      let parsed: SecType = code.parse().unwrap();
      assert_eq!(parsed.to_string(), code);
    }
    assert!("XYZ".parse::<SecType>().is_err());
  }

  #[test]
  fn test_option_right_spellings() {
    assert_eq!("C".parse::<OptionRight>().unwrap(), OptionRight::Call);
    assert_eq!("call".parse::<OptionRight>().unwrap(), OptionRight::Call);
    assert_eq!("PUT".parse::<OptionRight>().unwrap(), OptionRight::Put);
    assert!("X".parse::<OptionRight>().is_err());
  }

  #[test]
  fn test_contract_info_decode() {
    let json = r#"{
      "cfi_code": "OCXXXS",
      "symbol": "SPX",
      "cusip": null,
      "expiry_full": "20220822",
      "con_id": 577123126,
      "maturity_date": "20220822",
      "instrument_type": "OPT",
      "trading_class": "SPXW",
      "valid_exchanges": "SMART,CBOE",
      "allow_sell_long": false,
      "is_zero_commission_security": false,
      "local_symbol": "SPXW  220822C04230000",
      "currency": "USD",
      "text": "(SPXW) AUG 22 '22 4230 Call",
      "underlying_con_id": 416904,
      "r_t_h": true,
      "multiplier": "100",
      "strike": "4230.0",
      "right": "CALL",
      "contract_month": "202208",
      "company_name": "S&P 500 Stock Index",
      "smart_available": true,
      "exchange": "SMART"
    }"#;
    let info: ContractInfo = serde_json::from_str(json).unwrap();
    assert_eq!(info.con_id, 577123126);
    assert_eq!(info.instrument_type, SecType::Option);
    assert_eq!(info.option_right(), Some(OptionRight::Call));
    assert!(info.regular_trading_hours);
  }

  #[test]
  fn test_security_match_expirations() {
    let json = r#"{
      "conid": 416904,
      "symbol": "SPX",
      "companyHeader": "S&P 500 Stock Index - CBOE",
      "companyName": "S&P 500 Stock Index",
      "description": "CBOE",
      "opt": "20220822;20220823;20220824",
      "sections": [
        {"secType": "IND", "exchange": "CBOE;"},
        {"secType": "OPT", "months": "AUG22;SEP22", "exchange": "SMART;CBOE"}
      ]
    }"#;
    let m: SecurityMatch = serde_json::from_str(json).unwrap();
    assert_eq!(m.option_expirations(), vec!["20220822", "20220823", "20220824"]);
    assert_eq!(m.sections.len(), 2);
    assert_eq!(m.sections[1].sec_type, "OPT");
  }
}
