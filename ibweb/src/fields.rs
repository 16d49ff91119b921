// ibweb/src/fields.rs
// Market data field catalog for the Client Portal gateway
//
// The snapshot and subscription endpoints identify values by numeric field
// codes. This is the closed catalog of known codes with their semantic
// names.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

/// A market data field, identified on the wire by its numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketDataField {
  LastPrice,
  Symbol,
  Text,
  High,
  Low,
  Position,
  MarketValue,
  AvgPrice,
  UnrealizedPnl,
  FormattedPosition,
  FormattedUnrealizedPnl,
  DailyPnl,
  Change,
  ChangePercent,
  BidPrice,
  AskSize,
  AskPrice,
  Volume,
  BidSize,
  Exchange,
  Conid,
  SecType,
  Months,
  RegularExpiry,
  Marker,
  UnderlyingContract,
  MarketDataAvailability,
  CompanyName,
  AskExch,
  LastExch,
  LastSize,
  BidExch,
  MarketDataAvailabilityOther,
  PutCallInterest,
  PutCallVolume,
  HistoricVolumePercent,
  HistoricVolumeClosePercent,
  OptionVolume,
  ContractIdAndExchange,
  ContractDescription,
  ContractDescriptionOther,
  ListingExchange,
  Industry,
  Category,
  AverageVolume,
  OptionImpliedVolatilityPercent,
  HistoricVolume,
  PutCallRatio,
  DividendAmount,
  DividendYield,
  Ex,
  MarketCap,
  PriceEarningsRatio,
  EarningsPerShare,
  CostBasis,
  FiftyTwoWeekLow,
  FiftyTwoWeekHigh,
  Open,
  Close,
  Delta,
  Gamma,
  Theta,
  Vega,
  OptionVolumeChangePercent,
  ImpliedVolatilityPercent,
  Mark,
  ShortableShares,
  FeeRate,
  OptionOpenInterest,
  PercentOfMarketValue,
  Shortable,
  MorningstarRating,
  Dividends,
  DividendsTtm,
  EmaTwoHundred,
  EmaOneHundred,
  EmaFiftyDay,
  EmaTwentyDay,
  PriceEmaTwoHundredDay,
  PriceEmaOneHundredDay,
  PriceEmaFiftyDay,
  PriceEmaTwentyDay,
  ChangeSinceOpen,
  UpcomingEvent,
  UpcomingEventDate,
  UpcomingAnalystMeeting,
  UpcomingEarnings,
  UpcomingMiscEvents,
  RecentAnalystMeeting,
  RecentEarnings,
  RecentMiscEvents,
  ProbabilityOfMaxReturnCustomer,
  BreakEven,
  SpxDelta,
  FuturesOpenInterest,
  LastYield,
  BidYield,
  ProbabilityMaxReturn,
  ProbabilityMaxLoss,
  ProfitProbability,
  OrganizationType,
  DebtClass,
  Ratings,
  BondStateCode,
  BondType,
  LastTradingDate,
  IssueDate,
  Beta,
  AskYield,
  PriorClose,
  VolumeLong,
}

impl MarketDataField {
  /// Every known field, in wire-code order.
  pub const ALL: &'static [MarketDataField] = &[
    MarketDataField::LastPrice,
    MarketDataField::Symbol,
    MarketDataField::Text,
    MarketDataField::High,
    MarketDataField::Low,
    MarketDataField::Position,
    MarketDataField::MarketValue,
    MarketDataField::AvgPrice,
    MarketDataField::UnrealizedPnl,
    MarketDataField::FormattedPosition,
    MarketDataField::FormattedUnrealizedPnl,
    MarketDataField::DailyPnl,
    MarketDataField::Change,
    MarketDataField::ChangePercent,
    MarketDataField::BidPrice,
    MarketDataField::AskSize,
    MarketDataField::AskPrice,
    MarketDataField::Volume,
    MarketDataField::BidSize,
    MarketDataField::Exchange,
    MarketDataField::Conid,
    MarketDataField::SecType,
    MarketDataField::Months,
    MarketDataField::RegularExpiry,
    MarketDataField::Marker,
    MarketDataField::UnderlyingContract,
    MarketDataField::MarketDataAvailability,
    MarketDataField::CompanyName,
    MarketDataField::AskExch,
    MarketDataField::LastExch,
    MarketDataField::LastSize,
    MarketDataField::BidExch,
    MarketDataField::MarketDataAvailabilityOther,
    MarketDataField::PutCallInterest,
    MarketDataField::PutCallVolume,
    MarketDataField::HistoricVolumePercent,
    MarketDataField::HistoricVolumeClosePercent,
    MarketDataField::OptionVolume,
    MarketDataField::ContractIdAndExchange,
    MarketDataField::ContractDescription,
    MarketDataField::ContractDescriptionOther,
    MarketDataField::ListingExchange,
    MarketDataField::Industry,
    MarketDataField::Category,
    MarketDataField::AverageVolume,
    MarketDataField::OptionImpliedVolatilityPercent,
    MarketDataField::HistoricVolume,
    MarketDataField::PutCallRatio,
    MarketDataField::DividendAmount,
    MarketDataField::DividendYield,
    MarketDataField::Ex,
    MarketDataField::MarketCap,
    MarketDataField::PriceEarningsRatio,
    MarketDataField::EarningsPerShare,
    MarketDataField::CostBasis,
    MarketDataField::FiftyTwoWeekLow,
    MarketDataField::FiftyTwoWeekHigh,
    MarketDataField::Open,
    MarketDataField::Close,
    MarketDataField::Delta,
    MarketDataField::Gamma,
    MarketDataField::Theta,
    MarketDataField::Vega,
    MarketDataField::OptionVolumeChangePercent,
    MarketDataField::ImpliedVolatilityPercent,
    MarketDataField::Mark,
    MarketDataField::ShortableShares,
    MarketDataField::FeeRate,
    MarketDataField::OptionOpenInterest,
    MarketDataField::PercentOfMarketValue,
    MarketDataField::Shortable,
    MarketDataField::MorningstarRating,
    MarketDataField::Dividends,
    MarketDataField::DividendsTtm,
    MarketDataField::EmaTwoHundred,
    MarketDataField::EmaOneHundred,
    MarketDataField::EmaFiftyDay,
    MarketDataField::EmaTwentyDay,
    MarketDataField::PriceEmaTwoHundredDay,
    MarketDataField::PriceEmaOneHundredDay,
    MarketDataField::PriceEmaFiftyDay,
    MarketDataField::PriceEmaTwentyDay,
    MarketDataField::ChangeSinceOpen,
    MarketDataField::UpcomingEvent,
    MarketDataField::UpcomingEventDate,
    MarketDataField::UpcomingAnalystMeeting,
    MarketDataField::UpcomingEarnings,
    MarketDataField::UpcomingMiscEvents,
    MarketDataField::RecentAnalystMeeting,
    MarketDataField::RecentEarnings,
    MarketDataField::RecentMiscEvents,
    MarketDataField::ProbabilityOfMaxReturnCustomer,
    MarketDataField::BreakEven,
    MarketDataField::SpxDelta,
    MarketDataField::FuturesOpenInterest,
    MarketDataField::LastYield,
    MarketDataField::BidYield,
    MarketDataField::ProbabilityMaxReturn,
    MarketDataField::ProbabilityMaxLoss,
    MarketDataField::ProfitProbability,
    MarketDataField::OrganizationType,
    MarketDataField::DebtClass,
    MarketDataField::Ratings,
    MarketDataField::BondStateCode,
    MarketDataField::BondType,
    MarketDataField::LastTradingDate,
    MarketDataField::IssueDate,
    MarketDataField::Beta,
    MarketDataField::AskYield,
    MarketDataField::PriorClose,
    MarketDataField::VolumeLong,
  ];

  /// The numeric wire code used in snapshot keys and subscription commands.
  pub fn code(&self) -> &'static str {
    match self {
      MarketDataField::LastPrice => "31",
      MarketDataField::Symbol => "55",
      MarketDataField::Text => "58",
      MarketDataField::High => "70",
      MarketDataField::Low => "71",
      MarketDataField::Position => "72",
      MarketDataField::MarketValue => "73",
      MarketDataField::AvgPrice => "74",
      MarketDataField::UnrealizedPnl => "75",
      MarketDataField::FormattedPosition => "76",
      MarketDataField::FormattedUnrealizedPnl => "77",
      MarketDataField::DailyPnl => "78",
      MarketDataField::Change => "82",
      MarketDataField::ChangePercent => "83",
      MarketDataField::BidPrice => "84",
      MarketDataField::AskSize => "85",
      MarketDataField::AskPrice => "86",
      MarketDataField::Volume => "87",
      MarketDataField::BidSize => "88",
      MarketDataField::Exchange => "6004",
      MarketDataField::Conid => "6008",
      MarketDataField::SecType => "6070",
      MarketDataField::Months => "6072",
      MarketDataField::RegularExpiry => "6073",
      MarketDataField::Marker => "6119",
      MarketDataField::UnderlyingContract => "6457",
      MarketDataField::MarketDataAvailability => "6509",
      MarketDataField::CompanyName => "7051",
      MarketDataField::AskExch => "7057",
      MarketDataField::LastExch => "7058",
      MarketDataField::LastSize => "7059",
      MarketDataField::BidExch => "7068",
      MarketDataField::MarketDataAvailabilityOther => "7084",
      MarketDataField::PutCallInterest => "7085",
      MarketDataField::PutCallVolume => "7086",
      MarketDataField::HistoricVolumePercent => "7087",
      MarketDataField::HistoricVolumeClosePercent => "7088",
      MarketDataField::OptionVolume => "7089",
      MarketDataField::ContractIdAndExchange => "7094",
      MarketDataField::ContractDescription => "7219",
      MarketDataField::ContractDescriptionOther => "7220",
      MarketDataField::ListingExchange => "7221",
      MarketDataField::Industry => "7280",
      MarketDataField::Category => "7281",
      MarketDataField::AverageVolume => "7282",
      MarketDataField::OptionImpliedVolatilityPercent => "7283",
      MarketDataField::HistoricVolume => "7284",
      MarketDataField::PutCallRatio => "7285",
      MarketDataField::DividendAmount => "7286",
      MarketDataField::DividendYield => "7287",
      MarketDataField::Ex => "7288",
      MarketDataField::MarketCap => "7289",
      MarketDataField::PriceEarningsRatio => "7290",
      MarketDataField::EarningsPerShare => "7291",
      MarketDataField::CostBasis => "7292",
      MarketDataField::FiftyTwoWeekLow => "7293",
      MarketDataField::FiftyTwoWeekHigh => "7294",
      MarketDataField::Open => "7295",
      MarketDataField::Close => "7296",
      MarketDataField::Delta => "7308",
      MarketDataField::Gamma => "7309",
      MarketDataField::Theta => "7310",
      MarketDataField::Vega => "7311",
      MarketDataField::OptionVolumeChangePercent => "7607",
      MarketDataField::ImpliedVolatilityPercent => "7633",
      MarketDataField::Mark => "7635",
      MarketDataField::ShortableShares => "7636",
      MarketDataField::FeeRate => "7637",
      MarketDataField::OptionOpenInterest => "7638",
      MarketDataField::PercentOfMarketValue => "7639",
      MarketDataField::Shortable => "7644",
      MarketDataField::MorningstarRating => "7655",
      MarketDataField::Dividends => "7671",
      MarketDataField::DividendsTtm => "7672",
      MarketDataField::EmaTwoHundred => "7674",
      MarketDataField::EmaOneHundred => "7675",
      MarketDataField::EmaFiftyDay => "7676",
      MarketDataField::EmaTwentyDay => "7677",
      MarketDataField::PriceEmaTwoHundredDay => "7678",
      MarketDataField::PriceEmaOneHundredDay => "7679",
      MarketDataField::PriceEmaFiftyDay => "7680",
      MarketDataField::PriceEmaTwentyDay => "7681",
      MarketDataField::ChangeSinceOpen => "7682",
      MarketDataField::UpcomingEvent => "7683",
      MarketDataField::UpcomingEventDate => "7684",
      MarketDataField::UpcomingAnalystMeeting => "7685",
      MarketDataField::UpcomingEarnings => "7686",
      MarketDataField::UpcomingMiscEvents => "7687",
      MarketDataField::RecentAnalystMeeting => "7688",
      MarketDataField::RecentEarnings => "7689",
      MarketDataField::RecentMiscEvents => "7690",
      MarketDataField::ProbabilityOfMaxReturnCustomer => "7694",
      MarketDataField::BreakEven => "7695",
      MarketDataField::SpxDelta => "7696",
      MarketDataField::FuturesOpenInterest => "7697",
      MarketDataField::LastYield => "7698",
      MarketDataField::BidYield => "7699",
      MarketDataField::ProbabilityMaxReturn => "7700",
      MarketDataField::ProbabilityMaxLoss => "7702",
      MarketDataField::ProfitProbability => "7703",
      MarketDataField::OrganizationType => "7704",
      MarketDataField::DebtClass => "7705",
      MarketDataField::Ratings => "7706",
      MarketDataField::BondStateCode => "7707",
      MarketDataField::BondType => "7708",
      MarketDataField::LastTradingDate => "7714",
      MarketDataField::IssueDate => "7715",
      MarketDataField::Beta => "7718",
      MarketDataField::AskYield => "7720",
      MarketDataField::PriorClose => "7741",
      MarketDataField::VolumeLong => "7762",
    }
  }

  /// The semantic snake_case name used for renamed snapshot keys.
  pub fn field_name(&self) -> &'static str {
    match self {
      MarketDataField::LastPrice => "last_price",
      MarketDataField::Symbol => "symbol",
      MarketDataField::Text => "text",
      MarketDataField::High => "high",
      MarketDataField::Low => "low",
      MarketDataField::Position => "position",
      MarketDataField::MarketValue => "market_value",
      MarketDataField::AvgPrice => "avg_price",
      MarketDataField::UnrealizedPnl => "unrealized_pnl",
      MarketDataField::FormattedPosition => "formatted_position",
      MarketDataField::FormattedUnrealizedPnl => "formatted_unrealized_pnl",
      MarketDataField::DailyPnl => "daily_pnl",
      MarketDataField::Change => "change",
      MarketDataField::ChangePercent => "change_percent",
      MarketDataField::BidPrice => "bid_price",
      MarketDataField::AskSize => "ask_size",
      MarketDataField::AskPrice => "ask_price",
      MarketDataField::Volume => "volume",
      MarketDataField::BidSize => "bid_size",
      MarketDataField::Exchange => "exchange",
      MarketDataField::Conid => "conid",
      MarketDataField::SecType => "sec_type",
      MarketDataField::Months => "months",
      MarketDataField::RegularExpiry => "regular_expiry",
      MarketDataField::Marker => "marker",
      MarketDataField::UnderlyingContract => "underlying_contract",
      MarketDataField::MarketDataAvailability => "market_data_availability",
      MarketDataField::CompanyName => "company_name",
      MarketDataField::AskExch => "ask_exch",
      MarketDataField::LastExch => "last_exch",
      MarketDataField::LastSize => "last_size",
      MarketDataField::BidExch => "bid_exch",
      MarketDataField::MarketDataAvailabilityOther => "market_data_availability_other",
      MarketDataField::PutCallInterest => "put_call_interest",
      MarketDataField::PutCallVolume => "put_call_volume",
      MarketDataField::HistoricVolumePercent => "historic_volume_percent",
      MarketDataField::HistoricVolumeClosePercent => "historic_volume_close_percent",
      MarketDataField::OptionVolume => "option_volume",
      MarketDataField::ContractIdAndExchange => "contract_id_and_exchange",
      MarketDataField::ContractDescription => "contract_description",
      MarketDataField::ContractDescriptionOther => "contract_description_other",
      MarketDataField::ListingExchange => "listing_exchange",
      MarketDataField::Industry => "industry",
      MarketDataField::Category => "category",
      MarketDataField::AverageVolume => "average_volume",
      MarketDataField::OptionImpliedVolatilityPercent => "option_implied_volatility_percent",
      MarketDataField::HistoricVolume => "historic_volume",
      MarketDataField::PutCallRatio => "put_call_ratio",
      MarketDataField::DividendAmount => "dividend_amount",
      MarketDataField::DividendYield => "dividend_yield",
      MarketDataField::Ex => "ex",
      MarketDataField::MarketCap => "market_cap",
      MarketDataField::PriceEarningsRatio => "price_earnings_ratio",
      MarketDataField::EarningsPerShare => "earnings_per_share",
      MarketDataField::CostBasis => "cost_basis",
      MarketDataField::FiftyTwoWeekLow => "fifty_two_week_low",
      MarketDataField::FiftyTwoWeekHigh => "fifty_two_week_high",
      MarketDataField::Open => "open",
      MarketDataField::Close => "close",
      MarketDataField::Delta => "delta",
      MarketDataField::Gamma => "gamma",
      MarketDataField::Theta => "theta",
      MarketDataField::Vega => "vega",
      MarketDataField::OptionVolumeChangePercent => "option_volume_change_percent",
      MarketDataField::ImpliedVolatilityPercent => "implied_volatility_percent",
      MarketDataField::Mark => "mark",
      MarketDataField::ShortableShares => "shortable_shares",
      MarketDataField::FeeRate => "fee_rate",
      MarketDataField::OptionOpenInterest => "option_open_interest",
      MarketDataField::PercentOfMarketValue => "percent_of_market_value",
      MarketDataField::Shortable => "shortable",
      MarketDataField::MorningstarRating => "morningstar_rating",
      MarketDataField::Dividends => "dividends",
      MarketDataField::DividendsTtm => "dividends_ttm",
      MarketDataField::EmaTwoHundred => "ema_two_hundred",
      MarketDataField::EmaOneHundred => "ema_one_hundred",
      MarketDataField::EmaFiftyDay => "ema_fifty_day",
      MarketDataField::EmaTwentyDay => "ema_twenty_day",
      MarketDataField::PriceEmaTwoHundredDay => "price_ema_two_hundred_day",
      MarketDataField::PriceEmaOneHundredDay => "price_ema_one_hundred_day",
      MarketDataField::PriceEmaFiftyDay => "price_ema_fifty_day",
      MarketDataField::PriceEmaTwentyDay => "price_ema_twenty_day",
      MarketDataField::ChangeSinceOpen => "change_since_open",
      MarketDataField::UpcomingEvent => "upcoming_event",
      MarketDataField::UpcomingEventDate => "upcoming_event_date",
      MarketDataField::UpcomingAnalystMeeting => "upcoming_analyst_meeting",
      MarketDataField::UpcomingEarnings => "upcoming_earnings",
      MarketDataField::UpcomingMiscEvents => "upcoming_misc_events",
      MarketDataField::RecentAnalystMeeting => "recent_analyst_meeting",
      MarketDataField::RecentEarnings => "recent_earnings",
      MarketDataField::RecentMiscEvents => "recent_misc_events",
      MarketDataField::ProbabilityOfMaxReturnCustomer => "probability_of_max_return_customer",
      MarketDataField::BreakEven => "break_even",
      MarketDataField::SpxDelta => "spx_delta",
      MarketDataField::FuturesOpenInterest => "futures_open_interest",
      MarketDataField::LastYield => "last_yield",
      MarketDataField::BidYield => "bid_yield",
      MarketDataField::ProbabilityMaxReturn => "probability_max_return",
      MarketDataField::ProbabilityMaxLoss => "probability_max_loss",
      MarketDataField::ProfitProbability => "profit_probability",
      MarketDataField::OrganizationType => "organization_type",
      MarketDataField::DebtClass => "debt_class",
      MarketDataField::Ratings => "ratings",
      MarketDataField::BondStateCode => "bond_state_code",
      MarketDataField::BondType => "bond_type",
      MarketDataField::LastTradingDate => "last_trading_date",
      MarketDataField::IssueDate => "issue_date",
      MarketDataField::Beta => "beta",
      MarketDataField::AskYield => "ask_yield",
      MarketDataField::PriorClose => "prior_close",
      MarketDataField::VolumeLong => "volume_long",
    }
  }

  /// Look a field up by its wire code.
  pub fn from_code(code: &str) -> Option<MarketDataField> {
    CODE_INDEX.get(code).copied()
  }
}

impl fmt::Display for MarketDataField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.code())
  }
}

static CODE_INDEX: Lazy<HashMap<&'static str, MarketDataField>> =
  Lazy::new(|| MarketDataField::ALL.iter().map(|field| (field.code(), *field)).collect());

// The gateway emits the raw (unformatted) volume under this suffixed key.
const RAW_VOLUME_KEY: &str = "87_raw";
const RAW_VOLUME_NAME: &str = "volume_raw";

/// Rename a snapshot record's numeric field codes to their semantic names.
/// Unknown keys pass through untouched.
pub fn rename_snapshot_keys(record: &Map<String, Value>) -> Map<String, Value> {
  record
    .iter()
    .map(|(key, value)| {
      let name = if key == RAW_VOLUME_KEY {
        RAW_VOLUME_NAME.to_string()
      } else {
        match MarketDataField::from_code(key) {
          Some(field) => field.field_name().to_string(),
          None => key.clone(),
        }
      };
      (name, value.clone())
    })
    .collect()
}

/// Default request fields for equity-like contracts.
pub fn default_equity_fields() -> Vec<MarketDataField> {
  vec![
    MarketDataField::Symbol,
    MarketDataField::LastPrice,
    MarketDataField::AskPrice,
    MarketDataField::BidPrice,
    MarketDataField::Volume,
    MarketDataField::Mark,
    MarketDataField::ChangePercent,
    MarketDataField::ChangeSinceOpen,
  ]
}

/// Default request fields for option contracts: the equity set plus greeks
/// and option activity.
pub fn default_option_fields() -> Vec<MarketDataField> {
  let mut fields = default_equity_fields();
  fields.extend([
    MarketDataField::Delta,
    MarketDataField::Theta,
    MarketDataField::Gamma,
    MarketDataField::Vega,
    MarketDataField::OptionOpenInterest,
    MarketDataField::OptionImpliedVolatilityPercent,
    MarketDataField::OptionVolume,
  ]);
  fields
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_code_lookup_roundtrip() {
    for field in MarketDataField::ALL {
      assert_eq!(MarketDataField::from_code(field.code()), Some(*field));
    }
    assert_eq!(MarketDataField::from_code("99999"), None);
  }

  #[test]
  fn test_codes_unique() {
    let mut seen = std::collections::HashSet::new();
    for field in MarketDataField::ALL {
      assert!(seen.insert(field.code()), "duplicate code {}", field.code());
    }
  }

  #[test]
  fn test_rename_snapshot_keys() {
    let record = json!({
      "31": 182.5,
      "55": "AAPL",
      "87_raw": 1234567.0,
      "6008": 265598,
      "unknownKey": "kept"
    });
    let renamed = rename_snapshot_keys(record.as_object().unwrap());
    assert_eq!(renamed.get("last_price"), Some(&json!(182.5)));
    assert_eq!(renamed.get("symbol"), Some(&json!("AAPL")));
    assert_eq!(renamed.get("volume_raw"), Some(&json!(1234567.0)));
    assert_eq!(renamed.get("conid"), Some(&json!(265598)));
    assert_eq!(renamed.get("unknownKey"), Some(&json!("kept")));
    assert!(renamed.get("31").is_none());
  }

  #[test]
  fn test_default_field_sets() {
    let equity = default_equity_fields();
    assert!(equity.contains(&MarketDataField::LastPrice));
    assert!(!equity.contains(&MarketDataField::Delta));

    let option = default_option_fields();
    assert!(option.contains(&MarketDataField::LastPrice));
    assert!(option.contains(&MarketDataField::Delta));
    assert!(option.contains(&MarketDataField::OptionOpenInterest));
    assert_eq!(option.len(), equity.len() + 7);
  }

  #[test]
  fn test_display_is_wire_code() {
    assert_eq!(MarketDataField::LastPrice.to_string(), "31");
    assert_eq!(MarketDataField::Vega.to_string(), "7311");
  }
}
