//! Dhan API wire types.
//!
//! Field names follow the documented JSON verbatim, including the
//! `availabelBalance` misspelling the fund-limit endpoint actually returns.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Position, Symbol};

use super::error::DhanError;

/// Standard Dhan response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct DhanEnvelope<T> {
    /// `"success"` or `"failure"`.
    pub status: String,
    /// Payload, present on success.
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// Error detail on failure. String or object depending on the endpoint.
    #[serde(default)]
    pub remarks: Option<serde_json::Value>,
}

impl<T> DhanEnvelope<T> {
    /// Unwrap the payload, turning a non-success envelope into an API error.
    pub fn into_data(self) -> Result<T, DhanError> {
        if !self.status.eq_ignore_ascii_case("success") {
            let remarks = self
                .remarks
                .map_or_else(|| "no remarks".to_string(), |v| v.to_string());
            return Err(DhanError::Api {
                code: self.status,
                message: remarks,
            });
        }

        self.data
            .ok_or_else(|| DhanError::UnexpectedResponse("success envelope without data".to_string()))
    }
}

/// One holding from `GET /holdings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingEntry {
    /// Exchange trading symbol.
    pub trading_symbol: String,
    /// Broker security identifier, required for orders and quotes.
    pub security_id: String,
    /// Total held quantity.
    pub total_qty: i64,
    /// Per-unit acquisition cost.
    pub avg_cost_price: Decimal,
    /// Last traded price as of the snapshot. Often zero off-hours.
    #[serde(default)]
    pub last_price: Decimal,
}

impl HoldingEntry {
    /// Convert to a domain position, rejecting quantities the engine cannot
    /// represent.
    pub fn into_position(self) -> Result<Position, DhanError> {
        let quantity = u64::try_from(self.total_qty).map_err(|_| {
            DhanError::UnexpectedResponse(format!(
                "negative quantity {} for {}",
                self.total_qty, self.trading_symbol
            ))
        })?;

        Ok(Position {
            symbol: Symbol::new(self.trading_symbol),
            security_id: self.security_id,
            quantity,
            average_cost: self.avg_cost_price,
            last_price: self.last_price,
        })
    }
}

/// Payload of `GET /fundlimit`.
#[derive(Debug, Clone, Deserialize)]
pub struct FundLimitData {
    /// Withdrawable balance. The field name misspelling is the API's.
    #[serde(rename = "availabelBalance")]
    pub available_balance: Decimal,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Dhan client ID.
    pub dhan_client_id: String,
    /// Always `SELL` for this engine.
    pub transaction_type: &'static str,
    /// Exchange segment.
    pub exchange_segment: &'static str,
    /// Product type; `CNC` for delivery holdings.
    pub product_type: &'static str,
    /// Order type.
    pub order_type: &'static str,
    /// Order validity.
    pub validity: &'static str,
    /// Broker security identifier.
    pub security_id: String,
    /// Quantity to sell.
    pub quantity: u64,
    /// Zero is the market-order sentinel; the exchange determines the fill
    /// price.
    pub price: u32,
}

impl OrderRequest {
    /// Build a full-quantity market sell in the delivery segment.
    #[must_use]
    pub fn market_sell(client_id: &str, security_id: &str, quantity: u64) -> Self {
        Self {
            dhan_client_id: client_id.to_string(),
            transaction_type: "SELL",
            exchange_segment: "NSE_EQ",
            product_type: "CNC",
            order_type: "MARKET",
            validity: "DAY",
            security_id: security_id.to_string(),
            quantity,
            price: 0,
        }
    }
}

/// Payload of the `POST /orders` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponseData {
    /// Broker-assigned order ID.
    pub order_id: String,
    /// Initial order status (e.g. `TRANSIT`).
    pub order_status: String,
}

/// Payload of `POST /marketfeed/ltp`: segment -> security ID -> tick.
pub type LtpData = HashMap<String, HashMap<String, LtpTick>>;

/// One last-traded-price tick.
#[derive(Debug, Clone, Deserialize)]
pub struct LtpTick {
    /// Last traded price.
    pub last_price: Decimal,
}
