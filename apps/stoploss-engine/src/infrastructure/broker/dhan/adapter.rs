//! `BrokerPort` and backup-quote implementation for Dhan.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::application::ports::{
    BrokerError, BrokerPort, OrderAck, QuoteError, QuoteProviderPort, SellOrder,
};
use crate::domain::{PortfolioSnapshot, Symbol};

use super::api_types::{
    DhanEnvelope, FundLimitData, HoldingEntry, LtpData, OrderRequest, OrderResponseData,
};
use super::config::DhanConfig;
use super::error::DhanError;
use super::http_client::DhanHttpClient;

/// Broker adapter for the Dhan REST API.
///
/// Also serves as a backup quote provider: the marketfeed LTP endpoint is
/// keyed by security ID, so the adapter remembers the symbol-to-ID mapping
/// from the most recent holdings fetch.
pub struct DhanBrokerAdapter {
    http: DhanHttpClient,
    client_id: String,
    security_ids: RwLock<HashMap<Symbol, String>>,
}

impl DhanBrokerAdapter {
    /// Create an adapter from config.
    pub fn new(config: &DhanConfig) -> Result<Self, DhanError> {
        Ok(Self {
            http: DhanHttpClient::new(config)?,
            client_id: config.client_id.clone(),
            security_ids: RwLock::new(HashMap::new()),
        })
    }

    fn remember_security_ids(&self, snapshot: &PortfolioSnapshot) {
        if let Ok(mut ids) = self.security_ids.write() {
            for position in &snapshot.positions {
                ids.insert(position.symbol.clone(), position.security_id.clone());
            }
        }
    }

    fn security_id_for(&self, symbol: &Symbol) -> Option<String> {
        self.security_ids
            .read()
            .ok()
            .and_then(|ids| ids.get(symbol).cloned())
    }
}

#[async_trait]
impl BrokerPort for DhanBrokerAdapter {
    async fn get_holdings(&self) -> Result<PortfolioSnapshot, BrokerError> {
        let envelope: DhanEnvelope<Vec<HoldingEntry>> = self.http.get("/holdings").await?;
        let entries = envelope.into_data()?;

        let mut positions = Vec::with_capacity(entries.len());
        for entry in entries {
            positions.push(entry.into_position()?);
        }

        let snapshot = PortfolioSnapshot::new(positions);
        self.remember_security_ids(&snapshot);
        tracing::debug!(positions = snapshot.positions.len(), "holdings fetched");
        Ok(snapshot)
    }

    async fn get_available_funds(&self) -> Result<Decimal, BrokerError> {
        let envelope: DhanEnvelope<FundLimitData> = self.http.get("/fundlimit").await?;
        Ok(envelope.into_data()?.available_balance)
    }

    async fn place_market_sell(&self, order: &SellOrder) -> Result<OrderAck, BrokerError> {
        let request = OrderRequest::market_sell(&self.client_id, &order.security_id, order.quantity);

        let envelope: DhanEnvelope<OrderResponseData> =
            self.http.post("/orders", &request).await?;
        let data = envelope.into_data()?;

        tracing::info!(
            symbol = %order.symbol,
            order_id = %data.order_id,
            status = %data.order_status,
            "sell order placed"
        );

        Ok(OrderAck {
            order_id: data.order_id,
            status: data.order_status,
        })
    }
}

#[async_trait]
impl QuoteProviderPort for DhanBrokerAdapter {
    fn name(&self) -> &str {
        "dhan"
    }

    async fn last_price(&self, symbol: &Symbol) -> Result<Decimal, QuoteError> {
        let Some(security_id) = self.security_id_for(symbol) else {
            // No holdings fetch has mentioned this symbol yet.
            return Err(QuoteError::Unavailable {
                symbol: symbol.to_string(),
            });
        };

        let id: i64 = security_id
            .parse()
            .map_err(|_| QuoteError::Unavailable {
                symbol: symbol.to_string(),
            })?;
        let body = serde_json::json!({ "NSE_EQ": [id] });

        let envelope: DhanEnvelope<LtpData> = self
            .http
            .post("/marketfeed/ltp", &body)
            .await
            .map_err(QuoteError::from)?;
        let data = envelope.into_data().map_err(QuoteError::from)?;

        data.get("NSE_EQ")
            .and_then(|segment| segment.get(&security_id))
            .map(|tick| tick.last_price)
            .ok_or_else(|| QuoteError::Unavailable {
                symbol: symbol.to_string(),
            })
    }
}
