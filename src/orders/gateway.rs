use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;
use uuid::Uuid;

use crate::client::ApexClient;
use crate::helpers::{decode_list, float_to_string, unwrap_data, value_to_f64};
use crate::prelude::*;
use crate::req::RequestParams;

use super::types::{CancelAck, CancelAllResult, Fill, LimitOrderOptions, Order, OrderSide};

/// Typed order placement, cancellation and queries. One call is one signed
/// request; nothing is batched or retried.
pub struct OrderGateway {
    client: Arc<ApexClient>,
}

impl OrderGateway {
    pub fn new(client: Arc<ApexClient>) -> Self {
        Self { client }
    }

    pub async fn place_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        size: f64,
        price: f64,
        options: LimitOrderOptions,
    ) -> Result<Order> {
        validate_symbol(symbol)?;
        let size_text = wire_decimal("size", size)?;
        let price_text = wire_decimal("price", price)?;

        let client_order_id = options
            .client_order_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let params = RequestParams::new()
            .with("symbol", symbol)
            .with("side", side.as_str())
            .with("type", "LIMIT")
            .with("size", size_text)
            .with("price", price_text)
            .with("timeInForce", options.time_in_force.as_str())
            .with("clientOrderId", client_order_id.as_str())
            .with_opt("reduceOnly", options.reduce_only.then_some("true"));

        let response = unwrap_data(self.client.create_order(params).await?);

        let order = match serde_json::from_value::<Order>(response.clone()) {
            Ok(mut order) => {
                if order.symbol.is_empty() {
                    order.symbol = symbol.to_string();
                }
                if order.client_order_id.is_none() {
                    order.client_order_id = Some(client_order_id);
                }
                order
            }
            // Some acks only carry the id; fill the rest in from what was sent
            Err(_) => Order {
                order_id: order_id_from(&response)?,
                client_order_id: Some(client_order_id),
                symbol: symbol.to_string(),
                side,
                size,
                price,
                status: response
                    .get("status")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                filled_size: None,
            },
        };

        info!(
            "Placed {} {} {} @ {} (id {})",
            order.side, order.size, order.symbol, order.price, order.order_id
        );
        Ok(order)
    }

    pub async fn cancel_order(&self, order_id: &str) -> Result<CancelAck> {
        if order_id.trim().is_empty() {
            return Err(Error::Validation("order id cannot be empty".into()));
        }
        self.client.cancel_order(order_id).await?;
        debug!("Cancelled order {}", order_id);
        Ok(CancelAck {
            order_id: order_id.to_string(),
        })
    }

    /// Cancel every open order, optionally only for `symbol`. Succeeds with a
    /// zero count when nothing was open.
    pub async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<CancelAllResult> {
        if let Some(symbol) = symbol {
            validate_symbol(symbol)?;
        }
        let response = unwrap_data(self.client.cancel_all_orders(symbol).await?);
        let result = CancelAllResult {
            cancelled_count: cancelled_count(&response),
        };
        info!(
            "Cancelled {} open orders{}",
            result.cancelled_count,
            symbol.map(|s| format!(" for {}", s)).unwrap_or_default()
        );
        Ok(result)
    }

    pub async fn list_open_orders(&self) -> Result<Vec<Order>> {
        decode_list(self.client.get_open_orders().await?)
    }

    pub async fn list_fills(&self, symbol: Option<&str>, limit: Option<u32>) -> Result<Vec<Fill>> {
        if let Some(symbol) = symbol {
            validate_symbol(symbol)?;
        }
        if limit == Some(0) {
            return Err(Error::Validation("limit must be at least 1".into()));
        }
        let params = RequestParams::new()
            .with_opt("symbol", symbol)
            .with_opt("limit", limit);
        decode_list(self.client.get_fills(params).await?)
    }
}

fn validate_symbol(symbol: &str) -> Result<()> {
    if symbol.trim().is_empty() {
        return Err(Error::Validation("symbol cannot be empty".into()));
    }
    Ok(())
}

fn validate_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::Validation(format!(
            "{} must be a positive number, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Validate and render a decimal field. The rendered text must still be
/// positive, so nothing rounds down to zero on the wire.
fn wire_decimal(name: &str, value: f64) -> Result<String> {
    validate_positive(name, value)?;
    let text = float_to_string(value);
    match text.parse::<f64>() {
        Ok(parsed) if parsed > 0.0 => Ok(text),
        _ => Err(Error::Validation(format!(
            "{} {} does not render as a positive decimal",
            name, value
        ))),
    }
}

fn order_id_from(response: &Value) -> Result<String> {
    ["id", "orderId"]
        .iter()
        .find_map(|key| match response.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .ok_or_else(|| Error::JsonParse(format!("order response has no id: {response}")))
}

/// The bulk cancel ack is either the list of cancelled orders, an object
/// with a count, or nothing at all when no orders were open.
fn cancelled_count(response: &Value) -> u32 {
    match response {
        Value::Array(list) => list.len() as u32,
        Value::Object(map) => map
            .get("cancelledCount")
            .or_else(|| map.get("count"))
            .and_then(value_to_f64)
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(0),
        _ => 0,
    }
}
