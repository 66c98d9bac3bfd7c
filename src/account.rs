//! Account balance, positions and summary

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::client::ApexClient;
use crate::helpers::{de_f64, de_opt_f64, de_opt_string, decode, decode_list};
use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountBalance {
    #[serde(rename = "totalEquityValue", alias = "totalEquity", deserialize_with = "de_f64")]
    pub total_equity: f64,
    #[serde(rename = "availableBalance", alias = "available", deserialize_with = "de_f64")]
    pub available: f64,
    #[serde(default, rename = "initialMargin", deserialize_with = "de_opt_f64")]
    pub initial_margin: Option<f64>,
    #[serde(
        default,
        rename = "unrealizedPnl",
        alias = "totalUnrealizedPnl",
        deserialize_with = "de_opt_f64"
    )]
    pub unrealized_pnl: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct UserInfo {
    #[serde(default, alias = "userId", deserialize_with = "de_opt_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    email: Option<String>,
}

/// A non-flat position
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// `LONG` or `SHORT`
    #[serde(default)]
    pub side: String,
    #[serde(deserialize_with = "de_f64")]
    pub size: f64,
    #[serde(default, rename = "entryPrice", deserialize_with = "de_opt_f64")]
    pub entry_price: Option<f64>,
}

#[derive(Deserialize)]
struct AccountPositions {
    #[serde(default)]
    positions: Option<Vec<Position>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSummary {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub balance: AccountBalance,
    /// Open orders across all symbols
    pub open_orders: usize,
}

pub struct Account {
    client: Arc<ApexClient>,
}

impl Account {
    pub fn new(client: Arc<ApexClient>) -> Self {
        Self { client }
    }

    pub async fn get_balance(&self) -> Result<AccountBalance> {
        decode(self.client.get_account_balance().await?)
    }

    /// Open positions. The account lists flat symbols with a zero size;
    /// those are dropped.
    pub async fn get_positions(&self) -> Result<Vec<Position>> {
        let account: AccountPositions = decode(self.client.get_account().await?)?;
        Ok(account
            .positions
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.size != 0.0)
            .collect())
    }

    /// User profile, balance and open-order count in one view. Three signed
    /// requests, stopping at the first failure.
    pub async fn get_summary(&self) -> Result<AccountSummary> {
        let user: UserInfo = decode(self.client.get_user().await?)?;
        let balance = self.get_balance().await?;
        let open_orders = decode_list::<Value>(self.client.get_open_orders().await?)?.len();
        Ok(AccountSummary {
            user_id: user.id,
            email: user.email,
            balance,
            open_orders,
        })
    }
}
