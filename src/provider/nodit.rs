//! Nodit Web3 Data API client
//!
//! Fetches account transactions and token transfers, normalizes them into
//! [`Transaction`] records and caches raw responses for a short TTL.

use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

use super::{DataProvider, ProviderError, RateLimiter, ResponseCache};
use crate::config::ProviderConfig;
use crate::models::{Direction, Transaction, TxKind};
use crate::utils::{scale_raw_amount, NATIVE_DECIMALS};

const NATIVE_ENDPOINT: &str = "/blockchain/getTransactionsByAccount";
const TOKEN_ENDPOINT: &str = "/token/getTokenTransfersByAccount";
const NATIVE_SYMBOL: &str = "ETH";

/// Nodit Data API client
pub struct NoditClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    cache: ResponseCache,
    rate_limiter: RateLimiter,
    min_native_value: Decimal,
    token_allowlist: HashSet<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNativeTx {
    transaction_hash: Option<String>,
    from: Option<String>,
    to: Option<String>,
    value: Option<Value>,
    timestamp: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenTransfer {
    transaction_hash: Option<String>,
    from: Option<String>,
    to: Option<String>,
    value: Option<Value>,
    timestamp: Option<Value>,
    contract: Option<RawContract>,
}

#[derive(Debug, Deserialize)]
struct RawContract {
    address: Option<String>,
    symbol: Option<String>,
    decimals: Option<Value>,
}

impl NoditClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let min_native_value =
            Decimal::from_f64_retain(config.min_native_value).unwrap_or(Decimal::ZERO);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            cache: ResponseCache::new(
                config.cache_capacity,
                Duration::from_secs(config.cache_ttl_secs),
            ),
            rate_limiter: RateLimiter::new(config.rate_limit_per_second, 1),
            min_native_value,
            token_allowlist: config
                .token_allowlist
                .iter()
                .map(|a| a.to_ascii_lowercase())
                .collect(),
        })
    }

    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .map(|k| !k.expose_secret().is_empty())
            .unwrap_or(false)
    }

    async fn call_data_api(
        &self,
        address: &str,
        endpoint: &str,
        limit: usize,
    ) -> Result<Value, ProviderError> {
        let key = ResponseCache::key(address, endpoint, limit);
        if let Some(cached) = self.cache.get(&key) {
            tracing::trace!(endpoint, wallet = %address, "Using cached provider response");
            return Ok(cached);
        }

        self.rate_limiter.acquire().await;

        let url = format!("{}{}", self.base_url, endpoint);
        let body = json!({ "accountAddress": address, "rpp": limit });

        let mut request = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.header("X-API-KEY", api_key.expose_secret().as_str());
        }

        let response = request.send().await.map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, body });
        }

        let data: Value = response.json().await.map_err(map_reqwest_error)?;
        self.cache.set(key, data.clone());
        Ok(data)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else if e.is_decode() {
        ProviderError::Decode(e.to_string())
    } else {
        ProviderError::Http(e)
    }
}

fn response_items(data: &Value) -> &[Value] {
    data.get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Raw integer amount as a string; providers send either strings or numbers
fn raw_amount(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Unix seconds (number or numeric string) or an RFC 3339 string
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0),
        Value::String(s) => match s.parse::<i64>() {
            Ok(secs) => DateTime::from_timestamp(secs, 0),
            Err(_) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        },
        _ => None,
    }
}

fn parse_decimals(value: Option<&Value>) -> Option<u32> {
    match value {
        None | Some(Value::Null) => Some(NATIVE_DECIMALS),
        Some(Value::Number(n)) => n.as_u64().and_then(|d| u32::try_from(d).ok()),
        Some(Value::String(s)) => s.parse().ok(),
        Some(_) => None,
    }
}

fn direction_for(address: &str, from: &str, to: &str) -> Option<Direction> {
    if from.eq_ignore_ascii_case(address) {
        Some(Direction::Out)
    } else if to.eq_ignore_ascii_case(address) {
        Some(Direction::In)
    } else {
        None
    }
}

/// Normalize native transactions; malformed or unrelated records are dropped
pub(crate) fn normalize_native(
    address: &str,
    items: &[Value],
    min_value: Decimal,
) -> Vec<Transaction> {
    let mut transactions: Vec<Transaction> = items
        .iter()
        .filter_map(|item| {
            let raw: RawNativeTx = serde_json::from_value(item.clone()).ok()?;
            let hash = raw.transaction_hash?;
            let from = raw.from?;
            let to = raw.to?;
            let direction = direction_for(address, &from, &to)?;
            let value = scale_raw_amount(&raw_amount(raw.value.as_ref()?)?, NATIVE_DECIMALS)?;
            if value <= min_value {
                return None;
            }
            let timestamp = parse_timestamp(raw.timestamp.as_ref()?)?;
            Some(Transaction {
                hash,
                direction,
                value,
                token_symbol: NATIVE_SYMBOL.to_string(),
                from,
                to,
                timestamp,
                kind: TxKind::Native,
            })
        })
        .collect();
    transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    transactions
}

/// Normalize token transfers; malformed, unrelated or non-allowlisted records are dropped
pub(crate) fn normalize_tokens(
    address: &str,
    items: &[Value],
    allowlist: &HashSet<String>,
) -> Vec<Transaction> {
    let mut transactions: Vec<Transaction> = items
        .iter()
        .filter_map(|item| {
            let raw: RawTokenTransfer = serde_json::from_value(item.clone()).ok()?;
            let contract = raw.contract?;
            if !allowlist.is_empty() {
                let contract_address = contract.address.as_deref()?.to_ascii_lowercase();
                if !allowlist.contains(&contract_address) {
                    return None;
                }
            }
            let hash = raw.transaction_hash?;
            let from = raw.from?;
            let to = raw.to?;
            let direction = direction_for(address, &from, &to)?;
            let decimals = parse_decimals(contract.decimals.as_ref())?;
            let value = scale_raw_amount(&raw_amount(raw.value.as_ref()?)?, decimals)?;
            let timestamp = parse_timestamp(raw.timestamp.as_ref()?)?;
            Some(Transaction {
                hash,
                direction,
                value,
                token_symbol: contract.symbol.unwrap_or_else(|| "TOKEN".to_string()),
                from,
                to,
                timestamp,
                kind: TxKind::Token,
            })
        })
        .collect();
    transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    transactions
}

#[async_trait::async_trait]
impl DataProvider for NoditClient {
    async fn list_native_transactions(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<Transaction>, ProviderError> {
        let data = self.call_data_api(address, NATIVE_ENDPOINT, limit).await?;
        let items = response_items(&data);
        let transactions = normalize_native(address, items, self.min_native_value);
        tracing::debug!(
            wallet = %address,
            raw = items.len(),
            kept = transactions.len(),
            "Fetched native transactions"
        );
        Ok(transactions)
    }

    async fn list_token_transfers(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<Transaction>, ProviderError> {
        let data = self.call_data_api(address, TOKEN_ENDPOINT, limit).await?;
        let items = response_items(&data);
        let transactions = normalize_tokens(address, items, &self.token_allowlist);
        tracing::debug!(
            wallet = %address,
            raw = items.len(),
            kept = transactions.len(),
            "Fetched token transfers"
        );
        Ok(transactions)
    }

    fn invalidate(&self, address: &str) {
        self.cache.invalidate_address(address);
    }
}
