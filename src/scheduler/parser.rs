use std::time::Duration;
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde_json::{json, Value};
use crate::domain::{AdStatus, ListingSnapshot};

const PRICE_KEYS: [&str; 3] = ["price", "current_price", "priceValue"];
const VIEWS_TODAY_KEYS: [&str; 4] = ["views_today", "viewsToday", "views", "total_views"];
const TOTAL_VIEWS_KEYS: [&str; 2] = ["total_views", "totalViews"];
const STATUS_KEYS: [&str; 5] = ["status", "state", "is_active", "isActive", "active"];
const WRAPPER_KEYS: [&str; 2] = ["data", "result"];

static NUMBER_REGEXP: Lazy<Regex> = Lazy::new(||
    Regex::new(r"\d[\d\s\u{a0}\u{202f}]*")
        .expect("number regular expression must be valid")
);

/// Source of current values of an ad.
#[async_trait]
pub trait ListingParser: Send + Sync {
    async fn parse(&self, url: &str) -> anyhow::Result<ListingSnapshot>;
}

/// Client of the external parsing service.
pub struct PythonApiClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl PythonApiClient {
    pub fn new(base_url: &Url, timeout: Duration) -> anyhow::Result<Self> {
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: base_url.join("parse")?,
        })
    }
}

#[async_trait]
impl ListingParser for PythonApiClient {
    async fn parse(&self, url: &str) -> anyhow::Result<ListingSnapshot> {
        let resp: Value = self.client.post(self.endpoint.clone())
            .json(&json!({ "url": url }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if resp.get("success").and_then(Value::as_bool) == Some(false) {
            let message = resp.get("error").and_then(Value::as_str).unwrap_or("no details");
            bail!("the parsing service couldn't handle {url}: {message}")
        }
        let snapshot = normalize(&resp);
        if snapshot.is_empty() {
            return Err(anyhow!("the parsing service returned nothing useful for {url}"))
        }
        Ok(snapshot)
    }
}

/// Extracts known values from a response of the parsing service, tolerating different shapes of it.
pub fn normalize(resp: &Value) -> ListingSnapshot {
    let payload = WRAPPER_KEYS.iter()
        .find_map(|key| resp.get(key).filter(|v| v.is_object()))
        .unwrap_or(resp);
    ListingSnapshot {
        price: first_of(payload, &PRICE_KEYS).and_then(parse_number),
        views_today: first_of(payload, &VIEWS_TODAY_KEYS).and_then(parse_number).and_then(|v| i32::try_from(v).ok()),
        total_views: first_of(payload, &TOTAL_VIEWS_KEYS).and_then(parse_number).and_then(|v| i32::try_from(v).ok()),
        status: first_of(payload, &STATUS_KEYS)
            .map(AdStatus::from_json)
            .unwrap_or_default(),
    }
}

fn first_of<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| payload.get(key))
        .find(|v| !v.is_null())
}

fn parse_number(value: &Value) -> Option<i64> {
    let number = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => NUMBER_REGEXP.find(s)
            .map(|m| m.as_str().chars().filter(char::is_ascii_digit).collect::<String>())
            .and_then(|digits| digits.parse().ok()),
        _ => None
    };
    number.filter(|n| *n >= 0)
}
