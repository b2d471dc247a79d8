use std::collections::BTreeMap;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use crate::repo::TelegramProfile;

type HmacSha256 = Hmac<Sha256>;

const MAX_AUTH_AGE_HOURS: i64 = 24;
const MAX_CLOCK_SKEW_MINUTES: i64 = 5;

/// Payload of the Telegram Login Widget.
#[derive(Deserialize, Debug, Clone)]
pub struct TelegramLoginData {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub language_code: Option<String>,
    pub auth_date: i64,
    pub hash: String,
    /// Fields the widget may add later; they are signed as well.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum AuthError {
    #[display("the hash is not a valid hex string")]
    MalformedHash,
    #[display("the hash doesn't match the data")]
    InvalidHash,
    #[display("the authorization data is outdated")]
    Expired,
    #[display("the authorization date is in the future")]
    FromFuture,
}

#[derive(Clone)]
pub struct TelegramAuth {
    secret: Option<Vec<u8>>,
}

impl TelegramLoginData {
    /// Sorted `key=value` lines of all received fields except the hash.
    pub fn data_check_string(&self) -> String {
        let mut fields: BTreeMap<&str, String> = self.extra.iter()
            .filter_map(|(key, value)| field_value(value).map(|v| (key.as_str(), v)))
            .collect();
        fields.insert("auth_date", self.auth_date.to_string());
        fields.insert("first_name", self.first_name.clone());
        fields.insert("id", self.id.to_string());
        let optional = [
            ("language_code", &self.language_code),
            ("last_name", &self.last_name),
            ("photo_url", &self.photo_url),
            ("username", &self.username),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                fields.insert(key, value.clone());
            }
        }
        fields.into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn auth_date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.auth_date, 0)
    }
}

fn field_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl From<TelegramLoginData> for TelegramProfile {
    fn from(value: TelegramLoginData) -> Self {
        let auth_date = value.auth_date();
        Self {
            tg_user_id: value.id,
            username: value.username,
            first_name: value.first_name,
            last_name: value.last_name,
            photo_url: value.photo_url,
            language_code: value.language_code,
            auth_date,
        }
    }
}

impl TelegramAuth {
    pub fn new(bot_token: Option<&str>) -> Self {
        let secret = bot_token.map(|token| Sha256::digest(token.as_bytes()).to_vec());
        Self { secret }
    }

    pub fn verify(&self, data: &TelegramLoginData, now: DateTime<Utc>) -> Result<(), AuthError> {
        let Some(secret) = &self.secret else {
            log::warn!("skipping verification of the login data of {}", data.id);
            return Ok(())
        };

        let expected = hex::decode(data.hash.trim()).map_err(|_| AuthError::MalformedHash)?;
        let mut mac = HmacSha256::new_from_slice(secret)
            .map_err(|_| AuthError::InvalidHash)?;
        mac.update(data.data_check_string().as_bytes());
        mac.verify_slice(&expected).map_err(|_| AuthError::InvalidHash)?;

        let age = now.timestamp() - data.auth_date;
        if age > Duration::hours(MAX_AUTH_AGE_HOURS).num_seconds() {
            Err(AuthError::Expired)
        } else if age < -Duration::minutes(MAX_CLOCK_SKEW_MINUTES).num_seconds() {
            Err(AuthError::FromFuture)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;
    use chrono::{Duration, Utc};
    use hmac::Mac;
    use serde_json::json;
    use sha2::{Digest, Sha256};
    use super::{AuthError, HmacSha256, TelegramAuth, TelegramLoginData};

    const BOT_TOKEN: &str = "123456:TEST-token";

    fn signed_login_data(bot_token: &str, auth_date: i64) -> TelegramLoginData {
        let mut data = TelegramLoginData {
            id: 42,
            first_name: "Иван".to_owned(),
            last_name: None,
            username: Some("ivan".to_owned()),
            photo_url: None,
            language_code: Some("ru".to_owned()),
            auth_date,
            hash: String::new(),
            extra: BTreeMap::new(),
        };
        sign(bot_token, &mut data);
        data
    }

    fn sign(bot_token: &str, data: &mut TelegramLoginData) {
        let secret = Sha256::digest(bot_token.as_bytes());
        let mut mac = HmacSha256::new_from_slice(&secret).unwrap();
        mac.update(data.data_check_string().as_bytes());
        data.hash = hex::encode(mac.finalize().into_bytes());
    }

    #[test]
    fn data_check_string() {
        let data = signed_login_data(BOT_TOKEN, 1_700_000_000);
        assert_eq!(data.data_check_string(),
                   "auth_date=1700000000\nfirst_name=Иван\nid=42\nlanguage_code=ru\nusername=ivan");
    }

    #[test]
    fn valid_signature() {
        let now = Utc::now();
        let data = signed_login_data(BOT_TOKEN, now.timestamp() - 60);
        assert!(TelegramAuth::new(Some(BOT_TOKEN)).verify(&data, now).is_ok());
    }

    #[test]
    fn tampered_data() {
        let now = Utc::now();
        let mut data = signed_login_data(BOT_TOKEN, now.timestamp());
        data.username = Some("mallory".to_owned());
        let auth = TelegramAuth::new(Some(BOT_TOKEN));
        assert!(matches!(auth.verify(&data, now), Err(AuthError::InvalidHash)));

        data.hash = "not hex".to_owned();
        assert!(matches!(auth.verify(&data, now), Err(AuthError::MalformedHash)));
    }

    #[test]
    fn another_bot() {
        let now = Utc::now();
        let data = signed_login_data("654321:another", now.timestamp());
        assert!(matches!(TelegramAuth::new(Some(BOT_TOKEN)).verify(&data, now), Err(AuthError::InvalidHash)));
    }

    #[test]
    fn outdated_data() {
        let now = Utc::now();
        let data = signed_login_data(BOT_TOKEN, (now - Duration::hours(25)).timestamp());
        assert!(matches!(TelegramAuth::new(Some(BOT_TOKEN)).verify(&data, now), Err(AuthError::Expired)));
    }

    #[test]
    fn data_from_future() {
        let now = Utc::now();
        let auth = TelegramAuth::new(Some(BOT_TOKEN));
        let data = signed_login_data(BOT_TOKEN, (now + Duration::hours(1)).timestamp());
        assert!(matches!(auth.verify(&data, now), Err(AuthError::FromFuture)));

        let data = signed_login_data(BOT_TOKEN, (now + Duration::minutes(1)).timestamp());
        assert!(auth.verify(&data, now).is_ok());
    }

    #[test]
    fn unknown_fields_are_signed() {
        let now = Utc::now();
        let raw = json!({
            "id": 42,
            "first_name": "Иван",
            "username": "ivan",
            "auth_date": now.timestamp(),
            "allows_write_to_pm": true,
            "hash": "",
        });
        let mut data: TelegramLoginData = serde_json::from_value(raw).unwrap();
        assert!(data.data_check_string().starts_with("allows_write_to_pm=true\nauth_date="));

        sign(BOT_TOKEN, &mut data);
        let auth = TelegramAuth::new(Some(BOT_TOKEN));
        assert!(auth.verify(&data, now).is_ok());

        data.extra.remove("allows_write_to_pm");
        assert!(matches!(auth.verify(&data, now), Err(AuthError::InvalidHash)));
    }

    #[test]
    fn no_token_no_verification() {
        let mut data = signed_login_data(BOT_TOKEN, 0);
        data.hash = "garbage".to_owned();
        assert!(TelegramAuth::new(None).verify(&data, Utc::now()).is_ok());
    }
}
