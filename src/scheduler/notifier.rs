use async_trait::async_trait;
use rust_i18n::t;
use teloxide::Bot;
use teloxide::payloads::SendMessageSetters;
use teloxide::requests::Requester;
use teloxide::types::{ChatId, ParseMode};
use teloxide::utils::html;
use crate::domain::{AdId, AdStatus, ListingSnapshot, SupportedLanguage};
use crate::repo::{Ad, NotificationTarget};

/// Differences between the stored ad and a fresh snapshot of it that are worth telling the owner about.
#[derive(Debug, Clone, PartialEq)]
pub struct AdChange {
    pub ad_id: AdId,
    pub url: String,
    pub price: Option<(i64, i64)>,
    pub status: Option<AdStatus>,
}

impl AdChange {
    /// The first known price is not a change. Neither is the first known status unless the ad was removed.
    pub fn detect(ad: &Ad, snapshot: &ListingSnapshot) -> Option<Self> {
        let price = match (ad.price, snapshot.price) {
            (Some(old), Some(new)) if old != new => Some((old, new)),
            _ => None
        };
        let status = match (ad.status, snapshot.status) {
            (_, AdStatus::Unknown) => None,
            (old, new) if old == new => None,
            (AdStatus::Unknown, AdStatus::Active) => None,
            (_, new) => Some(new),
        };
        (price.is_some() || status.is_some()).then(|| Self {
            ad_id: ad.id,
            url: ad.url.clone(),
            price,
            status,
        })
    }

    pub fn render(&self, lang: SupportedLanguage) -> String {
        let locale = lang.to_string();
        let url = html::escape(&self.url);
        let mut parts = Vec::with_capacity(2);
        if let Some((old, new)) = self.price {
            parts.push(t!("notifications.price_changed", old = format_price(old), new = format_price(new), url = &url, locale = &locale));
        }
        if let Some(status) = self.status {
            let status = match status {
                AdStatus::Active => t!("statuses.active", locale = &locale),
                AdStatus::Inactive => t!("statuses.inactive", locale = &locale),
                AdStatus::Unknown => t!("statuses.unknown", locale = &locale),
            };
            parts.push(t!("notifications.status_changed", status = status, url = &url, locale = &locale));
        }
        parts.join("\n\n")
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, target: &NotificationTarget, change: &AdChange) -> anyhow::Result<()>;
}

pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str) -> Self {
        Self { bot: Bot::new(bot_token) }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, target: &NotificationTarget, change: &AdChange) -> anyhow::Result<()> {
        let lang = SupportedLanguage::from_language_code(target.language_code.as_deref());
        self.bot.send_message(ChatId(target.tg_user_id), change.render(lang))
            .parse_mode(ParseMode::Html)
            .disable_notification(change.price.is_none())
            .await?;
        Ok(())
    }
}

/// Separates groups of thousands with a space: `12500000` becomes `12 500 000 ₽`.
pub fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    let sign = if price < 0 { "-" } else { "" };
    format!("{sign}{grouped} ₽")
}
