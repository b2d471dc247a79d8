mod parser;
mod notifier;

use std::sync::Arc;
use std::time::Duration;
use anyhow::anyhow;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use crate::config::AppConfig;
use crate::metrics;
use crate::repo::{Ad, Repositories};

pub use parser::*;
pub use notifier::*;

const FALLBACK_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Daily job asking the sources of tracked ads about their current state.
pub struct Scheduler {
    repos: Repositories,
    parser: Arc<dyn ListingParser>,
    notifier: Option<Arc<dyn Notifier>>,
    run_at: NaiveTime,
    delay: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub checked: usize,
    pub changed: usize,
    pub failed: usize,
}

impl Scheduler {
    pub fn new(repos: Repositories, parser: Arc<dyn ListingParser>, notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            repos,
            parser,
            notifier,
            run_at: NaiveTime::MIN,
            delay: Duration::ZERO,
        }
    }

    pub fn from_config(repos: Repositories, config: &AppConfig) -> anyhow::Result<Self> {
        let scheduler_config = &config.scheduler;
        let parser_url = scheduler_config.parser_url.as_ref()
            .ok_or_else(|| anyhow!("the URL of the parsing service is not set"))?;
        let parser = PythonApiClient::new(parser_url, scheduler_config.request_timeout)?;
        let notifier = config.bot_token.as_deref()
            .map(|token| Arc::new(TelegramNotifier::new(token)) as Arc<dyn Notifier>);
        if notifier.is_none() {
            log::warn!("the owners of ads won't be notified about changes since the bot token is not set");
        }
        let mut scheduler = Self::new(repos, Arc::new(parser), notifier);
        scheduler.run_at = scheduler_config.run_at.0;
        scheduler.delay = scheduler_config.delay;
        Ok(scheduler)
    }

    pub async fn run(self) {
        log::info!("the scheduler is started, the checks run daily at {} UTC", self.run_at);
        loop {
            let wait = next_run_delay(Utc::now(), self.run_at);
            log::info!("next check of the ads in {} hours {} minutes", wait.as_secs() / 3600, (wait.as_secs() % 3600) / 60);
            tokio::time::sleep(wait).await;

            let report = self.run_batch().await;
            log::info!("checked ads: {}, changed: {}, failed: {}", report.checked, report.changed, report.failed);
            match self.repos.sessions.delete_expired().await {
                Ok(0) => {}
                Ok(n) => log::info!("{n} expired sessions were removed"),
                Err(e) => log::error!("couldn't remove expired sessions: {e}"),
            }
        }
    }

    /// Checks pollable ads one by one. A failed check is logged and doesn't stop the batch.
    pub async fn run_batch(&self) -> BatchReport {
        let mut report = BatchReport::default();
        let ads = match self.repos.ads.list_for_polling().await {
            Ok(ads) => ads,
            Err(e) => {
                log::error!("couldn't fetch the ads to check: {e:#}");
                return report
            }
        };
        for (i, ad) in ads.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let res = self.check(ad).await;
            metrics::AD_CHECKS_COUNTER.record(&res);
            match res {
                Ok(changed) => {
                    report.checked += 1;
                    if changed {
                        report.changed += 1;
                    }
                }
                Err(e) => {
                    log::error!("couldn't check the ad {} ({}): {e:#}", ad.id, ad.url);
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn check(&self, ad: &Ad) -> anyhow::Result<bool> {
        let snapshot = self.parser.parse(&ad.url).await?;
        self.repos.ads.apply_check(ad.id, &snapshot).await?;

        let Some(change) = AdChange::detect(ad, &snapshot) else {
            return Ok(false)
        };
        log::info!("the ad {} has changed: {change:?}", ad.id);
        if let Err(e) = self.notify(ad, &change).await {
            log::error!("couldn't notify about the change of the ad {}: {e:#}", ad.id);
        }
        Ok(true)
    }

    async fn notify(&self, ad: &Ad, change: &AdChange) -> anyhow::Result<()> {
        let Some(notifier) = &self.notifier else {
            return Ok(())
        };
        let Some(target) = self.repos.users.find_notification_target(ad.flat_id).await? else {
            log::debug!("the owner of the flat {} is not bound to Telegram", ad.flat_id);
            return Ok(())
        };
        let res = notifier.notify(&target, change).await;
        metrics::NOTIFICATIONS_COUNTER.record(&res);
        res
    }
}

/// Time left until the nearest `run_at` strictly after `now`.
pub fn next_run_delay(now: DateTime<Utc>, run_at: NaiveTime) -> Duration {
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(run_at));
    let next = if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or(FALLBACK_DELAY)
}

#[cfg(test)]
mod test {
    use std::time::Duration;
    use chrono::{NaiveTime, TimeZone, Utc};
    use super::next_run_delay;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn later_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 1, 30, 0).unwrap();
        assert_eq!(next_run_delay(now, time(3, 0)), Duration::from_secs(90 * 60));
    }

    #[test]
    fn tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap();
        assert_eq!(next_run_delay(now, time(3, 0)), Duration::from_secs(24 * 3600));

        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(next_run_delay(now, time(0, 0)), Duration::from_secs(60));
    }
}
