use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use once_cell::sync::Lazy;
use prometheus::{Encoder, Opts, TextEncoder};

/// Register additional metrics of our own structs by using this registry instance.
static REGISTRY: Lazy<Registry> = Lazy::new(|| Registry(prometheus::Registry::new()));

pub static DISTRICT_STATS_COUNTER: Lazy<ComplexCommandCounters> = Lazy::new(|| {
    let opts = Opts::new("district_stats_requests_total", "count of district statistics requests and successes");
    ComplexCommandCounters {
        invoked: Counter::new("district_stats (invoked)", opts.clone().const_label("state", "invoked")),
        finished: Counter::new("district_stats (finished)", opts.const_label("state", "finished")),
    }
});
pub static LOGINS_COUNTER: Lazy<Counter> = Lazy::new(|| {
    Counter::new("telegram_logins", Opts::new("telegram_logins_total", "count of successful logins via Telegram"))
});
pub static FLATS_COUNTER: Lazy<CrudCounters> = Lazy::new(|| {
    let opts = Opts::new("user_flats_changes_total", "count of created and deleted user flats");
    CrudCounters {
        created: Counter::new("user_flats (created)", opts.clone().const_label("action", "created")),
        deleted: Counter::new("user_flats (deleted)", opts.const_label("action", "deleted")),
    }
});
pub static ADS_COUNTER: Lazy<CrudCounters> = Lazy::new(|| {
    let opts = Opts::new("ads_changes_total", "count of created and deleted ads");
    CrudCounters {
        created: Counter::new("ads (created)", opts.clone().const_label("action", "created")),
        deleted: Counter::new("ads (deleted)", opts.const_label("action", "deleted")),
    }
});
pub static AD_CHECKS_COUNTER: Lazy<OutcomeCounters> = Lazy::new(|| {
    let opts = Opts::new("ad_checks_total", "count of ads checked by the scheduler");
    OutcomeCounters {
        succeeded: Counter::new("ad_checks (succeeded)", opts.clone().const_label("result", "succeeded")),
        failed: Counter::new("ad_checks (failed)", opts.const_label("result", "failed")),
    }
});
pub static NOTIFICATIONS_COUNTER: Lazy<OutcomeCounters> = Lazy::new(|| {
    let opts = Opts::new("notifications_total", "count of Telegram notifications about changed ads");
    OutcomeCounters {
        succeeded: Counter::new("notifications (sent)", opts.clone().const_label("result", "sent")),
        failed: Counter::new("notifications (failed)", opts.const_label("result", "failed")),
    }
});


/// Adds the `/metrics` route to the application and measures every route of it.
pub fn init(app: axum::Router) -> axum::Router {
    let prometheus = REGISTRY
        .register(&DISTRICT_STATS_COUNTER.invoked)
        .register(&DISTRICT_STATS_COUNTER.finished)
        .register(&LOGINS_COUNTER)
        .register(&FLATS_COUNTER.created)
        .register(&FLATS_COUNTER.deleted)
        .register(&ADS_COUNTER.created)
        .register(&ADS_COUNTER.deleted)
        .register(&AD_CHECKS_COUNTER.succeeded)
        .register(&AD_CHECKS_COUNTER.failed)
        .register(&NOTIFICATIONS_COUNTER.succeeded)
        .register(&NOTIFICATIONS_COUNTER.failed)
        .unwrap();

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
    app
        .route("/metrics", get(|| async move {
            let mut buffer = vec![];
            let metrics = prometheus.gather();
            if let Err(e) = TextEncoder::new().encode(&metrics, &mut buffer) {
                log::error!("couldn't encode the custom metrics: {e}");
            }
            let custom_metrics = String::from_utf8_lossy(&buffer);

            metric_handle.render() + &custom_metrics
        }))
        .layer(prometheus_layer)
}

pub struct Counter {
    inner: prometheus::Counter,
    name: String
}
pub struct ComplexCommandCounters {
    invoked: Counter,
    finished: Counter,
}
pub struct CrudCounters {
    pub created: Counter,
    pub deleted: Counter,
}
pub struct OutcomeCounters {
    pub succeeded: Counter,
    pub failed: Counter,
}
struct Registry(prometheus::Registry);

impl Counter {
    fn new(name: &str, opts: Opts) -> Counter {
        let c = prometheus::Counter::with_opts(opts)
            .unwrap_or_else(|e| panic!("unable to create {name} counter: {e}"));
        Counter { inner: c, name: name.to_string() }
    }

    pub fn inc(&self) {
        self.inner.inc()
    }

    #[cfg(test)]
    pub fn get(&self) -> f64 {
        self.inner.get()
    }
}

impl ComplexCommandCounters {
    pub fn invoked(&self) {
        self.invoked.inc()
    }

    pub fn finished(&self) {
        self.finished.inc()
    }
}

impl OutcomeCounters {
    pub fn record<T, E>(&self, res: &Result<T, E>) {
        match res {
            Ok(_) => self.succeeded.inc(),
            Err(_) => self.failed.inc(),
        }
    }
}

impl Registry {
    fn register(&self, counter: &Counter) -> &Self {
        self.0.register(Box::new(counter.inner.clone()))
            .unwrap_or_else(|e| panic!("unable to register the {} counter: {e}", counter.name));
        self
    }

    fn unwrap(&self) -> prometheus::Registry {
        self.0.clone()
    }
}
