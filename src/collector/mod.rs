//! Metric-collection engine: one `collect()` call produces one full scrape,
//! serving a cached prior result when the database is unreachable so the
//! exposition endpoint stays responsive while the database is down.

use anyhow::Result;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod loader;
pub mod mapper;
pub mod row;
pub mod spec;

use config::Settings;
use connection::ConnectionManager;
use executor::QueryExecutor;
use mapper::MetricFamily;
use spec::MetricSpec;

/// Prometheus namespace every exported family is prefixed with.
pub const NAMESPACE: &str = "tibero";

/// Trivial connectivity probe run at the start of every scrape.
const PROBE_QUERY: &str = "SELECT 1 FROM DUAL";

const UP_HELP: &str = "Whether the last Tibero scrape succeeded";
const SCRAPE_DURATION_HELP: &str = "Tibero scrape duration";

/// One full metrics snapshot: the per-spec families plus the status
/// families. This is the unit cached between scrapes and the unit returned
/// to the exposition layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeResult {
    pub families: Vec<MetricFamily>,
}

impl ScrapeResult {
    #[must_use]
    pub fn find(&self, full_name: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|f| f.full_name == full_name)
    }
}

/// Orchestrates one scrape cycle: health probe, per-spec collection, result
/// caching, fallback-on-failure. At most one scrape runs at a time; the
/// mutex spans the entire `collect()` call, so concurrent scrape requests
/// serialize rather than share partial state.
pub struct CollectionEngine {
    inner: Mutex<EngineInner>,
}

struct EngineInner {
    executor: QueryExecutor,
    specs: Vec<MetricSpec>,
    default_timeout: Duration,
    last_result: Option<ScrapeResult>,
}

impl CollectionEngine {
    /// # Errors
    ///
    /// Returns an error when the configured connection parts do not form a
    /// valid URL.
    pub fn new(settings: &Settings, specs: Vec<MetricSpec>) -> Result<Self> {
        let manager = ConnectionManager::new(settings.connection_url()?, settings.pool.clone());

        Ok(Self {
            inner: Mutex::new(EngineInner {
                executor: QueryExecutor::new(manager),
                specs,
                default_timeout: settings.default_query_timeout(),
                last_result: None,
            }),
        })
    }

    /// Eagerly open the pool once at startup. A failure is reported but not
    /// fatal: the engine reconnects on the next scrape.
    ///
    /// # Errors
    ///
    /// Propagates the pool initialization failure for the caller to log.
    pub async fn connect(&self) -> Result<(), error::CollectError> {
        self.inner.lock().await.executor.manager_mut().connect().await
    }

    /// Whether the last known connection state is healthy.
    pub async fn is_healthy(&self) -> bool {
        self.inner.lock().await.executor.manager_mut().is_healthy()
    }

    /// Produce one scrape. Never fails: under database failure this returns
    /// the cached prior result unchanged, or a minimal `up = 0` result when
    /// no cache exists yet.
    pub async fn collect(&self) -> ScrapeResult {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let started = Instant::now();

        if let Err(err) = inner.executor.run(PROBE_QUERY, inner.default_timeout).await {
            debug!(error = %err, "connectivity probe failed");

            // Serve the last good observation unchanged: the status families
            // are deliberately not refreshed so `up` keeps reporting the last
            // true scrape rather than masking the outage with fresh numbers.
            if let Some(cached) = &inner.last_result {
                debug!(
                    families = cached.families.len(),
                    "returning cached result from previous scrape"
                );
                return cached.clone();
            }

            return ScrapeResult {
                families: vec![
                    MetricFamily::status(&format!("{NAMESPACE}_up"), UP_HELP, 0.0),
                    scrape_duration_family(started.elapsed()),
                ],
            };
        }

        let mut families: Vec<MetricFamily> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for spec in &inner.specs {
            let timeout = spec.resolve_timeout(inner.default_timeout);
            match inner.executor.run(&spec.query, timeout).await {
                Ok(rows) => {
                    debug!(metric = %spec.name, rows = rows.len(), "collected metric");
                    for family in mapper::map(spec, &rows) {
                        if seen.insert(family.full_name.clone()) {
                            families.push(family);
                        } else {
                            warn!(
                                metric = %spec.name,
                                family = %family.full_name,
                                "duplicate metric family, keeping the first definition"
                            );
                        }
                    }
                }
                Err(err) => {
                    // A failing spec contributes nothing; the remaining specs
                    // still run.
                    error!(metric = %spec.name, error = %err, "error collecting metric");
                }
            }
        }

        families.push(MetricFamily::status(
            &format!("{NAMESPACE}_up"),
            UP_HELP,
            1.0,
        ));
        families.push(scrape_duration_family(started.elapsed()));

        let result = ScrapeResult { families };
        inner.last_result = Some(result.clone());
        result
    }

    /// Release the connection pool. Idempotent.
    pub async fn close(&self) {
        self.inner.lock().await.executor.manager_mut().close().await;
    }

    #[cfg(test)]
    async fn seed_cache(&self, result: ScrapeResult) {
        self.inner.lock().await.last_result = Some(result);
    }

    #[cfg(test)]
    async fn cached(&self) -> Option<ScrapeResult> {
        self.inner.lock().await.last_result.clone()
    }
}

fn scrape_duration_family(elapsed: Duration) -> MetricFamily {
    MetricFamily::status(
        &format!("{NAMESPACE}_scrape_duration_seconds"),
        SCRAPE_DURATION_HELP,
        elapsed.as_secs_f64(),
    )
}
