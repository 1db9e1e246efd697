//! Throttled fetch/parse dispatch.
//!
//! Submits every item to a [`WorkerPool`] up front, each with its own
//! start delay, then drains fetch completions as they arrive and parses
//! each one on the dispatcher task. Parsing never overlaps, and happens in
//! completion order rather than submission order.
//!
//! The dispatch is fail-fast: the first fetch or parse error is returned
//! as is, and tasks still in flight are abandoned without being parsed.
//! Without a `fetch_timeout`, a fetch that never completes stalls the
//! dispatch indefinitely.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::AppError;
use crate::pool::{DEFAULT_MAX_WORKERS, WorkerPool};
use crate::traits::{ItemFetcher, Parser, WorkItem};

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Worker count for pools created through [`Dispatcher::pool`].
    pub max_workers: usize,

    /// Upper bound on each fetch, counted after its delay has elapsed.
    /// `None` waits forever.
    pub fetch_timeout: Option<Duration>,
}

impl DispatchConfig {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers,
            fetch_timeout: None,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORKERS)
    }
}

/// Events emitted by the dispatcher for monitoring/logging.
#[derive(Debug, Clone)]
pub enum DispatchEvent<'a> {
    Started {
        items: usize,
        max_workers: usize,
    },
    Submitted {
        key: &'a str,
        delay: Duration,
    },
    Parsed {
        key: &'a str,
        remaining: usize,
    },
    Failed {
        key: &'a str,
        error: &'a str,
    },
    Finished {
        items: usize,
        elapsed: Duration,
    },
}

/// Trait for receiving dispatch events (decoupled logging).
pub trait DispatchReporter: Send + Sync {
    fn report(&self, event: DispatchEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl DispatchReporter for TracingReporter {
    fn report(&self, event: DispatchEvent<'_>) {
        match event {
            DispatchEvent::Started { items, max_workers } => {
                tracing::debug!(%items, %max_workers, "Dispatching items");
            }
            DispatchEvent::Submitted { key, delay } => {
                tracing::debug!(%key, delay_ms = %delay.as_millis(), "Item submitted");
            }
            DispatchEvent::Parsed { key, remaining } => {
                tracing::debug!(%key, %remaining, "Item parsed");
            }
            DispatchEvent::Failed { key, error } => {
                tracing::warn!(%key, %error, "Item failed");
            }
            DispatchEvent::Finished { items, elapsed } => {
                let secs = elapsed.as_secs_f64();
                tracing::info!(
                    %items,
                    elapsed = %format!("{secs:.3}"),
                    "Scrape delay took {secs:.3}s"
                );
            }
        }
    }
}

/// Outcome of a completed dispatch.
#[derive(Debug)]
pub struct DispatchSummary<W> {
    /// Parsed items, in completion order.
    pub items: Vec<W>,
    /// Wall-clock time from the first submission to the last parse.
    pub elapsed: Duration,
}

/// Runs the two-phase fetch/parse pipeline over a worker pool.
pub struct Dispatcher<R = TracingReporter> {
    config: DispatchConfig,
    reporter: R,
}

impl Dispatcher<TracingReporter> {
    pub fn new(config: DispatchConfig) -> Self {
        Self::with_reporter(config, TracingReporter)
    }
}

impl<R: DispatchReporter> Dispatcher<R> {
    pub fn with_reporter(config: DispatchConfig, reporter: R) -> Self {
        Self { config, reporter }
    }

    /// Create a fresh pool sized from the config.
    pub fn pool(&self) -> WorkerPool {
        WorkerPool::new(self.config.max_workers)
    }

    /// Fetch and parse every item, waiting `delays[i]` seconds before
    /// fetching `items[i]`.
    ///
    /// The pool is shut down once every item has been parsed.
    pub async fn dispatch<W, F, P>(
        &self,
        items: Vec<W>,
        fetcher: &F,
        parser: &mut P,
        pool: &WorkerPool,
        delays: &[f64],
    ) -> Result<DispatchSummary<W>, AppError>
    where
        W: WorkItem,
        F: ItemFetcher<W>,
        P: Parser<W>,
    {
        if items.len() != delays.len() {
            return Err(AppError::LengthMismatch {
                items: items.len(),
                delays: delays.len(),
            });
        }
        let delays = to_durations(delays)?;
        if pool.is_shut_down() {
            return Err(AppError::PoolShutDown);
        }

        let total = items.len();
        self.reporter.report(DispatchEvent::Started {
            items: total,
            max_workers: pool.max_workers(),
        });

        let start = Instant::now();
        // ticket -> item key; the ticket is the submission index
        let mut pending: HashMap<usize, String> = HashMap::with_capacity(total);
        let mut completions = FuturesUnordered::new();

        for (ticket, (item, delay)) in items.into_iter().zip(delays).enumerate() {
            let key = item.key().to_string();
            let fetcher = fetcher.clone();
            let fetch_timeout = self.config.fetch_timeout;

            let handle = pool.submit(async move {
                match fetch_timeout {
                    Some(limit) => tokio::time::timeout(
                        task_deadline(delay, limit),
                        fetcher.fetch(item, delay),
                    )
                    .await
                    .map_err(|_| AppError::Timeout(whole_seconds(limit)))?,
                    None => fetcher.fetch(item, delay).await,
                }
            })?;

            self.reporter
                .report(DispatchEvent::Submitted { key: &key, delay });
            pending.insert(ticket, key);
            completions.push(handle.map(move |joined| (ticket, joined)));
        }

        let mut parsed = Vec::with_capacity(total);
        while let Some((ticket, joined)) = completions.next().await {
            let key = pending.remove(&ticket).unwrap_or_default();

            let fetched = match joined {
                Ok(result) => result,
                Err(e) => Err(AppError::WorkerPanicked(e.to_string())),
            };
            let (mut item, payload) = match fetched {
                Ok(fetched) => fetched,
                Err(e) => {
                    self.reporter.report(DispatchEvent::Failed {
                        key: &key,
                        error: &e.to_string(),
                    });
                    return Err(e);
                }
            };

            if let Err(e) = parser.parse(&mut item, payload) {
                self.reporter.report(DispatchEvent::Failed {
                    key: &key,
                    error: &e.to_string(),
                });
                return Err(e);
            }

            self.reporter.report(DispatchEvent::Parsed {
                key: &key,
                remaining: pending.len(),
            });
            parsed.push(item);
        }

        pool.shutdown().await;
        let elapsed = start.elapsed();
        self.reporter.report(DispatchEvent::Finished {
            items: total,
            elapsed,
        });

        Ok(DispatchSummary {
            items: parsed,
            elapsed,
        })
    }
}

/// Convert a schedule in seconds into durations, rejecting negative or
/// non-finite entries.
fn to_durations(delays: &[f64]) -> Result<Vec<Duration>, AppError> {
    delays
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            Duration::try_from_secs_f64(value).map_err(|_| AppError::InvalidDelay { index, value })
        })
        .collect()
}

/// How long a task may run: its delay plus the fetch limit.
fn task_deadline(delay: Duration, limit: Duration) -> Duration {
    delay.saturating_add(limit)
}

/// Limit reported in `AppError::Timeout`, rounded up to a whole second.
fn whole_seconds(limit: Duration) -> u64 {
    limit.as_secs() + u64::from(limit.subsec_nanos() > 0)
}
