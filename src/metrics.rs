//! Runtime statistics for the prediction service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for served requests
pub struct ServiceMetrics {
    /// Predictions answered successfully
    pub requests_served: AtomicU64,
    /// Requests rejected by validation
    pub requests_rejected: AtomicU64,
    /// Requests that failed inside the pipeline
    pub requests_failed: AtomicU64,
    /// Predictions labelled positive
    pub positive_predictions: AtomicU64,
    /// Readiness probes answered
    pub health_checks: AtomicU64,
    /// Request latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            requests_served: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            positive_predictions: AtomicU64::new(0),
            health_checks: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record an answered prediction
    pub fn record_prediction(&self, latency: Duration, probability: f64, prediction: u8) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
        if prediction == 1 {
            self.positive_predictions.fetch_add(1, Ordering::Relaxed);
        }
        self.record_latency(latency);

        let bucket = (probability.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_rejection(&self, latency: Duration) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
    }

    pub fn record_failure(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_health_check(&self) {
        self.health_checks.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, latency: Duration) {
        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            // Keep only last 10000
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Latency percentiles over the retained window
    pub fn latency_stats(&self) -> LatencyStats {
        let mut sorted: Vec<u64> = match self.latencies.read() {
            Ok(times) => times.clone(),
            Err(_) => return LatencyStats::default(),
        };
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.50),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Requests answered per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_served.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or([0; 10])
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let served = self.requests_served.load(Ordering::Relaxed);
        let rejected = self.requests_rejected.load(Ordering::Relaxed);
        let failed = self.requests_failed.load(Ordering::Relaxed);
        let positives = self.positive_predictions.load(Ordering::Relaxed);
        let health_checks = self.health_checks.load(Ordering::Relaxed);
        let positive_rate = if served > 0 {
            (positives as f64 / served as f64) * 100.0
        } else {
            0.0
        };

        let latency = self.latency_stats();
        let distribution = self.probability_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║             CHD RISK SERVICE - METRICS SUMMARY               ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions Served:     {:>8}  │  Throughput: {:>6.1} req/s ║",
            served,
            self.throughput()
        );
        info!(
            "║ Positive Predictions:   {:>8}  │  Positive Rate: {:>5.1}%   ║",
            positives, positive_rate
        );
        info!(
            "║ Rejected: {:>8}  Failed: {:>8}  Health checks: {:>8} ║",
            rejected, failed, health_checks
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Latency (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}        ║",
            latency.mean_us, latency.p50_us, latency.p95_us, latency.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Probability Distribution:                                    ║");
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Request latency statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic summary printer
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // first tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
