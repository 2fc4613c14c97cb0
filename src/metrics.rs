//! Query metrics and tracing spans
//!
//! With the `metrics` feature, statement counts, failures and durations are recorded
//! through the global OpenTelemetry meter `tidewater`; installing an exporter is left
//! to the application. The `tracing` feature adds spans around statements and
//! transaction boundaries.

#[cfg(feature = "metrics")]
pub use otel::{TidewaterMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
    };
    use std::time::Duration;

    pub static METRICS: Lazy<TidewaterMetrics> = Lazy::new(TidewaterMetrics::init);

    pub struct TidewaterMetrics {
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
    }

    impl TidewaterMetrics {
        pub fn init() -> Self {
            let meter = global::meter("tidewater");

            let queries_total = meter
                .u64_counter("tidewater_queries_total")
                .with_description("Total statements executed")
                .build();

            let query_errors_total = meter
                .u64_counter("tidewater_query_errors_total")
                .with_description("Statements that returned an error")
                .build();

            let query_duration = meter
                .f64_histogram("tidewater_query_duration_seconds")
                .with_description("Duration of statements")
                .build();

            Self {
                queries_total,
                query_errors_total,
                query_duration,
            }
        }

        pub fn record_query_duration(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn execute_query_span(sql: &str) -> Span {
        tracing::debug_span!("tidewater.execute", sql = %sql)
    }

    pub fn begin_transaction_span(depth: u32) -> Span {
        tracing::debug_span!("tidewater.transaction.begin", depth)
    }

    pub fn commit_transaction_span(depth: u32) -> Span {
        tracing::debug_span!("tidewater.transaction.commit", depth)
    }

    pub fn rollback_transaction_span(depth: u32) -> Span {
        tracing::debug_span!("tidewater.transaction.rollback", depth)
    }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_recording_without_exporter_is_noop() {
        METRICS.record_query_duration(Duration::from_millis(3));
        METRICS.record_query_error();
    }
}
