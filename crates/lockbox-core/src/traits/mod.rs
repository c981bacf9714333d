//! Core traits defined in `lockbox-core` and implemented by other crates.

pub mod audit;
pub mod cache;
pub mod metrics;

pub use audit::{AuditAction, AuditEntity, AuditSink, TracingAudit};
pub use cache::CacheProvider;
pub use metrics::{CounterMetrics, MetricsSink};
