//! 弹性模式模块：提供请求合并和指数退避重试。
//!
//! # Resilience Primitives Module
//!
//! Two building blocks guard the inference backend from redundant and
//! bursty traffic.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`coalescer`] | Single-flight execution keyed by request |
//! | [`backoff`] | Bounded exponential backoff for classified failures |
//!
//! ## Coalescer
//!
//! While a computation for a key is in flight, further callers for the same
//! key attach to it instead of starting their own. The entry is removed as
//! soon as the computation settles, so results are never cached here.
//!
//! ```rust
//! use prompt_gateway::resilience::Coalescer;
//!
//! # async fn run() -> prompt_gateway::Result<()> {
//! let coalescer: Coalescer<String, u32> = Coalescer::new();
//! let value = coalescer.handle("k".to_string(), || async { Ok(42) }).await?;
//! assert_eq!(value, 42);
//! assert_eq!(coalescer.pending_count(), 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Backoff
//!
//! Only failures the predicate accepts are retried; by default these are the
//! upstream statuses in [`crate::error::RETRYABLE_STATUSES`].
//!
//! ```rust
//! use prompt_gateway::resilience::{Backoff, BackoffConfig};
//! use std::time::Duration;
//!
//! let backoff = Backoff::new(
//!     BackoffConfig::new()
//!         .with_max_retries(3)
//!         .with_base_delay(Duration::from_millis(100)),
//! );
//! assert_eq!(backoff.delay_for(2), Duration::from_millis(400));
//! assert_eq!(backoff.max_total_delay(), Duration::from_millis(700));
//! ```

pub mod backoff;
pub mod coalescer;

pub use backoff::{Backoff, BackoffConfig};
pub use coalescer::{Coalescer, CoalescerStats};
