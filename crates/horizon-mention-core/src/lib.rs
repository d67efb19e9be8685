//! Core systems for Horizon Mention.
//!
//! This crate provides the foundational pieces the mention engine is built on:
//!
//! - **Signal/Slot System**: Type-safe, fire-and-forget notifications
//! - **Timers**: One-shot timers driven by an explicit clock
//! - **Debouncing**: Trailing-edge coalescing of event bursts
//! - **Deferred Actions**: Actions that run on a later tick and can be
//!   superseded by a generation bump
//! - **Logging**: Tracing targets, span names and tree visualization
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_mention_core::Signal;
//!
//! let replaced = Signal::<String>::new();
//! let conn_id = replaced.connect(|text| {
//!     println!("inserted {}", text);
//! });
//! replaced.emit("@ada".to_string());
//! replaced.disconnect(conn_id);
//! ```
//!
//! # Debounce Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use horizon_mention_core::Debouncer;
//!
//! let start = Instant::now();
//! let mut resize = Debouncer::new(Duration::from_millis(10));
//! resize.call(start);
//! resize.call(start + Duration::from_millis(3));
//! assert!(!resize.poll(start + Duration::from_millis(10)));
//! assert!(resize.poll(start + Duration::from_millis(13)));
//! ```

mod debounce;
mod error;
pub mod logging;
pub mod signal;
mod task;
mod timer;

pub use debounce::Debouncer;
pub use error::{CoreError, Result, SignalError, TimerError};
pub use logging::{PerfSpan, TreeDebug, TreeFormatOptions, TreeSource, TreeStyle};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use task::{DeferredQueue, TaskId};
pub use timer::{TimerId, TimerManager};
