//! # guardian-core
//!
//! The streaming half of the EV charging guardian.
//!
//! This crate provides:
//! - The seam traits (`Classifier`, `AuditTrail`, `Attestor`, `ReadingSource`)
//! - `Counters` and the `SubscriptionRegistry`
//! - The per-reading `Pipeline` and the `Feed` that remembers the previous reading
//! - The `Engine`, which owns the stream driver's lifecycle
//!
//! ## Usage
//!
//! ```rust,ignore
//! use guardian_core::Engine;
//!
//! let engine = Engine::new(classifier, audit, Some(attestor), source, &config.stream);
//! let mut events = engine.subscribe();
//! engine.start().await?;
//! while let Some(event) = events.recv().await { /* ... */ }
//! ```

pub mod counters;
pub mod engine;
pub mod feed;
pub mod pipeline;
pub mod registry;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use counters::Counters;
pub use engine::Engine;
pub use feed::Feed;
pub use pipeline::Pipeline;
pub use registry::{Subscription, SubscriptionId, SubscriptionRegistry};
