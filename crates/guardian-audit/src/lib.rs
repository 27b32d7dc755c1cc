//! # guardian-audit
//!
//! Bounded, append-only, SHA-256 hash-linked audit log for the EV charging
//! guardian.
//!
//! ## Overview
//!
//! Every evaluated reading, VALID or FRAUD, becomes an `AuditRecord` whose
//! transaction hash commits to its immutable fields and to the hash of the
//! record before it. Editing a retained record breaks the link and is caught
//! by `verify_chain`. The log holds at most `capacity` records; the oldest
//! is evicted first.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use guardian_audit::BoundedAuditLog;
//! use guardian_core::traits::AuditTrail;
//!
//! let log = BoundedAuditLog::from_config(&config.audit);
//! let record = log.append(&reading, &verdict)?;
//! let recent = log.query(Some(10));
//! assert!(log.verify_integrity());
//! ```

pub mod chain;
pub mod entry;
pub mod memory;

pub use chain::{hash_record, verify_chain};
pub use entry::ChainEntry;
pub use memory::BoundedAuditLog;
