//! Version-history engine for crowd-sourced candidate records.
//!
//! Every accepted edit becomes an immutable [`version::Version`] at the head
//! of the person's [`log::VersionLog`]. On top of the log sit the pure
//! [`diff`] computer, the [`revert`] and [`merge`] operators, and the
//! [`redirect::RedirectIndex`] that keeps merged-away identities resolving.
//!
//! This crate performs no I/O. Timestamps and version identifiers are always
//! supplied by the caller; persistence backends implement
//! [`store::HistoryStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod diff;
pub mod error;
pub mod log;
pub mod merge;
pub mod person;
pub mod redirect;
pub mod revert;
pub mod snapshot;
pub mod store;
pub mod version;

pub use error::{Error, Result};
