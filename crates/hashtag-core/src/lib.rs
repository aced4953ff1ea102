//! Hashtag extraction and aggregation over a host platform's message store.
//!
//! This crate is framework-agnostic. Message storage lives behind the
//! [`ports::MessageStore`] trait implemented in adapter crates; transports call
//! into [`service::HashtagService`] (or the [`api`] contracts on top of it).

pub mod aggregator;
pub mod api;
pub mod config;
pub mod domain;
pub mod errors;
pub mod grouper;
pub mod logging;
pub mod paginator;
pub mod ports;
pub mod service;
pub mod tokenizer;

pub use errors::{Error, Result};
