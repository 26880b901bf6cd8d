//! A Rust client for LogSnag, an event tracking and insights service.
//!
//! # Overview
//!
//! The crate revolves around a [`Client`] that publishes [`LogEvent`]s to channels, identifies
//! users, and publishes or mutates [`Insight`]s. Each operation validates its input, assembles a
//! JSON payload containing only the fields that were set, and issues one blocking HTTP request
//! authenticated with a bearer token.
//!
//! ```no_run
//! use logsnag::{ClientConfig, InsightMutation, LogEvent};
//!
//! let client = ClientConfig::new("token", "my-project").to_client()?;
//!
//! client.log_event(LogEvent::new("deploys", "Deployed v2").tag("env", "prod"))?;
//! client.identify("user-42", [("plan", "pro")])?;
//! client.insight_mutate(InsightMutation::new("Deploys").inc(1))?;
//! # Ok::<(), logsnag::Error>(())
//! ```
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. Input that violates a documented constraint
//! (tag or property keys outside `^[a-z-]+$`, non-scalar values, unknown parsers, negative
//! timestamps, mutations without any change) is rejected with [`Error::InvalidMessage`] before
//! any request is made. Transport failures, including every non-success HTTP status, are
//! returned as errors too. Nothing is retried; resilience policy is up to the caller.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging
//! messages under the `logsnag` target. Consider integrating a `log`-compatible logger
//! implementation for better visibility into client operations.
//!
//! # Transport
//!
//! Requests go through the [`Transport`] trait. The default [`HttpTransport`] is built on a
//! blocking `reqwest` client; set [`ClientConfig::transport`] to use something else.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod key_value;
mod payload;
mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use key_value::{validate_key_value_map, KeyValueMap};
pub use payload::{Insight, InsightMutation, InsightValue, LogEvent, Parser};
pub use transport::{HttpTransport, Method, Request, Response, Transport};
