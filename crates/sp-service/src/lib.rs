//! # sp-service
//!
//! HTTP client for the stack-management service.
//!
//! [`StackServiceClient`] reads and writes the deployment settings of one
//! stack and implements [`sp_policy::SettingsSource`], so it plugs straight
//! into the policy applicator.
//!
//! ## Key invariants
//!
//! - Requests authenticate with `Authorization: token <access token>`; the
//!   header is marked sensitive and never logged.
//! - One request per call. Retry policy belongs to the caller.
//! - A non-2xx response keeps its body verbatim as the error detail.

pub mod client;
pub mod error;

pub use client::{ServiceConfig, StackServiceClient};
pub use error::{Result, ServiceError};
