//! Canopy Client - talking to tenants
//!
//! The deployment and download engines consume tenants exclusively through
//! the [`TenantClient`] trait. This crate provides the trait, an HTTP
//! implementation whose every request passes through a rate-limit-aware
//! execution strategy, and a dry-run implementation returning synthetic but
//! stable entities.
//!
//! ## Architectural Boundaries
//!
//! - `canopy-client` owns: wire access, retries, rate limiting
//! - `canopy-deploy` / `canopy-download` own: what to upsert or fetch, and
//!   in which order

#![deny(unsafe_code)]

pub mod client;
pub mod dry_run;
pub mod error;
pub mod http;
pub mod rate_limit;

// Re-export main types
pub use client::{
    DownloadSettingsObject, ListSettingsOptions, SchemaStub, SettingsObject, TenantClient,
    TenantEntity,
};
pub use dry_run::{DryRunClient, RecordedUpsert};
pub use error::{ClientError, Result};
pub use http::HttpTenantClient;
pub use rate_limit::{
    apply_min_max_defaults, ApiResponse, RateLimitStrategy, SystemTimeline, Timeline, MAX_WAIT,
    MIN_WAIT,
};
