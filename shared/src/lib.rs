//! Shared library for the salon booking proxy Lambda functions.
//!
//! Each function proxies one resource of the upstream booking API: it builds
//! candidate upstream URLs, fetches with Basic authentication, unwraps the
//! response envelope and normalizes records into a stable JSON shape.

pub mod config;
pub mod endpoints;
pub mod error;
pub mod handlers;
pub mod http;
pub mod normalize;
pub mod query;
pub mod resolver;
pub mod secrets;
pub mod state;
pub mod upstream;

pub use config::{Config, UpstreamCredentials};
pub use error::{AttemptFailure, Error, Result, UpstreamFailure};
pub use handlers::dispatch;
pub use query::{QueryParams, ResourceQuery, Route};
pub use resolver::{Resolver, Schedule, StaffListing, StaffSource};
pub use state::AppState;
pub use upstream::{HttpUpstream, Upstream};
