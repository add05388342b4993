//! Mock Core Library
//!
//! This library provides the response mocking engine: URL normalization,
//! rule matching, variant selection and synthetic response construction,
//! plus the interception seams (fetch-style transports, XHR-style handles and
//! a MITM proxy handler) that put it in front of real HTTP traffic.

pub mod admin;
pub mod ca;
pub mod engine;
pub mod fetch;
pub mod handlers;
pub mod hits;
pub mod normalize;
pub mod pattern;
/// Proxy server wiring
pub mod proxy;
pub mod response;
pub mod rule;
pub mod scheduler;
pub mod variant;
pub mod xhr;

/// Configuration types and utilities
pub mod config;

/// Error types for mock operations
pub mod error;

pub use admin::{AdminState, Metrics};
pub use ca::CertificateAuthority;
pub use config::MockConfig;
pub use engine::{InterceptionEngine, Resolution};
pub use error::MockError;
pub use fetch::{Fetch, FetchInput, FetchRequest, FetchTarget, InterceptedFetch};
pub use handlers::MockHandler;
pub use hits::{HitCounter, HitRecord, RuleHit};
pub use normalize::UrlNormalizer;
pub use pattern::MatchOutcome;
pub use proxy::MockProxy;
pub use response::{ResponseSpec, SyntheticResponse};
pub use rule::{BodyType, MatchType, Rule, RuleInput, RuleMatcher, Variant, VariantInput};
pub use scheduler::{Scheduler, TaskQueue, TokioScheduler};
pub use xhr::{ReadyState, XhrEventKind, XhrHandle, XhrInterceptor, XhrState, XhrTransport};

/// Result type alias for mock operations
pub type Result<T> = std::result::Result<T, MockError>;
