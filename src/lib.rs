//! Test scaffolding for exercising active scan rule plugins in isolation.
//!
//! A scan rule normally runs inside a host process that schedules plugins,
//! transports their probes and receives their alerts. This crate stands in
//! for that surrounding machinery in tests: it starts an embedded HTTP
//! server on an ephemeral port, wires a stubbed scan-policy/plugin-factory
//! graph, and intercepts the alert-found callback so a test can assert on
//! exactly what a rule raised.
//!
//! ```no_run
//! # use ascan_harness::harness::ActiveScanHarness;
//! # use ascan_harness::ports::ActiveScanRule;
//! # use ascan_harness::HarnessError;
//! # async fn example<R: ActiveScanRule>(rule: R) -> Result<(), HarnessError> {
//! let mut harness = ActiveScanHarness::start(rule).await?;
//! harness.server().serve_html("/login", "<html><form></form></html>");
//! let msg = harness.get_http_message("/login")?;
//! harness.run_scan(&msg).await?;
//! assert!(!harness.alerts_raised().is_empty());
//! harness.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod core;
pub mod fixtures;
pub mod harness;
pub mod http_message;
pub mod ports;

pub use crate::adapters::host::RecordingScanHost;
pub use crate::adapters::server::{ReceivedRequest, RequestHandler, TestHttpServer, TestResponse};
pub use crate::config::HarnessConfig;
pub use crate::core::error::{
    ConfigError, FixtureError, HarnessError, HttpMessageError, ScanError, ServerError,
};
pub use crate::core::types::{
    Alert, AlertBuilder, AlertThreshold, AttackStrength, Confidence, Risk, RuleContext,
};
pub use crate::fixtures::{DirFixtureStore, substitute_tokens};
pub use crate::harness::ActiveScanHarness;
pub use crate::http_message::{HttpMessage, HttpRequestHeader, HttpResponseHeader};
pub use crate::ports::{ActiveScanRule, FixtureStorePort, PluginFactoryPort, ScanHostPort, ScanPolicyPort};
