use crate::core::error::{FixtureError, ScanError};
use crate::core::types::{Alert, AlertThreshold, AttackStrength, RuleContext};
use crate::http_message::HttpMessage;
use async_trait::async_trait;
use std::sync::Arc;

/// An active scan rule plugin: probes a target for one vulnerability class.
///
/// The rule receives a primed message describing the original exchange and
/// drives follow-up probes through the host it is given. Findings go back
/// through [`ScanHostPort::alert_found`].
#[async_trait]
pub trait ActiveScanRule: Send + Sync {
    fn id(&self) -> u32;
    fn name(&self) -> &str;

    /// Called once before `scan`, with the strength/threshold the run uses.
    fn setup(&mut self, _ctx: &RuleContext) {}

    async fn scan(
        &mut self,
        host: Arc<dyn ScanHostPort>,
        msg: &HttpMessage,
    ) -> Result<(), ScanError>;
}

/// The slice of the host process a rule interacts with.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScanHostPort: Send + Sync {
    /// Sends the message's request to its target and writes the response
    /// (header and body) back into the same message.
    async fn send_and_receive(&self, msg: &mut HttpMessage) -> Result<(), ScanError>;

    fn alert_found(&self, alert: Alert);

    fn attack_strength(&self) -> AttackStrength;
    fn alert_threshold(&self) -> AlertThreshold;
}

/// Scan policy seam: hands out the plugin factory and run defaults.
#[cfg_attr(test, mockall::automock)]
pub trait ScanPolicyPort: Send + Sync {
    fn plugin_factory(&self) -> Arc<dyn PluginFactoryPort>;
    fn default_strength(&self) -> AttackStrength;
    fn default_threshold(&self) -> AlertThreshold;
}

#[cfg_attr(test, mockall::automock)]
pub trait PluginFactoryPort: Send + Sync {
    fn is_rule_enabled(&self, rule_id: u32) -> bool;
}

/// Fixture loading seam: plaintext files under a per-rule directory.
#[cfg_attr(test, mockall::automock)]
pub trait FixtureStorePort: Send + Sync {
    fn load(&self, rule_dir: &str, name: &str) -> Result<String, FixtureError>;
}
