use crate::core::types::{AlertThreshold, AttackStrength};
use crate::ports::{PluginFactoryPort, ScanPolicyPort};
use std::sync::Arc;

/// Plugin factory stand-in: every rule is enabled.
#[derive(Debug, Default)]
pub struct StubPluginFactory;

impl PluginFactoryPort for StubPluginFactory {
    fn is_rule_enabled(&self, _rule_id: u32) -> bool {
        true
    }
}

/// Scan policy stand-in with configurable run defaults.
pub struct StubScanPolicy {
    factory: Arc<dyn PluginFactoryPort>,
    strength: AttackStrength,
    threshold: AlertThreshold,
}

impl StubScanPolicy {
    pub fn new(strength: AttackStrength, threshold: AlertThreshold) -> Self {
        Self {
            factory: Arc::new(StubPluginFactory),
            strength,
            threshold,
        }
    }
}

impl Default for StubScanPolicy {
    fn default() -> Self {
        Self::new(AttackStrength::default(), AlertThreshold::default())
    }
}

impl ScanPolicyPort for StubScanPolicy {
    fn plugin_factory(&self) -> Arc<dyn PluginFactoryPort> {
        Arc::clone(&self.factory)
    }

    fn default_strength(&self) -> AttackStrength {
        self.strength
    }

    fn default_threshold(&self) -> AlertThreshold {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_factory_enables_everything() {
        let policy = StubScanPolicy::default();
        let factory = policy.plugin_factory();
        assert!(factory.is_rule_enabled(0));
        assert!(factory.is_rule_enabled(40012));
    }

    #[test]
    fn test_stub_policy_carries_defaults() {
        let policy = StubScanPolicy::new(AttackStrength::High, AlertThreshold::Low);
        assert_eq!(policy.default_strength(), AttackStrength::High);
        assert_eq!(policy.default_threshold(), AlertThreshold::Low);
    }
}
