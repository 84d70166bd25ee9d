use crate::http_message::HttpMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub enum Risk {
    Informational,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub enum Confidence {
    FalsePositive,
    Low,
    Medium,
    High,
    UserConfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
pub enum AttackStrength {
    Low,
    #[default]
    Medium,
    High,
    Insane,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Default)]
pub enum AlertThreshold {
    Off,
    Low,
    #[default]
    Medium,
    High,
}

/// A finding reported by a rule to the host process stand-in.
///
/// Alerts are collected in arrival order and never deduplicated, so a test
/// can assert on exactly what a rule raised and in what sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub rule_id: u32,
    pub name: String,
    pub risk: Risk,
    pub confidence: Confidence,
    pub uri: String,
    pub param: String,
    pub attack: String,
    pub evidence: String,
    pub other_info: String,
    pub raised_at: DateTime<Utc>,
    #[serde(skip)]
    pub message: Option<Box<HttpMessage>>,
}

impl Alert {
    pub fn builder(rule_id: u32, name: impl Into<String>) -> AlertBuilder {
        AlertBuilder {
            rule_id,
            name: name.into(),
            risk: Risk::Low,
            confidence: Confidence::Medium,
            uri: String::new(),
            param: String::new(),
            attack: String::new(),
            evidence: String::new(),
            other_info: String::new(),
            message: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertBuilder {
    rule_id: u32,
    name: String,
    risk: Risk,
    confidence: Confidence,
    uri: String,
    param: String,
    attack: String,
    evidence: String,
    other_info: String,
    message: Option<Box<HttpMessage>>,
}

impl AlertBuilder {
    pub fn risk(mut self, risk: Risk) -> Self {
        self.risk = risk;
        self
    }

    pub fn confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    pub fn attack(mut self, attack: impl Into<String>) -> Self {
        self.attack = attack.into();
        self
    }

    pub fn evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    pub fn other_info(mut self, other_info: impl Into<String>) -> Self {
        self.other_info = other_info.into();
        self
    }

    pub fn message(mut self, message: &HttpMessage) -> Self {
        self.message = Some(Box::new(message.clone()));
        self
    }

    pub fn build(self) -> Alert {
        Alert {
            rule_id: self.rule_id,
            name: self.name,
            risk: self.risk,
            confidence: self.confidence,
            uri: self.uri,
            param: self.param,
            attack: self.attack,
            evidence: self.evidence,
            other_info: self.other_info,
            raised_at: Utc::now(),
            message: self.message,
        }
    }
}

/// Rule runtime settings handed to a rule during `setup`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleContext {
    pub attack_strength: AttackStrength,
    pub alert_threshold: AlertThreshold,
}
