use crate::core::error::ScanError;
use crate::core::types::{Alert, AlertThreshold, AttackStrength, RuleContext};
use crate::http_message::HttpMessage;
use crate::ports::ScanHostPort;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Host-process stand-in: transports probes to the embedded server and
/// intercepts the alert-found callback into an in-memory list.
pub struct RecordingScanHost {
    client: reqwest::Client,
    probe_timeout: Duration,
    context: RuleContext,
    alerts: Arc<Mutex<Vec<Alert>>>,
}

impl RecordingScanHost {
    pub fn new(probe_timeout: Duration, context: RuleContext) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()?;
        Ok(Self {
            client,
            probe_timeout,
            context,
            alerts: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Alerts raised so far, in arrival order, duplicates included.
    pub fn alerts_raised(&self) -> Vec<Alert> {
        self.alerts.lock().expect("alert list lock poisoned").clone()
    }
}

#[async_trait]
impl ScanHostPort for RecordingScanHost {
    async fn send_and_receive(&self, msg: &mut HttpMessage) -> Result<(), ScanError> {
        let (method, url, fields) = {
            let header = msg.request_header()?;
            (
                header.method().to_string(),
                header.url()?,
                header.fields().to_vec(),
            )
        };

        let method = reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| {
            ScanError::ProbeFailed {
                target: url.to_string(),
                details: format!("invalid method '{method}': {e}"),
            }
        })?;

        debug!(target = %url, method = %method, "Sending probe");

        let mut request = self
            .client
            .request(method, url.clone())
            .body(msg.request_body().to_string());
        for (name, value) in &fields {
            request = request.header(name, value);
        }

        // The timeout covers the full exchange, body read included; a server
        // stalling mid-body must not hang the rule past the configured limit.
        let (status, headers, body) = tokio::time::timeout(self.probe_timeout, async {
            let response = request.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, headers, body))
        })
        .await
        .map_err(|_| ScanError::Timeout {
            target: url.to_string(),
            duration: self.probe_timeout,
        })??;

        let mut head = format!(
            "HTTP/1.1 {} {}\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        );
        for (name, value) in &headers {
            match value.to_str() {
                Ok(v) => head.push_str(&format!("{name}: {v}\r\n")),
                Err(_) => warn!(target = %url, header = %name, "Skipping non-UTF-8 response header"),
            }
        }
        msg.set_response_header(&head)?;
        msg.set_response_body(body);

        Ok(())
    }

    fn alert_found(&self, alert: Alert) {
        debug!(rule_id = alert.rule_id, name = %alert.name, "Alert raised");
        self.alerts
            .lock()
            .expect("alert list lock poisoned")
            .push(alert);
    }

    fn attack_strength(&self) -> AttackStrength {
        self.context.attack_strength
    }

    fn alert_threshold(&self) -> AlertThreshold {
        self.context.alert_threshold
    }
}
