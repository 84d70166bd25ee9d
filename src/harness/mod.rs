use crate::adapters::host::RecordingScanHost;
use crate::adapters::server::TestHttpServer;
use crate::config::HarnessConfig;
use crate::core::error::HarnessError;
use crate::core::policy::StubScanPolicy;
use crate::core::types::{Alert, RuleContext};
use crate::fixtures::{DirFixtureStore, substitute_tokens};
use crate::http_message::HttpMessage;
use crate::ports::{ActiveScanRule, FixtureStorePort, ScanHostPort, ScanPolicyPort};
use std::sync::{Arc, Once};
use tempfile::TempDir;
use tracing::{debug, info};


static TRACING_INIT: Once = Once::new();

fn init_test_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Per-test scaffolding for exercising one active scan rule.
///
/// Owns the collaborator graph a rule needs: a scan policy handing out a
/// plugin factory, an embedded HTTP server answering the rule's probes, a
/// recording host intercepting alert callbacks, and a scratch home directory
/// removed on shutdown.
pub struct ActiveScanHarness<R: ActiveScanRule> {
    config: HarnessConfig,
    scratch_home: Option<TempDir>,
    policy: Arc<dyn ScanPolicyPort>,
    server: TestHttpServer,
    host: Arc<RecordingScanHost>,
    fixture_store: DirFixtureStore,
    rule: R,
}

impl<R: ActiveScanRule> ActiveScanHarness<R> {
    pub async fn start(rule: R) -> Result<Self, HarnessError> {
        Self::start_with_config(rule, HarnessConfig::default()).await
    }

    pub async fn start_with_config(
        rule: R,
        config: HarnessConfig,
    ) -> Result<Self, HarnessError> {
        let policy: Arc<dyn ScanPolicyPort> = Arc::new(StubScanPolicy::default());
        Self::start_with_policy(rule, config, policy).await
    }

    pub async fn start_with_policy(
        mut rule: R,
        config: HarnessConfig,
        policy: Arc<dyn ScanPolicyPort>,
    ) -> Result<Self, HarnessError> {
        init_test_tracing();
        config.validate()?;

        let scratch_home = TempDir::new().map_err(HarnessError::ScratchHome)?;
        debug!(home = %scratch_home.path().display(), "Created scratch home directory");

        let server = TestHttpServer::start().await?;

        let context = RuleContext {
            attack_strength: policy.default_strength(),
            alert_threshold: policy.default_threshold(),
        };
        let host = Arc::new(RecordingScanHost::new(config.probe_timeout(), context)?);
        rule.setup(&context);

        let fixture_store = DirFixtureStore::new(config.fixture_base_dir.clone());

        info!(rule = rule.name(), port = server.port(), "Scan harness ready");
        Ok(Self {
            config,
            scratch_home: Some(scratch_home),
            policy,
            server,
            host,
            fixture_store,
            rule,
        })
    }

    /// A primed GET exchange against the test server with a minimal HTML body.
    pub fn get_http_message(&self, path: &str) -> Result<HttpMessage, HarnessError> {
        self.http_message("GET", path, "<html></html>")
    }

    /// A primed exchange: request head targets the embedded server with the
    /// configured synthetic header fields; response head is a 200 whose
    /// Content-Length matches `response_body`.
    pub fn http_message(
        &self,
        method: &str,
        path: &str,
        response_body: &str,
    ) -> Result<HttpMessage, HarnessError> {
        let mut msg = HttpMessage::new();

        let mut request_head = format!(
            "{} http://127.0.0.1:{}{} HTTP/1.1\r\n",
            method,
            self.server.port(),
            path
        );
        request_head.push_str(&format!("Host: {}\r\n", self.config.synthetic_host));
        request_head.push_str(&format!("User-Agent: {}\r\n", self.config.user_agent));
        for (name, value) in &self.config.extra_request_fields {
            request_head.push_str(&format!("{name}: {value}\r\n"));
        }
        msg.set_request_header(&request_head)?;

        msg.set_response_body(response_body);
        let response_head = format!(
            "HTTP/1.1 200 OK\r\nServer: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
            self.config.response_server,
            self.config.response_content_type,
            response_body.len()
        );
        msg.set_response_header(&response_head)?;

        Ok(msg)
    }

    /// Loads a fixture from the rule's resource directory, verbatim.
    pub fn html_fixture(&self, name: &str) -> Result<String, HarnessError> {
        Ok(self.fixture_store.load(self.rule.name(), name)?)
    }

    /// Loads a fixture and substitutes `@@@TOKEN@@@` placeholders.
    pub fn html_fixture_with(
        &self,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<String, HarnessError> {
        let content = self.html_fixture(name)?;
        Ok(substitute_tokens(&content, params))
    }

    /// Runs the rule under test against the message. A rule the plugin
    /// factory reports disabled is skipped.
    pub async fn run_scan(&mut self, msg: &HttpMessage) -> Result<(), HarnessError> {
        if !self.policy.plugin_factory().is_rule_enabled(self.rule.id()) {
            debug!(rule = self.rule.name(), "Rule disabled by plugin factory, skipping scan");
            return Ok(());
        }
        let host: Arc<dyn ScanHostPort> = Arc::clone(&self.host) as Arc<dyn ScanHostPort>;
        self.rule.scan(host, msg).await?;
        Ok(())
    }

    pub fn alerts_raised(&self) -> Vec<Alert> {
        self.host.alerts_raised()
    }

    pub fn server(&self) -> &TestHttpServer {
        &self.server
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    pub fn scratch_home(&self) -> Option<&std::path::Path> {
        self.scratch_home.as_ref().map(|d| d.path())
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Stops the test server and removes the scratch home directory.
    pub fn shutdown(mut self) -> Result<(), HarnessError> {
        self.server.stop();
        if let Some(home) = self.scratch_home.take() {
            home.close().map_err(HarnessError::ScratchHome)?;
        }
        Ok(())
    }
}
