//! The configured output: settings, HTTP client, credentials and dispatcher
//! wired together once at startup.

use std::sync::Arc;

use crate::adapters::google_chat::{http_client, GoogleChatClient, ServiceAccountCredentials};
use crate::config::{OutputConfig, OutputSettings};
use crate::dispatcher::Dispatcher;
use crate::error::{ChatError, ConfigError};
use crate::traits::{ChatClient, CredentialProvider};
use crate::types::{Batch, DispatchReport, Payload};

pub struct GoogleChatOutput {
    settings: OutputSettings,
    dispatcher: Dispatcher,
}

impl GoogleChatOutput {
    /// Validate `config` and build a ready-to-use output backed by the
    /// service account in `keyfile`.
    ///
    /// The key file itself is only read when the first token is needed.
    pub fn configure(config: &OutputConfig) -> Result<Self, ConfigError> {
        let settings = config.validate()?;
        let http = http_client(&settings.client)?;
        let credentials = ServiceAccountCredentials::new(settings.keyfile.clone(), http.clone())?;
        let client =
            GoogleChatClient::with_http_client(http, Arc::new(credentials), &settings.client)?;

        tracing::info!(
            destination = ?settings.destination,
            proxy = settings.client.https_proxy.is_some(),
            "google chat output configured"
        );
        Ok(Self::from_parts(settings, Arc::new(client)))
    }

    /// Like [`configure`](Self::configure) but with a caller-supplied
    /// credential provider instead of the service-account key.
    pub fn with_credentials(
        config: &OutputConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ConfigError> {
        let settings = config.validate()?;
        let client = GoogleChatClient::new(credentials, &settings.client)?;
        Ok(Self::from_parts(settings, Arc::new(client)))
    }

    pub fn from_parts(settings: OutputSettings, client: Arc<dyn ChatClient>) -> Self {
        let dispatcher = Dispatcher::new(settings.payload_builder(), client);
        Self {
            settings,
            dispatcher,
        }
    }

    pub fn settings(&self) -> &OutputSettings {
        &self.settings
    }

    /// Render the payloads a batch would produce without sending anything.
    pub fn build_payloads(&self, batch: &Batch) -> Vec<Payload> {
        self.dispatcher.builder().build(batch)
    }

    pub async fn dispatch(&self, batch: &Batch) -> Result<DispatchReport, ChatError> {
        self.dispatcher.dispatch(batch).await
    }

    /// Decode and dispatch a host chunk.
    pub async fn write(&self, chunk: &[u8]) -> Result<DispatchReport, ChatError> {
        self.dispatcher.write(chunk).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;
    use serde_json::json;

    fn config(extra: &str) -> OutputConfig {
        OutputConfig::from_toml_str(&format!(
            "space = \"space\"\nkeyfile = \"sa.json\"\n{extra}"
        ))
        .unwrap()
    }

    #[test]
    fn configure_does_not_touch_keyfile() {
        let output = GoogleChatOutput::configure(&config("")).unwrap();
        assert_eq!(output.settings().keyfile.to_str(), Some("sa.json"));
    }

    #[test]
    fn configure_surfaces_validation_errors() {
        let result = GoogleChatOutput::configure(&config("message = \"%s %s\"\n"));
        assert!(matches!(result, Err(ConfigError::TemplateMismatch { .. })));
    }

    #[test]
    fn build_payloads_is_a_dry_run() {
        let output = GoogleChatOutput::configure(&config(
            "message = \"%s %s\"\nmessage_keys = [\"tag\", \"message\"]\n",
        ))
        .unwrap();
        let batch: Batch = vec![Event::new(
            "app",
            0,
            json!({"message": "ready"}).as_object().cloned().unwrap(),
        )]
        .into_iter()
        .collect();

        let payloads = output.build_payloads(&batch);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].space, "space");
        assert_eq!(payloads[0].text, "app ready\n");
    }
}
