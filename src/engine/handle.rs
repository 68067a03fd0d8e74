use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::capability::{Capabilities, Capability};
use super::connection::EngineConnection;
use super::envelope::{CompletionData, Envelope, FormatData, HoverData};
use crate::error::EngineError;

const LOG_TARGET: &str = "treelens::engine";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Deserialize)]
struct InitializeResult {
    #[serde(default)]
    methods: Vec<String>,
}

/// Typed access to a negotiated engine connection.
///
/// Operations the engine did not advertise fail with
/// [`EngineError::Unsupported`] without touching the wire.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    connection: Arc<EngineConnection>,
    capabilities: Capabilities,
    timeout: Duration,
}

impl EngineHandle {
    /// Ask the engine for its method list and resolve capabilities once
    pub async fn connect(connection: EngineConnection, timeout: Duration) -> Result<Self, EngineError> {
        let connection = Arc::new(connection);
        let params = json!({
            "clientInfo": {
                "name": "treelens",
                "version": env!("CARGO_PKG_VERSION"),
            }
        });
        let result = tokio::time::timeout(timeout, connection.request("initialize", params))
            .await
            .map_err(|_| EngineError::Timeout {
                method: "initialize".to_string(),
            })??;
        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| EngineError::protocol(format!("Malformed initialize result: {e}")))?;

        let capabilities = Capabilities::negotiate(&init.methods);
        info!(
            target: LOG_TARGET,
            "Engine connected; advertised {} methods",
            init.methods.len()
        );

        Ok(Self {
            connection,
            capabilities,
            timeout,
        })
    }

    /// Spawn `command` and connect to it
    pub async fn spawn(command: &[String], timeout: Duration) -> Result<Self, EngineError> {
        Self::connect(EngineConnection::spawn(command)?, timeout).await
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    pub async fn hover(&self, source: &str, offset: usize) -> Result<Option<HoverData>, EngineError> {
        self.call(Capability::Hover, json!({"source": source, "offset": offset}))
            .await
    }

    pub async fn completions(&self, source: &str, offset: usize) -> Result<CompletionData, EngineError> {
        let data: Option<CompletionData> = self
            .call(Capability::Completion, json!({"source": source, "offset": offset}))
            .await?;
        Ok(data.unwrap_or_default())
    }

    /// Evaluate `source`; `Ok(None)` when the engine returns no data
    pub async fn evaluate(&self, source: &str) -> Result<Option<Value>, EngineError> {
        self.call(Capability::Evaluate, json!({"source": source}))
            .await
    }

    /// Formatted text, or `None` when the engine had nothing to say
    pub async fn format(&self, source: &str) -> Result<Option<String>, EngineError> {
        let data: Option<FormatData> = self
            .call(Capability::Format, json!({"source": source}))
            .await?;
        Ok(data.map(|data| data.formatted))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        capability: Capability,
        params: Value,
    ) -> Result<Option<T>, EngineError> {
        let method = self.capabilities.require(capability)?;
        debug!(target: LOG_TARGET, "-> {}", method);

        let result = tokio::time::timeout(self.timeout, self.connection.request(method, params))
            .await
            .map_err(|_| EngineError::Timeout {
                method: method.to_string(),
            })??;

        Envelope::from_value(result)?.into_data()
    }
}
