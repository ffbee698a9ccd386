//! Lifecycle tools: control channel, installing a newer deployment, and
//! status.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storecache_client::{ControlMessage, Dispatcher, LifecycleState, Registration};
use storecache_core::cache::GcReport;
use storecache_core::{AppConfig, Error, Generation};

/// Parameters for the worker_control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerControlParams {
    /// Control message kind. Only "force-activate" is understood.
    pub message: String,
}

/// Parameters for the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallParams {
    /// Version token of the new deployment; must exceed the current one.
    pub generation: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerControlOutput {
    pub activated: Option<Generation>,
    pub gc: GcReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerInstallOutput {
    pub generation: Generation,
    pub state: LifecycleState,
}

pub(crate) fn parse_control(message: &str) -> Result<ControlMessage, Error> {
    serde_json::from_value(serde_json::json!({ "type": message.trim() }))
        .map_err(|_| Error::InvalidInput(format!("unknown control message: {message}")))
}

/// Implementation of the worker_control tool.
pub async fn control_impl(registration: &Registration, params: WorkerControlParams) -> Result<CallToolResult, McpError> {
    let message = parse_control(&params.message)?;
    let gc = registration.control(message).await?;
    let output = WorkerControlOutput { activated: registration.active_generation().await, gc };
    super::json_result(&output)
}

/// Implementation of the worker_install tool.
pub async fn install_impl(
    registration: &Registration, config: &AppConfig, params: WorkerInstallParams,
) -> Result<CallToolResult, McpError> {
    let config = AppConfig { generation: Generation::new(params.generation), ..config.clone() };
    config.validate().map_err(|e| Error::InvalidInput(e.to_string()))?;

    let dispatcher = Dispatcher::from_config(&config, registration.db().clone(), registration.network())?;
    let state = registration.install(dispatcher).await?;

    super::json_result(&WorkerInstallOutput { generation: config.generation, state })
}

/// Implementation of the worker_status tool.
pub async fn status_impl(registration: &Registration) -> Result<CallToolResult, McpError> {
    let status = registration.status().await?;
    super::json_result(&status)
}

/// Bring up the deployment described by `config` at startup, reusing its
/// stored precache when an earlier run left a complete one.
pub async fn restore_initial(registration: &Registration, config: &AppConfig) -> Result<LifecycleState, Error> {
    let dispatcher = Dispatcher::from_config(config, registration.db().clone(), registration.network())?;
    registration.restore(dispatcher).await
}
