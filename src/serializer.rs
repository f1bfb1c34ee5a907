//! Translation of workflow commands into their wire envelopes.
//!
//! Each command serializes to a tagged envelope: a type discriminator plus
//! a JSON attribute object. Serialization is pure; nothing here touches the
//! network.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::InternalError;
use crate::options::TimeoutKind;

/// A decision produced by workflow code, awaiting transmission.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CompleteWorkflow {
        result: String,
    },
    FailWorkflow {
        reason: String,
    },
    /// Close the current run and immediately start a fresh one with new
    /// inputs, carrying the workflow id forward.
    ContinueAsNew {
        workflow_name: String,
        task_queue: String,
        input: String,
        timeouts: HashMap<TimeoutKind, Duration>,
        headers: HashMap<String, String>,
    },
}

/// Wire discriminator identifying the command an envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandType {
    CompleteWorkflowExecution,
    FailWorkflowExecution,
    ContinueAsNewWorkflowExecution,
}

/// A command in wire form: discriminator plus attribute payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireCommand {
    pub command_type: CommandType,
    pub attributes: serde_json::Value,
}

#[derive(Serialize)]
struct CompleteWorkflowAttributes<'a> {
    result: &'a str,
}

#[derive(Serialize)]
struct FailWorkflowAttributes<'a> {
    reason: &'a str,
}

#[derive(Serialize)]
struct ContinueAsNewAttributes<'a> {
    workflow_name: &'a str,
    task_queue: &'a str,
    input: &'a str,
    timeouts: &'a HashMap<TimeoutKind, Duration>,
    headers: &'a HashMap<String, String>,
}

/// Encodes a command into its wire envelope.
pub fn serialize_command(command: &Command) -> Result<WireCommand, InternalError> {
    let (command_type, attributes) = match command {
        Command::CompleteWorkflow { result } => (
            CommandType::CompleteWorkflowExecution,
            to_attributes(&CompleteWorkflowAttributes { result })?,
        ),
        Command::FailWorkflow { reason } => (
            CommandType::FailWorkflowExecution,
            to_attributes(&FailWorkflowAttributes { reason })?,
        ),
        Command::ContinueAsNew {
            workflow_name,
            task_queue,
            input,
            timeouts,
            headers,
        } => (
            CommandType::ContinueAsNewWorkflowExecution,
            to_attributes(&ContinueAsNewAttributes {
                workflow_name,
                task_queue,
                input,
                timeouts,
                headers,
            })?,
        ),
    };

    Ok(WireCommand { command_type, attributes })
}

fn to_attributes<T: Serialize>(attributes: &T) -> Result<serde_json::Value, InternalError> {
    serde_json::to_value(attributes).map_err(|e| InternalError::Serialization { message: e.to_string() })
}
