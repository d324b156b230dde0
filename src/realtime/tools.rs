//! Tools the remote AI may call.
//!
//! Both tools write into the shared view model so the change is visible to
//! the UI immediately. Arguments are validated before anything is mutated.

use super::RealtimeSessionClient;
use crate::messages::EmailDraft;
use crate::ui::SharedViewModel;
use crate::{Result, VoxdraftError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

pub const SET_MEMORY: &str = "set_memory";
pub const EDIT_EMAIL_MARKETING: &str = "edit_email_marketing";

/// Schema of a tool as advertised to the remote session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object
    pub parameters: Value,
}

/// Local implementation of a tool call
pub trait ToolHandler: Send + Sync {
    /// Handle one call; the returned value is sent back as the call output
    fn call(&self, arguments: Value) -> Result<Value>;
}

pub fn set_memory_definition() -> ToolDefinition {
    ToolDefinition {
        name: SET_MEMORY.to_string(),
        description: "Saves important data about the user into memory.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "The key of the memory value. Always use lowercase and underscores, no other characters."
                },
                "value": {
                    "type": "string",
                    "description": "Value can be anything represented as a string"
                }
            },
            "required": ["key", "value"]
        }),
    }
}

pub fn edit_email_marketing_definition() -> ToolDefinition {
    ToolDefinition {
        name: EDIT_EMAIL_MARKETING.to_string(),
        description: "Replaces the email marketing draft with a new subject and body.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "subject": {
                    "type": "string",
                    "description": "Subject line of the marketing email"
                },
                "body": {
                    "type": "string",
                    "description": "Full body text of the marketing email"
                }
            },
            "required": ["subject", "body"]
        }),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| VoxdraftError::ToolError(format!("Invalid arguments for {}: {}", tool, e)))
}

#[derive(Debug, Deserialize)]
struct SetMemoryArgs {
    key: String,
    value: String,
}

/// Stores a key/value pair in the memory panel; existing keys are overwritten
pub struct SetMemoryTool {
    view: SharedViewModel,
}

impl SetMemoryTool {
    pub fn new(view: SharedViewModel) -> Self {
        Self { view }
    }
}

impl ToolHandler for SetMemoryTool {
    fn call(&self, arguments: Value) -> Result<Value> {
        let args: SetMemoryArgs = parse_args(SET_MEMORY, arguments)?;
        debug!("set_memory {} = {}", args.key, args.value);
        self.view.set_memory(args.key, args.value);
        Ok(json!({ "ok": true }))
    }
}

#[derive(Debug, Deserialize)]
struct EditEmailArgs {
    subject: String,
    body: String,
}

/// Replaces the email draft wholesale
pub struct EditEmailMarketingTool {
    view: SharedViewModel,
}

impl EditEmailMarketingTool {
    pub fn new(view: SharedViewModel) -> Self {
        Self { view }
    }
}

impl ToolHandler for EditEmailMarketingTool {
    fn call(&self, arguments: Value) -> Result<Value> {
        let args: EditEmailArgs = parse_args(EDIT_EMAIL_MARKETING, arguments)?;
        let message = format!("Email marketing draft updated: {}", args.subject);
        self.view
            .apply_email_draft(EmailDraft::new(args.subject, args.body));
        info!("{}", message);
        Ok(json!({ "ok": true, "message": message }))
    }
}

/// Register both tools with the client
pub fn register_tools<C>(client: &mut C, view: &SharedViewModel) -> Result<()>
where
    C: RealtimeSessionClient + ?Sized,
{
    client.add_tool(
        set_memory_definition(),
        Arc::new(SetMemoryTool::new(view.clone())),
    )?;
    client.add_tool(
        edit_email_marketing_definition(),
        Arc::new(EditEmailMarketingTool::new(view.clone())),
    )?;
    debug!("Registered {} and {}", SET_MEMORY, EDIT_EMAIL_MARKETING);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_memory_schema() {
        let def = set_memory_definition();
        assert_eq!(def.name, "set_memory");
        assert_eq!(
            def.description,
            "Saves important data about the user into memory."
        );
        assert_eq!(def.parameters["required"], json!(["key", "value"]));
        assert_eq!(def.parameters["properties"]["key"]["type"], "string");
        assert_eq!(def.parameters["properties"]["value"]["type"], "string");
    }

    #[test]
    fn test_edit_email_schema() {
        let def = edit_email_marketing_definition();
        assert_eq!(def.name, "edit_email_marketing");
        assert_eq!(def.parameters["required"], json!(["subject", "body"]));
    }

    #[test]
    fn test_set_memory_overwrites() {
        let view = SharedViewModel::new();
        let tool = SetMemoryTool::new(view.clone());

        let out = tool.call(json!({ "key": "a", "value": "1" })).unwrap();
        assert_eq!(out, json!({ "ok": true }));
        tool.call(json!({ "key": "a", "value": "2" })).unwrap();

        let memory = view.memory();
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.get("a"), Some("2"));
    }

    #[test]
    fn test_set_memory_rejects_bad_arguments() {
        let view = SharedViewModel::new();
        let tool = SetMemoryTool::new(view.clone());

        let err = tool.call(json!({ "key": "a" })).unwrap_err();
        assert!(matches!(err, VoxdraftError::ToolError(_)));
        assert!(tool.call(json!({ "key": "a", "value": 3 })).is_err());
        assert!(view.memory().is_empty());
    }

    #[test]
    fn test_edit_email_replaces_draft() {
        let view = SharedViewModel::new();
        view.set_email_subject("old");
        let tool = EditEmailMarketingTool::new(view.clone());

        let out = tool
            .call(json!({ "subject": "Spring sale", "body": "20% off" }))
            .unwrap();
        assert_eq!(
            out,
            json!({ "ok": true, "message": "Email marketing draft updated: Spring sale" })
        );
        assert_eq!(view.email_draft(), EmailDraft::new("Spring sale", "20% off"));
    }

    #[test]
    fn test_edit_email_rejects_missing_body() {
        let view = SharedViewModel::new();
        view.set_email_subject("kept");
        let tool = EditEmailMarketingTool::new(view.clone());

        assert!(tool.call(json!({ "subject": "x" })).is_err());
        assert_eq!(view.email_draft().subject, "kept");
    }
}
