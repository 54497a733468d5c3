//! Typed builders for leaf `action` steps.
//!
//! A step turns the data a configuration dialog collects into the code fragments
//! an action node carries. The step itself is stored as the node's config, so the
//! payload stays plain data.

pub mod template;

use crate::compiler::Operand;
use crate::compiler::runtime::quote;
use crate::error::ConfigurationError;
use crate::graph::{AssistantRegistry, NodePayload, VariableRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The variable a step introduces for later steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputBinding {
    pub name: String,
    pub display_name: String,
}

impl OutputBinding {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        write!(f, "{}", name)
    }
}

/// One leaf step of an automation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum ActionStep {
    /// Sends a text message; `{{name}}` placeholders insert earlier values.
    SendText { text: String },
    SendMedia {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    HttpRequest {
        method: HttpMethod,
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        body: Option<String>,
        #[serde(default)]
        output: Option<OutputBinding>,
    },
    /// Asks a registered assistant and stores its reply.
    QueryAssistant {
        assistant: String,
        prompt: String,
        output: OutputBinding,
    },
    SetVariable { output: OutputBinding, value: Operand },
    StoreValue { key: String, value: Operand },
    LoadValue { key: String, output: OutputBinding },
    Wait { seconds: u32 },
    /// Hand-written script, emitted verbatim on its own line.
    Script { code: String },
}

impl ActionStep {
    pub fn send_text(text: impl Into<String>) -> Self {
        ActionStep::SendText { text: text.into() }
    }

    pub fn script(code: impl Into<String>) -> Self {
        ActionStep::Script { code: code.into() }
    }

    /// The variable this step introduces, if any.
    pub fn output(&self) -> Option<&OutputBinding> {
        match self {
            ActionStep::HttpRequest { output, .. } => output.as_ref(),
            ActionStep::QueryAssistant { output, .. }
            | ActionStep::SetVariable { output, .. }
            | ActionStep::LoadValue { output, .. } => Some(output),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ActionStep::SendText { .. } => "Send text".to_string(),
            ActionStep::SendMedia { .. } => "Send media".to_string(),
            ActionStep::HttpRequest { method, url, .. } => format!("{} {}", method, url),
            ActionStep::QueryAssistant { assistant, .. } => format!("Ask {}", assistant),
            ActionStep::SetVariable { output, .. } => format!("Set {}", output.display_name),
            ActionStep::StoreValue { key, .. } => format!("Store {}", key),
            ActionStep::LoadValue { key, .. } => format!("Load {}", key),
            ActionStep::Wait { seconds } => format!("Wait {}s", seconds),
            ActionStep::Script { .. } => "Script".to_string(),
        }
    }

    /// Builds the action payload: label, code fragments and the step as config.
    pub fn to_payload(
        &self,
        variables: &VariableRegistry,
        assistants: &AssistantRegistry,
    ) -> Result<NodePayload, ConfigurationError> {
        let code = self.fragments(variables, assistants)?;
        let config = serde_json::to_value(self).map_err(|e| ConfigurationError::InvalidConfig {
            node_id: String::new(),
            kind: crate::graph::kinds::ACTION.to_string(),
            message: e.to_string(),
        })?;
        Ok(NodePayload {
            label: self.label(),
            code,
            config,
        })
    }

    fn fragments(
        &self,
        variables: &VariableRegistry,
        assistants: &AssistantRegistry,
    ) -> Result<Vec<String>, ConfigurationError> {
        let code = match self {
            ActionStep::SendText { text } => vec![format!(
                "await sendText(conversationId, {});\n",
                template::render(text, variables)?
            )],
            ActionStep::SendMedia { url, caption } => {
                let caption = match caption {
                    Some(caption) => template::render(caption, variables)?,
                    None => "null".to_string(),
                };
                vec![format!(
                    "await sendMedia(conversationId, {}, {});\n",
                    template::render(url, variables)?,
                    caption
                )]
            }
            ActionStep::HttpRequest {
                method,
                url,
                headers,
                body,
                output,
            } => {
                let headers = headers
                    .iter()
                    .map(|(name, value)| -> Result<String, ConfigurationError> {
                        Ok(format!("{}: {}", quote(name), template::render(value, variables)?))
                    })
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ");
                let data = match body {
                    Some(body) => template::render(body, variables)?,
                    None => "null".to_string(),
                };
                let mut code = vec![format!(
                    "response = await http.request({{ method: {}, url: {}, headers: {{ {} }}, data: {} }});\n",
                    quote(&method.to_string()),
                    template::render(url, variables)?,
                    headers,
                    data
                )];
                if let Some(output) = output {
                    code.push(format!("var {} = response.data;\n", output.name));
                }
                code
            }
            ActionStep::QueryAssistant {
                assistant,
                prompt,
                output,
            } => {
                let assistant = assistants
                    .lookup(assistant)
                    .ok_or_else(|| ConfigurationError::UnknownAssistant(assistant.clone()))?;
                vec![
                    format!(
                        "response = await http.post('/assistants/query', {{ model: {}, personality: {}, prompt: {} }});\n",
                        quote(&assistant.model),
                        quote(&assistant.personality),
                        template::render(prompt, variables)?
                    ),
                    format!("var {} = response.data.reply;\n", output.name),
                ]
            }
            ActionStep::SetVariable { output, value } => {
                check_operand(value, variables)?;
                vec![format!("var {} = {};\n", output.name, value)]
            }
            ActionStep::StoreValue { key, value } => {
                check_operand(value, variables)?;
                vec![format!(
                    "await storage.set(contactId, {}, {});\n",
                    quote(key),
                    value
                )]
            }
            ActionStep::LoadValue { key, output } => vec![format!(
                "var {} = await storage.get(contactId, {});\n",
                output.name,
                quote(key)
            )],
            ActionStep::Wait { seconds } => {
                vec![format!("await clock.sleep({});\n", u64::from(*seconds) * 1000)]
            }
            ActionStep::Script { code } if code.ends_with('\n') => vec![code.clone()],
            ActionStep::Script { code } => vec![format!("{}\n", code)],
        };
        Ok(code)
    }
}

fn check_operand(operand: &Operand, variables: &VariableRegistry) -> Result<(), ConfigurationError> {
    match operand.referenced_variable() {
        Some(name) if !variables.is_resolvable(name) => {
            Err(ConfigurationError::UnknownVariable(name.to_string()))
        }
        _ => Ok(()),
    }
}
