//! Google Gemini provider implementation
//!
//! This module implements the LLMProvider trait on top of the Gemini
//! `generateContent` REST endpoint, including native function calling.
//! See: https://ai.google.dev/api/generate-content

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message, Result,
    Role, StopReason, TokenUsage, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model used by the report crew
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Gemini provider
///
/// Works with any `generateContent` capable model, e.g.
/// - gemini-2.0-flash
/// - gemini-2.5-flash
/// - gemini-2.5-pro
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider with a 120 second request timeout
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, Duration::from_secs(120))
    }

    /// Create a new Gemini provider with an explicit request timeout
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError(
                "Gemini API key is empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    /// Create a provider from environment variable
    ///
    /// Reads the API key from the `GEMINI_API` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API").map_err(|_| {
            LLMError::ConfigurationError("GEMINI_API environment variable not set".to_string())
        })?;
        Self::new(api_key)
    }

    /// Point the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Sending request to Gemini API"
        );

        let body = GeminiRequest::from_completion(&request)?;

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, request.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await?;
            return Err(LLMError::from_status(status, error_text, &request.model));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        let completion = gemini_response.into_completion()?;

        debug!(
            stop_reason = ?completion.stop_reason,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "Received response"
        );

        Ok(completion)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// Gemini wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolDefinition> for FunctionDeclaration {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.input_schema.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

impl GeminiRequest {
    fn from_completion(request: &CompletionRequest) -> Result<Self> {
        // functionResponse parts are matched by name, not by id
        let mut call_names: HashMap<String, String> = HashMap::new();
        let mut contents: Vec<GeminiContent> = Vec::with_capacity(request.messages.len());

        for message in &request.messages {
            let parts = message
                .blocks()
                .into_iter()
                .map(|block| to_part(block, &mut call_names))
                .collect::<Result<Vec<_>>>()?;

            if parts.is_empty() {
                continue;
            }

            // Parallel calls must be answered in a single turn
            if is_function_responses(&parts) {
                if let Some(last) = contents
                    .last_mut()
                    .filter(|last| is_function_responses(&last.parts))
                {
                    last.parts.extend(parts);
                    continue;
                }
            }

            contents.push(GeminiContent {
                role: Some(wire_role(message.role).to_string()),
                parts,
            });
        }

        let system_instruction = request.system.as_ref().map(|system| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: Some(system.clone()),
                ..GeminiPart::default()
            }],
        });

        let tools = match &request.tools {
            Some(defs) if !defs.is_empty() => vec![GeminiTool {
                function_declarations: defs.iter().map(FunctionDeclaration::from).collect(),
            }],
            _ => Vec::new(),
        };

        Ok(Self {
            contents,
            system_instruction,
            tools,
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
                stop_sequences: request.stop_sequences.clone(),
            },
        })
    }
}

fn is_function_responses(parts: &[GeminiPart]) -> bool {
    !parts.is_empty() && parts.iter().all(|part| part.function_response.is_some())
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn to_part(block: ContentBlock, call_names: &mut HashMap<String, String>) -> Result<GeminiPart> {
    Ok(match block {
        ContentBlock::Text { text } => GeminiPart {
            text: Some(text),
            ..GeminiPart::default()
        },
        ContentBlock::ToolUse { id, name, input } => {
            call_names.insert(id, name.clone());
            GeminiPart {
                function_call: Some(FunctionCall { name, args: input }),
                ..GeminiPart::default()
            }
        }
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            let name = call_names.get(&tool_use_id).cloned().ok_or_else(|| {
                LLMError::InvalidRequest(format!(
                    "tool result '{tool_use_id}' has no matching tool call"
                ))
            })?;
            let response = if is_error.unwrap_or(false) {
                json!({ "error": content })
            } else {
                json!({ "content": content })
            };
            GeminiPart {
                function_response: Some(FunctionResponse { name, response }),
                ..GeminiPart::default()
            }
        }
    })
}

impl GeminiResponse {
    fn into_completion(self) -> Result<CompletionResponse> {
        let usage = self
            .usage_metadata
            .map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(LLMError::Blocked(reason));
        };

        let finish_reason = candidate.finish_reason.unwrap_or_default();
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

        let mut blocks = Vec::with_capacity(parts.len());
        for (index, part) in parts.into_iter().enumerate() {
            if let Some(call) = part.function_call {
                blocks.push(ContentBlock::ToolUse {
                    id: format!("call_{index}_{}", call.name),
                    name: call.name,
                    input: call.args,
                });
            } else if let Some(text) = part.text {
                blocks.push(ContentBlock::Text { text });
            }
        }

        let has_calls = blocks
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }));

        let stop_reason = match finish_reason.as_str() {
            _ if has_calls => StopReason::ToolUse,
            "MAX_TOKENS" => StopReason::MaxTokens,
            "STOP" | "" => StopReason::EndTurn,
            other => {
                if blocks.is_empty() {
                    return Err(LLMError::Blocked(other.to_string()));
                }
                debug!("Unknown finish reason: {other}");
                StopReason::EndTurn
            }
        };

        Ok(CompletionResponse {
            message: Message::assistant_blocks(blocks),
            stop_reason,
            usage,
        })
    }
}
