//! Google Gemini client over the Generative Language REST API.

use async_trait::async_trait;
use futures_util::StreamExt;
use memchr::memchr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::api::{
    format_api_error, ApiRole, ChatMessage, GenerationRequest, ProviderError, ToolCall,
    ToolDefinition, ToolResponse,
};
use crate::core::chat_stream::StreamSink;
use crate::core::provider::{GenerationProvider, ProviderCapabilities};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSet>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSet {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentRequest {
    fn build(request: &GenerationRequest, tools: &[ToolDefinition]) -> Self {
        let contents = request.history.iter().map(Content::from_message).collect();

        let system_instruction = if request.system_prompt.trim().is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part::text(&request.system_prompt)],
            })
        };

        let tools = if tools.is_empty() {
            Vec::new()
        } else {
            vec![ToolSet {
                function_declarations: tools
                    .iter()
                    .map(|tool| FunctionDeclaration {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    })
                    .collect(),
            }]
        };

        Self {
            contents,
            system_instruction,
            tools,
        }
    }
}

impl Content {
    fn from_message(message: &ChatMessage) -> Self {
        let role = match message.role {
            ApiRole::User => "user",
            ApiRole::Model => "model",
        };
        Self {
            role: Some(role.to_string()),
            parts: vec![Part::text(&message.content)],
        }
    }
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            function_call: None,
        }
    }
}

impl GenerateContentResponse {
    fn blocked_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }

    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
    }

    fn into_tool_response(self) -> ToolResponse {
        let mut response = ToolResponse::default();
        for candidate in self.candidates {
            let Some(content) = candidate.content else {
                continue;
            };
            for part in content.parts {
                if let Some(text) = part.text {
                    response.text.push_str(&text);
                }
                if let Some(call) = part.function_call {
                    response.tool_calls.push(ToolCall::new(call.name, call.args));
                }
            }
        }
        response
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Forwards one SSE `data:` payload to the sink. Returns `Ok(false)` when the
/// receiver is gone and the stream should stop.
fn handle_data_payload(payload: &str, sink: &StreamSink) -> Result<bool, ProviderError> {
    if payload.trim().is_empty() {
        return Ok(true);
    }

    let response: GenerateContentResponse = serde_json::from_str(payload)
        .map_err(|_| ProviderError::Api(format_api_error(payload)))?;

    if response.error.is_some() {
        return Err(ProviderError::Api(format_api_error(payload)));
    }

    if let Some(reason) = response.blocked_reason() {
        return Err(ProviderError::Api(format!("Prompt blocked: {reason}")));
    }

    let mut tool_calls = Vec::new();
    for part in response.parts() {
        if let Some(text) = &part.text {
            if !sink.text(text.as_str()) {
                return Ok(false);
            }
        }
        if let Some(call) = &part.function_call {
            tool_calls.push(ToolCall::new(call.name.clone(), call.args.clone()));
        }
    }

    Ok(sink.tool_calls(tool_calls))
}

fn process_sse_line(line: &str, sink: &StreamSink) -> Result<bool, ProviderError> {
    match extract_data_payload(line) {
        Some(payload) => handle_data_payload(payload, sink),
        None => Ok(true),
    }
}

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    env_vars: Vec<String>,
}

impl GeminiProvider {
    pub const NAME: &'static str = "gemini";

    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        env_vars: Vec<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            env_vars,
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    async fn post(
        &self,
        url: String,
        body: &GenerateContentRequest,
    ) -> Result<reqwest::Response, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingCredential {
                provider: Self::NAME.to_string(),
                env_vars: self.env_vars.clone(),
            })?;

        if body.contents.is_empty() {
            return Err(ProviderError::EmptyHistory);
        }

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            warn!(%status, "gemini request failed");
            return Err(ProviderError::Api(format_api_error(&error_text)));
        }

        Ok(response)
    }

    async fn request_once(
        &self,
        request: &GenerationRequest,
        tools: &[ToolDefinition],
    ) -> Result<ToolResponse, ProviderError> {
        let body = GenerateContentRequest::build(request, tools);
        let url = self.endpoint(&request.model, "generateContent");
        let response = self.post(url, &body).await?;

        let text = response
            .text()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;
        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;

        if let Some(reason) = parsed.blocked_reason() {
            return Err(ProviderError::Api(format!("Prompt blocked: {reason}")));
        }
        if parsed.candidates.is_empty() {
            return Err(ProviderError::Malformed(
                "response contained no candidates".to_string(),
            ));
        }

        Ok(parsed.into_tool_response())
    }

    async fn stream(
        &self,
        request: &GenerationRequest,
        tools: &[ToolDefinition],
        sink: &StreamSink,
    ) -> Result<(), ProviderError> {
        let body = GenerateContentRequest::build(request, tools);
        let url = format!(
            "{}?alt=sse",
            self.endpoint(&request.model, "streamGenerateContent")
        );
        let response = self.post(url, &body).await?;

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk_bytes = chunk.map_err(|err| ProviderError::Transport(err.to_string()))?;
            buffer.extend_from_slice(&chunk_bytes);

            while let Some(newline_pos) = memchr(b'\n', &buffer) {
                let keep_going = match std::str::from_utf8(&buffer[..newline_pos]) {
                    Ok(line) => process_sse_line(line.trim(), sink)?,
                    Err(err) => {
                        debug!("skipping invalid UTF-8 in stream: {err}");
                        true
                    }
                };
                buffer.drain(..=newline_pos);
                if !keep_going {
                    return Ok(());
                }
            }
        }

        if let Ok(rest) = std::str::from_utf8(&buffer) {
            process_sse_line(rest.trim(), sink)?;
        }

        Ok(())
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::full()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.request_once(request, &[])
            .await
            .map(|response| response.text)
    }

    async fn generate_streaming(
        &self,
        request: &GenerationRequest,
        sink: &StreamSink,
    ) -> Result<(), ProviderError> {
        self.stream(request, &[], sink).await
    }

    async fn generate_with_tools(
        &self,
        request: &GenerationRequest,
        tools: &[ToolDefinition],
    ) -> Result<ToolResponse, ProviderError> {
        self.request_once(request, tools).await
    }

    async fn generate_streaming_with_tools(
        &self,
        request: &GenerationRequest,
        tools: &[ToolDefinition],
        sink: &StreamSink,
    ) -> Result<(), ProviderError> {
        self.stream(request, tools, sink).await
    }
}
