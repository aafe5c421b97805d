//! The generation provider contract and capability-based dispatch.
//!
//! A provider advertises a [`ProviderCapabilities`] descriptor once. The
//! engine turns it into a [`DispatchMode`] when the provider is constructed,
//! so every request for that provider goes through the same entry point.

use async_trait::async_trait;

use crate::api::{GenerationRequest, ProviderError, ToolDefinition, ToolResponse};
use crate::core::chat_stream::StreamSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderCapabilities {
    pub streaming: bool,
    pub tools: bool,
}

impl ProviderCapabilities {
    pub const fn plain() -> Self {
        Self {
            streaming: false,
            tools: false,
        }
    }

    pub const fn full() -> Self {
        Self {
            streaming: true,
            tools: true,
        }
    }
}

/// Which provider entry point a request goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    StreamingWithTools,
    ToolsOnly,
    Streaming,
    Plain,
}

impl DispatchMode {
    /// Tool calling with streaming beats tool calling alone, which beats
    /// streaming alone, which beats a plain request.
    pub fn select(capabilities: ProviderCapabilities) -> Self {
        match (capabilities.tools, capabilities.streaming) {
            (true, true) => DispatchMode::StreamingWithTools,
            (true, false) => DispatchMode::ToolsOnly,
            (false, true) => DispatchMode::Streaming,
            (false, false) => DispatchMode::Plain,
        }
    }

    pub fn streams(self) -> bool {
        matches!(
            self,
            DispatchMode::StreamingWithTools | DispatchMode::Streaming
        )
    }

    pub fn uses_tools(self) -> bool {
        matches!(
            self,
            DispatchMode::StreamingWithTools | DispatchMode::ToolsOnly
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            DispatchMode::StreamingWithTools => "streaming + tools",
            DispatchMode::ToolsOnly => "tools",
            DispatchMode::Streaming => "streaming",
            DispatchMode::Plain => "plain",
        }
    }
}

/// A remote (or scripted) model that can answer a conversation.
///
/// Only [`generate`](GenerationProvider::generate) is mandatory. The other
/// entry points are called exclusively when [`capabilities`] advertises them.
///
/// [`capabilities`]: GenerationProvider::capabilities
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> ProviderCapabilities;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;

    /// Pushes text fragments into `sink` in arrival order.
    async fn generate_streaming(
        &self,
        _request: &GenerationRequest,
        _sink: &StreamSink,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("streaming"))
    }

    async fn generate_with_tools(
        &self,
        _request: &GenerationRequest,
        _tools: &[ToolDefinition],
    ) -> Result<ToolResponse, ProviderError> {
        Err(ProviderError::Unsupported("tool calling"))
    }

    /// Pushes text fragments and tool calls into `sink` interleaved, in
    /// arrival order.
    async fn generate_streaming_with_tools(
        &self,
        _request: &GenerationRequest,
        _tools: &[ToolDefinition],
        _sink: &StreamSink,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported("streaming tool calls"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_precedence_is_fixed() {
        let cases = [
            (true, true, DispatchMode::StreamingWithTools),
            (false, true, DispatchMode::ToolsOnly),
            (true, false, DispatchMode::Streaming),
            (false, false, DispatchMode::Plain),
        ];
        for (streaming, tools, expected) in cases {
            let mode = DispatchMode::select(ProviderCapabilities { streaming, tools });
            assert_eq!(mode, expected, "streaming={streaming} tools={tools}");
        }
    }

    #[test]
    fn streaming_modes_report_streams() {
        assert!(DispatchMode::StreamingWithTools.streams());
        assert!(DispatchMode::Streaming.streams());
        assert!(!DispatchMode::ToolsOnly.streams());
        assert!(!DispatchMode::Plain.streams());
        assert!(DispatchMode::ToolsOnly.uses_tools());
        assert!(!DispatchMode::Streaming.uses_tools());
    }
}
