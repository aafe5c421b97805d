use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{GenerationRequest, ProviderError, ToolCall, ToolDefinition, ToolResponse};
use crate::core::provider::{DispatchMode, GenerationProvider};

/// Messages a request worker reports back to the event loop.
///
/// Every request ends with exactly one terminal message: `End` for streaming
/// requests, `Complete` for non-streaming ones, or `Error` for either.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    Chunk(String),
    ToolCalls(Vec<ToolCall>),
    Complete(ToolResponse),
    Error(String),
    End,
}

impl StreamMessage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamMessage::Complete(_) | StreamMessage::Error(_) | StreamMessage::End
        )
    }
}

/// Write half handed to streaming providers; tags everything with the
/// request's stream id.
#[derive(Clone, Debug)]
pub struct StreamSink {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
}

impl StreamSink {
    /// Returns `false` once the receiving side has gone away.
    pub fn text(&self, chunk: impl Into<String>) -> bool {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return !self.tx.is_closed();
        }
        self.tx
            .send((StreamMessage::Chunk(chunk), self.stream_id))
            .is_ok()
    }

    pub fn tool_calls(&self, calls: Vec<ToolCall>) -> bool {
        if calls.is_empty() {
            return !self.tx.is_closed();
        }
        self.tx
            .send((StreamMessage::ToolCalls(calls), self.stream_id))
            .is_ok()
    }

    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    fn finish(&self, message: StreamMessage) {
        let _ = self.tx.send((message, self.stream_id));
    }
}

pub struct StreamParams {
    pub provider: Arc<dyn GenerationProvider>,
    pub mode: DispatchMode,
    pub request: GenerationRequest,
    pub tools: Vec<ToolDefinition>,
    pub timeout: Option<Duration>,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

impl std::fmt::Debug for StreamParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamParams")
            .field("provider", &self.provider.name())
            .field("mode", &self.mode)
            .field("request", &self.request)
            .field("tools", &self.tools.len())
            .field("timeout", &self.timeout)
            .field("stream_id", &self.stream_id)
            .finish()
    }
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn sink(&self, stream_id: u64) -> StreamSink {
        StreamSink {
            tx: self.tx.clone(),
            stream_id,
        }
    }

    /// Runs one request on its own task. A cancelled request reports nothing
    /// further.
    pub fn spawn_stream(&self, params: StreamParams) -> tokio::task::JoinHandle<()> {
        let sink = self.sink(params.stream_id);
        tokio::spawn(async move {
            let StreamParams {
                provider,
                mode,
                request,
                tools,
                timeout,
                cancel_token,
                stream_id,
            } = params;

            debug!(
                stream_id,
                provider = provider.name(),
                mode = mode.label(),
                messages = request.history.len(),
                "dispatching generation request"
            );

            let work = run_request(provider.as_ref(), mode, &request, &tools, &sink);
            let work = async {
                match timeout {
                    Some(limit) => match tokio::time::timeout(limit, work).await {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Timeout(limit)),
                    },
                    None => work.await,
                }
            };

            tokio::select! {
                result = work => {
                    if cancel_token.is_cancelled() {
                        return;
                    }
                    match result {
                        Ok(Some(response)) => sink.finish(StreamMessage::Complete(response)),
                        Ok(None) => sink.finish(StreamMessage::End),
                        Err(err) => sink.finish(StreamMessage::Error(err.to_string())),
                    }
                }
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "generation request cancelled");
                }
            }
        })
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

/// Streaming modes report through the sink and yield `None`; the others
/// yield their single response.
async fn run_request(
    provider: &dyn GenerationProvider,
    mode: DispatchMode,
    request: &GenerationRequest,
    tools: &[ToolDefinition],
    sink: &StreamSink,
) -> Result<Option<ToolResponse>, ProviderError> {
    match mode {
        DispatchMode::StreamingWithTools => provider
            .generate_streaming_with_tools(request, tools, sink)
            .await
            .map(|_| None),
        DispatchMode::ToolsOnly => provider
            .generate_with_tools(request, tools)
            .await
            .map(Some),
        DispatchMode::Streaming => provider
            .generate_streaming(request, sink)
            .await
            .map(|_| None),
        DispatchMode::Plain => provider
            .generate(request)
            .await
            .map(|text| Some(ToolResponse::text(text))),
    }
}
