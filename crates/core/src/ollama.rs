//! Client for an Ollama-compatible `/api/chat` endpoint. Supports the
//! aggregate response shape and the NDJSON streaming shape.

use anyhow::Result;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::{Message, Role};

/// Model is kept loaded indefinitely when the residency flag is on,
/// otherwise unloaded after five minutes of idle time.
const KEEP_ALIVE_RESIDENT: i64 = -1;
const KEEP_ALIVE_IDLE_SECS: i64 = 300;

#[derive(Serialize, Clone, Copy, Debug)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub num_ctx: u32,
    pub use_mlock: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            num_ctx: 4096,
            use_mlock: false,
        }
    }
}

#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
    pub keep_alive: i64,
    pub options: GenerationOptions,
}

impl ChatRequest {
    pub fn new(
        model: impl Into<String>,
        messages: Vec<Message>,
        stream: bool,
        keep_alive: bool,
        options: GenerationOptions,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            stream,
            keep_alive: if keep_alive { KEEP_ALIVE_RESIDENT } else { KEEP_ALIVE_IDLE_SECS },
            options,
        }
    }
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl ResponseMessage {
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct StreamChunk {
    message: ResponseMessage,
    #[allow(dead_code)]
    done: bool,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    /// Single aggregate response.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ResponseMessage> {
        let response = self.client
            .post(self.chat_url())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Inference request failed: {}", response.status()));
        }

        let response = response.json::<ChatResponse>().await?;
        Ok(response.message)
    }

    /// Streamed response. Each non-empty content fragment is handed to
    /// `on_chunk` as it arrives; the assembled message is returned once the
    /// stream ends.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
        mut on_chunk: impl FnMut(&str),
    ) -> Result<ResponseMessage> {
        let response = self.client
            .post(self.chat_url())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Inference request failed: {}", response.status()));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut full_content = String::new();
        let mut role = Role::Assistant;

        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            buffer.extend_from_slice(&bytes);

            // Process complete NDJSON lines
            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
                let line = String::from_utf8_lossy(&line);
                consume_line(line.trim(), &mut role, &mut full_content, &mut on_chunk)?;
            }
        }

        // Flush a trailing line without a newline terminator
        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer);
            consume_line(line.trim(), &mut role, &mut full_content, &mut on_chunk)?;
        }

        Ok(ResponseMessage {
            role,
            content: full_content,
        })
    }
}

fn consume_line(
    line: &str,
    role: &mut Role,
    full_content: &mut String,
    on_chunk: &mut impl FnMut(&str),
) -> Result<()> {
    if line.is_empty() {
        return Ok(());
    }

    let chunk: StreamChunk = serde_json::from_str(line)?;
    *role = chunk.message.role;

    if !chunk.message.content.is_empty() {
        full_content.push_str(&chunk.message.content);
        on_chunk(&chunk.message.content);
    }

    Ok(())
}
