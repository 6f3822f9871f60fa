//! Request adapter for the Ollama HTTP API.
//!
//! An [`OllamaClient`] takes a [`Model`], a [`Payload`] and a flat bag of
//! [`Options`], routes the call to `/api/chat` or `/api/embed`, reshapes the
//! options into the body layout Ollama expects and hands back the raw
//! response for downstream conversion.

pub mod options;
pub mod providers;
pub mod transport;

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use options::{normalize, Options, CHAT_TOP_LEVEL_KEYS, EMBED_TOP_LEVEL_KEYS, RESPONSE_FORMAT};
pub use providers::ollama::OllamaClient;
pub use transport::{HttpRequest, HttpTransport, RawHttpResult, ReqwestTransport};

/// Family tag carried by every model this crate can serve.
pub const OLLAMA_FAMILY: &str = "ollama";

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Unsupported model \"{family}\": \"{name}\"")]
    UnsupportedModel { family: String, name: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ollama returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// One chat turn in the shape `/api/chat` accepts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Base64-encoded images for multimodal models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
    /// Name of the tool whose output this message carries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: None,
            tool_calls: None,
            tool_name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }
}

/// A feature a model declares support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    InputMessages,
    InputText,
    InputImage,
    OutputText,
    OutputStreaming,
    OutputStructured,
    ToolCalling,
    Thinking,
    Embeddings,
}

/// Immutable descriptor of a target model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    family: String,
    name: String,
    capabilities: BTreeSet<Capability>,
}

impl Model {
    pub fn new(family: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            name: name.into(),
            capabilities: BTreeSet::new(),
        }
    }

    /// A chat model served by Ollama.
    pub fn ollama_chat(name: impl Into<String>) -> Self {
        Self::new(OLLAMA_FAMILY, name).with_capabilities([
            Capability::InputMessages,
            Capability::OutputText,
            Capability::OutputStreaming,
            Capability::OutputStructured,
            Capability::ToolCalling,
        ])
    }

    /// An embedding model served by Ollama.
    pub fn ollama_embedding(name: impl Into<String>) -> Self {
        Self::new(OLLAMA_FAMILY, name)
            .with_capabilities([Capability::InputText, Capability::Embeddings])
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }
}

/// Request payload handed to a [`ModelClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Body fields for a chat call (`model`, `messages`, ...).
    Object(Map<String, Value>),
    /// Single embedding input.
    Text(String),
    /// Batch embedding input.
    Texts(Vec<String>),
}

impl Payload {
    /// Build a chat payload `{model, messages}`.
    pub fn chat(model: impl Into<String>, messages: &[Message]) -> Result<Self, AdapterError> {
        let mut body = Map::new();
        body.insert("model".into(), Value::String(model.into()));
        body.insert("messages".into(), serde_json::to_value(messages)?);
        Ok(Payload::Object(body))
    }

    /// The payload as a JSON value, used verbatim as embedding `input`.
    pub fn into_value(self) -> Value {
        match self {
            Payload::Object(map) => Value::Object(map),
            Payload::Text(text) => Value::String(text),
            Payload::Texts(texts) => Value::Array(texts.into_iter().map(Value::String).collect()),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Vec<String>> for Payload {
    fn from(texts: Vec<String>) -> Self {
        Payload::Texts(texts)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Payload::Object(map)
    }
}

/// A client that turns a model call into one HTTP request.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Transport response handed back, unconsumed, inside [`RawHttpResult`].
    type Response: Send;

    fn supports(&self, model: &Model) -> bool;

    async fn request(
        &self,
        model: &Model,
        payload: Payload,
        options: Options,
    ) -> Result<RawHttpResult<Self::Response>, AdapterError>;
}
