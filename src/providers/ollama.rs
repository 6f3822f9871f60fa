/// Ollama request adapter, talking to the native `/api/chat` and `/api/embed`
/// endpoints of a server at http://localhost:11434 by default.
use async_trait::async_trait;
use serde_json::Value;

use crate::options::{self, Options, CHAT_TOP_LEVEL_KEYS, EMBED_TOP_LEVEL_KEYS};
use crate::transport::{HttpRequest, HttpTransport, RawHttpResult, ReqwestTransport};
use crate::{AdapterError, Capability, Model, ModelClient, Payload, OLLAMA_FAMILY};

pub const DEFAULT_HOST_URL: &str = "http://localhost:11434";

/// Environment variable read by [`OllamaClient::from_env`].
pub const HOST_ENV_VAR: &str = "OLLAMA_HOST";

pub struct OllamaClient<T = ReqwestTransport> {
    transport: T,
    host_url: String,
}

impl OllamaClient<ReqwestTransport> {
    /// Uses `http://localhost:11434`.
    pub fn new() -> Self {
        Self::with_host_url(DEFAULT_HOST_URL)
    }

    /// Use a custom Ollama host (e.g. a remote server or Docker container).
    pub fn with_host_url(host_url: impl Into<String>) -> Self {
        Self::with_transport(host_url, ReqwestTransport::new())
    }

    /// Reads `OLLAMA_HOST`, falling back to the local default when unset.
    pub fn from_env() -> Self {
        let host = std::env::var(HOST_ENV_VAR).ok();
        Self::with_host_url(host_url_from(host.as_deref()))
    }
}

impl Default for OllamaClient<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HttpTransport> OllamaClient<T> {
    pub fn with_transport(host_url: impl Into<String>, transport: T) -> Self {
        Self {
            transport,
            host_url: host_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    async fn do_completion_request(
        &self,
        payload: Payload,
        mut options: Options,
    ) -> Result<RawHttpResult<T::Response>, AdapterError> {
        let Payload::Object(fields) = payload else {
            return Err(AdapterError::InvalidPayload(
                "chat requests need an object payload with model and messages".into(),
            ));
        };

        // Ollama streams unless told otherwise.
        if options.get("stream").map_or(true, Value::is_null) {
            options.insert("stream".into(), Value::Bool(false));
        }
        options::lift_response_format(&mut options);

        let mut body = options::normalize(&options, CHAT_TOP_LEVEL_KEYS);
        body.extend(fields);

        self.post("api/chat", body).await
    }

    async fn do_embeddings_request(
        &self,
        model: &Model,
        payload: Payload,
        options: Options,
    ) -> Result<RawHttpResult<T::Response>, AdapterError> {
        if let Payload::Object(_) = payload {
            return Err(AdapterError::InvalidPayload(
                "embedding requests need a text or list-of-texts payload".into(),
            ));
        }

        let mut body = options::normalize(&options, EMBED_TOP_LEVEL_KEYS);
        body.insert("model".into(), Value::String(model.name().to_string()));
        body.insert("input".into(), payload.into_value());

        self.post("api/embed", body).await
    }

    async fn post(
        &self,
        endpoint: &str,
        body: Options,
    ) -> Result<RawHttpResult<T::Response>, AdapterError> {
        let url = format!("{}/{}", self.host_url, endpoint);
        let response = self
            .transport
            .send(HttpRequest::post_json(url, Value::Object(body)))
            .await?;
        Ok(RawHttpResult::new(response))
    }
}

#[async_trait]
impl<T: HttpTransport> ModelClient for OllamaClient<T> {
    type Response = T::Response;

    fn supports(&self, model: &Model) -> bool {
        model.family() == OLLAMA_FAMILY
    }

    async fn request(
        &self,
        model: &Model,
        payload: Payload,
        options: Options,
    ) -> Result<RawHttpResult<T::Response>, AdapterError> {
        if model.supports(Capability::InputMessages) {
            tracing::debug!(model = model.name(), endpoint = "api/chat", "routing Ollama request");
            return self.do_completion_request(payload, options).await;
        }

        if model.supports(Capability::Embeddings) {
            tracing::debug!(model = model.name(), endpoint = "api/embed", "routing Ollama request");
            return self.do_embeddings_request(model, payload, options).await;
        }

        tracing::warn!(family = model.family(), model = model.name(), "model has no routable capability");
        Err(AdapterError::UnsupportedModel {
            family: model.family().to_string(),
            name: model.name().to_string(),
        })
    }
}

/// Resolve an `OLLAMA_HOST` value to a base URL.
fn host_url_from(value: Option<&str>) -> String {
    match value.map(str::trim) {
        None | Some("") => DEFAULT_HOST_URL.to_string(),
        Some(host) if host.starts_with("http://") || host.starts_with("https://") => host.to_string(),
        Some(host) => format!("http://{host}"),
    }
}
