//! HTTP transport seam and the raw response wrapper.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use crate::AdapterError;

/// A fully built request, ready for a transport to send.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl HttpRequest {
    /// `POST` with a JSON body and a JSON content type.
    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Sends one request and returns the transport's response handle.
///
/// Implementations must not consume the response body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    type Response: Send;

    async fn send(&self, request: HttpRequest) -> Result<Self::Response, AdapterError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a transport whose requests fail after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, AdapterError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    type Response = reqwest::Response;

    async fn send(&self, request: HttpRequest) -> Result<reqwest::Response, AdapterError> {
        let body = serde_json::to_vec(&request.body)?;
        tracing::debug!(method = %request.method, url = %request.url, bytes = body.len(), "sending request");

        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        Ok(builder.body(body).send().await?)
    }
}

/// Unconsumed transport response returned by a model client.
#[derive(Debug)]
pub struct RawHttpResult<R> {
    response: R,
}

impl<R> RawHttpResult<R> {
    pub fn new(response: R) -> Self {
        Self { response }
    }

    pub fn into_inner(self) -> R {
        self.response
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>;

impl RawHttpResult<reqwest::Response> {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// Buffer the whole body and decode it as one JSON value.
    pub async fn into_data(self) -> Result<Value, AdapterError> {
        let response = ensure_success(self.response).await?;
        let bytes = response.bytes().await?;
        tracing::debug!(bytes = bytes.len(), "received response body");
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Decode a streamed body, one JSON object per line.
    pub async fn into_data_stream(
        self,
    ) -> Result<impl Stream<Item = Result<Value, AdapterError>> + Send, AdapterError> {
        let response = ensure_success(self.response).await?;
        let bytes: ByteStream = Box::pin(response.bytes_stream());

        Ok(stream::unfold(
            (bytes, BytesMut::new(), false),
            |(mut bytes, mut buffer, mut ended)| async move {
                loop {
                    if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                        let line = buffer.split_to(pos + 1);
                        match decode_line(&line) {
                            Some(item) => return Some((item, (bytes, buffer, ended))),
                            None => continue,
                        }
                    }

                    if ended {
                        // Last line without a trailing newline.
                        let rest = buffer.split();
                        return decode_line(&rest).map(|item| (item, (bytes, buffer, ended)));
                    }

                    match bytes.next().await {
                        Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                        Some(Err(e)) => {
                            ended = true;
                            buffer.clear();
                            return Some((Err(AdapterError::from(e)), (bytes, buffer, ended)));
                        }
                        None => ended = true,
                    }
                }
            },
        ))
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, AdapterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AdapterError::Status {
        status: status.as_u16(),
        body,
    })
}

fn decode_line(line: &[u8]) -> Option<Result<Value, AdapterError>> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    tracing::trace!(chunk = text, "decoded stream chunk");
    Some(serde_json::from_str(text).map_err(AdapterError::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_json_sets_content_type() {
        let request = HttpRequest::post_json("http://localhost:11434/api/chat", json!({}));
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.header("content-type"), Some("application/json"));
    }

    #[test]
    fn decode_line_skips_blank_lines() {
        assert!(decode_line(b"  \r\n").is_none());
    }

    #[test]
    fn decode_line_parses_json() {
        let value = decode_line(b"{\"done\":true}\n").unwrap().unwrap();
        assert_eq!(value, json!({ "done": true }));
    }

    #[test]
    fn decode_line_reports_bad_json() {
        let result = decode_line(b"{not json").unwrap();
        assert!(matches!(result, Err(AdapterError::Json(_))));
    }
}
