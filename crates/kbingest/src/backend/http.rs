//! HTTP implementation of [`Backend`] for the REST ingestion service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::knowledge_base::KnowledgeBase;
use crate::store::FileRecord;

use super::types::{
    CreateKnowledgeBaseRequest, EmbedAck, EmbedRequest, ErrorBody, TranslatedText, UploadFile,
    UploadedText,
};
use super::Backend;

/// Maximum length of a rejection body kept in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &body[..end])
    } else {
        body.to_string()
    }
}

fn transport_error(endpoint: &str, err: reqwest::Error) -> BackendError {
    let message = if err.is_timeout() {
        format!("timed out ({})", err)
    } else {
        err.to_string()
    };
    BackendError::Transport {
        endpoint: endpoint.to_string(),
        message,
    }
}

/// Client for the backend REST API.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Creates a client with the timeouts from `config`.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;

        Self::with_client(client, &config.base_url)
    }

    /// Creates a backend around an existing client.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::Client(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Client(format!(
                "Base URL cannot carry a path: {}",
                base_url
            )));
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in the constructor
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response, BackendError> {
        debug!("Backend request: {}", endpoint);

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.message(),
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            Err(_) => truncate_body(&body),
        };

        Err(BackendError::Rejection {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        response: Response,
    ) -> Result<T, BackendError> {
        response.json::<T>().await.map_err(|e| BackendError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    fn file_form(file: UploadFile) -> Result<Form, BackendError> {
        let mime = file
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let part = Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&mime)
            .map_err(|e| BackendError::Client(format!("Invalid MIME type '{}': {}", mime, e)))?;
        Ok(Form::new().part("file", part))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn upload(&self, file: UploadFile) -> Result<UploadedText, BackendError> {
        const ENDPOINT: &str = "POST /api/upload";
        let form = Self::file_form(file)?;
        let request = self.client.post(self.url(&["api", "upload"])).multipart(form);
        let response = self.send(ENDPOINT, request).await?;
        self.json(ENDPOINT, response).await
    }

    async fn upload_and_translate(
        &self,
        file: UploadFile,
    ) -> Result<TranslatedText, BackendError> {
        const ENDPOINT: &str = "POST /api/upload_and_translate";
        let form = Self::file_form(file)?;
        let request = self
            .client
            .post(self.url(&["api", "upload_and_translate"]))
            .multipart(form);
        let response = self.send(ENDPOINT, request).await?;
        self.json(ENDPOINT, response).await
    }

    async fn embed(&self, request: EmbedRequest) -> Result<EmbedAck, BackendError> {
        const ENDPOINT: &str = "POST /api/embed";
        let builder = self.client.post(self.url(&["api", "embed"])).json(&request);
        let response = self.send(ENDPOINT, builder).await?;
        let ack: EmbedAck = self.json(ENDPOINT, response).await?;

        if !ack.success {
            return Err(BackendError::Rejection {
                endpoint: ENDPOINT.to_string(),
                status: 200,
                message: "backend reported an unsuccessful embed".to_string(),
            });
        }
        Ok(ack)
    }

    async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>, BackendError> {
        const ENDPOINT: &str = "GET /api/knowledge_bases";
        let request = self.client.get(self.url(&["api", "knowledge_bases"]));
        let response = self.send(ENDPOINT, request).await?;
        self.json(ENDPOINT, response).await
    }

    async fn create_knowledge_base(
        &self,
        name: &str,
        description: &str,
    ) -> Result<KnowledgeBase, BackendError> {
        const ENDPOINT: &str = "POST /api/knowledge_base";
        let request = self
            .client
            .post(self.url(&["api", "knowledge_base"]))
            .json(&CreateKnowledgeBaseRequest { name, description });
        let response = self.send(ENDPOINT, request).await?;
        self.json(ENDPOINT, response).await
    }

    async fn delete_knowledge_base(&self, id: &str) -> Result<(), BackendError> {
        let request = self.client.delete(self.url(&["api", "knowledge_base", id]));
        self.send("DELETE /api/knowledge_base/{id}", request).await?;
        Ok(())
    }

    async fn reset_knowledge_base(&self, id: &str) -> Result<(), BackendError> {
        let request = self
            .client
            .post(self.url(&["api", "knowledge_base", "reset", id]));
        self.send("POST /api/knowledge_base/reset/{id}", request)
            .await?;
        Ok(())
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, BackendError> {
        const ENDPOINT: &str = "GET /api/translations";
        let request = self.client.get(self.url(&["api", "translations"]));
        let response = self.send(ENDPOINT, request).await?;
        self.json(ENDPOINT, response).await
    }

    async fn delete_file(&self, id: &str) -> Result<(), BackendError> {
        let request = self.client.delete(self.url(&["api", "translations", id]));
        self.send("DELETE /api/translations/{id}", request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::with_client(Client::new(), base).expect("valid base url")
    }

    #[test]
    fn test_url_joins_segments() {
        let b = backend("http://localhost:5000");
        assert_eq!(
            b.url(&["api", "upload"]).as_str(),
            "http://localhost:5000/api/upload"
        );

        let b = backend("http://example.com/prefix/");
        assert_eq!(
            b.url(&["api", "translations", "abc"]).as_str(),
            "http://example.com/prefix/api/translations/abc"
        );
    }

    #[test]
    fn test_url_escapes_ids() {
        let b = backend("http://localhost:5000");
        assert_eq!(
            b.url(&["api", "knowledge_base", "a/b c"]).as_str(),
            "http://localhost:5000/api/knowledge_base/a%2Fb%20c"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpBackend::with_client(Client::new(), "not a url").is_err());
        assert!(HttpBackend::with_client(Client::new(), "mailto:x@example.com").is_err());
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(500);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("... (truncated)"));
        assert!(truncated.len() < long.len());
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn test_new_from_config() {
        let config = BackendConfig::default();
        let b = HttpBackend::new(&config).unwrap();
        assert_eq!(b.base_url().as_str(), "http://localhost:5000/");
    }
}
