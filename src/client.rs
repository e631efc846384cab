use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct AskRequest {
    query: String,
}

#[derive(Deserialize)]
struct AskResponse {
    answer: String,
}

/// Error body shape of the service (FastAPI-style `detail` field).
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Clone)]
pub struct AgentClient {
    client: Client,
    base_url: String,
}

impl AgentClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a question to the service and return the generated answer.
    ///
    /// The query is sent as-is; the service decides what to do with empty
    /// input.
    pub async fn ask(&self, query: &str) -> Result<String> {
        let request = AskRequest {
            query: query.to_string(),
        };

        let response = self
            .client
            .post(self.endpoint("ask"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(failure_message(response).await));
        }

        let ask_response: AskResponse = response.json().await?;
        Ok(ask_response.answer)
    }

    /// Upload a PDF as multipart form data under the `file` field.
    ///
    /// The service ingests and indexes the document; the success body is
    /// ignored. Returns the uploaded file name.
    pub async fn upload_pdf(&self, path: &Path) -> Result<String> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("not a file: {}", path.display()))?;

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload-pdf"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(failure_message(response).await));
        }

        Ok(file_name)
    }
}

/// Prefer the server-supplied `detail` over a generic status message.
async fn failure_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    detail_or_status(status, &body)
}

fn detail_or_status(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Some(detail),
        }) if !detail.is_empty() => detail,
        _ => format!("request failed with status {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_doubled_slashes() {
        let client = AgentClient::new("http://localhost:8000/", None).unwrap();
        assert_eq!(client.endpoint("ask"), "http://localhost:8000/ask");
        assert_eq!(
            client.endpoint("/upload-pdf"),
            "http://localhost:8000/upload-pdf"
        );
    }

    #[test]
    fn failure_prefers_server_detail() {
        let message = detail_or_status(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "index not found"}"#,
        );
        assert_eq!(message, "index not found");
    }

    #[test]
    fn failure_falls_back_on_missing_detail() {
        let message = detail_or_status(StatusCode::INTERNAL_SERVER_ERROR, "{}");
        assert_eq!(message, "request failed with status 500 Internal Server Error");
    }

    #[test]
    fn failure_falls_back_on_unparseable_body() {
        let message = detail_or_status(StatusCode::BAD_GATEWAY, "<html>nope</html>");
        assert_eq!(message, "request failed with status 502 Bad Gateway");
    }

    #[test]
    fn empty_detail_is_treated_as_absent() {
        let message = detail_or_status(StatusCode::BAD_REQUEST, r#"{"detail": ""}"#);
        assert_eq!(message, "request failed with status 400 Bad Request");
    }

    #[tokio::test]
    async fn upload_rejects_path_without_file_name() {
        let client = AgentClient::new("http://localhost:8000", None).unwrap();
        let err = client.upload_pdf(Path::new("/")).await.unwrap_err();
        assert!(err.to_string().contains("not a file"));
    }
}
