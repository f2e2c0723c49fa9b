//! Thin HTTP client for the SIGUM REST API.
//!
//! Every service function goes through `get_json` / `send_json` / `delete`, so
//! bearer auth and error-message extraction live in one place.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

const VALIDATION_FALLBACK: &str = "Erro de validação no formulário.";
const SERVER_FALLBACK: &str = "Erro desconhecido do servidor.";

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into(), Client::builder())
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(config.api_url.clone(), Client::builder().timeout(config.http_timeout))
    }

    fn build(base_url: String, builder: reqwest::ClientBuilder) -> Result<Self> {
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Attach the bearer token saved at login
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying HTTP client with the configured timeout, without the bearer
    pub fn http(&self) -> &Client {
        &self.http
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = method.as_str(), url = url.as_str(), "api request");
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// POST / PATCH / PUT with a JSON body, decoding the JSON answer
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(method, path).json(body).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self.request(Method::DELETE, path).send().await?;
        check(response).await?;
        Ok(())
    }
}

/// Pass 2xx through, turn anything else into `Error::Api`
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(status, &body);
    debug!(status = status.as_u16(), message = message.as_str(), "api error");
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

/// Human-readable message for a failed call.
///
/// On 400 the server's validation messages win: an array is joined with
/// `" | "`, a single string is used as is, otherwise a generic form error.
/// Other statuses are prefixed with the code.
pub fn extract_error_message(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").cloned());

    let text = match message {
        Some(Value::Array(items)) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            Some(parts.join(" | ")).filter(|s| !s.is_empty())
        }
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    };

    if status == StatusCode::BAD_REQUEST {
        text.unwrap_or_else(|| VALIDATION_FALLBACK.to_string())
    } else {
        format!(
            "Erro {}: {}",
            status.as_u16(),
            text.unwrap_or_else(|| SERVER_FALLBACK.to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_message_joined() {
        let body = r#"{"statusCode":400,"message":["codigo must be a string","descricao should not be empty"]}"#;
        assert_eq!(
            extract_error_message(StatusCode::BAD_REQUEST, body),
            "codigo must be a string | descricao should not be empty"
        );
    }

    #[test]
    fn test_single_message_used() {
        let body = r#"{"message":"CNAE já cadastrado"}"#;
        assert_eq!(extract_error_message(StatusCode::BAD_REQUEST, body), "CNAE já cadastrado");
    }

    #[test]
    fn test_validation_fallback() {
        assert_eq!(extract_error_message(StatusCode::BAD_REQUEST, "<html>"), VALIDATION_FALLBACK);
        assert_eq!(extract_error_message(StatusCode::BAD_REQUEST, r#"{"message":[]}"#), VALIDATION_FALLBACK);
    }

    #[test]
    fn test_other_status_prefixed() {
        assert_eq!(
            extract_error_message(StatusCode::NOT_FOUND, r#"{"message":"Zoneamento não encontrado"}"#),
            "Erro 404: Zoneamento não encontrado"
        );
        assert_eq!(
            extract_error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Erro 500: Erro desconhecido do servidor."
        );
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = ApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }
}
