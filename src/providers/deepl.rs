use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{Provider, Translator};

/// Default DeepL API endpoint (free tier)
pub const DEFAULT_ENDPOINT: &str = "https://api-free.deepl.com/v2";

/// DeepL client for interacting with the DeepL REST API
#[derive(Debug)]
pub struct DeepL {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API base URL, without trailing slash
    endpoint: String,
    /// Request options applied to every translation
    options: DeepLOptions,
}

/// Per-request translation options
#[derive(Debug, Clone, PartialEq)]
pub struct DeepLOptions {
    /// `default`, `more`, `less`, `prefer_more` or `prefer_less`
    pub formality: String,
    /// Keep punctuation and casing as sent
    pub preserve_formatting: bool,
    /// Let DeepL split sentences
    pub split_sentences: bool,
    /// Treat markup as XML so tags survive translation
    pub tag_handling: bool,
    /// Glossary to apply, if any
    pub glossary_id: Option<String>,
}

impl Default for DeepLOptions {
    fn default() -> Self {
        Self {
            formality: "default".to_string(),
            preserve_formatting: true,
            split_sentences: true,
            tag_handling: true,
            glossary_id: None,
        }
    }
}

/// DeepL translate request
#[derive(Debug, Clone)]
pub struct DeepLRequest {
    pub text: String,
    pub target_lang: String,
    pub source_lang: Option<String>,
}

impl DeepLRequest {
    /// Create a new request; language codes are upper-cased as DeepL expects
    pub fn new(text: impl Into<String>, target_lang: &str) -> Self {
        Self {
            text: text.into(),
            target_lang: target_lang.to_uppercase(),
            source_lang: None,
        }
    }

    /// Set the source language
    pub fn source(mut self, source_lang: &str) -> Self {
        self.source_lang = Some(source_lang.to_uppercase());
        self
    }
}

/// One translated text
#[derive(Debug, Clone, Deserialize)]
pub struct DeepLTranslation {
    #[serde(default)]
    pub detected_source_language: Option<String>,
    pub text: String,
}

/// DeepL translate response
#[derive(Debug, Clone, Deserialize)]
pub struct DeepLResponse {
    pub translations: Vec<DeepLTranslation>,
}

/// Account usage as reported by `/usage`
#[derive(Debug, Clone, Deserialize)]
pub struct DeepLUsage {
    pub character_count: u64,
    pub character_limit: u64,
}

/// A glossary stored on the DeepL account
#[derive(Debug, Clone, Deserialize)]
pub struct Glossary {
    pub glossary_id: String,
    pub name: String,
    pub source_lang: String,
    pub target_lang: String,
    #[serde(default)]
    pub entry_count: u64,
    #[serde(default)]
    pub ready: bool,
}

#[derive(Debug, Deserialize)]
struct GlossaryList {
    glossaries: Vec<Glossary>,
}

impl DeepL {
    /// Create a new DeepL client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        let endpoint = if endpoint.trim().is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            endpoint.trim_end_matches('/').to_string()
        };

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs.max(1)))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint,
            options: DeepLOptions::default(),
        }
    }

    /// Replace the translation options
    pub fn with_options(mut self, options: DeepLOptions) -> Self {
        self.options = options;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        Url::parse(&format!("{}/{}", self.endpoint, path))
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid DeepL endpoint '{}': {}", self.endpoint, e)))
    }

    fn auth_header(&self) -> String {
        format!("DeepL-Auth-Key {}", self.api_key)
    }

    /// Form fields for a translate call
    pub fn form_fields(&self, request: &DeepLRequest) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("text", request.text.clone()),
            ("target_lang", request.target_lang.clone()),
        ];

        if let Some(source) = &request.source_lang {
            fields.push(("source_lang", source.clone()));
        }
        if !self.options.formality.is_empty() && self.options.formality != "default" {
            fields.push(("formality", self.options.formality.clone()));
        }
        if self.options.tag_handling {
            fields.push(("tag_handling", "xml".to_string()));
        }
        fields.push(("preserve_formatting", bool_flag(self.options.preserve_formatting)));
        fields.push(("split_sentences", bool_flag(self.options.split_sentences)));
        if let Some(glossary_id) = self.options.glossary_id.as_ref().filter(|id| !id.is_empty()) {
            fields.push(("glossary_id", glossary_id.clone()));
        }

        fields
    }

    /// Fetch character usage for the account
    pub async fn usage(&self) -> Result<DeepLUsage, ProviderError> {
        let response = self.client.get(self.url("usage")?)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to reach DeepL API: {}", e)))?;

        let response = check_status(response).await?;
        response.json::<DeepLUsage>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse DeepL usage: {}", e)))
    }

    /// List the glossaries available to the account
    pub async fn list_glossaries(&self) -> Result<Vec<Glossary>, ProviderError> {
        let response = self.client.get(self.url("glossaries")?)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to reach DeepL API: {}", e)))?;

        let response = check_status(response).await?;
        let list = response.json::<GlossaryList>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse DeepL glossaries: {}", e)))?;
        Ok(list.glossaries)
    }
}

#[async_trait]
impl Provider for DeepL {
    type Request = DeepLRequest;
    type Response = DeepLResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        debug!("Sending {} chars to DeepL ({} -> {})",
               request.text.chars().count(),
               request.source_lang.as_deref().unwrap_or("auto"),
               request.target_lang);

        let response = self.client.post(self.url("translate")?)
            .header(header::AUTHORIZATION, self.auth_header())
            .form(&self.form_fields(&request))
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to send request to DeepL API: {}", e)))?;

        let response = check_status(response).await?;
        let deepl_response = response.json::<DeepLResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse DeepL API response: {}", e)))?;

        if deepl_response.translations.is_empty() {
            return Err(ProviderError::ParseError("Empty response from DeepL server".to_string()));
        }

        Ok(deepl_response)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let usage = self.usage().await?;
        debug!("DeepL usage: {}/{} characters", usage.character_count, usage.character_limit);
        Ok(())
    }

    fn extract_text(response: &Self::Response) -> String {
        response.translations.iter()
            .map(|translation| translation.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Translator for DeepL {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: Option<&str>,
    ) -> Result<String, ProviderError> {
        let mut request = DeepLRequest::new(text, target_language);
        if let Some(source) = source_language {
            request = request.source(source);
        }

        let response = self.complete(request).await?;
        Ok(Self::extract_text(&response))
    }

    fn name(&self) -> &str {
        "deepl"
    }
}

fn bool_flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

// Map a non-success HTTP status onto the provider error taxonomy
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    error!("DeepL API error ({}): {}", status, error_text);

    Err(status_error(status, error_text))
}

/// Translate an HTTP status and body into a [`ProviderError`]
pub fn status_error(status: StatusCode, message: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(message),
        429 => ProviderError::RateLimitExceeded(message),
        456 => ProviderError::QuotaExceeded(message),
        code => ProviderError::ApiError { status_code: code, message },
    }
}
