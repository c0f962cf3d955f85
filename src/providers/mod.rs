/*!
 * Provider implementations for translation services.
 *
 * Two layers live here:
 * - `Translator`: the port consumed by the translation engine, a single
 *   stateless `translate(text, target, source)` call
 * - `Provider`: wire-level clients with their own request/response types
 *
 * Implementations:
 * - DeepL: the DeepL REST API
 * - Mock: scripted behaviours for tests
 * - Retry: backoff wrapper around any `Translator`
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::errors::ProviderError;

/// Translation capability consumed by the engine
///
/// One call is atomic and stateless. The engine never retries a failed call;
/// retry policy belongs to adapters such as [`retry::RetryingTranslator`].
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate raw text into `target_language`
    ///
    /// # Arguments
    /// * `text` - Text to translate, possibly carrying marker envelopes
    /// * `target_language` - Target language code
    /// * `source_language` - Source language code, `None` to let the provider detect it
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: Option<&str>,
    ) -> Result<String, ProviderError>;

    /// Short provider name used in logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Translator + ?Sized> Translator for Arc<T> {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: Option<&str>,
    ) -> Result<String, ProviderError> {
        (**self).translate(text, target_language, source_language).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Common trait for wire-level provider clients
///
/// This trait defines the interface that all provider clients follow,
/// independent of the engine-facing [`Translator`] port.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the connection is successful, or an error
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

pub mod deepl;
pub mod mock;
pub mod retry;
