/*!
 * Tests for provider implementations
 */

use std::sync::Arc;
use std::time::Duration;

use subrecon::app_config::Config;
use subrecon::app_controller::build_translator;
use subrecon::errors::ProviderError;
use subrecon::providers::Translator;
use subrecon::providers::deepl::{DeepL, DeepLRequest, DeepLResponse};
use subrecon::providers::mock::{MockProvider, MockRequest};
use subrecon::providers::retry::{RetryPolicy, RetryingTranslator};
use subrecon::translation::core::normalize_source_language;
use crate::common;

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff_base_ms: 1,
        rate_limit_delay_ms: 0,
    }
}

/// Test exponential backoff growth
#[test]
fn test_retry_policy_backoff_shouldDoublePerAttempt() {
    let policy = RetryPolicy { max_retries: 3, backoff_base_ms: 100, rate_limit_delay_ms: 0 };

    assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
    assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
    assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
}

/// Test transient failures are retried until success
#[tokio::test]
async fn test_retrying_translator_withIntermittentFailure_shouldRecover() {
    let mock = MockProvider::intermittent(2);
    let retrying = RetryingTranslator::new(mock.clone(), fast_policy(2));

    assert!(retrying.translate("one", "es", None).await.is_ok());
    // second call fails once, the retry is the third call
    assert_eq!(retrying.translate("two", "es", None).await.unwrap(), "[ES] two");
    assert_eq!(mock.call_count(), 3);
    assert_eq!(retrying.name(), "mock");
}

/// Test retries stop after the configured count
#[tokio::test]
async fn test_retrying_translator_withPersistentFailure_shouldGiveUp() {
    let mock = MockProvider::failing();
    let retrying = RetryingTranslator::new(mock.clone(), fast_policy(2));

    let result = retrying.translate("text", "es", None).await;
    assert!(matches!(result, Err(ProviderError::ApiError { status_code: 500, .. })));
    assert_eq!(mock.call_count(), 3);
}

/// Test the mock records what it receives
#[tokio::test]
async fn test_mock_provider_withCustomResponse_shouldUseGenerator() {
    fn shout(request: &MockRequest) -> String {
        request.text.to_uppercase()
    }

    let mock = MockProvider::working().with_custom_response(shout);
    let translator: Arc<dyn Translator> = Arc::new(mock.clone());

    assert_eq!(translator.translate("quiet", "de", Some("en")).await.unwrap(), "QUIET");
    assert_eq!(mock.requests(), vec!["quiet".to_string()]);
}

/// Test the empty and slow behaviours
#[test]
fn test_mock_provider_withEmptyAndSlowBehaviours_shouldAnswer() {
    let empty = tokio_test::block_on(MockProvider::empty().translate("x", "es", None));
    tokio_test::assert_ok!(&empty);
    assert_eq!(empty.unwrap(), "");

    let slow = tokio_test::block_on(MockProvider::slow(5).translate("x", "es", None));
    assert_eq!(slow.unwrap(), "[ES] x");
}

/// Test which source codes are forwarded to the provider
#[test]
fn test_normalize_source_language_withAutoOrBlank_shouldLetProviderDetect() {
    assert_eq!(normalize_source_language("auto"), None);
    assert_eq!(normalize_source_language(" AUTO "), None);
    assert_eq!(normalize_source_language(""), None);
    assert_eq!(normalize_source_language(" en "), Some("en"));
}

/// Test DeepL request construction
#[test]
fn test_deepl_request_withLowercaseCodes_shouldUppercase() {
    let request = DeepLRequest::new("Hello", "pt-br").source("en");

    assert_eq!(request.target_lang, "PT-BR");
    assert_eq!(request.source_lang.as_deref(), Some("EN"));
}

/// Test parsing of a DeepL reply
#[test]
fn test_deepl_response_withJsonBody_shouldDeserialize() {
    let body = r#"{"translations":[{"detected_source_language":"EN","text":"Hola"}]}"#;
    let response: DeepLResponse = serde_json::from_str(body).unwrap();

    assert_eq!(response.translations.len(), 1);
    assert_eq!(response.translations[0].text, "Hola");
}

/// Test a custom endpoint is kept
#[test]
fn test_deepl_client_withCustomEndpoint_shouldKeepIt() {
    let client = DeepL::new("key", "https://api.deepl.com/v2", 10);
    assert_eq!(client.endpoint(), "https://api.deepl.com/v2");
}

/// Test provider construction from configuration
#[test]
fn test_build_translator_withConfig_shouldPickProvider() {
    let mock = build_translator(&common::mock_config(10)).unwrap();
    assert_eq!(mock.name(), "mock");

    let mut config = Config::default();
    assert!(build_translator(&config).is_err(), "DeepL without key must be rejected");

    config.translation.active_provider_config_mut().api_key = "key".to_string();
    assert_eq!(build_translator(&config).unwrap().name(), "deepl");
}
