//! On-demand translation of titles and summaries (spec.md §4.E).
//!
//! CJK detection short-circuits already-translated text. Summaries are
//! clipped to 350 code points before translation (to bound token cost) and
//! re-clipped to 300 after. Results are memoized per upstream id for 24h.
//! Any failure leaves the original (clipped) text in place.

mod clip;

pub use clip::{clip_at_word_boundary, clip_code_points, has_cjk};

use aiscout_cache::TtlCache;
use aiscout_config::LlmConfig;
use aiscout_http::HttpClient;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

const PRE_CLIP: usize = 350;
const POST_CLIP: usize = 300;
const MEMOIZE_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslatedPair {
    pub title: String,
    pub summary: String,
}

pub struct Translator {
    http: HttpClient,
    config: LlmConfig,
    target_language: String,
    cache: TtlCache<TranslatedPair>,
}

impl Translator {
    pub fn new(http: HttpClient, config: LlmConfig, target_language: impl Into<String>) -> Self {
        Self {
            http,
            config,
            target_language: target_language.into(),
            cache: TtlCache::new(),
        }
    }

    /// Translate `title`/`summary` for `upstream_id`, honoring the 24h
    /// memoization cache. Returns the pair unchanged (modulo clipping) when
    /// the LLM is disabled, the text is already in the target language, or
    /// translation fails.
    pub async fn translate_item(
        &self,
        upstream_id: &str,
        title: &str,
        summary: &str,
    ) -> TranslatedPair {
        if let Some(cached) = self.cache.get(upstream_id) {
            return cached;
        }

        let summary_clipped = clip_at_word_boundary(summary, PRE_CLIP);

        let need_title = !self.already_in_target(title) && self.config.enabled;
        let need_summary = !self.already_in_target(&summary_clipped) && self.config.enabled;

        let result = if !need_title && !need_summary {
            TranslatedPair {
                title: title.to_string(),
                summary: clip_code_points(&summary_clipped, POST_CLIP),
            }
        } else {
            let (title_result, summary_result) = tokio::join!(
                self.maybe_translate(need_title, title),
                self.maybe_translate(need_summary, &summary_clipped),
            );
            TranslatedPair {
                title: title_result,
                summary: clip_code_points(&summary_result, POST_CLIP),
            }
        };

        self.cache.set(
            upstream_id.to_string(),
            result.clone(),
            Duration::hours(MEMOIZE_TTL_HOURS),
        );
        result
    }

    /// A CJK code point only proves "already translated" when the target
    /// itself is Chinese; for any other target it says nothing.
    fn already_in_target(&self, text: &str) -> bool {
        self.target_language.eq_ignore_ascii_case("zh") && has_cjk(text)
    }

    async fn maybe_translate(&self, needed: bool, text: &str) -> String {
        if !needed || text.is_empty() {
            return text.to_string();
        }
        match self.translate_text(text).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!(error = %e, "translation failed, keeping original text");
                text.to_string()
            }
        }
    }

    async fn translate_text(&self, text: &str) -> Result<String, String> {
        let system_prompt = format!(
            "Translate the given text into {}. Return only the translation, \
             no quotes, no explanation.",
            self.target_language
        );
        let payload = json!({
            "model": self.config.model_name,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": text },
            ],
            "temperature": 0.3,
            "max_tokens": self.config.max_tokens.min(1024),
        });

        let auth_header = format!("Bearer {}", self.config.api_key);
        let headers = [
            ("Authorization", auth_header.as_str()),
            ("Content-Type", "application/json"),
        ];

        let response = self
            .http
            .post_json(&self.config.api_url, &headers, &payload)
            .await
            .map_err(|e| e.to_string())?;

        let body: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;
        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| "response missing choices[0].message.content".to_string())?;

        Ok(content.trim().trim_matches('"').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn enabled_config(api_url: String) -> LlmConfig {
        LlmConfig {
            enabled: true,
            provider: "openai-compatible".to_string(),
            api_key: "test-key".to_string(),
            api_url,
            model_name: "gpt-4o-mini".to_string(),
            max_tokens: 512,
            temperature: 0.3,
            recent_days: 7,
            target_language: "zh".to_string(),
        }
    }

    #[tokio::test]
    async fn already_cjk_text_passes_through() {
        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let translator = Translator::new(http, LlmConfig::default(), "zh");
        let pair = translator.translate_item("1", "你好", "世界").await;
        assert_eq!(pair.title, "你好");
        assert_eq!(pair.summary, "世界");
    }

    #[tokio::test]
    async fn translates_english_via_llm() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{"message": {"content": "\"翻译结果\""}}]
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let translator = Translator::new(http, enabled_config(server.uri()), "zh");
        let pair = translator.translate_item("1", "hello", "world").await;
        assert_eq!(pair.title, "翻译结果");
        assert_eq!(pair.summary, "翻译结果");
    }

    #[tokio::test]
    async fn failure_keeps_original_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let translator = Translator::new(http, enabled_config(server.uri()), "zh");
        let pair = translator.translate_item("1", "hello", "world").await;
        assert_eq!(pair.title, "hello");
        assert_eq!(pair.summary, "world");
    }

    #[tokio::test]
    async fn repeated_call_for_same_id_is_memoized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let translator = Translator::new(http, enabled_config(server.uri()), "zh");
        let _ = translator.translate_item("1", "hello", "world").await;
        let second = translator.translate_item("1", "hello", "world").await;
        assert_eq!(second.title, "hello");
    }
}
