//! Batch LLM classifier for AI-relevance screening (spec.md §4.D).
//!
//! Input is an ordered `(id, title)` sequence of arbitrary length; output is
//! a same-length, same-id-order sequence of [`Verdict`]s. The classifier
//! never fails the caller — transport errors, timeouts, and malformed
//! responses all degrade to default-kept verdicts so a classifier outage
//! never silently drops ingestion.

mod parsing;

use aiscout_config::LlmConfig;
use aiscout_http::HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

const BATCH_SIZE: usize = 25;
const INTER_BATCH_SLEEP: Duration = Duration::from_millis(500);
const MAX_RETRIES: u32 = 2;

const SYSTEM_PROMPT: &str = "You are an AI-news screening assistant. Decide whether each \
title is related to AI, machine learning, or foundation models.\n\n\
Keep if: clearly about AI/ML/LLMs/GPT/Claude/Gemini/transformers/NLP/computer vision/agents/\
generative AI, or AI infrastructure (training frameworks, inference engines, accelerators).\n\
Drop if: purely non-AI web/database/hardware content with no AI angle.\n\
When in doubt and there is a plausible AI connection, keep it.\n\n\
Return only a JSON array, no prose, shaped as:\n\
[{\"id\": \"1\", \"score\": 0.95, \"keep\": true, \"reason\": \"mentions GPT model\"}]\n\n\
score is 0.0-1.0 AI relevance; keep is true/false; reason is one short sentence.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    pub id: String,
    pub score: f32,
    pub keep: bool,
    pub reason: String,
}

impl Verdict {
    pub fn default_kept(id: String) -> Self {
        Self {
            id,
            score: 0.5,
            keep: true,
            reason: "default-kept".to_string(),
        }
    }

    fn disabled(id: String) -> Self {
        Self {
            id,
            score: 0.5,
            keep: true,
            reason: "llm-disabled".to_string(),
        }
    }
}

pub struct Classifier {
    http: HttpClient,
    config: LlmConfig,
}

impl Classifier {
    pub fn new(http: HttpClient, config: LlmConfig) -> Self {
        Self { http, config }
    }

    /// Classify every `(id, title)` pair. Always returns one verdict per
    /// input, in input order.
    pub async fn classify(&self, items: &[(String, String)]) -> Vec<Verdict> {
        if items.is_empty() {
            return Vec::new();
        }

        if !self.config.enabled || self.config.api_key.is_empty() {
            return items
                .iter()
                .map(|(id, _)| Verdict::disabled(id.clone()))
                .collect();
        }

        let total_batches = items.len().div_ceil(BATCH_SIZE);
        let mut results = Vec::with_capacity(items.len());

        for (batch_num, chunk) in items.chunks(BATCH_SIZE).enumerate() {
            info!(
                batch = batch_num + 1,
                total_batches,
                size = chunk.len(),
                "classifying batch"
            );

            results.extend(self.classify_batch_with_retry(chunk).await);

            if (batch_num + 1) * BATCH_SIZE < items.len() {
                tokio::time::sleep(INTER_BATCH_SLEEP).await;
            }
        }

        results
    }

    async fn classify_batch_with_retry(&self, batch: &[(String, String)]) -> Vec<Verdict> {
        let ids: Vec<String> = batch.iter().map(|(id, _)| id.clone()).collect();

        for retry in 0..=MAX_RETRIES {
            match self.classify_single_batch(batch).await {
                Ok(verdicts) => return verdicts,
                Err(e) => {
                    if retry < MAX_RETRIES {
                        let wait = Duration::from_secs((retry as u64 + 1) * 2);
                        warn!(retry, error = %e, wait_secs = wait.as_secs(), "classifier batch failed, retrying");
                        tokio::time::sleep(wait).await;
                    } else {
                        warn!(error = %e, "classifier batch exhausted retries, defaulting to kept");
                    }
                }
            }
        }

        ids.into_iter().map(Verdict::default_kept).collect()
    }

    async fn classify_single_batch(&self, batch: &[(String, String)]) -> Result<Vec<Verdict>, String> {
        let ids: Vec<String> = batch.iter().map(|(id, _)| id.clone()).collect();
        let items_json: Vec<_> = batch
            .iter()
            .map(|(id, title)| json!({ "id": id, "title": title }))
            .collect();

        let user_prompt = format!(
            "Classify the following {} titles for AI relevance:\n\n{}\n\n\
             Return a JSON array with one result per title, same order.",
            batch.len(),
            serde_json::to_string_pretty(&items_json).unwrap_or_default()
        );

        let payload = json!({
            "model": self.config.model_name,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens.min(2000),
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

        Ok(parsing::parse_verdicts(content, &ids))
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
            max_tokens: 1024,
            temperature: 0.3,
            recent_days: 7,
            target_language: "zh".to_string(),
        }
    }

    #[tokio::test]
    async fn disabled_llm_returns_default_kept_for_all_ids() {
        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let classifier = Classifier::new(http, LlmConfig::default());
        let items = vec![("1".to_string(), "title".to_string())];
        let verdicts = classifier.classify(&items).await;
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].reason, "llm-disabled");
    }

    #[tokio::test]
    async fn same_length_and_ids_as_input() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [{"message": {"content":
                "[{\"id\":\"1\",\"score\":0.9,\"keep\":true,\"reason\":\"gpt\"},\
                 {\"id\":\"2\",\"score\":0.1,\"keep\":false,\"reason\":\"db\"}]"
            }}]
        });
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let classifier = Classifier::new(http, enabled_config(format!("{}/chat", server.uri())));
        let items = vec![
            ("1".to_string(), "GPT-5 launches".to_string()),
            ("2".to_string(), "New SQL index type".to_string()),
        ];
        let verdicts = classifier.classify(&items).await;
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[0].id, "1");
        assert!(verdicts[0].keep);
        assert_eq!(verdicts[1].id, "2");
        assert!(!verdicts[1].keep);
    }

    #[tokio::test]
    async fn exhausted_retries_fail_open() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let http = HttpClient::new("aiscout-test/0.1").unwrap();
        let classifier = Classifier::new(http, enabled_config(format!("{}/chat", server.uri())));
        let items = vec![("1".to_string(), "anything".to_string())];
        let verdicts = classifier.classify(&items).await;
        assert_eq!(verdicts.len(), 1);
        assert!(verdicts[0].keep);
        assert_eq!(verdicts[0].reason, "default-kept");
    }
}
