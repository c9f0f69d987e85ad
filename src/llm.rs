use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Shortens text to a bounded length. Implementations must be
/// deterministic for identical input.
#[allow(async_fn_in_trait)]
pub trait Summarizer {
    /// Summarize `text` to roughly `min_len..=max_len` words.
    async fn summarize(&self, text: &str, min_len: usize, max_len: usize) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

const SUMMARY_SYSTEM_PROMPT: &str = "You summarize educational material for a learner. \
Reply with the summary only, no preamble, no lists, no quotation marks.";

pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    /// `None` when `LLM_BASE_URL` is not configured.
    pub fn from_env() -> Result<Option<Self>> {
        let Some(base_url) = dotenv::var("LLM_BASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
        else {
            return Ok(None);
        };
        let model =
            dotenv::var("LLM_MODEL").unwrap_or_else(|_| "qwen/qwen3-8b".to_string());
        let api_key = dotenv::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());
        Self::new(base_url, model, api_key).map(Some)
    }

    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing LLM model name");
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Non-streaming chat completion at temperature 0.
    pub async fn chat(&self, messages: &[Message], max_tokens: usize) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.0,
            "max_tokens": max_tokens,
        });

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await.context("LLM request failed")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read LLM response")?;
        anyhow::ensure!(status.is_success(), "LLM request failed ({}): {}", status, text);
        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse LLM JSON")?;

        // Extract content from choices[0].message.content (handle null)
        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(content)
    }
}

impl Summarizer for LlmClient {
    async fn summarize(&self, text: &str, min_len: usize, max_len: usize) -> Result<String> {
        let messages = vec![
            Message {
                role: "system".to_string(),
                content: SUMMARY_SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: "user".to_string(),
                content: format!(
                    "Summarize the following in between {} and {} words:\n\n{}",
                    min_len, max_len, text
                ),
            },
        ];
        // Generous token headroom: roughly two tokens per word
        let summary = self.chat(&messages, max_len * 2 + 16).await?;
        anyhow::ensure!(!summary.is_empty(), "LLM returned an empty summary");
        debug!(input_len = text.len(), summary_len = summary.len(), "LLM summary");
        Ok(summary)
    }
}

/// Model-free summarizer: keeps leading whole sentences up to `max_len`
/// words, falling back to a hard word cut when that would drop below
/// `min_len`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveSummarizer;

impl ExtractiveSummarizer {
    pub fn extract(text: &str, min_len: usize, max_len: usize) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= max_len {
            return text.trim().to_string();
        }

        let mut kept: Vec<&str> = Vec::new();
        let mut sentence: Vec<&str> = Vec::new();
        for &word in &words {
            sentence.push(word);
            if word.ends_with(['.', '!', '?']) {
                if kept.len() + sentence.len() > max_len {
                    break;
                }
                kept.append(&mut sentence);
            }
        }

        if kept.is_empty() || kept.len() < min_len {
            kept = words[..max_len].to_vec();
        }
        kept.join(" ")
    }
}

impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, text: &str, min_len: usize, max_len: usize) -> Result<String> {
        Ok(Self::extract(text, min_len, max_len))
    }
}

/// Summarization backend selected at startup.
pub enum SummaryBackend {
    Llm(LlmClient),
    Extractive(ExtractiveSummarizer),
}

impl SummaryBackend {
    /// LLM backend when `LLM_BASE_URL` is set, extractive otherwise.
    pub fn from_env() -> Result<Self> {
        Ok(match LlmClient::from_env()? {
            Some(client) => Self::Llm(client),
            None => Self::Extractive(ExtractiveSummarizer),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            SummaryBackend::Llm(client) => client.model(),
            SummaryBackend::Extractive(_) => "extractive",
        }
    }
}

impl Summarizer for SummaryBackend {
    async fn summarize(&self, text: &str, min_len: usize, max_len: usize) -> Result<String> {
        match self {
            SummaryBackend::Llm(s) => s.summarize(text, min_len, max_len).await,
            SummaryBackend::Extractive(s) => s.summarize(text, min_len, max_len).await,
        }
    }
}
