//! Gap analyzer — the external compute collaborator behind the cache.
//!
//! ARCHITECTURAL RULE: no other module may call the Anthropic API directly.
//! The coordinator talks to the [`GapAnalyzer`] trait so tests swap in a
//! deterministic stub; [`ClaudeAnalyzer`] is the production implementation.
//!
//! Model: claude-sonnet-4-5 (hardcoded — do not make configurable to prevent
//! drift)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

use crate::models::analysis::GapAnalysis;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

/// Shape bounds the analyzer output must satisfy.
const MAX_MISSING_SKILLS: usize = 10;
const REQUIRED_LEARNING_STEPS: usize = 3;
const REQUIRED_INTERVIEW_QUESTIONS: usize = 3;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The model returned data failing the expected shape. Client-visible,
    /// distinct from a generic failure; nothing is cached.
    #[error("analyzer returned malformed output: {0}")]
    Malformed(String),

    /// The analyzer service failed outright. Nothing is cached.
    #[error("analyzer unavailable: {0}")]
    Unavailable(String),
}

/// The one-method compute collaborator the cache coordinator invokes on a
/// full miss.
#[async_trait]
pub trait GapAnalyzer: Send + Sync {
    async fn analyze(&self, resume_text: &str, jd_text: &str)
        -> Result<GapAnalysis, AnalyzerError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicResponse {
    /// Extracts the text content from the first text block.
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Production analyzer over the Anthropic Messages API.
/// Retries 429 and 5xx with exponential backoff; enforces the output shape
/// before handing the analysis to the cache.
#[derive(Clone)]
pub struct ClaudeAnalyzer {
    client: Client,
    api_key: String,
}

impl ClaudeAnalyzer {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a raw call to the Claude API, returning the extracted text.
    async fn call(&self, prompt: &str, system: &str) -> Result<String, AnalyzerError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<AnalyzerError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "analyzer call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(AnalyzerError::Unavailable(e.to_string()));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("analyzer API returned {}: {}", status, body);
                last_error = Some(AnalyzerError::Unavailable(format!(
                    "API error (status {status}): {body}"
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(AnalyzerError::Unavailable(format!(
                    "API error (status {status}): {message}"
                )));
            }

            let parsed: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| AnalyzerError::Malformed(e.to_string()))?;

            debug!(
                "analyzer call succeeded: input_tokens={}, output_tokens={}",
                parsed.usage.input_tokens, parsed.usage.output_tokens
            );

            return parsed
                .text()
                .map(str::to_string)
                .ok_or_else(|| AnalyzerError::Malformed("empty content".to_string()));
        }

        Err(last_error.unwrap_or_else(|| {
            AnalyzerError::Unavailable(format!("rate limited after {MAX_RETRIES} retries"))
        }))
    }
}

#[async_trait]
impl GapAnalyzer for ClaudeAnalyzer {
    async fn analyze(
        &self,
        resume_text: &str,
        jd_text: &str,
    ) -> Result<GapAnalysis, AnalyzerError> {
        let prompt = prompts::build_gap_analysis_prompt(resume_text, jd_text);
        let text = self.call(&prompt, prompts::GAP_ANALYSIS_SYSTEM).await?;

        // Strip markdown code fences if the model wrapped its JSON anyway.
        let text = strip_json_fences(&text);

        let analysis: GapAnalysis =
            serde_json::from_str(text).map_err(|e| AnalyzerError::Malformed(e.to_string()))?;

        validate_shape(&analysis)?;
        Ok(analysis)
    }
}

/// Enforces the output contract: 1–10 missing skills, exactly 3 learning
/// steps, exactly 3 interview questions.
fn validate_shape(analysis: &GapAnalysis) -> Result<(), AnalyzerError> {
    if analysis.missing_skills.is_empty() || analysis.missing_skills.len() > MAX_MISSING_SKILLS {
        return Err(AnalyzerError::Malformed(format!(
            "expected 1..={MAX_MISSING_SKILLS} missing skills, got {}",
            analysis.missing_skills.len()
        )));
    }
    if analysis.learning_steps.len() != REQUIRED_LEARNING_STEPS {
        return Err(AnalyzerError::Malformed(format!(
            "expected exactly {REQUIRED_LEARNING_STEPS} learning steps, got {}",
            analysis.learning_steps.len()
        )));
    }
    if analysis.interview_questions.len() != REQUIRED_INTERVIEW_QUESTIONS {
        return Err(AnalyzerError::Malformed(format!(
            "expected exactly {REQUIRED_INTERVIEW_QUESTIONS} interview questions, got {}",
            analysis.interview_questions.len()
        )));
    }
    Ok(())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::LearningStep;

    fn well_formed() -> GapAnalysis {
        GapAnalysis {
            missing_skills: vec!["Kubernetes".to_string()],
            learning_steps: vec![
                LearningStep {
                    title: "a".to_string(),
                    description: "b".to_string(),
                };
                3
            ],
            interview_questions: vec!["q".to_string(); 3],
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_validate_shape_accepts_contract() {
        assert!(validate_shape(&well_formed()).is_ok());
    }

    #[test]
    fn test_validate_shape_rejects_empty_skills() {
        let mut analysis = well_formed();
        analysis.missing_skills.clear();
        assert!(matches!(
            validate_shape(&analysis),
            Err(AnalyzerError::Malformed(_))
        ));
    }

    #[test]
    fn test_validate_shape_rejects_too_many_skills() {
        let mut analysis = well_formed();
        analysis.missing_skills = vec!["s".to_string(); 11];
        assert!(validate_shape(&analysis).is_err());
    }

    #[test]
    fn test_validate_shape_rejects_wrong_step_count() {
        let mut analysis = well_formed();
        analysis.learning_steps.pop();
        assert!(validate_shape(&analysis).is_err());
    }

    #[test]
    fn test_validate_shape_rejects_wrong_question_count() {
        let mut analysis = well_formed();
        analysis.interview_questions.push("extra".to_string());
        assert!(validate_shape(&analysis).is_err());
    }
}
