use crate::report::Analysis;
use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub content: String,
}

// The `Evaluator` trait is the seam between the interview controller and
// whatever judges candidate answers. The controller never cares whether the
// judgment came from an LLM or a canned stub, and in unit tests `mockall`'s
// `MockEvaluator` stands in without any network traffic.
//
// The contract is deliberately infallible: implementations degrade to
// `Analysis::neutral()` on internal failure so one bad evaluation cannot
// abort a running interview.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, question: &str, response: &str) -> Analysis;
}

/// Fixed-value evaluator matching the prototype's canned analysis. Useful
/// for local runs and demos where no LLM is wired up.
pub struct StubEvaluator;

#[async_trait]
impl Evaluator for StubEvaluator {
    async fn evaluate(&self, _question: &str, _response: &str) -> Analysis {
        Analysis {
            score: 8.5,
            feedback: "Good response, shows relevant experience".to_string(),
            keywords: vec![
                "experience".to_string(),
                "skills".to_string(),
                "passion".to_string(),
            ],
            sentiment: crate::report::Sentiment::Positive,
            completeness: 0.9,
        }
    }
}

/// Chat-completions backed evaluator.
pub struct OpenAiEvaluator {
    client: Client,
    api_key: SecretString,
    model: String,
}

impl OpenAiEvaluator {
    pub fn new(api_key: SecretString, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    async fn try_evaluate(&self, question: &str, response: &str) -> Result<Analysis> {
        let prompt = format!(
            r#"You are scoring a candidate's answer in a job interview.

Question: "{question}"

Candidate's answer: "{response}"

Judge the answer for relevance, depth, and clarity. Respond STRICTLY as JSON:
{{
  "score": <float 0-10>,
  "feedback": "<one or two sentences for the candidate>",
  "keywords": ["<notable term>", ...],
  "sentiment": "positive" | "neutral" | "negative",
  "completeness": <float 0-1>
}}

Do NOT add any explanation, just the JSON."#
        );

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.2
        });

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .json::<LlmResponse>()
            .await?;

        let content = &resp
            .choices
            .first()
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?
            .message
            .content;

        let analysis = parse_analysis(content).context("Failed to parse LLM analysis")?;
        Ok(analysis)
    }
}

/// Parses the model's JSON into an `Analysis`, clamping the numeric fields
/// into their documented ranges.
fn parse_analysis(content: &str) -> Result<Analysis> {
    let mut analysis: Analysis = serde_json::from_str(content.trim())?;
    analysis.score = analysis.score.clamp(0.0, 10.0);
    analysis.completeness = analysis.completeness.clamp(0.0, 1.0);
    Ok(analysis)
}

#[async_trait]
impl Evaluator for OpenAiEvaluator {
    async fn evaluate(&self, question: &str, response: &str) -> Analysis {
        match self.try_evaluate(question, response).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!("evaluation failed, falling back to neutral analysis: {e:#}");
                Analysis::neutral()
            }
        }
    }
}
