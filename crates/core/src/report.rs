use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// The evaluator's structured judgment of one candidate response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// 0.0..=10.0
    pub score: f64,
    pub feedback: String,
    pub keywords: Vec<String>,
    pub sentiment: Sentiment,
    /// 0.0..=1.0
    pub completeness: f64,
}

impl Analysis {
    /// The degraded analysis used when an evaluator fails internally, so a
    /// single evaluator fault never aborts the interview.
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            feedback: String::new(),
            keywords: Vec::new(),
            sentiment: Sentiment::Neutral,
            completeness: 0.0,
        }
    }
}

/// One answered question. A question whose response wait timed out
/// contributes no record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRecord {
    pub question: String,
    pub response: String,
    pub analysis: Analysis,
}

/// Derived summary of a finished interview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewReport {
    /// Mean of the recorded scores; None when nothing was answered.
    pub final_score: Option<f64>,
    pub answered: usize,
}

impl InterviewReport {
    pub fn from_records(records: &[ResponseRecord]) -> Self {
        let final_score = if records.is_empty() {
            None
        } else {
            let total: f64 = records.iter().map(|r| r.analysis.score).sum();
            Some(total / records.len() as f64)
        };
        Self {
            final_score,
            answered: records.len(),
        }
    }
}
