//! Interpreter endpoint client
//!
//! Forwards a transcript to the backend `POST /interpret` endpoint and
//! classifies the reply into one narratable outcome per cycle.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::{Error, Result};

/// Characters allowed to reach the voice: word characters, whitespace,
/// and basic sentence punctuation
static NARRATION_FILTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,?!]").expect("valid regex"));

/// Classified outcome of one interpretation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// Server understood the transcript but found nothing actionable
    NoAction,
    /// A quiz was generated and is waiting in Parent Mode
    QuizReady,
    /// Sanitized text ready to narrate
    Narratable(String),
}

/// Wire shape of an `/interpret` reply
///
/// All fields are optional; classification decides which one wins.
#[derive(Debug, Default, serde::Deserialize)]
pub struct InterpretReply {
    /// Error reason (e.g. "No action detected")
    #[serde(default)]
    pub error: Option<String>,

    /// Non-empty when a quiz was generated from the transcript
    #[serde(default)]
    pub quiz: Option<String>,

    /// Primary narratable content
    #[serde(default)]
    pub text: Option<String>,

    /// Fallback summary, used only when `text` is empty
    #[serde(default)]
    pub summary: Option<String>,
}

impl InterpretReply {
    /// Classify the reply into an [`Interpretation`]
    ///
    /// Precedence: error, then quiz, then `text` over `summary`. A reply
    /// with nothing usable (or whose content sanitizes away entirely)
    /// classifies as [`Interpretation::NoAction`].
    #[must_use]
    pub fn classify(self) -> Interpretation {
        if let Some(reason) = self.error {
            tracing::debug!(reason = %reason, "interpreter reported no action");
            return Interpretation::NoAction;
        }

        if self.quiz.as_deref().is_some_and(|q| !q.is_empty()) {
            return Interpretation::QuizReady;
        }

        let body = self
            .text
            .filter(|t| !t.is_empty())
            .or_else(|| self.summary.filter(|s| !s.is_empty()));

        match body {
            Some(text) => {
                let clean = sanitize_narration(&text);
                if clean.trim().is_empty() {
                    Interpretation::NoAction
                } else {
                    Interpretation::Narratable(clean)
                }
            }
            None => Interpretation::NoAction,
        }
    }
}

/// Strip characters that should not reach the voice
#[must_use]
pub fn sanitize_narration(text: &str) -> String {
    NARRATION_FILTER.replace_all(text, "").into_owned()
}

/// Turns a transcript into an [`Interpretation`]
#[async_trait(?Send)]
pub trait Interpret {
    /// Interpret one transcript
    ///
    /// # Errors
    ///
    /// Returns error on network failure or a non-2xx response
    async fn interpret(&self, transcript: &str) -> Result<Interpretation>;
}

/// HTTP client for the backend `/interpret` endpoint
pub struct InterpreterClient {
    client: reqwest::Client,
    base_url: String,
}

impl InterpreterClient {
    /// Create a client against the given backend base URL
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait(?Send)]
impl Interpret for InterpreterClient {
    async fn interpret(&self, transcript: &str) -> Result<Interpretation> {
        #[derive(serde::Serialize)]
        struct InterpretRequest<'a> {
            transcript: &'a str,
        }

        tracing::debug!(chars = transcript.len(), "sending transcript for interpretation");

        let response = self
            .client
            .post(format!("{}/interpret", self.base_url))
            .json(&InterpretRequest { transcript })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "interpret request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "interpreter API error");
            return Err(Error::Interpreter(format!(
                "interpret error {status}: {body}"
            )));
        }

        let reply: InterpretReply = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse interpreter response");
            e
        })?;

        Ok(reply.classify())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> InterpretReply {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn error_reply_is_no_action() {
        let reply = parse(r#"{"error":"No action detected"}"#);
        assert_eq!(reply.classify(), Interpretation::NoAction);
    }

    #[test]
    fn quiz_reply_is_quiz_ready() {
        let reply = parse(r#"{"quiz":"chapter-3"}"#);
        assert_eq!(reply.classify(), Interpretation::QuizReady);
    }

    #[test]
    fn empty_quiz_field_is_ignored() {
        let reply = parse(r#"{"quiz":""}"#);
        assert_eq!(reply.classify(), Interpretation::NoAction);
    }

    #[test]
    fn text_wins_over_summary() {
        let reply = parse(r#"{"text":"Primary content.","summary":"Fallback."}"#);
        assert_eq!(
            reply.classify(),
            Interpretation::Narratable("Primary content.".to_string())
        );
    }

    #[test]
    fn empty_text_falls_back_to_summary() {
        let reply = parse(r#"{"text":"","summary":"Photosynthesis is how plants eat."}"#);
        assert_eq!(
            reply.classify(),
            Interpretation::Narratable("Photosynthesis is how plants eat.".to_string())
        );
    }

    #[test]
    fn narration_is_sanitized() {
        let reply = parse(r#"{"text":"Plants* use #sunlight (to grow)!"}"#);
        assert_eq!(
            reply.classify(),
            Interpretation::Narratable("Plants use sunlight to grow!".to_string())
        );
    }

    #[test]
    fn empty_reply_is_no_action() {
        let reply = parse(r"{}");
        assert_eq!(reply.classify(), Interpretation::NoAction);
    }

    #[test]
    fn both_fields_empty_is_no_action() {
        let reply = parse(r#"{"text":"","summary":""}"#);
        assert_eq!(reply.classify(), Interpretation::NoAction);
    }

    #[test]
    fn content_that_sanitizes_away_is_no_action() {
        let reply = parse(r#"{"text":"***"}"#);
        assert_eq!(reply.classify(), Interpretation::NoAction);
    }

    #[test]
    fn sanitize_keeps_words_whitespace_and_punctuation() {
        assert_eq!(
            sanitize_narration("Hello, world? Yes! One_two 3."),
            "Hello, world? Yes! One_two 3."
        );
        assert_eq!(sanitize_narration("a&b(c)d\"e\""), "abcde");
    }
}
