//! Shared test doubles for the voice loop
//!
//! The collaborators are scripted: each mock yields a fixed sequence of
//! outcomes and records what the session asked of it. Interpreter replies
//! are raw JSON so the real classification path is exercised.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use sonique::interpreter::{Interpret, Interpretation, InterpretReply};
use sonique::voice::{SpeechInput, SpeechOutput, TranscriptResult, Utterance};
use sonique::{Error, Result};

/// Speech output that records everything it is asked to speak
#[derive(Clone, Default)]
pub struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything spoken so far, in order
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait(?Send)]
impl SpeechOutput for RecordingSpeaker {
    async fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        self.spoken.lock().unwrap().push(utterance.content.clone());
        Ok(())
    }
}

/// One scripted listen outcome
pub enum Heard {
    /// Deliver a final transcript
    Transcript(&'static str),
    /// Never resolve (drives the timeout path)
    Silence,
    /// Fail with a recognition error
    EngineError(&'static str),
}

/// Speech input that yields scripted outcomes in order
///
/// An exhausted script behaves like silence, so a session that should have
/// stopped earlier hangs (and fails its test) instead of inventing input.
pub struct ScriptedListener {
    script: VecDeque<Heard>,
    listens: Arc<Mutex<usize>>,
    halts: Arc<Mutex<usize>>,
}

impl ScriptedListener {
    pub fn new(script: Vec<Heard>) -> Self {
        Self {
            script: script.into(),
            listens: Arc::new(Mutex::new(0)),
            halts: Arc::new(Mutex::new(0)),
        }
    }

    /// Counter handles that survive the session consuming the mock
    pub fn counters(&self) -> (Arc<Mutex<usize>>, Arc<Mutex<usize>>) {
        (Arc::clone(&self.listens), Arc::clone(&self.halts))
    }
}

#[async_trait(?Send)]
impl SpeechInput for ScriptedListener {
    async fn listen(&mut self, _locale: &str) -> Result<TranscriptResult> {
        *self.listens.lock().unwrap() += 1;

        match self.script.pop_front() {
            Some(Heard::Transcript(text)) => Ok(TranscriptResult::final_text(text)),
            Some(Heard::EngineError(reason)) => Err(Error::Stt(reason.to_string())),
            Some(Heard::Silence) | None => std::future::pending().await,
        }
    }

    fn halt(&mut self) {
        *self.halts.lock().unwrap() += 1;
    }
}

/// One scripted interpreter outcome
pub enum Reply {
    /// Classify a raw JSON reply through the real classification path
    Json(&'static str),
    /// Fail the request (network / non-2xx)
    Failure(&'static str),
    /// Block until the gate opens, then classify the JSON
    Gated(&'static str),
}

/// Interpreter that yields scripted replies in order
pub struct ScriptedInterpreter {
    replies: Mutex<VecDeque<Reply>>,
    calls: Arc<Mutex<Vec<String>>>,
    /// Opened by the test to release a [`Reply::Gated`] response
    pub gate: Arc<Notify>,
}

impl ScriptedInterpreter {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
            gate: Arc::new(Notify::new()),
        }
    }

    /// Transcripts forwarded so far, surviving the session consuming the mock
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait(?Send)]
impl Interpret for ScriptedInterpreter {
    async fn interpret(&self, transcript: &str) -> Result<Interpretation> {
        self.calls.lock().unwrap().push(transcript.to_string());

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Json(raw)) => Ok(classify(raw)),
            Some(Reply::Failure(reason)) => Err(Error::Interpreter(reason.to_string())),
            Some(Reply::Gated(raw)) => {
                self.gate.notified().await;
                Ok(classify(raw))
            }
            None => Err(Error::Interpreter("reply script exhausted".to_string())),
        }
    }
}

/// Run a raw JSON reply through the production classification path
fn classify(raw: &str) -> Interpretation {
    serde_json::from_str::<InterpretReply>(raw)
        .expect("valid reply json")
        .classify()
}
