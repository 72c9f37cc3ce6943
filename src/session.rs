//! Voice interaction session
//!
//! Drives one Kid-Mode conversation as an explicit state machine:
//! speak a prompt, listen for one utterance, interpret the transcript,
//! narrate the reply, and repeat until the child says "stop", the session
//! handle is stopped, or a collaborator fails hard.
//!
//! The machine has a single driver ([`VoiceSession::run`]) dispatching on
//! the current phase, so at most one collaborator operation is ever in
//! flight. Cancellation is checked at the top of every dispatch and raced
//! against every in-flight operation, which makes stale completions
//! impossible: a transcript or interpreter reply arriving after `stop()`
//! can never schedule another cycle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

use crate::interpreter::{Interpret, Interpretation};
use crate::voice::{SpeechInput, SpeechOutput, Utterance};
use crate::Result;

/// Prompt spoken at the top of every cycle
pub const SESSION_PROMPT: &str =
    "Please tell me what you want me to do, or say stop to end the voice session.";

/// Spoken before re-prompting when recognition produced nothing usable
pub const RETRY_NOTICE: &str = "I didn't catch that, please say it again.";

/// Spoken when the stop keyword ends the session
pub const FAREWELL: &str = "Voice session ended.";

/// Spoken when the backend reports a generated quiz
pub const QUIZ_NOTICE: &str = "Quiz generated and can be accessed on Parent Mode.";

/// Keyword that ends the session (bare substring match, case-insensitive)
const STOP_KEYWORD: &str = "stop";

/// Default bound on one listening window
pub const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for one session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// BCP-47 locale for synthesis and recognition
    pub locale: String,

    /// Wall-clock bound on each listening window
    pub listen_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            listen_timeout: DEFAULT_LISTEN_TIMEOUT,
        }
    }
}

/// Observable phase of a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Speaking the session prompt
    Prompting,
    /// Waiting for a transcript
    Listening,
    /// Waiting for the interpreter
    Interpreting,
    /// Narrating a reply
    Narrating,
    /// Session over
    Ended,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The stop keyword was heard or the handle was stopped
    Stopped,
    /// Speech synthesis or playback failed
    SpeechFailed,
    /// The recognition engine failed
    RecognitionFailed,
    /// The interpreter request failed (network or non-2xx)
    InterpreterFailed,
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "session ended"),
            Self::SpeechFailed => write!(f, "speech output failed"),
            Self::RecognitionFailed => write!(f, "speech recognition failed"),
            Self::InterpreterFailed => write!(f, "interpreter unreachable"),
        }
    }
}

/// Owned handle to a running session
///
/// Cloneable; `stop()` is idempotent and safe to call from any task at any
/// suspension point. Each session gets a fresh handle, so a torn-down
/// session can never be revived through an old clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    active: Arc<watch::Sender<bool>>,
}

impl SessionHandle {
    fn new() -> Self {
        let (active, _) = watch::channel(true);
        Self {
            id: Uuid::new_v4(),
            active: Arc::new(active),
        }
    }

    /// Unique id of the session this handle controls
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the session is still accepting cycles
    #[must_use]
    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Stop the session, cancelling any in-flight collaborator call
    ///
    /// Idempotent: calling twice has the same effect as calling once.
    pub fn stop(&self) {
        if self.active.send_replace(false) {
            tracing::debug!(session = %self.id, "session stop requested");
        }
    }

    /// Resolve once the session has been stopped
    pub async fn cancelled(&self) {
        let mut rx = self.active.subscribe();
        // Lost-sender errors cannot happen while `self` holds the Arc
        let _ = rx.wait_for(|active| !*active).await;
    }
}

/// What to do after a narration completes
enum AfterNarration {
    /// Re-enter the prompt for another cycle
    Prompt,
    /// Terminate with the given outcome
    End(SessionOutcome),
}

/// Internal machine state, one variant per phase plus its pending data
enum State {
    Prompting { notice: Option<&'static str> },
    Listening,
    Interpreting { transcript: String },
    Narrating { text: String, next: AfterNarration },
    Ended(SessionOutcome),
}

impl State {
    const fn phase(&self) -> Phase {
        match self {
            Self::Prompting { .. } => Phase::Prompting,
            Self::Listening => Phase::Listening,
            Self::Interpreting { .. } => Phase::Interpreting,
            Self::Narrating { .. } => Phase::Narrating,
            Self::Ended(_) => Phase::Ended,
        }
    }
}

/// One voice interaction session
///
/// Owns its collaborators for the whole session lifetime; `run()` consumes
/// the session, so a second concurrent cycle for the same session is
/// unrepresentable. A fresh session after `stop()` behaves exactly like a
/// first-time start.
pub struct VoiceSession<O, I, C> {
    output: O,
    input: I,
    interpreter: C,
    config: SessionConfig,
    handle: SessionHandle,
    phase_tx: watch::Sender<Phase>,
    state: State,
}

impl<O, I, C> VoiceSession<O, I, C>
where
    O: SpeechOutput,
    I: SpeechInput,
    C: Interpret,
{
    /// Create a session over the given collaborators
    pub fn new(output: O, input: I, interpreter: C, config: SessionConfig) -> Self {
        let (phase_tx, _) = watch::channel(Phase::Prompting);
        Self {
            output,
            input,
            interpreter,
            config,
            handle: SessionHandle::new(),
            phase_tx,
            state: State::Prompting { notice: None },
        }
    }

    /// Get a handle for stopping this session from another task
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Subscribe to phase changes (for status display)
    #[must_use]
    pub fn phases(&self) -> watch::Receiver<Phase> {
        self.phase_tx.subscribe()
    }

    /// Drive cycles until the session ends
    ///
    /// Collaborator failures never propagate: they are absorbed into the
    /// returned [`SessionOutcome`]. On return the handle reads inactive and
    /// no capture resource is left live.
    pub async fn run(mut self) -> SessionOutcome {
        tracing::info!(session = %self.handle.id(), "voice session started");

        loop {
            self.phase_tx.send_replace(self.state.phase());

            let state = std::mem::replace(&mut self.state, State::Ended(SessionOutcome::Stopped));

            self.state = match state {
                State::Ended(outcome) => {
                    self.input.halt();
                    self.handle.stop();
                    tracing::info!(
                        session = %self.handle.id(),
                        outcome = %outcome,
                        "voice session ended"
                    );
                    return outcome;
                }
                // Teardown wins over whatever was pending
                _ if !self.handle.is_active() => State::Ended(SessionOutcome::Stopped),
                State::Prompting { notice } => self.step_prompt(notice).await,
                State::Listening => self.step_listen().await,
                State::Interpreting { transcript } => self.step_interpret(&transcript).await,
                State::Narrating { text, next } => self.step_narrate(&text, next).await,
            };
        }
    }

    /// Speak the optional retry notice, then the session prompt
    async fn step_prompt(&mut self, notice: Option<&'static str>) -> State {
        if let Some(notice) = notice {
            if let Err(e) = self.speak(notice).await {
                tracing::error!(error = %e, "retry notice failed");
                return State::Ended(SessionOutcome::SpeechFailed);
            }
        }

        match self.speak(SESSION_PROMPT).await {
            Ok(()) => State::Listening,
            Err(e) => {
                tracing::error!(error = %e, "session prompt failed");
                State::Ended(SessionOutcome::SpeechFailed)
            }
        }
    }

    /// Listen for one transcript within the configured window
    async fn step_listen(&mut self) -> State {
        let handle = self.handle.clone();
        let window = self.config.listen_timeout;

        let listened = tokio::select! {
            () = handle.cancelled() => return State::Ended(SessionOutcome::Stopped),
            res = tokio::time::timeout(window, self.input.listen(&self.config.locale)) => res,
        };

        match listened {
            // Window elapsed with no transcript
            Err(_elapsed) => {
                self.input.halt();
                tracing::debug!(session = %self.handle.id(), "listen window elapsed");
                State::Prompting {
                    notice: Some(RETRY_NOTICE),
                }
            }
            // Hard recognition error: fail closed, no auto-retry
            Ok(Err(e)) => {
                tracing::error!(error = %e, "recognition failed");
                State::Ended(SessionOutcome::RecognitionFailed)
            }
            Ok(Ok(result)) => {
                tracing::info!(transcript = %result.text, "transcript received");
                Self::classify(&result.text)
            }
        }
    }

    /// Route a transcript to its next state
    fn classify(text: &str) -> State {
        if contains_stop_keyword(text) {
            return State::Narrating {
                text: FAREWELL.to_string(),
                next: AfterNarration::End(SessionOutcome::Stopped),
            };
        }

        if text.trim().is_empty() {
            return State::Prompting {
                notice: Some(RETRY_NOTICE),
            };
        }

        State::Interpreting {
            transcript: text.to_string(),
        }
    }

    /// Forward the transcript to the interpreter
    async fn step_interpret(&mut self, transcript: &str) -> State {
        let handle = self.handle.clone();

        let outcome = tokio::select! {
            () = handle.cancelled() => return State::Ended(SessionOutcome::Stopped),
            res = self.interpreter.interpret(transcript) => res,
        };

        match outcome {
            Ok(Interpretation::NoAction) => State::Prompting {
                notice: Some(RETRY_NOTICE),
            },
            Ok(Interpretation::QuizReady) => State::Narrating {
                text: QUIZ_NOTICE.to_string(),
                next: AfterNarration::Prompt,
            },
            Ok(Interpretation::Narratable(text)) => State::Narrating {
                text,
                next: AfterNarration::Prompt,
            },
            // Hard backend failure: fail closed, distinct from the retry path
            Err(e) => {
                tracing::error!(error = %e, "interpretation failed");
                State::Ended(SessionOutcome::InterpreterFailed)
            }
        }
    }

    /// Narrate, then move to the recorded next state
    async fn step_narrate(&mut self, text: &str, next: AfterNarration) -> State {
        if let Err(e) = self.speak(text).await {
            tracing::error!(error = %e, "narration failed");
            return State::Ended(SessionOutcome::SpeechFailed);
        }

        match next {
            AfterNarration::Prompt => State::Prompting { notice: None },
            AfterNarration::End(outcome) => State::Ended(outcome),
        }
    }

    /// Speak one utterance, racing it against cancellation
    ///
    /// A cancelled speak returns `Ok`; the inactive handle is observed at
    /// the next dispatch.
    async fn speak(&mut self, text: &str) -> Result<()> {
        let utterance = Utterance::new(text, &self.config.locale);
        let handle = self.handle.clone();

        tokio::select! {
            () = handle.cancelled() => Ok(()),
            res = self.output.speak(&utterance) => res,
        }
    }
}

/// Bare substring stop-keyword check, case-insensitive
///
/// Matches embedded occurrences too: "don't stop" ends the session.
fn contains_stop_keyword(text: &str) -> bool {
    text.to_lowercase().contains(STOP_KEYWORD)
}
