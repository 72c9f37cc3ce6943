//! Sonique Gateway - voice-interaction client for the Sonique learning companion
//!
//! This library provides the core functionality of the Sonique client:
//! - The Kid-Mode voice interaction loop (speak, listen, interpret, narrate)
//! - Speech collaborators (microphone STT, speaker TTS)
//! - The Parent-Mode library client (PDF upload, book listing)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  VoiceSession                        │
//! │   Prompting → Listening → Interpreting → Narrating   │
//! └───────┬───────────────┬───────────────┬─────────────┘
//!         │               │               │
//! ┌───────▼──────┐ ┌──────▼───────┐ ┌─────▼────────────┐
//! │ SpeechOutput │ │ SpeechInput  │ │ InterpreterClient │
//! │  (TTS+play)  │ │ (mic+STT)    │ │  POST /interpret  │
//! └──────────────┘ └──────────────┘ └──────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod interpreter;
pub mod library;
pub mod session;
pub mod setup;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use interpreter::{Interpret, Interpretation, InterpreterClient};
pub use library::{Book, BookName, LibraryClient, UploadReceipt};
pub use session::{
    Phase, SessionConfig, SessionHandle, SessionOutcome, VoiceSession,
};
pub use voice::{SpeechInput, SpeechOutput, TranscriptResult, Utterance};
