//! Voice session loop tests
//!
//! Exercise the full state machine against scripted collaborators: stop
//! keyword handling, retry paths, reply preference, timeout behavior, and
//! teardown during in-flight work.

use std::time::Duration;

use sonique::session::{FAREWELL, QUIZ_NOTICE, RETRY_NOTICE, SESSION_PROMPT};
use sonique::{Phase, SessionConfig, SessionOutcome, VoiceSession};

mod common;

use common::{Heard, RecordingSpeaker, Reply, ScriptedInterpreter, ScriptedListener};

#[tokio::test]
async fn stop_keyword_ends_session_in_any_case() {
    for phrase in ["stop", "STOP", "  Please Stop now  ", "don't stop"] {
        let speaker = RecordingSpeaker::new();
        let listener = ScriptedListener::new(vec![Heard::Transcript(phrase)]);
        let (listen_count, _) = listener.counters();
        let interpreter = ScriptedInterpreter::new(vec![]);
        let calls = interpreter.calls();

        let session = VoiceSession::new(
            speaker.clone(),
            listener,
            interpreter,
            SessionConfig::default(),
        );
        let handle = session.handle();

        let outcome = session.run().await;

        assert_eq!(outcome, SessionOutcome::Stopped, "phrase: {phrase}");
        assert!(!handle.is_active());
        // One listen, no interpretation, farewell spoken
        assert_eq!(*listen_count.lock().unwrap(), 1);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(speaker.spoken(), vec![SESSION_PROMPT, FAREWELL]);
    }
}

#[tokio::test]
async fn no_action_reply_retries_exactly_once() {
    let speaker = RecordingSpeaker::new();
    let listener = ScriptedListener::new(vec![
        Heard::Transcript("read me a book"),
        Heard::Transcript("stop"),
    ]);
    let (listen_count, _) = listener.counters();
    let interpreter =
        ScriptedInterpreter::new(vec![Reply::Json(r#"{"error":"No action detected"}"#)]);
    let calls = interpreter.calls();

    let session = VoiceSession::new(
        speaker.clone(),
        listener,
        interpreter,
        SessionConfig::default(),
    );
    let outcome = session.run().await;

    assert_eq!(outcome, SessionOutcome::Stopped);
    assert_eq!(calls.lock().unwrap().as_slice(), ["read me a book"]);
    // One retry re-entry per no-action reply, no duplicate scheduling
    assert_eq!(*listen_count.lock().unwrap(), 2);
    assert_eq!(
        speaker.spoken(),
        vec![SESSION_PROMPT, RETRY_NOTICE, SESSION_PROMPT, FAREWELL]
    );
}

#[tokio::test]
async fn narration_prefers_text_over_summary() {
    let speaker = RecordingSpeaker::new();
    let session_under_test = VoiceSession::new(
        speaker.clone(),
        ScriptedListener::new(vec![
            Heard::Transcript("tell me about plants"),
            Heard::Transcript("stop"),
        ]),
        ScriptedInterpreter::new(vec![Reply::Json(
            r#"{"text":"Plants are green.","summary":"Fallback summary."}"#,
        )]),
        SessionConfig::default(),
    );

    session_under_test.run().await;

    let spoken = speaker.spoken();
    assert!(spoken.contains(&"Plants are green.".to_string()));
    assert!(!spoken.iter().any(|s| s.contains("Fallback")));
}

#[tokio::test]
async fn empty_text_narrates_sanitized_summary() {
    let speaker = RecordingSpeaker::new();
    let session_under_test = VoiceSession::new(
        speaker.clone(),
        ScriptedListener::new(vec![
            Heard::Transcript("what is photosynthesis"),
            Heard::Transcript("stop"),
        ]),
        ScriptedInterpreter::new(vec![Reply::Json(
            r#"{"text":"","summary":"Photosynthesis is #1 *great*!"}"#,
        )]),
        SessionConfig::default(),
    );

    session_under_test.run().await;

    assert!(
        speaker
            .spoken()
            .contains(&"Photosynthesis is 1 great!".to_string())
    );
}

#[tokio::test]
async fn quiz_reply_narrates_quiz_notice_and_continues() {
    let speaker = RecordingSpeaker::new();
    let session_under_test = VoiceSession::new(
        speaker.clone(),
        ScriptedListener::new(vec![
            Heard::Transcript("make a quiz about fractions"),
            Heard::Transcript("stop"),
        ]),
        ScriptedInterpreter::new(vec![Reply::Json(r#"{"quiz":"fractions-1"}"#)]),
        SessionConfig::default(),
    );

    let outcome = session_under_test.run().await;

    assert_eq!(outcome, SessionOutcome::Stopped);
    assert_eq!(
        speaker.spoken(),
        vec![SESSION_PROMPT, QUIZ_NOTICE, SESSION_PROMPT, FAREWELL]
    );
}

#[tokio::test(start_paused = true)]
async fn listen_timeout_retries_once_then_listens_again() {
    let speaker = RecordingSpeaker::new();
    let listener = ScriptedListener::new(vec![Heard::Silence, Heard::Transcript("stop")]);
    let (listen_count, halt_count) = listener.counters();

    let session_under_test = VoiceSession::new(
        speaker.clone(),
        listener,
        ScriptedInterpreter::new(vec![]),
        SessionConfig {
            locale: "en-US".to_string(),
            listen_timeout: Duration::from_secs(10),
        },
    );

    let outcome = session_under_test.run().await;

    assert_eq!(outcome, SessionOutcome::Stopped);
    // The silent window was force-stopped, one retry notice, then a new listen
    assert_eq!(*listen_count.lock().unwrap(), 2);
    assert!(*halt_count.lock().unwrap() >= 1);
    assert_eq!(
        speaker.spoken(),
        vec![SESSION_PROMPT, RETRY_NOTICE, SESSION_PROMPT, FAREWELL]
    );
}

#[tokio::test]
async fn empty_transcript_takes_the_retry_path() {
    let speaker = RecordingSpeaker::new();
    let interpreter = ScriptedInterpreter::new(vec![]);
    let calls = interpreter.calls();

    let session_under_test = VoiceSession::new(
        speaker.clone(),
        ScriptedListener::new(vec![Heard::Transcript("   "), Heard::Transcript("stop")]),
        interpreter,
        SessionConfig::default(),
    );

    session_under_test.run().await;

    // Nothing was forwarded to the interpreter
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(
        speaker.spoken(),
        vec![SESSION_PROMPT, RETRY_NOTICE, SESSION_PROMPT, FAREWELL]
    );
}

#[tokio::test]
async fn recognition_error_fails_closed() {
    let speaker = RecordingSpeaker::new();
    let listener = ScriptedListener::new(vec![Heard::EngineError("engine unavailable")]);
    let (listen_count, _) = listener.counters();

    let session_under_test = VoiceSession::new(
        speaker.clone(),
        listener,
        ScriptedInterpreter::new(vec![]),
        SessionConfig::default(),
    );
    let outcome = session_under_test.run().await;

    assert_eq!(outcome, SessionOutcome::RecognitionFailed);
    // No retry after a hard engine error, and no farewell
    assert_eq!(*listen_count.lock().unwrap(), 1);
    assert_eq!(speaker.spoken(), vec![SESSION_PROMPT]);
}

#[tokio::test]
async fn interpreter_failure_fails_closed() {
    let speaker = RecordingSpeaker::new();
    let listener = ScriptedListener::new(vec![Heard::Transcript("read me a book")]);
    let (listen_count, _) = listener.counters();

    let session_under_test = VoiceSession::new(
        speaker.clone(),
        listener,
        ScriptedInterpreter::new(vec![Reply::Failure("connection refused")]),
        SessionConfig::default(),
    );
    let outcome = session_under_test.run().await;

    assert_eq!(outcome, SessionOutcome::InterpreterFailed);
    // Distinct from the no-action retry path: the loop does not resume
    assert_eq!(*listen_count.lock().unwrap(), 1);
    assert_eq!(speaker.spoken(), vec![SESSION_PROMPT]);
}

#[tokio::test]
async fn stop_during_inflight_interpret_schedules_no_further_cycle() {
    let speaker = RecordingSpeaker::new();
    let listener = ScriptedListener::new(vec![Heard::Transcript("read me a book")]);
    let (listen_count, _) = listener.counters();
    let interpreter = ScriptedInterpreter::new(vec![Reply::Gated(r#"{"text":"Too late."}"#)]);
    let calls = interpreter.calls();
    let gate = interpreter.gate.clone();

    let session_under_test = VoiceSession::new(
        speaker.clone(),
        listener,
        interpreter,
        SessionConfig::default(),
    );
    let handle = session_under_test.handle();

    let mut task = tokio_test::task::spawn(session_under_test.run());

    // Drive until the session parks on the gated interpreter call
    assert!(task.poll().is_pending());
    assert_eq!(calls.lock().unwrap().len(), 1);

    // Tear down mid-flight; twice, to pin the idempotence property
    handle.stop();
    handle.stop();
    assert!(!handle.is_active());

    let outcome = match task.poll() {
        std::task::Poll::Ready(outcome) => outcome,
        std::task::Poll::Pending => panic!("session must end after stop()"),
    };
    assert_eq!(outcome, SessionOutcome::Stopped);

    // The eventual reply finds nobody listening: no narration, no new cycle
    gate.notify_one();
    assert_eq!(*listen_count.lock().unwrap(), 1);
    assert_eq!(speaker.spoken(), vec![SESSION_PROMPT]);
}

#[tokio::test]
async fn stop_before_run_prevents_any_cycle() {
    let speaker = RecordingSpeaker::new();
    let listener = ScriptedListener::new(vec![Heard::Transcript("never heard")]);
    let (listen_count, _) = listener.counters();

    let session_under_test = VoiceSession::new(
        speaker.clone(),
        listener,
        ScriptedInterpreter::new(vec![]),
        SessionConfig::default(),
    );
    let handle = session_under_test.handle();
    let mut phases = session_under_test.phases();

    handle.stop();
    let outcome = session_under_test.run().await;

    assert_eq!(outcome, SessionOutcome::Stopped);
    assert_eq!(*listen_count.lock().unwrap(), 0);
    assert!(speaker.spoken().is_empty());
    assert_eq!(*phases.borrow_and_update(), Phase::Ended);
}
