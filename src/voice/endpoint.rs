//! Utterance endpointing
//!
//! Segments the microphone stream into single utterances: an utterance is
//! complete once enough speech energy has accumulated and is followed by a
//! stretch of trailing silence.

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to count as an utterance (samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Trailing silence that ends an utterance (samples at 16kHz)
const TRAILING_SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// State of the utterance endpointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Waiting for speech to begin
    Waiting,
    /// Speech detected, accumulating the utterance
    Speech,
    /// A complete utterance is buffered and ready to take
    Complete,
}

/// Detects utterance boundaries in a stream of audio chunks
pub struct UtteranceDetector {
    state: EndpointState,
    buffer: Vec<f32>,
    silence_counter: usize,
}

impl Default for UtteranceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceDetector {
    /// Create a new detector in the waiting state
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: EndpointState::Waiting,
            buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Feed a chunk of samples; returns true once an utterance is complete
    ///
    /// After a true return the buffered utterance stays available until
    /// [`UtteranceDetector::take_utterance`] or [`UtteranceDetector::reset`].
    pub fn feed(&mut self, samples: &[f32]) -> bool {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            EndpointState::Waiting => {
                if is_speech {
                    self.state = EndpointState::Speech;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                }
                false
            }
            EndpointState::Speech => {
                self.buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                tracing::trace!(
                    buffered = self.buffer.len(),
                    silence = self.silence_counter,
                    energy,
                    "accumulating utterance"
                );

                if self.silence_counter > TRAILING_SILENCE_SAMPLES {
                    if self.buffer.len() > MIN_SPEECH_SAMPLES {
                        self.state = EndpointState::Complete;
                        tracing::debug!(samples = self.buffer.len(), "utterance complete");
                        return true;
                    }
                    // Too short to be speech: a cough or a bump
                    tracing::trace!("segment too short, resetting");
                    self.reset();
                }
                false
            }
            EndpointState::Complete => true,
        }
    }

    /// Take the buffered utterance, returning the detector to waiting
    pub fn take_utterance(&mut self) -> Vec<f32> {
        let utterance = std::mem::take(&mut self.buffer);
        self.reset();
        utterance
    }

    /// Discard any partial segment and return to waiting
    pub fn reset(&mut self) {
        self.state = EndpointState::Waiting;
        self.buffer.clear();
        self.silence_counter = 0;
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    /// Number of samples buffered so far
    #[must_use]
    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::SAMPLE_RATE;

    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    #[allow(clippy::cast_possible_truncation)]
    fn sine(duration_secs: f32, amplitude: f32) -> Vec<f32> {
        let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                amplitude * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    #[allow(clippy::cast_possible_truncation)]
    fn silence(duration_secs: f32) -> Vec<f32> {
        vec![0.0; (SAMPLE_RATE as f32 * duration_secs) as usize]
    }

    #[test]
    fn energy_of_silence_is_near_zero() {
        assert!(calculate_energy(&silence(0.01)) < 0.001);
        assert!(calculate_energy(&sine(0.01, 0.5)) > 0.3);
    }

    #[test]
    fn silence_does_not_start_a_segment() {
        let mut detector = UtteranceDetector::new();
        assert!(!detector.feed(&silence(0.1)));
        assert_eq!(detector.state(), EndpointState::Waiting);
    }

    #[test]
    fn speech_then_silence_completes_utterance() {
        let mut detector = UtteranceDetector::new();

        detector.feed(&sine(0.5, 0.3));
        assert_eq!(detector.state(), EndpointState::Speech);

        let complete = detector.feed(&silence(0.6));
        assert!(complete);
        assert_eq!(detector.state(), EndpointState::Complete);
    }

    #[test]
    fn short_blip_is_discarded() {
        let mut detector = UtteranceDetector::new();

        // 0.1s of noise is below the minimum speech duration
        detector.feed(&sine(0.1, 0.3));
        let complete = detector.feed(&silence(0.6));

        assert!(!complete);
        assert_eq!(detector.state(), EndpointState::Waiting);
        assert_eq!(detector.buffered_samples(), 0);
    }

    #[test]
    fn utterance_buffer_accumulates_chunks() {
        let mut detector = UtteranceDetector::new();

        let chunk1 = sine(0.1, 0.3);
        let chunk2 = sine(0.1, 0.3);
        detector.feed(&chunk1);
        detector.feed(&chunk2);

        assert_eq!(detector.buffered_samples(), chunk1.len() + chunk2.len());
    }

    #[test]
    fn take_utterance_returns_to_waiting() {
        let mut detector = UtteranceDetector::new();

        let speech = sine(0.5, 0.3);
        detector.feed(&speech);
        detector.feed(&silence(0.6));

        let taken = detector.take_utterance();
        assert!(!taken.is_empty());
        assert_eq!(detector.state(), EndpointState::Waiting);
        assert_eq!(detector.buffered_samples(), 0);
    }

    #[test]
    fn complete_state_is_sticky_until_taken() {
        let mut detector = UtteranceDetector::new();

        detector.feed(&sine(0.5, 0.3));
        assert!(detector.feed(&silence(0.6)));

        // Further chunks do not disturb a completed utterance
        let buffered = detector.buffered_samples();
        assert!(detector.feed(&sine(0.1, 0.3)));
        assert_eq!(detector.buffered_samples(), buffered);
    }
}
