//! Sound engine: one-shot voice lines for questions and answers.
//!
//! Every line is addressed by `(question, role)`. The orchestrator only sees
//! the `AudioSink` trait; `LogAudio` stands in when there is no device or
//! the `audio` feature is off, and `SoundEngine` plays the matching file
//! through rodio.

use std::fmt;

/// Which line of a question is spoken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioRole {
    Question,
    Answer1,
    Answer2,
    Answer3,
}

impl AudioRole {
    pub fn tag(&self) -> &'static str {
        match self {
            AudioRole::Question => "question",
            AudioRole::Answer1 => "answer1",
            AudioRole::Answer2 => "answer2",
            AudioRole::Answer3 => "answer3",
        }
    }

    /// Role announcing answer option `n` (1..=3)
    pub fn answer(n: u8) -> Option<Self> {
        match n {
            1 => Some(AudioRole::Answer1),
            2 => Some(AudioRole::Answer2),
            3 => Some(AudioRole::Answer3),
            _ => None,
        }
    }
}

/// One-shot audio id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioCue {
    /// 1-based question number
    pub question: usize,
    pub role: AudioRole,
}

impl AudioCue {
    pub fn new(question: usize, role: AudioRole) -> Self {
        Self { question, role }
    }

    /// File name under the audio directory, e.g. `q3_answer2.mp3`
    pub fn file_name(&self) -> String {
        format!("q{}_{}.mp3", self.question, self.role.tag())
    }
}

impl fmt::Display for AudioCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}/{}", self.question, self.role.tag())
    }
}

/// Fire-and-forget playback
pub trait AudioSink {
    fn play(&mut self, cue: AudioCue);
}

/// Logs cues instead of playing them
#[derive(Debug, Default)]
pub struct LogAudio;

impl AudioSink for LogAudio {
    fn play(&mut self, cue: AudioCue) {
        tracing::debug!("Audio cue {}", cue);
    }
}

#[cfg(feature = "audio")]
pub use device::SoundEngine;

#[cfg(feature = "audio")]
mod device {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::{Path, PathBuf};

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

    use super::{AudioCue, AudioSink};

    /// rodio-backed playback of `<root>/q{n}_{role}.mp3`
    pub struct SoundEngine {
        /// rodio output stream (must be kept alive)
        _stream: OutputStream,
        handle: OutputStreamHandle,
        /// One-shot sinks, kept alive until drained
        sinks: Vec<Sink>,
        root: PathBuf,
        volume: f32,
    }

    impl SoundEngine {
        /// Open the default output device. Returns None if audio is unavailable.
        pub fn new(root: &Path) -> Option<Self> {
            match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    tracing::info!("Audio output initialized ({})", root.display());
                    Some(Self {
                        _stream: stream,
                        handle,
                        sinks: Vec::new(),
                        root: root.to_path_buf(),
                        volume: 1.0,
                    })
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize audio: {}", e);
                    None
                }
            }
        }

        /// Set master volume (0.0 - 1.0)
        pub fn set_volume(&mut self, vol: f32) {
            self.volume = vol.clamp(0.0, 1.0);
        }

        /// Drop sinks that finished playing
        pub fn gc(&mut self) {
            self.sinks.retain(|s| !s.empty());
        }
    }

    impl AudioSink for SoundEngine {
        fn play(&mut self, cue: AudioCue) {
            self.gc();
            let path = self.root.join(cue.file_name());
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!("Audio {} not playable ({}): {}", cue, path.display(), e);
                    return;
                }
            };
            let source = match Decoder::new(BufReader::new(file)) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Failed to decode {}: {}", path.display(), e);
                    return;
                }
            };
            match Sink::try_new(&self.handle) {
                Ok(sink) => {
                    sink.set_volume(self.volume);
                    sink.append(source);
                    self.sinks.push(sink);
                    tracing::debug!("Playing {}", cue);
                }
                Err(e) => tracing::warn!("Failed to create audio sink: {}", e),
            }
        }
    }
}

/// Records every cue; clones share the same log
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct RecordingAudio {
    played: std::rc::Rc<std::cell::RefCell<Vec<AudioCue>>>,
}

#[cfg(test)]
impl RecordingAudio {
    pub fn played(&self) -> Vec<AudioCue> {
        self.played.borrow().clone()
    }
}

#[cfg(test)]
impl AudioSink for RecordingAudio {
    fn play(&mut self, cue: AudioCue) {
        self.played.borrow_mut().push(cue);
    }
}
