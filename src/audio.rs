use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, warn};
use rand::Rng;

/// Name of the file listing the WAVs to load, one filename per line.
const REGISTRY_FILE: &str = ".registry.txt";

#[derive(Debug)]
pub enum AudioError {
    /// The host reported no output device.
    NoDevice,
    Registry(std::io::Error),
    Wav(hound::Error),
    Stream(cpal::BuildStreamError),
    Play(cpal::PlayStreamError),
}

impl From<std::io::Error> for AudioError {
    fn from(value: std::io::Error) -> Self {
        AudioError::Registry(value)
    }
}

impl From<hound::Error> for AudioError {
    fn from(value: hound::Error) -> Self {
        AudioError::Wav(value)
    }
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(value: cpal::BuildStreamError) -> Self {
        AudioError::Stream(value)
    }
}

impl From<cpal::PlayStreamError> for AudioError {
    fn from(value: cpal::PlayStreamError) -> Self {
        AudioError::Play(value)
    }
}

/// One decoded WAV, interleaved f32 samples.
struct Sound {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

/// Index of the sound currently playing plus how far into it we are.
struct Playing {
    sound: usize,
    offset: usize,
}

/// The single-sound mixer. At most one sound plays at a time; starting a
/// sound while another is playing is a no-op.
pub struct Audio {
    sounds: Arc<Vec<Sound>>,
    current: Arc<Mutex<Option<Playing>>>,
    // Held only to keep the output stream alive.
    _stream: Option<cpal::Stream>,
}

impl Audio {
    /// Load every WAV named by the registry in `sound_directory` and open an
    /// output stream matching the first one. A missing registry or an empty
    /// sound set is not an error, it just leaves the demo silent.
    pub fn new(sound_directory: &Path) -> Result<Audio, AudioError> {
        let sounds = match load_sounds(sound_directory) {
            Ok(sounds) => sounds,
            Err(AudioError::Registry(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "no {} in {}, running silent",
                    REGISTRY_FILE,
                    sound_directory.display()
                );
                vec![]
            }
            Err(e) => return Err(e),
        };

        let sounds = Arc::new(sounds);
        let current: Arc<Mutex<Option<Playing>>> = Arc::new(Mutex::new(None));

        let stream = if sounds.is_empty() {
            None
        } else {
            Some(open_stream(sounds.clone(), current.clone())?)
        };

        Ok(Audio {
            sounds,
            current,
            _stream: stream,
        })
    }

    /// Start a uniformly random sound, unless one is already playing.
    pub fn play_random(&self) {
        if self.sounds.is_empty() {
            return;
        }
        if let Ok(mut current) = self.current.lock() {
            if current.is_none() {
                *current = Some(Playing {
                    sound: rand::thread_rng().gen_range(0..self.sounds.len()),
                    offset: 0,
                });
            }
        }
    }
}

fn open_stream(
    sounds: Arc<Vec<Sound>>,
    current: Arc<Mutex<Option<Playing>>>,
) -> Result<cpal::Stream, AudioError> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or(AudioError::NoDevice)?;

    let config = cpal::StreamConfig {
        channels: sounds[0].channels,
        sample_rate: cpal::SampleRate(sounds[0].sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            if let Ok(mut current) = current.lock() {
                mix(&sounds, &mut current, data);
            }
        },
        |e| error!("audio stream error: {}", e),
        None,
    )?;
    stream.play()?;
    Ok(stream)
}

/// Fill `out` with silence, then copy as much of the current sound as fits.
/// Clears the slot once the sound is exhausted.
fn mix(sounds: &[Sound], current: &mut Option<Playing>, out: &mut [f32]) {
    out.fill(0.0);

    let finished = match current {
        Some(playing) => {
            let samples = &sounds[playing.sound].samples;
            let remaining = &samples[playing.offset..];
            if remaining.len() > out.len() {
                out.copy_from_slice(&remaining[..out.len()]);
                playing.offset += out.len();
                false
            } else {
                out[..remaining.len()].copy_from_slice(remaining);
                true
            }
        }
        None => false,
    };
    if finished {
        *current = None;
    }
}

fn load_sounds(sound_directory: &Path) -> Result<Vec<Sound>, AudioError> {
    let registry = fs::read_to_string(sound_directory.join(REGISTRY_FILE))?;

    let mut sounds: Vec<Sound> = Vec::new();
    for path in registry_paths(sound_directory, &registry) {
        let sound = load_wav(&path)?;
        if let Some(first) = sounds.first() {
            if sound.sample_rate != first.sample_rate || sound.channels != first.channels {
                warn!(
                    "{} does not match the stream format ({} ch @ {} Hz), it will play wrong",
                    path.display(),
                    first.channels,
                    first.sample_rate
                );
            }
        }
        sounds.push(sound);
    }
    Ok(sounds)
}

/// Resolve the registry's lines against the directory that holds it.
fn registry_paths(sound_directory: &Path, registry: &str) -> Vec<PathBuf> {
    registry
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| sound_directory.join(line))
        .collect()
}

fn load_wav(path: &Path) -> Result<Sound, AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .map(|sample| sample.map(|s| f32::from(s) / f32::from(i16::MAX)))
            .collect::<Result<Vec<f32>, hound::Error>>()?,
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, hound::Error>>()?,
    };
    Ok(Sound {
        samples,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sounds() -> Vec<Sound> {
        vec![
            Sound {
                samples: vec![0.5; 8],
                channels: 1,
                sample_rate: 44_100,
            },
            Sound {
                samples: vec![-0.25; 3],
                channels: 1,
                sample_rate: 44_100,
            },
        ]
    }

    #[test]
    fn registry_lines_resolve_against_their_directory() {
        let paths = registry_paths(Path::new("sounds"), "bark.wav\n\n  howl.wav  \n");
        assert_eq!(
            paths,
            vec![PathBuf::from("sounds/bark.wav"), PathBuf::from("sounds/howl.wav")]
        );
    }

    #[test]
    fn idle_mixer_outputs_silence() {
        let sounds = test_sounds();
        let mut current = None;
        let mut out = [1.0; 4];
        mix(&sounds, &mut current, &mut out);
        assert_eq!(out, [0.0; 4]);
        assert!(current.is_none());
    }

    #[test]
    fn mixer_advances_through_the_current_sound() {
        let sounds = test_sounds();
        let mut current = Some(Playing { sound: 0, offset: 0 });
        let mut out = [0.0; 5];
        mix(&sounds, &mut current, &mut out);
        assert_eq!(out, [0.5; 5]);
        match &current {
            Some(playing) => assert_eq!(playing.offset, 5),
            None => panic!("sound should still be playing"),
        }
    }

    #[test]
    fn mixer_pads_the_tail_with_silence_and_clears_the_slot() {
        let sounds = test_sounds();
        let mut current = Some(Playing { sound: 1, offset: 1 });
        let mut out = [1.0; 4];
        mix(&sounds, &mut current, &mut out);
        assert_eq!(out, [-0.25, -0.25, 0.0, 0.0]);
        assert!(current.is_none());
    }

    #[test]
    fn exact_fit_finishes_the_sound() {
        let sounds = test_sounds();
        let mut current = Some(Playing { sound: 1, offset: 0 });
        let mut out = [0.0; 3];
        mix(&sounds, &mut current, &mut out);
        assert_eq!(out, [-0.25; 3]);
        assert!(current.is_none());
    }
}
