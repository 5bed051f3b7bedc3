// Audio Export - Offline rendering to WAV files
//
// Runs the same engine as real-time playback, but as fast as possible and
// without a device: the song is played from page 0 and each rendered block is
// written with hound.

use crate::audio::engine::Engine;
use crate::audio::format_conversion::f32_to_i16;
use crate::config::{EndOfSong, EngineConfig};
use crate::error::ExportError;
use crate::model::song::Song;
use hound::{WavSpec, WavWriter};
use std::io::{Seek, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Block size used for offline rendering
const BLOCK_FRAMES: usize = 512;

/// Safety cap for song-length exports (one hour)
const MAX_EXPORT_SECONDS: u64 = 3600;

/// Sample encoding of the exported file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportSampleFormat {
    #[default]
    Int16,
    Float32,
}

/// How much to render
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ExportLength {
    /// One pass through every page, then the release tail
    #[default]
    Song,
    Ticks(u64),
    Seconds(f64),
}

/// Audio export settings
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub output_path: PathBuf,
    pub sample_format: ExportSampleFormat,
    pub length: ExportLength,
    /// Extra time rendered after the song ends so releases can ring out
    pub tail_seconds: f64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("export.wav"),
            sample_format: ExportSampleFormat::default(),
            length: ExportLength::default(),
            tail_seconds: 1.0,
        }
    }
}

/// What was written
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSummary {
    pub frames: u64,
    pub sample_rate: u32,
}

impl ExportSummary {
    pub fn duration_seconds(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Progress callback for export (reports 0.0 to 1.0).
pub type ProgressCallback = Box<dyn FnMut(f32) + Send>;

/// Audio exporter - renders a song to a WAV file
pub struct AudioExporter {
    settings: ExportSettings,
}

impl AudioExporter {
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Render `song` with the engine settings of `config`
    pub fn export(
        &self,
        song: Arc<Song>,
        config: &EngineConfig,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ExportSummary, ExportError> {
        let spec = match self.settings.sample_format {
            ExportSampleFormat::Int16 => WavSpec {
                channels: 2,
                sample_rate: config.sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
            ExportSampleFormat::Float32 => WavSpec {
                channels: 2,
                sample_rate: config.sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
        };
        let mut writer = WavWriter::create(&self.settings.output_path, spec)?;

        log::info!(
            "Exporting {:?} to {} ({:?})",
            self.settings.length,
            self.settings.output_path.display(),
            self.settings.sample_format
        );

        let summary = self.render(song, config, &mut writer, progress_callback)?;
        writer.finalize()?;

        log::info!(
            "Export complete: {} frames ({:.2}s)",
            summary.frames,
            summary.duration_seconds()
        );
        Ok(summary)
    }

    fn render<W: Write + Seek>(
        &self,
        song: Arc<Song>,
        config: &EngineConfig,
        writer: &mut WavWriter<W>,
        mut progress_callback: Option<ProgressCallback>,
    ) -> Result<ExportSummary, ExportError> {
        let sample_rate = config.sample_rate as u64;
        let mut config = config.clone();
        if self.settings.length == ExportLength::Song {
            if song.pages().is_empty() {
                return Err(ExportError::Empty("song has no pages".into()));
            }
            config.end_of_song = EndOfSong::Stop;
        }

        let (mut engine, mut handle) = Engine::new(Arc::clone(&song), &config)?;
        engine.start();
        engine.start_playback();

        let tail_frames = (self.settings.tail_seconds.max(0.0) * sample_rate as f64) as u64;
        let mut limit = match self.settings.length {
            ExportLength::Song => None,
            ExportLength::Ticks(ticks) => {
                let frames_per_tick = sample_rate as f64 * 60.0 / (song_tempo(&song, &config) as f64 * config.ticks_per_beat as f64);
                Some((ticks as f64 * frames_per_tick).ceil() as u64)
            }
            ExportLength::Seconds(seconds) => Some((seconds.max(0.0) * sample_rate as f64) as u64),
        };
        let song_ticks = song.length_ticks().max(1);
        let max_frames = MAX_EXPORT_SECONDS * sample_rate;

        let mut buffer = vec![0.0f32; BLOCK_FRAMES * 2];
        let mut rendered: u64 = 0;
        let mut next_report = sample_rate;

        loop {
            let remaining = limit.unwrap_or(max_frames).min(max_frames).saturating_sub(rendered);
            let frames = (BLOCK_FRAMES as u64).min(remaining) as usize;
            if frames == 0 {
                if limit.is_none() {
                    log::warn!("Export stopped at the {}s safety limit", MAX_EXPORT_SECONDS);
                }
                break;
            }

            let block = &mut buffer[..frames * 2];
            engine.render(block);
            match self.settings.sample_format {
                ExportSampleFormat::Int16 => {
                    for &sample in block.iter() {
                        writer.write_sample(f32_to_i16(sample))?;
                    }
                }
                ExportSampleFormat::Float32 => {
                    for &sample in block.iter() {
                        writer.write_sample(sample)?;
                    }
                }
            }
            rendered += frames as u64;

            // Keep the queues flowing; nobody listens during an export
            while handle.poll_notification().is_some() {}
            handle.collect_garbage();

            if limit.is_none() && !engine.sequencer().is_playing() {
                limit = Some(rendered + tail_frames);
            }

            if rendered >= next_report {
                next_report += sample_rate;
                if let Some(ref mut callback) = progress_callback {
                    let progress = match limit {
                        Some(total) => rendered as f32 / total.max(1) as f32,
                        // Still inside the song: measure by ticks played
                        None => engine.clock().ticks_elapsed() as f32 / song_ticks as f32 * 0.99,
                    };
                    callback(progress.clamp(0.0, 1.0));
                }
            }
        }

        if let Some(ref mut callback) = progress_callback {
            callback(1.0);
        }

        Ok(ExportSummary {
            frames: rendered,
            sample_rate: config.sample_rate,
        })
    }
}

/// Tempo of the first page, or the configured default
fn song_tempo(song: &Song, config: &EngineConfig) -> f32 {
    song.page(0).map_or(config.default_tempo, |page| page.tempo())
}

/// Render `song` to the WAV file described by `settings`
pub fn render_to_wav(
    song: Arc<Song>,
    config: &EngineConfig,
    settings: ExportSettings,
    progress_callback: Option<ProgressCallback>,
) -> Result<ExportSummary, ExportError> {
    AudioExporter::new(settings).export(song, config, progress_callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::instrument::Instrument;
    use crate::model::key::EntityId;
    use crate::model::list::Keyed;
    use crate::model::page::Page;
    use crate::model::pattern::{Event, NoteEvent, Pattern};
    use crate::model::sample::{Sample, Waveform};
    use crate::model::track::Track;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn config() -> EngineConfig {
        EngineConfig {
            sample_rate: 8_000,
            seed: Some(5),
            ..Default::default()
        }
    }

    /// One page of 192 ticks (one beat at 125 BPM = 0.48s) with a note at tick 0
    fn one_note_song() -> Arc<Song> {
        let song = Song::new();
        let inst = Instrument::new(EntityId::new("01").unwrap(), "tone");
        inst.add_sample(Sample::new("dc", Waveform::mono(8_000, vec![0.25; 80_000]).unwrap()));
        let inst_key = inst.key();
        song.add_instrument(inst).unwrap();

        let track = Track::new("t");
        song.add_track(track.clone());
        let pattern = Pattern::with_events(
            EntityId::new("01").unwrap(),
            192,
            vec![Event::note(0, NoteEvent::note_on(inst_key, 60, 1.0))],
        )
        .unwrap();
        track.add_pattern(pattern.clone()).unwrap();

        let page = Page::new(192, 125.0).unwrap();
        song.add_page(page.clone());
        song.select_pattern(page.key(), track.key(), Some(pattern.key())).unwrap();
        song
    }

    #[test]
    fn test_export_settings_default() {
        let settings = ExportSettings::default();
        assert_eq!(settings.sample_format, ExportSampleFormat::Int16);
        assert_eq!(settings.length, ExportLength::Song);
        assert_eq!(settings.tail_seconds, 1.0);
    }

    #[test]
    fn test_export_fixed_duration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fixed.wav");
        let settings = ExportSettings {
            output_path: path.clone(),
            length: ExportLength::Seconds(0.5),
            ..Default::default()
        };

        let summary = render_to_wav(one_note_song(), &config(), settings, None).unwrap();
        assert_eq!(summary.frames, 4_000);

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 8_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 8_000);
    }

    #[test]
    fn test_export_song_length_with_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("song.wav");
        let settings = ExportSettings {
            output_path: path.clone(),
            sample_format: ExportSampleFormat::Float32,
            length: ExportLength::Song,
            tail_seconds: 0.25,
        };

        let summary = render_to_wav(one_note_song(), &config(), settings, None).unwrap();
        // 192 ticks at 125 BPM = 0.48s = 3840 frames, plus at most one block, plus 2000 tail frames
        assert!(summary.frames >= 3_840 + 2_000);
        assert!(summary.frames <= 3_840 + 512 + 2_000);

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert!(samples[0] > 0.1);
        // Released with a zero-length release: silent at the end
        assert_eq!(*samples.last().unwrap(), 0.0);
    }

    #[test]
    fn test_export_empty_song_is_rejected() {
        let dir = tempdir().unwrap();
        let settings = ExportSettings {
            output_path: dir.path().join("empty.wav"),
            ..Default::default()
        };
        let result = render_to_wav(Song::new(), &config(), settings, None);
        assert!(matches!(result, Err(ExportError::Empty(_))));
    }

    #[test]
    fn test_progress_reaches_one() {
        let dir = tempdir().unwrap();
        let settings = ExportSettings {
            output_path: dir.path().join("progress.wav"),
            length: ExportLength::Seconds(2.5),
            ..Default::default()
        };
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let callback: ProgressCallback = Box::new(move |p| sink.lock().unwrap().push(p));

        render_to_wav(one_note_song(), &config(), settings, Some(callback)).unwrap();
        let reports = reports.lock().unwrap();
        assert!(reports.len() >= 3);
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*reports.last().unwrap(), 1.0);
    }

    #[test]
    fn test_export_by_ticks() {
        let dir = tempdir().unwrap();
        let settings = ExportSettings {
            output_path: dir.path().join("ticks.wav"),
            length: ExportLength::Ticks(96),
            ..Default::default()
        };
        // 96 ticks at 125 BPM and 192 ticks/beat, 8 kHz → 1920 frames
        let summary = render_to_wav(one_note_song(), &config(), settings, None).unwrap();
        assert_eq!(summary.frames, 1_920);
    }
}
