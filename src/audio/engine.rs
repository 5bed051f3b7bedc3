// Audio engine - Render loop and control handle
//
// `Engine` lives on the render thread: the output sink calls `render` with an
// interleaved stereo buffer and the engine drains queued commands, plays
// sequencer ticks at their exact frame, mixes every voice and applies the
// output stage. `EngineHandle` stays on the control thread and talks to the
// engine only through lock-free ring buffers and atomics.

use crate::audio::dsp_utils::{flush_denormals_to_zero, hard_clip, soft_clip};
use crate::audio::format_conversion::{OutputSample, convert_interleaved};
use crate::audio::timing::TickClock;
use crate::config::{EngineConfig, OutputLimiter};
use crate::error::ConfigError;
use crate::messaging::channels::{
    CommandConsumer, CommandProducer, GarbageConsumer, NotificationConsumer, NotificationProducer,
    create_command_channel, create_garbage_channel, create_notification_channel,
};
use crate::messaging::command::Command;
use crate::messaging::notification::{Notification, NotificationSink};
use crate::model::EntityKey;
use crate::model::song::Song;
use crate::sequencer::player::Sequencer;
use crate::sequencer::transport::{SharedTransportState, TransportSnapshot};
use crate::synth::voice::VoiceOwner;
use crate::synth::voice_manager::{NoteTrigger, VoicePool};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use ringbuf::traits::{Consumer, Producer};
use std::sync::Arc;

pub struct Engine {
    song: Arc<Song>,
    pool: VoicePool,
    sequencer: Sequencer,
    clock: TickClock,
    commands: CommandConsumer,
    notifications: NotificationProducer,
    shared: Arc<SharedTransportState>,
    limiter: OutputLimiter,
    /// Tick rate while the sequencer is stopped
    idle_tempo: f32,
    running: bool,
    reported_steals: u64,
}

impl Engine {
    /// Build the render-side engine and its control handle
    pub fn new(song: Arc<Song>, config: &EngineConfig) -> Result<(Engine, EngineHandle), ConfigError> {
        config.validate()?;

        let (command_tx, command_rx) = create_command_channel(config.command_capacity);
        let (notification_tx, notification_rx) = create_notification_channel(config.notification_capacity);
        let (garbage_tx, garbage_rx) = create_garbage_channel(config.max_voices * 4);

        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let sample_rate = config.sample_rate as f32;
        let mut pool = VoicePool::new(config.max_voices, sample_rate, rng);
        pool.set_garbage_channel(garbage_tx);

        let shared = SharedTransportState::new();
        let engine = Engine {
            song: Arc::clone(&song),
            pool,
            sequencer: Sequencer::new(config.end_of_song, Arc::clone(&shared)),
            clock: TickClock::new(sample_rate, config.ticks_per_beat, config.default_tempo),
            commands: command_rx,
            notifications: notification_tx,
            shared: Arc::clone(&shared),
            limiter: config.output_limiter,
            idle_tempo: config.default_tempo,
            running: false,
            reported_steals: 0,
        };
        let handle = EngineHandle {
            song,
            commands: command_tx,
            notifications: notification_rx,
            garbage: garbage_rx,
            transport: shared,
            sample_rate: config.sample_rate,
        };

        log::info!(
            "Engine created: {} Hz, {} voices, {} ticks/beat, end of song {:?}",
            config.sample_rate,
            config.max_voices,
            config.ticks_per_beat,
            config.end_of_song
        );
        Ok((engine, handle))
    }

    /// Fill `out` (interleaved stereo) with the next block of audio
    pub fn render(&mut self, out: &mut [f32]) {
        // ========== SACRED ZONE ==========
        // No allocations, No I/O, No blocking locks
        out.fill(0.0);
        self.drain_commands();
        if !self.running {
            return;
        }

        let frames = out.len() / 2;
        let mut offset = 0;
        while offset < frames {
            if self.clock.frames_until_tick() == 0 {
                self.process_tick();
            }
            let n = self.clock.frames_until_tick().min(frames - offset);
            self.pool.render(&mut out[offset * 2..(offset + n) * 2]);
            self.clock.advance(n);
            offset += n;
        }

        self.apply_output_stage(&mut out[..frames * 2]);
        self.report_steals();
        // ========== SACRED ZONE END ==========
    }

    /// Render into a device buffer of any sample type and channel count.
    /// `scratch` needs two samples per output frame; extra output frames are left untouched.
    pub fn render_converted<T: OutputSample>(&mut self, scratch: &mut [f32], out: &mut [T], channels: usize) {
        let channels = channels.max(1);
        let frames = (out.len() / channels).min(scratch.len() / 2);
        let scratch = &mut scratch[..frames * 2];
        self.render(scratch);
        convert_interleaved(scratch, &mut out[..frames * channels], channels);
    }

    fn process_tick(&mut self) {
        let master_volume = self.song.master_volume();
        // Voices advance first so notes triggered on this tick start at their first stage
        self.pool.tick(master_volume);
        let tempo = self
            .sequencer
            .process_tick(&self.song, &mut self.pool, &mut self.notifications)
            .unwrap_or(self.idle_tempo);
        self.clock.set_tempo(tempo);
        self.clock.tick();
    }

    fn apply_output_stage(&self, out: &mut [f32]) {
        match self.limiter {
            OutputLimiter::Hard => out.iter_mut().for_each(|s| *s = hard_clip(flush_denormals_to_zero(*s))),
            OutputLimiter::Soft => out.iter_mut().for_each(|s| *s = soft_clip(flush_denormals_to_zero(*s))),
            OutputLimiter::Off => out.iter_mut().for_each(|s| *s = flush_denormals_to_zero(*s)),
        }
    }

    fn report_steals(&mut self) {
        let steals = self.pool.steal_count();
        if steals > self.reported_steals {
            let count = (steals - self.reported_steals).min(u32::MAX as u64) as u32;
            self.reported_steals = steals;
            self.notifications.notify(Notification::VoicesStolen { count });
        }
    }

    fn drain_commands(&mut self) {
        while let Some(command) = self.commands.try_pop() {
            self.apply(command);
        }
    }

    /// Execute one command immediately
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::TriggerNote {
                instrument,
                pitch,
                velocity,
                modulation,
            } => {
                self.trigger(instrument, NoteTrigger {
                    pitch,
                    velocity,
                    modulation,
                });
            }
            Command::ReleaseNote => self.release_note(),
            Command::CutNote => self.cut_note(),
            Command::Glide(pitch) => self.glide(pitch),
            Command::SetVelocity { velocity, slide_ticks } => {
                let master_volume = self.song.master_volume();
                self.pool
                    .set_velocity_owner(VoiceOwner::Live, velocity, slide_ticks, master_volume);
            }
            Command::SetModulation { modulation, slide_ticks } => {
                self.pool.set_modulation_owner(VoiceOwner::Live, modulation, slide_ticks);
            }
            Command::StartPlayback => self.start_playback(),
            Command::StopPlayback => self.stop_playback(),
            Command::PlayFrom { page, tick } => self.play_from(page, tick),
            Command::StopAllNotes => self.stop_all_notes(),
        }
    }

    // ---- Direct control (render thread, or offline use) ----

    pub fn start(&mut self) {
        self.running = true;
        self.shared.set_running(true);
    }

    /// Gate the render loop: every voice is cut and output stays silent
    pub fn stop(&mut self) {
        self.running = false;
        self.shared.set_running(false);
        self.pool.cut_all();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Live note on the performance channel
    pub fn trigger_note(&mut self, instrument: EntityKey, pitch: i32, velocity: f32) {
        self.trigger(instrument, NoteTrigger::new(pitch, velocity));
    }

    fn trigger(&mut self, instrument: EntityKey, note: NoteTrigger) {
        // A deleted instrument plays nothing
        if let Some(instrument) = self.song.instrument(instrument) {
            let master_volume = self.song.master_volume();
            self.pool.trigger(VoiceOwner::Live, &instrument, note, master_volume);
        }
    }

    pub fn release_note(&mut self) {
        let master_volume = self.song.master_volume();
        self.pool.release_owner(VoiceOwner::Live, master_volume);
    }

    pub fn cut_note(&mut self) {
        self.pool.cut_owner(VoiceOwner::Live);
    }

    pub fn glide(&mut self, pitch: i32) {
        self.pool.glide_owner(VoiceOwner::Live, pitch);
    }

    pub fn set_velocity(&mut self, velocity: f32) {
        self.apply(Command::SetVelocity {
            velocity,
            slide_ticks: 0,
        });
    }

    pub fn start_playback(&mut self) {
        if self.sequencer.start(&self.song, &mut self.notifications) {
            // Tick 0 plays at the next rendered frame
            self.clock.reset();
        }
    }

    pub fn play_from(&mut self, page: usize, tick: u32) {
        if self.sequencer.play_from(&self.song, page, tick, &mut self.notifications) {
            self.clock.reset();
        }
    }

    pub fn stop_playback(&mut self) {
        let master_volume = self.song.master_volume();
        self.sequencer
            .stop(&mut self.pool, master_volume, &mut self.notifications);
    }

    pub fn stop_all_notes(&mut self) {
        self.pool.cut_all();
    }

    // ---- Inspection ----

    pub fn song(&self) -> &Arc<Song> {
        &self.song
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn voices(&self) -> &VoicePool {
        &self.pool
    }

    pub fn active_voice_count(&self) -> usize {
        self.pool.active_voice_count()
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn transport(&self) -> TransportSnapshot {
        self.shared.snapshot()
    }
}

/// Control-thread side of the engine
pub struct EngineHandle {
    song: Arc<Song>,
    commands: CommandProducer,
    notifications: NotificationConsumer,
    garbage: GarbageConsumer,
    transport: Arc<SharedTransportState>,
    sample_rate: u32,
}

impl EngineHandle {
    /// The song being played; edit it directly, the render thread picks changes up
    pub fn song(&self) -> &Arc<Song> {
        &self.song
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Queue a command; returns false (and logs) when the queue is full
    pub fn send(&mut self, command: Command) -> bool {
        match self.commands.try_push(command) {
            Ok(()) => true,
            Err(command) => {
                log::warn!("Command queue full, dropping {:?}", command);
                false
            }
        }
    }

    pub fn start(&mut self) -> bool {
        self.send(Command::Start)
    }

    pub fn stop(&mut self) -> bool {
        self.send(Command::Stop)
    }

    pub fn trigger_note(&mut self, instrument: EntityKey, pitch: i32, velocity: f32) -> bool {
        self.send(Command::TriggerNote {
            instrument,
            pitch,
            velocity,
            modulation: 0.0,
        })
    }

    pub fn release_note(&mut self) -> bool {
        self.send(Command::ReleaseNote)
    }

    pub fn cut_note(&mut self) -> bool {
        self.send(Command::CutNote)
    }

    pub fn glide(&mut self, pitch: i32) -> bool {
        self.send(Command::Glide(pitch))
    }

    pub fn set_velocity(&mut self, velocity: f32) -> bool {
        self.send(Command::SetVelocity {
            velocity,
            slide_ticks: 0,
        })
    }

    pub fn slide_velocity(&mut self, velocity: f32, ticks: u32) -> bool {
        self.send(Command::SetVelocity {
            velocity,
            slide_ticks: ticks,
        })
    }

    pub fn set_modulation(&mut self, modulation: f32, slide_ticks: u32) -> bool {
        self.send(Command::SetModulation {
            modulation,
            slide_ticks,
        })
    }

    pub fn start_playback(&mut self) -> bool {
        self.send(Command::StartPlayback)
    }

    pub fn stop_playback(&mut self) -> bool {
        self.send(Command::StopPlayback)
    }

    pub fn play_from(&mut self, page: usize, tick: u32) -> bool {
        self.send(Command::PlayFrom { page, tick })
    }

    pub fn stop_all_notes(&mut self) -> bool {
        self.send(Command::StopAllNotes)
    }

    /// Playhead as last published by the render thread
    pub fn transport(&self) -> TransportSnapshot {
        self.transport.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.transport.is_running()
    }

    pub fn poll_notification(&mut self) -> Option<Notification> {
        self.notifications.try_pop()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut drained = Vec::new();
        while let Some(notification) = self.notifications.try_pop() {
            drained.push(notification);
        }
        drained
    }

    /// Free waveforms released by the render thread; returns how many were dropped
    pub fn collect_garbage(&mut self) -> usize {
        let mut collected = 0;
        while let Some(waveform) = self.garbage.try_pop() {
            drop(waveform);
            collected += 1;
        }
        if collected > 0 {
            log::debug!("Collected {} retired waveform(s)", collected);
        }
        collected
    }
}
