// Sequencer Player - Walks pages tick by tick and triggers notes
//
// Runs on the render thread. Each call to `process_tick` plays one tick:
// every unmuted track's selected pattern is scanned for events at that tick
// and notes go straight to the voice pool. Deleted pages, patterns or
// instruments are simply skipped.

use super::transport::{SharedTransportState, TransportState};
use crate::config::EndOfSong;
use crate::messaging::notification::{Notification, NotificationSink};
use crate::model::list::Keyed;
use crate::model::pattern::{EventKind, NoteEvent};
use crate::model::page::Page;
use crate::model::song::Song;
use crate::synth::voice::VoiceOwner;
use crate::synth::voice_manager::{NoteTrigger, VoicePool};
use crate::units::MIDDLE_C;
use std::sync::Arc;

pub struct Sequencer {
    state: TransportState,
    page_index: usize,
    /// Next tick to play within the current page
    tick: u32,
    end_of_song: EndOfSong,
    shared: Arc<SharedTransportState>,
}

impl Sequencer {
    pub fn new(end_of_song: EndOfSong, shared: Arc<SharedTransportState>) -> Self {
        Self {
            state: TransportState::Stopped,
            page_index: 0,
            tick: 0,
            end_of_song,
            shared,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn end_of_song(&self) -> EndOfSong {
        self.end_of_song
    }

    pub fn set_end_of_song(&mut self, end_of_song: EndOfSong) {
        self.end_of_song = end_of_song;
    }

    /// Start from the first page
    pub fn start(&mut self, song: &Song, notify: &mut impl NotificationSink) -> bool {
        self.play_from(song, 0, 0, notify)
    }

    /// Start at `tick` of page `page_index` (clamped to the last page).
    /// Returns false when the song has no pages.
    pub fn play_from(
        &mut self,
        song: &Song,
        page_index: usize,
        tick: u32,
        notify: &mut impl NotificationSink,
    ) -> bool {
        let page_count = song.pages().len();
        if page_count == 0 {
            return false;
        }
        self.page_index = page_index.min(page_count - 1);
        self.tick = tick;
        self.state = TransportState::Playing;
        self.publish();
        notify.notify(Notification::PlaybackStarted {
            page_index: self.page_index,
            tick,
        });
        true
    }

    /// Stop playback and release every voice. No effect when already stopped.
    pub fn stop(&mut self, pool: &mut VoicePool, master_volume: f32, notify: &mut impl NotificationSink) -> bool {
        if self.state.is_stopped() {
            return false;
        }
        self.state = TransportState::Stopped;
        pool.release_all(master_volume);
        self.publish();
        notify.notify(Notification::PlaybackStopped);
        true
    }

    /// Play one tick. Returns the tempo of the page played, `None` if stopped.
    pub fn process_tick(
        &mut self,
        song: &Song,
        pool: &mut VoicePool,
        notify: &mut impl NotificationSink,
    ) -> Option<f32> {
        if !self.state.is_playing() {
            return None;
        }

        let pages = song.pages().load();
        let page = self.resolve_page(&pages, song, pool, notify)?;
        let master_volume = song.master_volume();
        let page_index = self.page_index;
        let tick = self.tick;

        let tracks = song.tracks().load();
        for track in tracks.iter() {
            if track.is_muted() {
                continue;
            }
            let track_key = track.key();
            let Some(pattern) = page.pattern_for(track_key).and_then(|key| track.pattern(key)) else {
                continue;
            };
            let length = pattern.length();
            if length == 0 {
                continue;
            }
            // Shorter patterns repeat within the page
            let local_tick = tick % length;
            let owner = VoiceOwner::Track(track_key);

            pattern.for_each_at(local_tick, |event, next_time| match &event.kind {
                EventKind::Note(note) => {
                    execute_note(song, pool, owner, note, next_time - local_tick, master_volume);
                }
                EventKind::Label(label) => notify.notify(Notification::Label {
                    track: track_key,
                    page_index,
                    tick,
                    text: Arc::clone(&label.text),
                }),
            });
        }

        self.tick += 1;
        self.publish();
        Some(page.tempo())
    }

    /// Move past finished (or vanished) pages until the playhead is on a valid tick
    fn resolve_page<'a>(
        &mut self,
        pages: &'a [Arc<Page>],
        song: &Song,
        pool: &mut VoicePool,
        notify: &mut impl NotificationSink,
    ) -> Option<&'a Arc<Page>> {
        // Every page is at least one tick long, so one pass over the list suffices
        for _ in 0..=pages.len() + 1 {
            match pages.get(self.page_index) {
                Some(page) if self.tick < page.length() => return Some(page),
                Some(_) => {
                    self.page_index += 1;
                    self.tick = 0;
                    if self.page_index < pages.len() {
                        notify.notify(Notification::PageChanged {
                            page_index: self.page_index,
                        });
                    }
                }
                None => {
                    if pages.is_empty() || self.end_of_song == EndOfSong::Stop {
                        self.stop(pool, song.master_volume(), notify);
                        notify.notify(Notification::SongEnded);
                        return None;
                    }
                    self.page_index = 0;
                    self.tick = 0;
                    notify.notify(Notification::SongLooped);
                    notify.notify(Notification::PageChanged { page_index: 0 });
                }
            }
        }
        None
    }

    fn publish(&self) {
        self.shared.publish(self.state, self.page_index, self.tick);
    }
}

/// Apply one note event to a track's voices.
///
/// `duration` is the number of ticks until the next event of the pattern;
/// velocity/mod slides spread over it.
pub(crate) fn execute_note(
    song: &Song,
    pool: &mut VoicePool,
    owner: VoiceOwner,
    note: &NoteEvent,
    duration: u32,
    master_volume: f32,
) {
    if note.release {
        if note.instrument.is_none() {
            if let Some(pitch) = note.pitch {
                pool.glide_owner(owner, pitch);
            }
        }
        pool.release_owner(owner, master_volume);
    }

    if let Some(key) = note.instrument {
        // A deleted instrument plays nothing
        if let Some(instrument) = song.instrument(key) {
            let trigger = NoteTrigger {
                pitch: note.pitch.unwrap_or(MIDDLE_C),
                velocity: note.velocity.unwrap_or(1.0),
                modulation: note.modulation.unwrap_or(0.0),
            };
            pool.trigger(owner, &instrument, trigger, master_volume);
        }
        return;
    }

    if note.release {
        return;
    }
    if let Some(pitch) = note.pitch {
        pool.glide_owner(owner, pitch);
    }
    if let Some(velocity) = note.velocity {
        let ticks = if note.velocity_slide { duration } else { 0 };
        pool.set_velocity_owner(owner, velocity, ticks, master_volume);
    }
    if let Some(modulation) = note.modulation {
        let ticks = if note.mod_slide { duration } else { 0 };
        pool.set_modulation_owner(owner, modulation, ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::instrument::Instrument;
    use crate::model::key::EntityId;
    use crate::model::pattern::{Event, Pattern};
    use crate::model::sample::{Sample, Waveform};
    use crate::model::track::Track;

    struct Fixture {
        song: Arc<Song>,
        track: Arc<Track>,
        instrument: Arc<Instrument>,
        pool: VoicePool,
        sequencer: Sequencer,
        notes: Vec<Notification>,
    }

    impl Fixture {
        /// One track, one instrument, `pages` pages of `page_len` ticks
        fn new(pages: usize, page_len: u32, end_of_song: EndOfSong) -> Self {
            let song = Song::new();
            let instrument = Instrument::new(EntityId::new("01").unwrap(), "lead");
            instrument.add_sample(Sample::new("s", Waveform::mono(48_000, vec![0.5; 96_000]).unwrap()));
            song.add_instrument(instrument.clone()).unwrap();

            let track = Track::new("t1");
            song.add_track(track.clone());
            for _ in 0..pages {
                song.add_page(Page::new(page_len, 125.0).unwrap());
            }

            Self {
                song,
                track,
                instrument,
                pool: VoicePool::with_seed(16, 48_000.0, 1),
                sequencer: Sequencer::new(end_of_song, SharedTransportState::new()),
                notes: Vec::new(),
            }
        }

        fn pattern(&self, id: &str, length: u32, events: Vec<Event>) -> Arc<Pattern> {
            let pattern = Pattern::with_events(EntityId::new(id).unwrap(), length, events).unwrap();
            self.track.add_pattern(pattern.clone()).unwrap();
            pattern
        }

        fn select(&self, page: usize, pattern: &Pattern) {
            let page = self.song.page(page).unwrap();
            self.song
                .select_pattern(page.key(), self.track.key(), Some(pattern.key()))
                .unwrap();
        }

        fn start(&mut self) {
            assert!(self.sequencer.start(&self.song, &mut self.notes));
        }

        fn tick(&mut self) -> Option<f32> {
            self.pool.tick(1.0);
            self.sequencer.process_tick(&self.song, &mut self.pool, &mut self.notes)
        }

        fn owner(&self) -> VoiceOwner {
            VoiceOwner::Track(self.track.key())
        }
    }

    #[test]
    fn test_stopped_sequencer_does_nothing() {
        let mut f = Fixture::new(1, 4, EndOfSong::Loop);
        assert_eq!(f.tick(), None);
        assert_eq!(f.pool.active_voice_count(), 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut f = Fixture::new(1, 4, EndOfSong::Loop);
        assert!(!f.sequencer.stop(&mut f.pool, 1.0, &mut f.notes));
        assert!(f.notes.is_empty());
        assert_eq!(f.pool.active_voice_count(), 0);
    }

    #[test]
    fn test_events_fire_on_their_tick() {
        let mut f = Fixture::new(1, 8, EndOfSong::Loop);
        let key = f.instrument.key();
        let pattern = f.pattern("01", 8, vec![Event::note(2, NoteEvent::note_on(key, 60, 1.0))]);
        f.select(0, &pattern);
        f.start();

        f.tick();
        f.tick();
        assert_eq!(f.pool.active_voice_count(), 0);
        f.tick();
        assert_eq!(f.pool.owner_voice_count(f.owner()), 1);
    }

    #[test]
    fn test_song_loops_to_first_page() {
        let mut f = Fixture::new(2, 2, EndOfSong::Loop);
        f.start();
        for _ in 0..4 {
            assert!(f.tick().is_some());
        }
        assert_eq!(f.sequencer.page_index(), 1);
        assert!(f.tick().is_some());
        assert_eq!(f.sequencer.page_index(), 0);
        assert_eq!(f.sequencer.tick(), 1);
        assert!(f.notes.contains(&Notification::SongLooped));
        assert!(f.notes.contains(&Notification::PageChanged { page_index: 1 }));
    }

    #[test]
    fn test_song_stops_at_end() {
        let mut f = Fixture::new(1, 2, EndOfSong::Stop);
        let key = f.instrument.key();
        let pattern = f.pattern("01", 2, vec![Event::note(0, NoteEvent::note_on(key, 60, 1.0))]);
        f.select(0, &pattern);
        f.start();

        f.tick();
        f.tick();
        assert!(f.sequencer.is_playing());
        assert_eq!(f.tick(), None);
        assert!(!f.sequencer.is_playing());
        assert!(f.notes.contains(&Notification::SongEnded));
        // Graceful: the note is released, not cut
        assert!(f.pool.active_voices().all(|v| !v.is_held()));
    }

    #[test]
    fn test_stop_releases_voices() {
        let mut f = Fixture::new(1, 16, EndOfSong::Loop);
        f.instrument.envelope().set_release(8);
        let key = f.instrument.key();
        let pattern = f.pattern("01", 16, vec![Event::note(0, NoteEvent::note_on(key, 60, 1.0))]);
        f.select(0, &pattern);
        f.start();
        f.tick();

        assert!(f.sequencer.stop(&mut f.pool, 1.0, &mut f.notes));
        assert_eq!(f.pool.active_voice_count(), 1);
        assert!(f.pool.active_voices().all(|v| v.is_releasing()));
        assert_eq!(f.tick(), None);
    }

    #[test]
    fn test_muted_track_is_skipped() {
        let mut f = Fixture::new(1, 4, EndOfSong::Loop);
        let key = f.instrument.key();
        let pattern = f.pattern("01", 4, vec![Event::note(0, NoteEvent::note_on(key, 60, 1.0))]);
        f.select(0, &pattern);
        f.track.set_muted(true);
        f.start();
        f.tick();
        assert_eq!(f.pool.active_voice_count(), 0);
    }

    #[test]
    fn test_short_pattern_repeats_within_page() {
        let mut f = Fixture::new(1, 8, EndOfSong::Loop);
        let key = f.instrument.key();
        f.instrument.set_new_note_action(crate::model::NewNoteAction::Continue);
        let pattern = f.pattern("01", 2, vec![Event::note(0, NoteEvent::note_on(key, 60, 1.0))]);
        f.select(0, &pattern);
        f.start();
        for _ in 0..8 {
            f.tick();
        }
        assert_eq!(f.pool.owner_voice_count(f.owner()), 4);
    }

    #[test]
    fn test_labels_are_reported() {
        let mut f = Fixture::new(1, 4, EndOfSong::Loop);
        let pattern = f.pattern("01", 4, vec![Event::label(1, "drop")]);
        f.select(0, &pattern);
        f.start();
        f.tick();
        f.tick();

        let label = f.notes.iter().find_map(|n| match n {
            Notification::Label { text, tick, track, .. } => Some((text.clone(), *tick, *track)),
            _ => None,
        });
        assert_eq!(label, Some((Arc::from("drop"), 1, f.track.key())));
        assert_eq!(f.pool.active_voice_count(), 0);
    }

    #[test]
    fn test_deleted_instrument_plays_silence() {
        let mut f = Fixture::new(1, 4, EndOfSong::Loop);
        let key = f.instrument.key();
        let pattern = f.pattern("01", 4, vec![Event::note(0, NoteEvent::note_on(key, 60, 1.0))]);
        f.select(0, &pattern);
        f.song.remove_instrument(key);
        f.start();
        assert!(f.tick().is_some());
        assert_eq!(f.pool.active_voice_count(), 0);
    }

    #[test]
    fn test_deleted_page_is_skipped() {
        let mut f = Fixture::new(2, 4, EndOfSong::Loop);
        f.sequencer.play_from(&f.song, 1, 0, &mut f.notes);
        let last = f.song.page(1).unwrap();
        f.song.remove_page(last.key());
        assert!(f.tick().is_some());
        assert_eq!(f.sequencer.page_index(), 0);
    }

    #[test]
    fn test_play_from_position() {
        let mut f = Fixture::new(3, 4, EndOfSong::Loop);
        assert!(f.sequencer.play_from(&f.song, 2, 3, &mut f.notes));
        f.tick();
        assert_eq!((f.sequencer.page_index(), f.sequencer.tick()), (2, 4));
        assert_eq!(
            f.notes.first(),
            Some(&Notification::PlaybackStarted { page_index: 2, tick: 3 })
        );

        assert!(f.sequencer.play_from(&f.song, 99, 0, &mut f.notes));
        assert_eq!(f.sequencer.page_index(), 2);
    }

    #[test]
    fn test_empty_song_cannot_start() {
        let song = Song::new();
        let mut sequencer = Sequencer::new(EndOfSong::Loop, SharedTransportState::new());
        let mut notes = Vec::new();
        assert!(!sequencer.start(&song, &mut notes));
        assert!(!sequencer.is_playing());
    }

    #[test]
    fn test_release_and_glide_events() {
        let mut f = Fixture::new(1, 8, EndOfSong::Loop);
        f.instrument.envelope().set_release(4);
        let key = f.instrument.key();
        let pattern = f.pattern(
            "01",
            8,
            vec![
                Event::note(0, NoteEvent::note_on(key, 60, 1.0)),
                Event::note(1, NoteEvent::glide(67)),
                Event::note(2, NoteEvent::note_off()),
            ],
        );
        f.select(0, &pattern);
        f.start();

        f.tick();
        f.tick();
        let voice = f.pool.active_voices().next().unwrap();
        assert_eq!(voice.pitch(), 67.0);
        assert!(voice.is_held());

        f.tick();
        assert!(f.pool.active_voices().all(|v| v.is_releasing()));
    }

    #[test]
    fn test_velocity_slide_spans_until_next_event() {
        let mut f = Fixture::new(1, 16, EndOfSong::Loop);
        let key = f.instrument.key();
        let slide = NoteEvent {
            velocity: Some(0.0),
            velocity_slide: true,
            ..Default::default()
        };
        let pattern = f.pattern(
            "01",
            16,
            vec![Event::note(0, NoteEvent::note_on(key, 60, 1.0)), Event::note(4, slide)],
        );
        f.select(0, &pattern);
        f.start();

        for _ in 0..5 {
            f.tick();
        }
        // Slide over 12 ticks (4 → 16)
        let velocity = f.pool.active_voices().next().unwrap().velocity();
        assert!((velocity - 1.0).abs() < 1e-6);
        for _ in 0..6 {
            f.tick();
        }
        let velocity = f.pool.active_voices().next().unwrap().velocity();
        assert!((velocity - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_transport_is_published() {
        let shared = SharedTransportState::new();
        let mut f = Fixture::new(1, 4, EndOfSong::Loop);
        f.sequencer = Sequencer::new(EndOfSong::Loop, shared.clone());
        f.start();
        f.tick();
        f.tick();
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.state, TransportState::Playing);
        assert_eq!(snapshot.tick, 2);
    }
}
