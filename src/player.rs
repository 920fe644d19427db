use crate::model::{Playlist, Track};
use crate::platform::{MediaAction, WakeLockSlot};
use crate::sequencer::Sequencer;
use crate::widget::{NowPlaying, PlaybackWidget, WidgetError, WidgetEvent, WidgetSound};
use std::time::{Duration, Instant};

pub const LOADING_TITLE: &str = "Loading...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetStatus {
    Loading,
    Ready,
    Unavailable,
}

#[derive(Debug)]
pub struct PlayerCore {
    pub playlist: Playlist,
    pub widget_status: WidgetStatus,
    pub loading: bool,
    pub playing: bool,
    pub current_track: usize,
    pub title: String,
    pub position_ms: u64,
    pub shuffle_enabled: bool,
    pub status: String,
    pub dirty: bool,
    sequencer: Sequencer,
    wake_lock: WakeLockSlot,
    tracks_loaded: bool,
    ready_deadline: Option<Instant>,
}

impl PlayerCore {
    pub fn new(
        playlist: Playlist,
        shuffle_enabled: bool,
        sequencer: Sequencer,
        wake_lock: WakeLockSlot,
        ready_timeout: Duration,
        now: Instant,
    ) -> Self {
        Self {
            playlist,
            widget_status: WidgetStatus::Loading,
            loading: true,
            playing: false,
            current_track: 0,
            title: String::from(LOADING_TITLE),
            position_ms: 0,
            shuffle_enabled,
            status: String::from("Connecting to player"),
            dirty: true,
            sequencer,
            wake_lock,
            tracks_loaded: false,
            ready_deadline: now.checked_add(ready_timeout),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.widget_status == WidgetStatus::Ready
    }

    pub fn tracks(&self) -> &[Track] {
        &self.playlist.tracks
    }

    pub fn current(&self) -> Option<&Track> {
        self.playlist.tracks.get(self.current_track)
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn wake_lock_held(&self) -> bool {
        self.wake_lock.is_held()
    }

    pub fn handle_event(&mut self, event: WidgetEvent, widget: &mut dyn PlaybackWidget) {
        match event {
            WidgetEvent::Ready => self.on_ready(widget),
            WidgetEvent::AllTracks(sounds) => self.on_all_tracks(sounds),
            WidgetEvent::CurrentTrack(now_playing) => self.on_current_track(now_playing),
            WidgetEvent::PlaybackStarted => self.on_playback_started(widget),
            WidgetEvent::PlaybackPaused => self.on_playback_paused(),
            WidgetEvent::TrackFinished => {
                tracing::info!("track finished, playing next");
                self.next(widget);
            }
            WidgetEvent::ProgressUpdate { position_ms } => {
                self.position_ms = position_ms;
                if position_ms == 0 {
                    widget.request_current_track();
                }
                self.dirty = true;
            }
            WidgetEvent::Error(message) => self.on_widget_error(&message),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if self.widget_status != WidgetStatus::Loading {
            return;
        }
        if self.ready_deadline.is_some_and(|deadline| now >= deadline) {
            tracing::warn!(playlist = %self.playlist.name, "player did not become ready in time");
            self.widget_status = WidgetStatus::Unavailable;
            self.loading = false;
            self.ready_deadline = None;
            self.set_status("Player did not respond");
        }
    }

    pub fn widget_unavailable(&mut self, reason: &str) {
        tracing::error!(playlist = %self.playlist.name, "player unavailable: {reason}");
        self.widget_status = WidgetStatus::Unavailable;
        self.loading = false;
        self.ready_deadline = None;
        self.set_status(&format!("Player unavailable: {reason}"));
    }

    pub fn play_pause(&mut self, widget: &mut dyn PlaybackWidget) {
        if !self.ensure_ready("play/pause") {
            return;
        }
        let result = if self.playing {
            tracing::debug!("pausing");
            widget.pause()
        } else {
            tracing::debug!("playing");
            widget.play()
        };
        if let Err(err) = result {
            self.command_failed("play/pause", &err);
        }
    }

    pub fn next(&mut self, widget: &mut dyn PlaybackWidget) {
        if !self.ensure_ready("next") {
            return;
        }
        let count = self.playlist.tracks.len();
        if count == 0 {
            if let Err(err) = widget.next() {
                self.command_failed("next", &err);
            }
            return;
        }
        if let Some(index) = self
            .sequencer
            .next(self.current_track, count, self.shuffle_enabled)
        {
            self.skip_to(index, widget);
        }
    }

    pub fn previous(&mut self, widget: &mut dyn PlaybackWidget) {
        if !self.ensure_ready("previous") {
            return;
        }
        let count = self.playlist.tracks.len();
        if count == 0 {
            if let Err(err) = widget.previous() {
                self.command_failed("previous", &err);
            }
            return;
        }
        if let Some(index) =
            self.sequencer
                .previous(self.current_track, count, self.shuffle_enabled)
        {
            self.skip_to(index, widget);
        }
    }

    pub fn select_track(&mut self, index: usize, widget: &mut dyn PlaybackWidget) {
        if !self.ensure_ready("select") {
            return;
        }
        if self.shuffle_enabled {
            self.sequencer.on_manual_select(index);
        }
        self.skip_to(index, widget);
    }

    pub fn set_shuffle(&mut self, enabled: bool, widget: &mut dyn PlaybackWidget) {
        if self.shuffle_enabled == enabled {
            return;
        }
        self.shuffle_enabled = enabled;
        let count = self.playlist.tracks.len();
        let first = self.sequencer.on_shuffle_toggle(enabled, count);
        tracing::info!(enabled, tracks = count, "shuffle toggled");

        if let Some(index) = first
            && self.is_ready()
        {
            self.skip_to(index, widget);
        }
        self.set_status(if enabled {
            "Shuffle on"
        } else {
            "Shuffle off"
        });
    }

    pub fn handle_media_action(&mut self, action: MediaAction, widget: &mut dyn PlaybackWidget) {
        match action {
            MediaAction::Play | MediaAction::Pause => self.play_pause(widget),
            MediaAction::NextTrack => self.next(widget),
            MediaAction::PreviousTrack => self.previous(widget),
        }
    }

    pub fn teardown(&mut self) {
        self.wake_lock.release();
        self.playing = false;
        self.dirty = true;
    }

    fn on_ready(&mut self, widget: &mut dyn PlaybackWidget) {
        tracing::info!(playlist = %self.playlist.name, "player ready");
        self.widget_status = WidgetStatus::Ready;
        self.loading = false;
        self.ready_deadline = None;
        widget.request_all_tracks();
        widget.request_current_track();
        self.set_status("Ready");
    }

    fn on_all_tracks(&mut self, sounds: Vec<WidgetSound>) {
        if self.tracks_loaded {
            tracing::debug!("ignoring repeated track list");
            return;
        }
        self.tracks_loaded = true;
        self.playlist.tracks = build_tracks(&self.playlist, sounds);

        let count = self.playlist.tracks.len();
        if self.current_track >= count {
            self.current_track = 0;
        }
        self.sequencer
            .on_track_count_change(count, self.shuffle_enabled);
        if self.shuffle_enabled {
            // the widget keeps playing the current track; start the lap there
            self.sequencer.on_manual_select(self.current_track);
        }
        tracing::info!(tracks = count, "track list loaded");
        self.dirty = true;
    }

    fn on_current_track(&mut self, now_playing: Option<NowPlaying>) {
        let Some(NowPlaying { index, sound }) = now_playing else {
            if self.title == LOADING_TITLE {
                self.title = self.playlist.fallback_title();
            }
            self.dirty = true;
            return;
        };

        if index != self.current_track {
            tracing::debug!(
                expected = self.current_track,
                actual = index,
                "widget moved to another track"
            );
            if self.shuffle_enabled {
                self.sequencer.on_manual_select(index);
            }
            self.current_track = index;
        }
        self.title = sound
            .title
            .filter(|title| !title.trim().is_empty())
            .or_else(|| self.current().map(|track| track.title.clone()))
            .unwrap_or_else(|| self.playlist.fallback_title());
        self.dirty = true;
    }

    fn on_playback_started(&mut self, widget: &mut dyn PlaybackWidget) {
        self.playing = true;
        self.loading = false;
        widget.request_current_track();
        self.wake_lock.acquire();
        self.set_status("Playing");
    }

    fn on_playback_paused(&mut self) {
        self.playing = false;
        self.wake_lock.release();
        self.set_status("Paused");
    }

    fn on_widget_error(&mut self, message: &str) {
        tracing::warn!(playlist = %self.playlist.name, "player error: {message}");
        self.title = self.playlist.fallback_title();
        self.loading = false;
        self.set_status(&format!("Player error: {message}"));
    }

    fn skip_to(&mut self, index: usize, widget: &mut dyn PlaybackWidget) {
        let count = self.playlist.tracks.len();
        let result = if index < count {
            widget.skip(index)
        } else {
            Err(WidgetError::InvalidIndex(index))
        };

        match result {
            Ok(()) => {
                self.current_track = index;
                if let Some(title) = self.current().map(|track| track.title.clone()) {
                    self.title = title;
                }
                self.position_ms = 0;
                self.dirty = true;
            }
            Err(WidgetError::InvalidIndex(bad)) => {
                tracing::warn!(index = bad, tracks = count, "skip target out of range, restarting at first track");
                if let Err(err) = widget.skip(0) {
                    self.command_failed("skip", &err);
                }
                self.current_track = 0;
                self.position_ms = 0;
                self.title = self.playlist.fallback_title();
                if self.shuffle_enabled {
                    self.sequencer.on_manual_select(0);
                }
                self.set_status("Restarted at first track");
            }
            Err(err) => self.command_failed("skip", &err),
        }
    }

    fn ensure_ready(&mut self, command: &str) -> bool {
        if self.is_ready() {
            return true;
        }
        tracing::info!(command, "player not ready, ignoring command");
        self.set_status("Player not ready yet");
        false
    }

    fn command_failed(&mut self, command: &str, err: &WidgetError) {
        tracing::error!(command, "player command failed: {err}");
        self.set_status(&format!("{command} failed: {err}"));
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}

pub fn build_tracks(playlist: &Playlist, sounds: Vec<WidgetSound>) -> Vec<Track> {
    sounds
        .into_iter()
        .enumerate()
        .map(|(idx, sound)| {
            let position = idx + 1;
            Track {
                id: sound.id.unwrap_or_else(|| format!("track-{position}")),
                title: sound
                    .title
                    .filter(|title| !title.trim().is_empty())
                    .unwrap_or_else(|| format!("Track {position}")),
                artist: sound
                    .artist
                    .filter(|artist| !artist.trim().is_empty())
                    .unwrap_or_else(|| playlist.fallback_artist()),
                duration_ms: sound.duration_ms.unwrap_or(0),
                position,
            }
        })
        .collect()
}
