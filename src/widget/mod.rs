use crate::model::CatalogTrack;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const WIDGET_HOST: &str = "https://w.soundcloud.com/player/";
const DEFAULT_TRACK_LENGTH: Duration = Duration::from_secs(180);
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
const READY_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WidgetError {
    #[error("widget is not ready")]
    NotReady,
    #[error("widget unavailable: {0}")]
    Unavailable(String),
    #[error("no track at index {0}")]
    InvalidIndex(usize),
    #[error("widget command failed: {0}")]
    Command(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetSound {
    pub id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub index: usize,
    pub sound: WidgetSound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    Ready,
    PlaybackStarted,
    PlaybackPaused,
    TrackFinished,
    ProgressUpdate { position_ms: u64 },
    Error(String),
    CurrentTrack(Option<NowPlaying>),
    AllTracks(Vec<WidgetSound>),
}

/// Remote-controlled player. Commands are fire-and-forget; their effects and
/// the answers to `request_*` calls arrive later through `drain_events`.
pub trait PlaybackWidget {
    fn play(&mut self) -> Result<(), WidgetError>;
    fn pause(&mut self) -> Result<(), WidgetError>;
    fn next(&mut self) -> Result<(), WidgetError>;
    fn previous(&mut self) -> Result<(), WidgetError>;
    fn skip(&mut self, index: usize) -> Result<(), WidgetError>;
    fn request_current_track(&mut self);
    fn request_all_tracks(&mut self);
    fn tick(&mut self);
    fn drain_events(&mut self) -> Vec<WidgetEvent>;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
}

pub fn embed_url(source_url: &str, color: &str) -> String {
    let color = color.trim_start_matches('#');
    format!(
        "{WIDGET_HOST}?url={source_url}&color=%23{color}&auto_play=false&hide_related=true\
         &show_comments=false&show_user=false&show_reposts=false&show_teaser=false&visual=false"
    )
}

pub struct SimulatedWidget {
    sounds: Vec<WidgetSound>,
    events: VecDeque<WidgetEvent>,
    created_at: Instant,
    now: Instant,
    ready: bool,
    current: usize,
    playing: bool,
    started_at: Option<Instant>,
    position_offset: Duration,
    last_progress: Option<Instant>,
}

impl SimulatedWidget {
    pub fn new(embed_url: &str, catalog: &[CatalogTrack]) -> Result<Self, WidgetError> {
        Self::new_at(embed_url, catalog, Instant::now())
    }

    pub fn new_at(
        embed_url: &str,
        catalog: &[CatalogTrack],
        now: Instant,
    ) -> Result<Self, WidgetError> {
        if !embed_url.starts_with(WIDGET_HOST) || !embed_url.contains("url=http") {
            return Err(WidgetError::Unavailable(format!(
                "no player frame for {embed_url}"
            )));
        }

        let sounds = catalog
            .iter()
            .map(|track| WidgetSound {
                id: track.id.clone(),
                title: Some(track.title.clone()),
                artist: track.artist.clone(),
                duration_ms: (track.duration_ms > 0).then_some(track.duration_ms),
            })
            .collect();

        Ok(Self {
            sounds,
            events: VecDeque::new(),
            created_at: now,
            now,
            ready: false,
            current: 0,
            playing: false,
            started_at: None,
            position_offset: Duration::ZERO,
            last_progress: None,
        })
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn tick_at(&mut self, now: Instant) {
        self.now = now;

        if !self.ready {
            if now.saturating_duration_since(self.created_at) >= READY_DELAY {
                self.ready = true;
                self.events.push_back(WidgetEvent::Ready);
            }
            return;
        }

        if !self.playing {
            return;
        }

        let position = self.current_position();
        if let Some(length) = self.current_length()
            && position >= length
        {
            self.position_offset = length;
            self.started_at = None;
            self.playing = false;
            self.events.push_back(WidgetEvent::TrackFinished);
            return;
        }

        let due = self
            .last_progress
            .is_none_or(|last| now.saturating_duration_since(last) >= PROGRESS_INTERVAL);
        if due {
            self.last_progress = Some(now);
            self.events.push_back(WidgetEvent::ProgressUpdate {
                position_ms: position.as_millis() as u64,
            });
        }
    }

    fn current_length(&self) -> Option<Duration> {
        let sound = self.sounds.get(self.current)?;
        Some(
            sound
                .duration_ms
                .map_or(DEFAULT_TRACK_LENGTH, Duration::from_millis),
        )
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if self.playing
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(self.now.saturating_duration_since(started_at));
        }
        match self.current_length() {
            Some(length) => position.min(length),
            None => position,
        }
    }

    fn ensure_ready(&self) -> Result<(), WidgetError> {
        if self.ready {
            Ok(())
        } else {
            Err(WidgetError::NotReady)
        }
    }

    fn start_track(&mut self, index: usize) {
        self.current = index;
        self.position_offset = Duration::ZERO;
        self.started_at = Some(self.now);
        self.playing = true;
        self.last_progress = Some(self.now);
        self.events.push_back(WidgetEvent::PlaybackStarted);
        self.events
            .push_back(WidgetEvent::ProgressUpdate { position_ms: 0 });
    }
}

impl PlaybackWidget for SimulatedWidget {
    fn play(&mut self) -> Result<(), WidgetError> {
        self.ensure_ready()?;
        if self.sounds.is_empty() {
            return Err(WidgetError::Command(String::from("playlist has no tracks")));
        }
        if self.playing {
            return Ok(());
        }
        if self.position_offset == Duration::ZERO
            || self.current_length() == Some(self.position_offset)
        {
            self.start_track(self.current);
            return Ok(());
        }
        self.started_at = Some(self.now);
        self.playing = true;
        self.events.push_back(WidgetEvent::PlaybackStarted);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), WidgetError> {
        self.ensure_ready()?;
        if !self.playing {
            return Ok(());
        }
        self.position_offset = self.current_position();
        self.started_at = None;
        self.playing = false;
        self.events.push_back(WidgetEvent::PlaybackPaused);
        Ok(())
    }

    fn next(&mut self) -> Result<(), WidgetError> {
        self.ensure_ready()?;
        if self.sounds.is_empty() {
            return Ok(());
        }
        self.start_track((self.current + 1) % self.sounds.len());
        Ok(())
    }

    fn previous(&mut self) -> Result<(), WidgetError> {
        self.ensure_ready()?;
        if self.sounds.is_empty() {
            return Ok(());
        }
        let len = self.sounds.len();
        self.start_track((self.current + len - 1) % len);
        Ok(())
    }

    fn skip(&mut self, index: usize) -> Result<(), WidgetError> {
        self.ensure_ready()?;
        if index >= self.sounds.len() {
            return Err(WidgetError::InvalidIndex(index));
        }
        self.start_track(index);
        Ok(())
    }

    fn request_current_track(&mut self) {
        if !self.ready {
            return;
        }
        let now_playing = self.sounds.get(self.current).map(|sound| NowPlaying {
            index: self.current,
            sound: sound.clone(),
        });
        self.events
            .push_back(WidgetEvent::CurrentTrack(now_playing));
    }

    fn request_all_tracks(&mut self) {
        if !self.ready {
            return;
        }
        self.events
            .push_back(WidgetEvent::AllTracks(self.sounds.clone()));
    }

    fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    fn drain_events(&mut self) -> Vec<WidgetEvent> {
        self.events.drain(..).collect()
    }

    fn position(&self) -> Option<Duration> {
        (self.ready && !self.sounds.is_empty()).then(|| self.current_position())
    }

    fn duration(&self) -> Option<Duration> {
        self.current_length()
    }
}

pub struct DetachedWidget {
    reason: String,
}

impl DetachedWidget {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn unavailable(&self) -> Result<(), WidgetError> {
        Err(WidgetError::Unavailable(self.reason.clone()))
    }
}

impl PlaybackWidget for DetachedWidget {
    fn play(&mut self) -> Result<(), WidgetError> {
        self.unavailable()
    }

    fn pause(&mut self) -> Result<(), WidgetError> {
        self.unavailable()
    }

    fn next(&mut self) -> Result<(), WidgetError> {
        self.unavailable()
    }

    fn previous(&mut self) -> Result<(), WidgetError> {
        self.unavailable()
    }

    fn skip(&mut self, _index: usize) -> Result<(), WidgetError> {
        self.unavailable()
    }

    fn request_current_track(&mut self) {}

    fn request_all_tracks(&mut self) {}

    fn tick(&mut self) {}

    fn drain_events(&mut self) -> Vec<WidgetEvent> {
        Vec::new()
    }

    fn position(&self) -> Option<Duration> {
        None
    }

    fn duration(&self) -> Option<Duration> {
        None
    }
}
