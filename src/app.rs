use crate::config::{self, Settings};
use crate::model::{Playlist, PlaylistConfig};
use crate::platform::{MediaAction, MediaSession, UnsupportedWakeLock, WakeLockSlot};
use crate::player::PlayerCore;
use crate::sequencer::Sequencer;
use crate::shell_cache::{KeepAlive, ShellCache};
use crate::storage::{self, JsonFileStore, KeyValueStore};
use crate::widget::{self, DetachedWidget, PlaybackWidget, SimulatedWidget, WidgetError};
use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    MediaKeyCode, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub const SETTINGS_ITEMS: [&str; 2] = ["Shuffle playback", "About"];
const SELECTOR_STATUS: &str = "Choose your sound journey";

#[derive(Debug, Default)]
pub struct AppStartupOptions {
    pub config_root: Option<PathBuf>,
    pub playlist: Option<String>,
    pub ready_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    TrackList { selected: usize },
    Settings { selected: usize },
    About,
}

pub type WidgetFactory = fn(&PlaylistConfig) -> Result<Box<dyn PlaybackWidget>, WidgetError>;

pub struct Session {
    pub player: PlayerCore,
    pub widget: Box<dyn PlaybackWidget>,
    pub media: MediaSession,
}

pub struct App {
    pub settings: Settings,
    pub shuffle_enabled: bool,
    pub selected_playlist: usize,
    pub session: Option<Session>,
    pub overlay: Overlay,
    pub status: String,
    pub dirty: bool,
    pub should_quit: bool,
    store: Box<dyn KeyValueStore>,
    widget_factory: WidgetFactory,
    worker: ShellCache,
    keep_alive: KeepAlive,
}

pub fn simulated_widget(config: &PlaylistConfig) -> Result<Box<dyn PlaybackWidget>, WidgetError> {
    let url = widget::embed_url(&config.url, &config.color);
    tracing::info!(playlist = %config.name, %url, "embedding player");
    Ok(Box::new(SimulatedWidget::new(&url, &config.catalog)?))
}

impl App {
    pub fn new(settings: Settings, store: Box<dyn KeyValueStore>) -> Self {
        let shuffle_enabled = storage::load_shuffle(store.as_ref());
        let keep_alive = KeepAlive::new(Duration::from_secs(settings.keep_alive_secs));
        Self {
            settings,
            shuffle_enabled,
            selected_playlist: 0,
            session: None,
            overlay: Overlay::None,
            status: String::from(SELECTOR_STATUS),
            dirty: true,
            should_quit: false,
            store,
            widget_factory: simulated_widget,
            worker: ShellCache::new(),
            keep_alive,
        }
    }

    pub fn with_widget_factory(mut self, factory: WidgetFactory) -> Self {
        self.widget_factory = factory;
        self
    }

    pub fn status_line(&self) -> &str {
        match &self.session {
            Some(session) => session.player.status.as_str(),
            None => self.status.as_str(),
        }
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty
            || self
                .session
                .as_ref()
                .is_some_and(|session| session.player.dirty)
    }

    pub fn mark_drawn(&mut self) {
        self.dirty = false;
        if let Some(session) = self.session.as_mut() {
            session.player.dirty = false;
        }
    }

    pub fn open_playlist(&mut self, index: usize, now: Instant) {
        let Some(config) = self.settings.playlists.get(index).cloned() else {
            self.set_status("Playlist not found");
            return;
        };
        self.close_playlist();

        let mut player = PlayerCore::new(
            Playlist::from_config(&config),
            self.shuffle_enabled,
            Sequencer::new(),
            WakeLockSlot::new(Box::new(UnsupportedWakeLock)),
            Duration::from_millis(self.settings.ready_timeout_ms),
            now,
        );
        let widget = match (self.widget_factory)(&config) {
            Ok(widget) => widget,
            Err(err) => {
                player.widget_unavailable(&err.to_string());
                Box::new(DetachedWidget::new(err.to_string()))
            }
        };

        self.selected_playlist = index;
        self.session = Some(Session {
            player,
            widget,
            media: MediaSession::new(),
        });
        self.overlay = Overlay::None;
        self.dirty = true;
    }

    pub fn open_playlist_by_key(&mut self, key: &str, now: Instant) -> bool {
        let Some(index) = self.settings.playlist_index(key) else {
            self.set_status(&format!("Unknown playlist {key}"));
            return false;
        };
        self.open_playlist(index, now);
        true
    }

    pub fn close_playlist(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.player.teardown();
            session.media.clear();
            tracing::info!(playlist = %session.player.playlist.name, "left player");
        }
        self.overlay = Overlay::None;
        self.set_status(SELECTOR_STATUS);
    }

    pub fn toggle_shuffle(&mut self) {
        self.shuffle_enabled = !self.shuffle_enabled;
        if let Err(err) = storage::save_shuffle(self.store.as_mut(), self.shuffle_enabled) {
            tracing::error!("failed to persist shuffle setting: {err:#}");
        }

        match self.session.as_mut() {
            Some(Session { player, widget, .. }) => {
                player.set_shuffle(self.shuffle_enabled, widget.as_mut());
            }
            None => {
                let message = if self.shuffle_enabled {
                    "Shuffle on"
                } else {
                    "Shuffle off"
                };
                self.set_status(message);
            }
        }
    }

    pub fn pump(&mut self, now: Instant) {
        if let Some(message) = self.keep_alive.poll(now) {
            self.worker.on_message(&message);
        }

        let Some(Session {
            player,
            widget,
            media,
        }) = self.session.as_mut()
        else {
            return;
        };

        widget.tick();
        for event in widget.drain_events() {
            player.handle_event(event, widget.as_mut());
        }
        player.tick(now);

        if media.update(
            &player.title,
            &self.settings.artist_label,
            &player.playlist.name,
        ) {
            player.dirty = true;
        }
    }

    pub fn media_action(&mut self, action: MediaAction) {
        match self.session.as_mut() {
            Some(Session { player, widget, .. }) => {
                player.handle_media_action(action, widget.as_mut());
            }
            None => self.set_status("Nothing is playing"),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if let KeyCode::Media(media_key) = key.code {
            if let Some(action) = media_action_for(media_key) {
                self.media_action(action);
            }
            return;
        }

        match self.overlay {
            Overlay::About => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q')) {
                    self.overlay = Overlay::None;
                    self.dirty = true;
                }
            }
            Overlay::Settings { selected } => self.handle_settings_key(key.code, selected),
            Overlay::TrackList { selected } => self.handle_track_list_key(key.code, selected),
            Overlay::None if self.session.is_some() => self.handle_player_key(key.code),
            Overlay::None => self.handle_selector_key(key.code, now),
        }
    }

    fn handle_selector_key(&mut self, code: KeyCode, now: Instant) {
        let count = self.settings.playlists.len();
        match code {
            KeyCode::Down => {
                self.selected_playlist = (self.selected_playlist + 1).min(count.saturating_sub(1));
                self.dirty = true;
            }
            KeyCode::Up => {
                self.selected_playlist = self.selected_playlist.saturating_sub(1);
                self.dirty = true;
            }
            KeyCode::Enter => self.open_playlist(self.selected_playlist, now),
            KeyCode::Char('o') => self.open_overlay(Overlay::Settings { selected: 0 }),
            KeyCode::Char('s') => self.toggle_shuffle(),
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_player_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('h') => self.close_playlist(),
            KeyCode::Char('o') => self.open_overlay(Overlay::Settings { selected: 0 }),
            KeyCode::Char('s') => self.toggle_shuffle(),
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('l') => {
                let selected = self
                    .session
                    .as_ref()
                    .map_or(0, |session| session.player.current_track);
                self.open_overlay(Overlay::TrackList { selected });
            }
            KeyCode::Char(' ') => self.media_action(MediaAction::Play),
            KeyCode::Char('n') | KeyCode::Right => self.media_action(MediaAction::NextTrack),
            KeyCode::Char('p') | KeyCode::Left => self.media_action(MediaAction::PreviousTrack),
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, code: KeyCode, selected: usize) {
        match code {
            KeyCode::Down => {
                let selected = (selected + 1).min(SETTINGS_ITEMS.len() - 1);
                self.open_overlay(Overlay::Settings { selected });
            }
            KeyCode::Up => {
                let selected = selected.saturating_sub(1);
                self.open_overlay(Overlay::Settings { selected });
            }
            KeyCode::Enter => {
                if selected == 0 {
                    self.overlay = Overlay::None;
                    self.toggle_shuffle();
                } else {
                    self.open_overlay(Overlay::About);
                }
                self.dirty = true;
            }
            KeyCode::Esc | KeyCode::Char('o') | KeyCode::Char('q') => {
                self.open_overlay(Overlay::None);
            }
            _ => {}
        }
    }

    fn handle_track_list_key(&mut self, code: KeyCode, selected: usize) {
        let count = self
            .session
            .as_ref()
            .map_or(0, |session| session.player.tracks().len());
        match code {
            KeyCode::Down => {
                let selected = (selected + 1).min(count.saturating_sub(1));
                self.open_overlay(Overlay::TrackList { selected });
            }
            KeyCode::Up => {
                let selected = selected.saturating_sub(1);
                self.open_overlay(Overlay::TrackList { selected });
            }
            KeyCode::Enter => {
                if let Some(Session { player, widget, .. }) = self.session.as_mut()
                    && selected < count
                {
                    player.select_track(selected, widget.as_mut());
                }
                self.open_overlay(Overlay::None);
            }
            KeyCode::Esc | KeyCode::Char('l') | KeyCode::Char('q') => {
                self.open_overlay(Overlay::None);
            }
            _ => {}
        }
    }

    fn open_overlay(&mut self, overlay: Overlay) {
        self.overlay = overlay;
        self.dirty = true;
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}

fn media_action_for(key: MediaKeyCode) -> Option<MediaAction> {
    match key {
        MediaKeyCode::Play | MediaKeyCode::PlayPause => Some(MediaAction::Play),
        MediaKeyCode::Pause => Some(MediaAction::Pause),
        MediaKeyCode::TrackNext => Some(MediaAction::NextTrack),
        MediaKeyCode::TrackPrevious => Some(MediaAction::PreviousTrack),
        _ => None,
    }
}

pub fn run_with_startup(options: AppStartupOptions) -> Result<()> {
    let root = match options.config_root {
        Some(root) => root,
        None => config::config_root()?,
    };
    if let Err(err) = crate::logging::init(&root) {
        eprintln!("logging disabled: {err:#}");
    }

    let mut settings = config::load_or_init_settings(&root)?;
    if let Some(timeout) = options.ready_timeout_ms {
        settings.ready_timeout_ms = timeout;
    }
    let store = JsonFileStore::open(&root)?;
    let mut app = App::new(settings, Box::new(store));
    tracing::info!(
        version = config::APP_VERSION,
        shuffle = app.shuffle_enabled,
        "starting"
    );

    if let Some(key) = options.playlist.as_deref()
        && !app.open_playlist_by_key(key, Instant::now())
    {
        anyhow::bail!("unknown playlist {key}");
    }

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let enhanced_keys = matches!(supports_keyboard_enhancement(), Ok(true));
    if enhanced_keys {
        execute!(
            out,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
    }
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut last_tick = Instant::now();
    let result: Result<()> = loop {
        app.pump(Instant::now());

        if app.needs_redraw() || last_tick.elapsed() > Duration::from_millis(250) {
            if let Err(err) = terminal.draw(|frame| crate::ui::draw(frame, &app)) {
                break Err(err.into());
            }
            app.mark_drawn();
            last_tick = Instant::now();
        }

        match event::poll(Duration::from_millis(33)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => break Err(err.into()),
        }
        match event::read() {
            Ok(Event::Key(key)) => app.handle_key(key, Instant::now()),
            Ok(Event::Resize(_, _)) => app.dirty = true,
            Ok(_) => {}
            Err(err) => break Err(err.into()),
        }

        if app.should_quit {
            break Ok(());
        }
    };

    app.close_playlist();
    disable_raw_mode()?;
    if enhanced_keys {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    tracing::info!("stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::WidgetStatus;
    use crate::storage::{MemoryStore, SHUFFLE_KEY};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn unreachable_widget(_config: &PlaylistConfig) -> Result<Box<dyn PlaybackWidget>, WidgetError> {
        Err(WidgetError::Unavailable(String::from("script failed to load")))
    }

    fn app() -> App {
        App::new(Settings::default(), Box::new(MemoryStore::new()))
    }

    #[test]
    fn shuffle_starts_from_store() {
        let mut store = MemoryStore::new();
        store.set(SHUFFLE_KEY, "true").expect("set");
        let app = App::new(Settings::default(), Box::new(store));
        assert!(app.shuffle_enabled);
    }

    #[test]
    fn toggling_shuffle_persists_flag() {
        let mut app = app();
        app.toggle_shuffle();
        assert!(app.shuffle_enabled);
        assert_eq!(app.store.get(SHUFFLE_KEY).as_deref(), Some("true"));
        assert_eq!(app.status_line(), "Shuffle on");

        app.toggle_shuffle();
        assert_eq!(app.store.get(SHUFFLE_KEY).as_deref(), Some("false"));
    }

    #[test]
    fn selector_opens_highlighted_playlist() {
        let mut app = app();
        let now = Instant::now();
        app.handle_key(press(KeyCode::Down), now);
        app.handle_key(press(KeyCode::Down), now);
        assert_eq!(app.selected_playlist, 1);

        app.handle_key(press(KeyCode::Enter), now);
        let session = app.session.as_ref().expect("session");
        assert_eq!(session.player.playlist.key, "reggae");
        assert!(session.player.loading);
    }

    #[test]
    fn unreachable_widget_degrades_player() {
        let mut app = app().with_widget_factory(unreachable_widget);
        app.open_playlist(0, Instant::now());
        let session = app.session.as_ref().expect("session");
        assert_eq!(session.player.widget_status, WidgetStatus::Unavailable);
        assert!(!session.player.loading);

        app.handle_key(press(KeyCode::Char(' ')), Instant::now());
        assert_eq!(app.status_line(), "Player not ready yet");
    }

    #[test]
    fn going_back_returns_to_selector() {
        let mut app = app();
        app.open_playlist(0, Instant::now());
        app.handle_key(press(KeyCode::Esc), Instant::now());
        assert!(app.session.is_none());
        assert_eq!(app.status_line(), SELECTOR_STATUS);
        assert!(!app.should_quit);
    }

    #[test]
    fn settings_menu_toggles_shuffle_and_shows_about() {
        let mut app = app();
        let now = Instant::now();
        app.handle_key(press(KeyCode::Char('o')), now);
        assert_eq!(app.overlay, Overlay::Settings { selected: 0 });
        app.handle_key(press(KeyCode::Enter), now);
        assert!(app.shuffle_enabled);
        assert_eq!(app.overlay, Overlay::None);

        app.handle_key(press(KeyCode::Char('o')), now);
        app.handle_key(press(KeyCode::Down), now);
        app.handle_key(press(KeyCode::Enter), now);
        assert_eq!(app.overlay, Overlay::About);
        app.handle_key(press(KeyCode::Enter), now);
        assert_eq!(app.overlay, Overlay::None);
    }

    #[test]
    fn unknown_playlist_key_is_reported() {
        let mut app = app();
        assert!(!app.open_playlist_by_key("polka", Instant::now()));
        assert!(app.status_line().contains("Unknown playlist"));
        assert!(app.open_playlist_by_key("CHILLOUT", Instant::now()));
    }

    #[test]
    fn media_keys_without_player_are_ignored() {
        let mut app = app();
        app.handle_key(press(KeyCode::Media(MediaKeyCode::TrackNext)), Instant::now());
        assert_eq!(app.status_line(), "Nothing is playing");
    }

    #[test]
    fn ctrl_c_quits() {
        let mut app = app();
        app.handle_key(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Instant::now(),
        );
        assert!(app.should_quit);
    }
}
