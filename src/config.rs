use crate::model::{PlaylistConfig, default_playlists};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "klanginsel";
const SETTINGS_FILE: &str = "settings.json";
pub const APP_NAME: &str = "Klanginsel";
pub const APP_VERSION: &str = "1.2";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_playlists")]
    pub playlists: Vec<PlaylistConfig>,
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    #[serde(default = "default_artist_label")]
    pub artist_label: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

fn default_ready_timeout_ms() -> u64 {
    15_000
}

fn default_artist_label() -> String {
    String::from(APP_NAME)
}

fn default_keep_alive_secs() -> u64 {
    25
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            playlists: default_playlists(),
            ready_timeout_ms: default_ready_timeout_ms(),
            artist_label: default_artist_label(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

impl Settings {
    pub fn playlist_index(&self, key: &str) -> Option<usize> {
        self.playlists
            .iter()
            .position(|playlist| playlist.key.eq_ignore_ascii_case(key))
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("KLANGINSEL_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("USERPROFILE")
        .or_else(|_| env::var("HOME"))
        .context("neither USERPROFILE nor HOME is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

pub fn ensure_config_dir(root: &Path) -> Result<()> {
    fs::create_dir_all(root).with_context(|| format!("failed to create {}", root.display()))
}

pub fn load_settings(root: &Path) -> Result<Settings> {
    let path = settings_path(root);
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    if settings.playlists.is_empty() {
        anyhow::bail!("settings file {} lists no playlists", path.display());
    }
    Ok(settings)
}

pub fn load_or_init_settings(root: &Path) -> Result<Settings> {
    let settings = load_settings(root)?;
    if !settings_path(root).exists()
        && let Err(err) = save_settings(root, &settings)
    {
        tracing::warn!("could not write default settings: {err:#}");
    }
    Ok(settings)
}

pub fn save_settings(root: &Path, settings: &Settings) -> Result<()> {
    ensure_config_dir(root)?;
    let path = settings_path(root);
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_builtin_playlists() {
        let dir = tempdir().expect("tempdir");
        let settings = load_settings(dir.path()).expect("load");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.playlist_index("chillout"), Some(0));
        assert_eq!(settings.playlist_index("Reggae"), Some(1));
        assert_eq!(settings.playlist_index("polka"), None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        let settings = Settings {
            ready_timeout_ms: 2_500,
            ..Settings::default()
        };
        save_settings(dir.path(), &settings).expect("save");
        let loaded = load_settings(dir.path()).expect("load");
        assert_eq!(loaded.ready_timeout_ms, 2_500);
        assert_eq!(loaded.playlists.len(), 2);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        fs::write(settings_path(dir.path()), r#"{"ready_timeout_ms": 900}"#).expect("write");
        let loaded = load_settings(dir.path()).expect("load");
        assert_eq!(loaded.ready_timeout_ms, 900);
        assert_eq!(loaded.artist_label, APP_NAME);
        assert_eq!(loaded.keep_alive_secs, 25);
    }

    #[test]
    fn first_run_writes_editable_defaults() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path().join("klanginsel");
        let settings = load_or_init_settings(&root).expect("init");
        assert!(settings_path(&root).exists());

        fs::write(settings_path(&root), r#"{"ready_timeout_ms": 700}"#).expect("edit");
        let edited = load_or_init_settings(&root).expect("reload");
        assert_eq!(edited.ready_timeout_ms, 700);
        assert_eq!(edited.playlists, settings.playlists);
    }

    #[test]
    fn empty_playlist_list_is_rejected() {
        let dir = tempdir().expect("tempdir");
        fs::write(settings_path(dir.path()), r#"{"playlists": []}"#).expect("write");
        let err = load_settings(dir.path()).expect_err("empty playlists");
        assert!(format!("{err:#}").contains("no playlists"));
    }
}
