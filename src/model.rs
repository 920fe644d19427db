use serde::{Deserialize, Serialize};

pub const DEFAULT_THEME_COLOR: &str = "#d4a076";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_ms: u64,
    pub position: usize,
}

impl Track {
    pub fn formatted_duration(&self) -> String {
        format_duration_ms(self.duration_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogTrack {
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistConfig {
    pub key: String,
    pub name: String,
    pub url: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub catalog: Vec<CatalogTrack>,
}

fn default_color() -> String {
    String::from(DEFAULT_THEME_COLOR)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub key: String,
    pub name: String,
    pub color: String,
    pub url: String,
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub fn from_config(config: &PlaylistConfig) -> Self {
        Self {
            key: config.key.clone(),
            name: config.name.clone(),
            color: config.color.clone(),
            url: config.url.clone(),
            tracks: Vec::new(),
        }
    }

    pub fn fallback_title(&self) -> String {
        format!("{} Playlist", self.name)
    }

    pub fn fallback_artist(&self) -> String {
        format!("{} Artist", self.name)
    }
}

pub fn format_duration_ms(ms: u64) -> String {
    if ms == 0 {
        return String::from("0:00");
    }
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

pub fn default_playlists() -> Vec<PlaylistConfig> {
    vec![
        PlaylistConfig {
            key: String::from("chillout"),
            name: String::from("Chillout"),
            url: String::from("https://soundcloud.com/stephan-herzhauser/sets/chillout"),
            color: default_color(),
            catalog: demo_catalog(&[
                ("Tidal Drift", 214_000),
                ("Sandbank Sunset", 187_000),
                ("Low Clouds", 242_000),
                ("Island Breath", 199_000),
                ("Slow Lagoon", 263_000),
            ]),
        },
        PlaylistConfig {
            key: String::from("reggae"),
            name: String::from("Reggae"),
            url: String::from("https://soundcloud.com/stephan-herzhauser/sets/reggae"),
            color: default_color(),
            catalog: demo_catalog(&[
                ("Harbour Skank", 201_000),
                ("One Drop Morning", 223_000),
                ("Palm Dub", 256_000),
                ("Roots Ferry", 178_000),
            ]),
        },
    ]
}

fn demo_catalog(entries: &[(&str, u64)]) -> Vec<CatalogTrack> {
    entries
        .iter()
        .map(|(title, duration_ms)| CatalogTrack {
            title: (*title).to_string(),
            artist: None,
            duration_ms: *duration_ms,
            id: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_duration_renders_zero() {
        assert_eq!(format_duration_ms(0), "0:00");
        assert_eq!(format_duration_ms(65_400), "1:05");
        assert_eq!(format_duration_ms(600_000), "10:00");
    }

    #[test]
    fn playlist_config_defaults_color_and_catalog() {
        let raw = r#"{"key":"jazz","name":"Jazz","url":"https://soundcloud.com/x/sets/jazz"}"#;
        let config: PlaylistConfig = serde_json::from_str(raw).expect("parse");
        assert_eq!(config.color, DEFAULT_THEME_COLOR);
        assert!(config.catalog.is_empty());
        assert_eq!(Playlist::from_config(&config).fallback_title(), "Jazz Playlist");
    }
}
