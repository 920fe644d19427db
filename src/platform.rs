use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WakeLockError {
    #[error("wake lock is not supported here")]
    Unsupported,
    #[error("wake lock request denied: {0}")]
    Denied(String),
}

pub trait WakeLockProvider {
    fn acquire(&mut self) -> Result<(), WakeLockError>;
    fn release(&mut self);
}

#[derive(Debug, Default)]
pub struct UnsupportedWakeLock;

impl WakeLockProvider for UnsupportedWakeLock {
    fn acquire(&mut self) -> Result<(), WakeLockError> {
        Err(WakeLockError::Unsupported)
    }

    fn release(&mut self) {}
}

pub struct WakeLockSlot {
    provider: Box<dyn WakeLockProvider>,
    held: bool,
}

impl WakeLockSlot {
    pub fn new(provider: Box<dyn WakeLockProvider>) -> Self {
        Self {
            provider,
            held: false,
        }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn acquire(&mut self) {
        if self.held {
            return;
        }
        match self.provider.acquire() {
            Ok(()) => {
                self.held = true;
                tracing::debug!("wake lock active");
            }
            Err(err) => tracing::warn!("continuing without wake lock: {err}"),
        }
    }

    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        self.provider.release();
        self.held = false;
        tracing::debug!("wake lock released");
    }
}

impl std::fmt::Debug for WakeLockSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakeLockSlot")
            .field("held", &self.held)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub src: &'static str,
    pub sizes: &'static str,
}

pub const ARTWORK: [Artwork; 3] = [
    Artwork {
        src: "/icon-96.png",
        sizes: "96x96",
    },
    Artwork {
        src: "/icon-192.png",
        sizes: "192x192",
    },
    Artwork {
        src: "/icon-512.png",
        sizes: "512x512",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: &'static [Artwork],
}

#[derive(Debug, Default)]
pub struct MediaSession {
    metadata: Option<MediaMetadata>,
    updates: usize,
}

impl MediaSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(&self) -> Option<&MediaMetadata> {
        self.metadata.as_ref()
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn update(&mut self, title: &str, artist_label: &str, playlist_name: &str) -> bool {
        let next = MediaMetadata {
            title: title.to_string(),
            artist: artist_label.to_string(),
            album: format!("{playlist_name} Playlist"),
            artwork: &ARTWORK,
        };
        if self.metadata.as_ref() == Some(&next) {
            return false;
        }
        self.metadata = Some(next);
        self.updates += 1;
        true
    }

    pub fn clear(&mut self) {
        self.metadata = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingLock {
        acquired: Rc<Cell<usize>>,
        released: Rc<Cell<usize>>,
    }

    impl WakeLockProvider for CountingLock {
        fn acquire(&mut self) -> Result<(), WakeLockError> {
            self.acquired.set(self.acquired.get() + 1);
            Ok(())
        }

        fn release(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    #[test]
    fn release_is_idempotent() {
        let acquired = Rc::new(Cell::new(0));
        let released = Rc::new(Cell::new(0));
        let mut slot = WakeLockSlot::new(Box::new(CountingLock {
            acquired: acquired.clone(),
            released: released.clone(),
        }));

        slot.acquire();
        slot.acquire();
        slot.release();
        slot.release();

        assert_eq!(acquired.get(), 1);
        assert_eq!(released.get(), 1);
        assert!(!slot.is_held());
    }

    struct DeniedLock;

    impl WakeLockProvider for DeniedLock {
        fn acquire(&mut self) -> Result<(), WakeLockError> {
            Err(WakeLockError::Denied(String::from("battery saver")))
        }

        fn release(&mut self) {
            panic!("release without a held lock");
        }
    }

    #[test]
    fn denied_lock_leaves_playback_unlocked() {
        let mut provider = DeniedLock;
        assert_eq!(
            provider.acquire(),
            Err(WakeLockError::Denied(String::from("battery saver")))
        );

        let mut slot = WakeLockSlot::new(Box::new(DeniedLock));
        slot.acquire();
        assert!(!slot.is_held());
        slot.release();
    }

    #[test]
    fn unsupported_lock_is_not_held() {
        let mut slot = WakeLockSlot::new(Box::new(UnsupportedWakeLock));
        slot.acquire();
        assert!(!slot.is_held());
        slot.release();
    }

    #[test]
    fn metadata_updates_only_on_change() {
        let mut session = MediaSession::new();
        assert!(session.update("Tidal Drift", "Klanginsel", "Chillout"));
        assert!(!session.update("Tidal Drift", "Klanginsel", "Chillout"));
        assert!(session.update("Low Clouds", "Klanginsel", "Chillout"));
        assert_eq!(session.updates(), 2);

        let metadata = session.metadata().expect("metadata");
        assert_eq!(metadata.album, "Chillout Playlist");
        assert_eq!(metadata.artwork.len(), 3);
    }
}
