//! Off-tick save writing.
//!
//! The tick only builds a [`SaveTag`] and hands it to a bounded channel with
//! `try_send`. A background task drains the channel and performs the file
//! write on the blocking pool, so no tick ever waits on the disk.

use std::path::{Path, PathBuf};

use ember_state::{
    ExtensionState, PersistenceCodec, SaveTag, load_save_file, quarantine_save_file,
    write_save_file,
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::error::SyncError;

/// One pending save.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub player_name: String,
    pub tag: SaveTag,
}

// ---------------------------------------------------------------------------
// SaveQueue
// ---------------------------------------------------------------------------

/// Sending side of the background save writer. Dropping every clone lets the
/// writer finish the backlog and exit.
#[derive(Debug, Clone)]
pub struct SaveQueue {
    tx: mpsc::Sender<SaveRequest>,
}

impl SaveQueue {
    /// Spawns the writer task on the current runtime. The handle resolves to
    /// the number of saves written successfully.
    pub fn spawn(save_dir: PathBuf, capacity: usize) -> (Self, JoinHandle<usize>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let writer = tokio::spawn(write_loop(save_dir, rx));
        (Self { tx }, writer)
    }

    /// Queues a save of `state`'s persisted subset without waiting.
    pub fn enqueue(&self, player_name: &str, state: &ExtensionState) -> Result<(), SyncError> {
        let request = SaveRequest {
            player_name: player_name.to_string(),
            tag: PersistenceCodec::save(state),
        };
        self.tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => SyncError::SaveQueueFull,
            TrySendError::Closed(_) => SyncError::SaveQueueClosed,
        })
    }
}

async fn write_loop(save_dir: PathBuf, mut rx: mpsc::Receiver<SaveRequest>) -> usize {
    let mut written = 0;
    while let Some(request) = rx.recv().await {
        let dir = save_dir.clone();
        let name = request.player_name.clone();
        let result = tokio::task::spawn_blocking(move || {
            write_save_file(&dir, &request.player_name, &request.tag)
        })
        .await;
        match result {
            Ok(Ok(path)) => {
                written += 1;
                tracing::debug!(player = %name, path = %path.display(), "save written");
            }
            Ok(Err(e)) => tracing::warn!(player = %name, error = %e, "save failed"),
            Err(e) => tracing::warn!(player = %name, error = %e, "save task aborted"),
        }
    }
    tracing::debug!(written, "save writer stopped");
    written
}

// ---------------------------------------------------------------------------
// Autosave
// ---------------------------------------------------------------------------

/// Tick counter that queues a save every `interval_ticks`. A save that could
/// not be queued is retried on the following tick.
#[derive(Debug, Clone)]
pub struct Autosave {
    interval_ticks: u64,
    elapsed: u64,
    pending: bool,
}

impl Autosave {
    /// `interval_ticks == 0` disables autosave.
    pub fn new(interval_ticks: u64) -> Self {
        Self {
            interval_ticks,
            elapsed: 0,
            pending: false,
        }
    }

    /// Whether a save is owed from an earlier tick.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Advances one tick. Returns `true` when a save was queued.
    pub fn tick(&mut self, queue: &SaveQueue, player_name: &str, state: &ExtensionState) -> bool {
        if self.interval_ticks == 0 {
            return false;
        }
        self.elapsed += 1;
        if !self.pending && self.elapsed < self.interval_ticks {
            return false;
        }
        match queue.enqueue(player_name, state) {
            Ok(()) => {
                self.elapsed = 0;
                self.pending = false;
                true
            }
            Err(e) => {
                tracing::warn!(player = player_name, error = %e, "autosave deferred");
                self.pending = true;
                false
            }
        }
    }
}

/// Loads `player_name`'s state, or fresh defaults when there is no save or
/// the save cannot be read. An unreadable save is moved aside first so the
/// next save does not replace it.
pub fn load_or_default(save_dir: &Path, player_name: &str) -> ExtensionState {
    match load_save_file(save_dir, player_name) {
        Ok(Some(fields)) => {
            tracing::info!(player = player_name, "loaded save");
            ExtensionState::from_persisted(&fields)
        }
        Ok(None) => {
            tracing::info!(player = player_name, "no save found, starting fresh");
            ExtensionState::new()
        }
        Err(e) => {
            match quarantine_save_file(save_dir, player_name) {
                Ok(Some(backup)) => tracing::warn!(
                    player = player_name,
                    error = %e,
                    backup = %backup.display(),
                    "unreadable save moved aside, using defaults"
                ),
                Ok(None) => {
                    tracing::warn!(player = player_name, error = %e, "unreadable save, using defaults")
                }
                Err(move_err) => tracing::error!(
                    player = player_name,
                    error = %e,
                    move_error = %move_err,
                    "unreadable save could not be moved aside"
                ),
            }
            ExtensionState::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_state::PersistenceError;
    use ember_state::SCHEMA_VERSION;
    use ember_state::persistence::{KEY_SCHEMA, KEY_SCORE};

    fn state(score: i32, crystals: i32) -> ExtensionState {
        let mut state = ExtensionState::new();
        state.score = score;
        state.life_crystals = crystals;
        state
    }

    #[tokio::test]
    async fn test_queued_save_reaches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, writer) = SaveQueue::spawn(dir.path().to_path_buf(), 4);

        queue.enqueue("Alice", &state(7, 3)).unwrap();
        drop(queue);
        assert_eq!(writer.await.unwrap(), 1);

        let loaded = load_or_default(dir.path(), "Alice");
        assert_eq!(loaded.score, 7);
        assert_eq!(loaded.life_crystals, 3);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, writer) = SaveQueue::spawn(dir.path().to_path_buf(), 1);

        // The writer cannot run until this task yields.
        queue.enqueue("Bob", &state(1, 0)).unwrap();
        assert!(matches!(
            queue.enqueue("Bob", &state(2, 0)),
            Err(SyncError::SaveQueueFull)
        ));

        drop(queue);
        assert_eq!(writer.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_autosave_retries_after_full_queue() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, writer) = SaveQueue::spawn(dir.path().to_path_buf(), 1);
        let mut autosave = Autosave::new(2);
        let s = state(3, 1);

        assert!(!autosave.tick(&queue, "Cara", &s));
        assert!(autosave.tick(&queue, "Cara", &s));

        // The writer has not run yet, so the only slot is still taken.
        assert!(queue.enqueue("Other", &s).is_err());
        assert!(!autosave.tick(&queue, "Cara", &s));
        assert!(!autosave.tick(&queue, "Cara", &s));
        assert!(autosave.is_pending());

        while autosave.is_pending() {
            tokio::task::yield_now().await;
            autosave.tick(&queue, "Cara", &s);
        }

        drop(queue);
        assert_eq!(writer.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_autosave_disabled_with_zero_interval() {
        let (queue, _writer) = SaveQueue::spawn(PathBuf::from("unused"), 1);
        let mut autosave = Autosave::new(0);
        for _ in 0..10 {
            assert!(!autosave.tick(&queue, "Dan", &ExtensionState::new()));
        }
    }

    #[test]
    fn test_missing_or_corrupt_save_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_or_default(dir.path(), "Eve").score, 0);

        std::fs::write(ember_state::save_path(dir.path(), "Eve"), b"EMSV").unwrap();
        let loaded = load_or_default(dir.path(), "Eve");
        assert_eq!(loaded.score, 0);
        assert_eq!(loaded.life_crystals, 0);
    }

    #[tokio::test]
    async fn test_newer_save_survives_autosave() {
        let dir = tempfile::tempdir().unwrap();
        let mut tag = SaveTag::new();
        tag.set(KEY_SCHEMA, SCHEMA_VERSION + 1);
        tag.set(KEY_SCORE, 9000);
        write_save_file(dir.path(), "Faye", &tag).unwrap();
        let newer = std::fs::read(ember_state::save_path(dir.path(), "Faye")).unwrap();

        let state = load_or_default(dir.path(), "Faye");
        assert_eq!(state.score, 0);

        let (queue, writer) = SaveQueue::spawn(dir.path().to_path_buf(), 4);
        let mut autosave = Autosave::new(1);
        assert!(autosave.tick(&queue, "Faye", &state));
        drop(queue);
        assert_eq!(writer.await.unwrap(), 1);

        let backup = dir.path().join("Faye.emsave.bak-0");
        assert_eq!(std::fs::read(&backup).unwrap(), newer);
        assert!(matches!(
            ember_state::decode_save(&newer),
            Err(PersistenceError::SchemaTooNew { found, .. }) if found == SCHEMA_VERSION + 1
        ));
        assert_eq!(load_or_default(dir.path(), "Faye").score, 0);
    }
}
