//! Bridges the frame loop and the async document store.
//!
//! Writes are spawned on a dedicated tokio runtime and never block a frame.
//! Failures are logged and swallowed; the page only learns that a write
//! settled, through [`Persistence::drain_settled`].

use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};

use bevy::prelude::*;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, Mutex};

use crate::config::StoreConfig;
use crate::recorder::InteractionRecorder;
use crate::store::{DocumentStore, MemoryStore, MySqlStore, StoreError};

/// Writes the page waits on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Settled {
    Dodge,
    Acceptance,
}

#[derive(Resource)]
pub struct Persistence {
    runtime: Runtime,
    // Empty until the store connects and the session is reset
    recorder: Arc<Mutex<Option<InteractionRecorder>>>,
    settled_tx: mpsc::UnboundedSender<Settled>,
    settled_rx: StdMutex<mpsc::UnboundedReceiver<Settled>>,
}

impl Persistence {
    pub fn new(runtime: Runtime) -> Self {
        Self::build(runtime, None)
    }

    /// Starts with an already connected recorder, skipping the reset.
    pub fn with_recorder(runtime: Runtime, recorder: InteractionRecorder) -> Self {
        Self::build(runtime, Some(recorder))
    }

    fn build(runtime: Runtime, recorder: Option<InteractionRecorder>) -> Self {
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            recorder: Arc::new(Mutex::new(recorder)),
            settled_tx,
            settled_rx: StdMutex::new(settled_rx),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Connects in the background, resets the session, then accepts writes.
    ///
    /// The recorder slot stays locked until the reset is done, so writes
    /// issued meanwhile queue up behind it instead of being dropped.
    pub fn connect(&self, config: StoreConfig) {
        let Ok(mut slot) = self.recorder.clone().try_lock_owned() else {
            warn!("Document store is already connecting");
            return;
        };
        self.runtime.spawn(async move {
            let store = match config.database_url.as_deref() {
                Some(url) => match MySqlStore::connect(url, config.max_connections).await {
                    Ok(store) => DocumentStore::MySql(store),
                    Err(e) => {
                        warn!("Failed to connect to document store: {}", e);
                        return;
                    }
                },
                None => DocumentStore::Memory(MemoryStore::default()),
            };
            info!("Document store ready ({})", store.backend_name());

            let recorder = InteractionRecorder::new(Arc::new(store));
            if let Err(e) = recorder.reset_session().await {
                warn!("Failed to reset session: {}", e);
            }
            *slot = Some(recorder);
        });
    }

    pub fn record_dodge(&self, new_count: u32, points_at_time: u32) {
        self.spawn_write("dodge", Some(Settled::Dodge), move |recorder| async move {
            recorder.record_dodge(new_count, points_at_time).await
        });
    }

    pub fn record_reward(&self, new_points: u32) {
        self.spawn_write("reward", None, move |recorder| async move {
            recorder.record_reward(new_points).await
        });
    }

    pub fn record_acceptance(&self, dodge_count: u32, points: u32) {
        self.spawn_write("acceptance", Some(Settled::Acceptance), move |recorder| async move {
            recorder.record_acceptance(dodge_count, points).await
        });
    }

    pub fn drain_settled(&self) -> Vec<Settled> {
        let Ok(mut rx) = self.settled_rx.lock() else {
            return Vec::new();
        };
        let mut settled = Vec::new();
        while let Ok(s) = rx.try_recv() {
            settled.push(s);
        }
        settled
    }

    fn spawn_write<F, Fut>(&self, label: &'static str, settled: Option<Settled>, write: F)
    where
        F: FnOnce(InteractionRecorder) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), StoreError>> + Send,
    {
        let slot = self.recorder.clone();
        let settled_tx = self.settled_tx.clone();
        self.runtime.spawn(async move {
            let recorder = slot.lock().await.clone();
            match recorder {
                Some(recorder) => {
                    if let Err(e) = write(recorder).await {
                        warn!("Failed to record {}: {}", label, e);
                    }
                }
                None => warn!("No document store, {} not recorded", label),
            }
            if let Some(settled) = settled {
                // Receiver gone means the page was torn down
                let _ = settled_tx.send(settled);
            }
        });
    }
}

pub struct PersistencePlugin;

impl Plugin for PersistencePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, connect_store);
    }
}

fn connect_store(persistence: Res<Persistence>, config: Res<StoreConfig>) {
    persistence.connect(config.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for(persistence: &Persistence, expected: usize) -> Vec<Settled> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut settled = Vec::new();
        while settled.len() < expected && Instant::now() < deadline {
            settled.extend(persistence.drain_settled());
            std::thread::sleep(Duration::from_millis(5));
        }
        settled
    }

    #[test]
    fn writes_before_connect_still_settle() {
        let persistence = Persistence::new(Runtime::new().unwrap());
        persistence.record_dodge(1, 0);
        persistence.record_acceptance(1, 0);

        let settled = wait_for(&persistence, 2);
        assert_eq!(settled.len(), 2);
        assert!(settled.contains(&Settled::Dodge));
        assert!(settled.contains(&Settled::Acceptance));
    }

    #[test]
    fn connect_without_database_resets_an_in_memory_session() {
        let persistence = Persistence::new(Runtime::new().unwrap());
        persistence.connect(StoreConfig::default());

        let deadline = Instant::now() + Duration::from_secs(5);
        let record = loop {
            let recorder = persistence.recorder.blocking_lock().clone();
            if let Some(recorder) = recorder {
                break persistence.runtime().block_on(recorder.interactions()).unwrap();
            }
            assert!(Instant::now() < deadline, "store never connected");
            std::thread::sleep(Duration::from_millis(5));
        };
        let record = record.unwrap();
        assert_eq!(record.dodge_count, 0);
        assert_eq!(record.points, 0);
        assert!(record.sessions.is_empty());
    }

    #[test]
    fn writes_issued_while_connecting_land_after_the_reset() {
        let persistence = Persistence::new(Runtime::new().unwrap());
        persistence.connect(StoreConfig::default());
        persistence.record_dodge(1, 0);

        assert_eq!(wait_for(&persistence, 1), vec![Settled::Dodge]);
        let recorder = persistence.recorder.blocking_lock().clone().unwrap();
        let record = persistence
            .runtime()
            .block_on(recorder.interactions())
            .unwrap()
            .unwrap();
        assert_eq!(record.dodge_count, 1);
        assert_eq!(record.sessions.len(), 1);
        assert_eq!(record.sessions[0].click_number, 1);
    }

    #[test]
    fn reward_writes_reach_the_store_without_settling() {
        let runtime = Runtime::new().unwrap();
        let recorder =
            InteractionRecorder::new(Arc::new(DocumentStore::Memory(MemoryStore::default())));
        let persistence = Persistence::with_recorder(runtime, recorder.clone());

        persistence.record_reward(7);

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let record = persistence.runtime().block_on(recorder.interactions()).unwrap();
            if record.is_some_and(|r| r.points == 7) {
                break;
            }
            assert!(Instant::now() < deadline, "reward never written");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(persistence.drain_settled().is_empty());
    }
}
