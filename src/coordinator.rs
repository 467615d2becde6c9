//! The single owner of [`AppModel`].
//!
//! Actions arrive on an mpsc channel, effects run as detached tokio tasks and
//! report back on the same channel, and every processed message publishes a
//! fresh [`Snapshot`] on a watch channel.

use crate::api::MapBackend;
use crate::dataset::Dataset;
use crate::selection::{Action, AppModel, Effect, Msg};
use crate::view::{compose, ViewModel};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};

const CHANNEL_CAPACITY: usize = 64;

/// What readers see: the composed view plus the dataset it was built from.
#[derive(Debug)]
pub struct Snapshot {
    pub view: ViewModel,
    pub dataset: Arc<Dataset>,
}

impl Snapshot {
    pub fn of(model: &AppModel) -> Self {
        Self {
            view: compose(model),
            dataset: Arc::clone(&model.dataset),
        }
    }
}

#[derive(Error, Debug)]
#[error("coordinator has shut down")]
pub struct CoordinatorClosed;

#[derive(Clone)]
pub struct CoordinatorHandle {
    actions: mpsc::Sender<Msg>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
}

impl CoordinatorHandle {
    pub async fn dispatch(&self, action: Action) -> Result<(), CoordinatorClosed> {
        self.actions
            .send(Msg::Action(action))
            .await
            .map_err(|_| CoordinatorClosed)
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }

    /// Waits for the first snapshot satisfying `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<Arc<Snapshot>, CoordinatorClosed>
    where
        F: FnMut(&Snapshot) -> bool,
    {
        let mut rx = self.subscribe();
        let snapshot = rx
            .wait_for(|s| predicate(&**s))
            .await
            .map_err(|_| CoordinatorClosed)?;
        Ok(Arc::clone(&snapshot))
    }

    pub async fn wait_until_loaded(&self) -> Result<Arc<Snapshot>, CoordinatorClosed> {
        self.wait_for(|s| !s.view.loading).await
    }
}

struct Coordinator {
    model: AppModel,
    backend: Arc<dyn MapBackend>,
    inbox: mpsc::Receiver<Msg>,
    // Weak so the loop ends once every handle is dropped.
    outbox: mpsc::WeakSender<Msg>,
    snapshots: watch::Sender<Arc<Snapshot>>,
}

/// Starts the coordinator task and kicks off the initial dataset load.
pub fn spawn(backend: Arc<dyn MapBackend>) -> CoordinatorHandle {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let model = AppModel::new();
    let (snap_tx, snap_rx) = watch::channel(Arc::new(Snapshot::of(&model)));

    let coordinator = Coordinator {
        model,
        backend,
        inbox: rx,
        outbox: tx.downgrade(),
        snapshots: snap_tx,
    };
    tokio::spawn(coordinator.run());

    CoordinatorHandle {
        actions: tx,
        snapshots: snap_rx,
    }
}

impl Coordinator {
    async fn run(mut self) {
        self.handle(Msg::Action(Action::Reload));
        while let Some(msg) = self.inbox.recv().await {
            self.handle(msg);
        }
        debug!("Coordinator stopped");
    }

    fn handle(&mut self, msg: Msg) {
        let effects = self.model.update(msg);
        self.snapshots.send_replace(Arc::new(Snapshot::of(&self.model)));
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Effects are fire-and-forget; their results come back as messages.
    fn execute(&self, effect: Effect) {
        let Some(outbox) = self.outbox.upgrade() else {
            return;
        };
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            let msg = run_effect(backend.as_ref(), effect).await;
            if outbox.send(msg).await.is_err() {
                debug!("Dropping effect result; coordinator has shut down");
            }
        });
    }
}

async fn run_effect(backend: &dyn MapBackend, effect: Effect) -> Msg {
    match effect {
        Effect::LoadDataset => {
            let (schools, districts) = tokio::join!(backend.schools(), backend.districts());
            let schools = schools.unwrap_or_else(|e| {
                error!("Error fetching schools: {}", e);
                Vec::new()
            });
            let districts = districts.unwrap_or_else(|e| {
                error!("Error fetching districts: {}", e);
                Vec::new()
            });
            Msg::DatasetLoaded(Dataset::new(schools, districts))
        }
        Effect::FetchDistrictStats { seq, district_id } => {
            let stats = match backend.district_stats(&district_id).await {
                Ok(stats) => Some(stats),
                Err(e) => {
                    error!("Error fetching district stats for {}: {}", district_id, e);
                    None
                }
            };
            Msg::DistrictStatsLoaded {
                seq,
                district_id,
                stats,
            }
        }
        Effect::CreateSchool(new) => {
            Msg::SchoolCreated(backend.create_school(&new).await.map_err(|e| e.to_string()))
        }
    }
}
