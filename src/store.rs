use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{LoadCause, SaveCause, StoreError};
use crate::persist::PersistQueue;
use crate::storage::KeyValueStore;
use crate::task::{Task, TaskDraft, TaskKey};

/// The single storage key the whole task list lives under.
pub const TASKS_KEY: &str = "tasks";

/// Immutable view of the task list at one point in time.
pub type Snapshot = Arc<[Task]>;

type Listener = Box<dyn Fn(&Snapshot)>;

/// In-memory task list mirrored wholesale to a [`KeyValueStore`].
///
/// Every effective mutation builds a new snapshot, queues it for saving
/// and then notifies subscribers. Mutations on unknown keys change nothing
/// and report `false`.
pub struct TaskStore {
    tasks: Snapshot,
    writer: PersistQueue,
    listeners: Vec<Listener>,
}

impl TaskStore {
    #[tracing::instrument(skip_all)]
    pub fn open(storage: Arc<dyn KeyValueStore>) -> Self {
        let tasks = load(storage.as_ref());
        info!(count = tasks.len(), "task store opened");
        Self {
            tasks,
            writer: PersistQueue::spawn(storage),
            listeners: Vec::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.tasks)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, key: &TaskKey) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.key == key)
    }

    pub fn subscribe(&mut self, listener: impl Fn(&Snapshot) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    #[tracing::instrument(skip_all, fields(title = %draft.title))]
    pub fn add(&mut self, draft: TaskDraft) -> TaskKey {
        let task = Task::new(draft);
        let key = task.key.clone();
        let next = self
            .tasks
            .iter()
            .cloned()
            .chain(std::iter::once(task))
            .collect();
        self.commit(next);
        info!(key = %key, "task added");
        key
    }

    #[tracing::instrument(skip(self, draft), fields(key = %key))]
    pub fn edit(&mut self, key: &TaskKey, draft: &TaskDraft) -> bool {
        self.update(key, |t| t.with_draft(draft))
    }

    #[tracing::instrument(skip(self), fields(key = %key))]
    pub fn delete(&mut self, key: &TaskKey) -> bool {
        if self.get(key).is_none() {
            debug!("delete on unknown key ignored");
            return false;
        }
        let next = self.tasks.iter().filter(|t| &t.key != key).cloned().collect();
        self.commit(next);
        true
    }

    #[tracing::instrument(skip(self), fields(key = %key))]
    pub fn toggle_complete(&mut self, key: &TaskKey) -> bool {
        self.update(key, Task::toggled)
    }

    #[tracing::instrument(skip(self), fields(key = %key))]
    pub fn postpone(&mut self, key: &TaskKey, now: DateTime<Utc>) -> bool {
        self.update(key, |t| t.postponed(now))
    }

    /// Queues the current list for an unconditional overwrite of the blob.
    pub fn persist(&self) {
        self.writer.push(self.snapshot());
    }

    pub fn flush(&self) {
        self.writer.flush();
    }

    fn update(&mut self, key: &TaskKey, f: impl Fn(&Task) -> Task) -> bool {
        if self.get(key).is_none() {
            debug!("update on unknown key ignored");
            return false;
        }
        let next = self
            .tasks
            .iter()
            .map(|t| if &t.key == key { f(t) } else { t.clone() })
            .collect();
        self.commit(next);
        true
    }

    fn commit(&mut self, next: Snapshot) {
        self.tasks = next;
        self.persist();
        for listener in &self.listeners {
            listener(&self.tasks);
        }
    }
}

/// Reads the stored list, degrading to an empty list on any failure.
pub fn load(storage: &dyn KeyValueStore) -> Snapshot {
    match read_tasks(storage) {
        Ok(tasks) => tasks.into(),
        Err(err) => {
            warn!(error = %err, "starting with an empty task list");
            Arc::from(Vec::new())
        }
    }
}

pub fn read_tasks(storage: &dyn KeyValueStore) -> Result<Vec<Task>, StoreError> {
    let raw = storage
        .get(TASKS_KEY)
        .map_err(|err| StoreError::Load(LoadCause::from(err)))?;
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => {
            let tasks: Vec<Task> = serde_json::from_str(&raw)
                .map_err(|err| StoreError::Load(LoadCause::from(err)))?;
            debug!(count = tasks.len(), "loaded tasks");
            Ok(tasks)
        }
    }
}

pub fn write_tasks(storage: &dyn KeyValueStore, tasks: &[Task]) -> Result<(), StoreError> {
    let raw =
        serde_json::to_string(tasks).map_err(|err| StoreError::Save(SaveCause::from(err)))?;
    storage
        .set(TASKS_KEY, &raw)
        .map_err(|err| StoreError::Save(SaveCause::from(err)))?;
    debug!(count = tasks.len(), bytes = raw.len(), "saved tasks");
    Ok(())
}
