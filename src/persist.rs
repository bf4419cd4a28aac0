use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, warn};

use crate::storage::KeyValueStore;
use crate::store::{write_tasks, Snapshot};

enum Command {
    Save(Snapshot),
    Flush(Sender<()>),
}

enum Mode {
    Threaded {
        tx: Option<Sender<Command>>,
        handle: Option<JoinHandle<()>>,
    },
    Inline(Arc<dyn KeyValueStore>),
}

/// Single in-flight write queue. Snapshots are written one at a time in
/// the order they were queued, so an older list never lands after a
/// newer one.
pub struct PersistQueue {
    mode: Mode,
}

impl PersistQueue {
    pub fn spawn(storage: Arc<dyn KeyValueStore>) -> Self {
        let (tx, rx) = mpsc::channel::<Command>();
        let worker_storage = Arc::clone(&storage);
        let spawn_res = thread::Builder::new()
            .name("tarefas-writer".to_owned())
            .spawn(move || {
                for command in rx {
                    match command {
                        Command::Save(snapshot) => save(worker_storage.as_ref(), &snapshot),
                        Command::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                debug!("writer queue closed");
            });

        match spawn_res {
            Ok(handle) => Self {
                mode: Mode::Threaded {
                    tx: Some(tx),
                    handle: Some(handle),
                },
            },
            Err(err) => {
                error!("failed to spawn writer thread, saving inline: {err}");
                Self {
                    mode: Mode::Inline(storage),
                }
            }
        }
    }

    pub fn push(&self, snapshot: Snapshot) {
        match &self.mode {
            Mode::Threaded { tx: Some(tx), .. } => {
                if tx.send(Command::Save(snapshot)).is_err() {
                    warn!("writer thread gone, tasks not saved");
                }
            }
            Mode::Threaded { tx: None, .. } => {}
            Mode::Inline(storage) => save(storage.as_ref(), &snapshot),
        }
    }

    /// Blocks until everything queued so far has been handed to storage.
    pub fn flush(&self) {
        if let Mode::Threaded { tx: Some(tx), .. } = &self.mode {
            let (done_tx, done_rx) = mpsc::channel();
            if tx.send(Command::Flush(done_tx)).is_ok() {
                let _ = done_rx.recv();
            }
        }
    }
}

impl Drop for PersistQueue {
    fn drop(&mut self) {
        if let Mode::Threaded { tx, handle } = &mut self.mode {
            drop(tx.take());
            if let Some(handle) = handle.take() {
                if handle.join().is_err() {
                    error!("writer thread panicked");
                }
            }
        }
    }
}

fn save(storage: &dyn KeyValueStore, snapshot: &Snapshot) {
    if let Err(err) = write_tasks(storage, snapshot) {
        warn!(error = %err, "save failed, stored tasks are stale until the next save");
    }
}
