//! A database connection owned by a dedicated thread.
//!
//! SQLite calls block, for up to the busy timeout when another connection holds
//! the write lock. [`DbWorker`] keeps them off the async runtime: every call is
//! sent to the worker thread and its result awaited.

use std::path::Path;
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};

use tokio::sync::oneshot;

use crate::{Database, DbError};

type DbTask = Box<dyn FnOnce(&mut Database) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct WorkerInner {
    sender: mpsc::Sender<DbCommand>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WorkerInner {
    fn drop(&mut self) {
        let mut guard = match self.thread.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = guard.take() {
            if self.sender.send(DbCommand::Shutdown).is_err() {
                tracing::warn!("database worker already stopped");
            }
            if handle.join().is_err() {
                tracing::error!("database worker panicked");
            }
        }
    }
}

/// Handle to a [`Database`] living on its own thread.
///
/// Clones share the same connection; calls run one at a time in submission order.
#[derive(Clone)]
pub struct DbWorker {
    inner: Arc<WorkerInner>,
}

impl DbWorker {
    /// Opens the database at `path` on a new worker thread.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let path = path.to_path_buf();
        Self::spawn(move || Database::open(&path), "lb-db")
    }

    /// Opens an in-memory database on a new worker thread.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::spawn(Database::open_in_memory, "lb-db-memory")
    }

    fn spawn<F>(open: F, name: &str) -> Result<Self, DbError>
    where
        F: FnOnce() -> Result<Database, DbError> + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut db = match open() {
                    Ok(db) => {
                        if ready_tx.send(Ok(())).is_err() {
                            return;
                        }
                        db
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => task(&mut db),
                        DbCommand::Shutdown => break,
                    }
                }
                tracing::debug!("database worker shutting down");
            })
            .map_err(DbError::Spawn)?;

        ready_rx.recv().map_err(|_| DbError::WorkerStopped)??;

        Ok(Self {
            inner: Arc::new(WorkerInner {
                sender: command_tx,
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    /// Runs `task` against the database on the worker thread.
    pub async fn execute<F, T>(&self, task: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut Database) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command = DbCommand::Execute(Box::new(move |db| {
            if reply_tx.send(task(db)).is_err() {
                tracing::debug!("database caller went away before the reply");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|_| DbError::WorkerStopped)?;
        reply_rx.await.map_err(|_| DbError::WorkerStopped)?
    }
}
