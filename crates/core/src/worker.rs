use crate::error::{IndexError, WorkerError};
use crate::ingest::{IndexOutcome, Indexer};
use crate::traits::RecordStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, info};

#[derive(Debug)]
pub struct TaskCompletion {
    pub filename: String,
    pub result: Result<IndexOutcome, IndexError>,
}

type Completion = Box<dyn FnOnce(TaskCompletion) + Send + 'static>;

struct IndexTask {
    path: PathBuf,
    on_complete: Completion,
}

pub struct IndexWorker {
    sender: UnboundedSender<IndexTask>,
    handle: JoinHandle<()>,
}

impl IndexWorker {
    pub fn spawn<S>(indexer: Arc<Indexer<S>>) -> Self
    where
        S: RecordStore + 'static,
    {
        let (sender, mut receiver) = unbounded_channel::<IndexTask>();

        let handle = thread::spawn(move || {
            while let Some(task) = receiver.blocking_recv() {
                let filename = task
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| task.path.display().to_string());
                debug!(filename = %filename, "index task started");

                let result = indexer.index(&task.path);
                (task.on_complete)(TaskCompletion { filename, result });
            }
            info!("index worker stopped");
        });

        Self { sender, handle }
    }

    /// Queues `path`. `on_complete` runs on the worker thread once the task has finished.
    pub fn submit(
        &self,
        path: impl Into<PathBuf>,
        on_complete: impl FnOnce(TaskCompletion) + Send + 'static,
    ) -> Result<(), WorkerError> {
        self.sender
            .send(IndexTask {
                path: path.into(),
                on_complete: Box::new(on_complete),
            })
            .map_err(|_| WorkerError::Stopped)
    }

    pub fn shutdown(self) -> Result<(), WorkerError> {
        drop(self.sender);
        self.handle.join().map_err(|_| WorkerError::Stopped)
    }
}
