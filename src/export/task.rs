//! Export tasks running on worker threads
//!
//! Submitting a job registers a task and starts it on its own thread. The
//! returned handle can be polled with `status` or blocked on with `wait`.

use log::{error, info};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::composite::ClassStatistics;
use crate::coordinate::GeoGrid;
use crate::errors::{PipelineError, PipelineResult};

/// Lifecycle of an export task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// What a completed export produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub description: String,
    pub path: PathBuf,
    pub grid: GeoGrid,
    pub is_big_tiff: bool,
    pub stats: Option<ClassStatistics>,
    pub stats_path: Option<PathBuf>,
}

struct TaskSlot {
    state: TaskState,
    result: Option<Result<ExportOutcome, String>>,
}

struct TaskShared {
    id: usize,
    description: String,
    slot: Mutex<TaskSlot>,
    changed: Condvar,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskShared {
    fn lock(&self) -> MutexGuard<'_, TaskSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: TaskState) {
        self.lock().state = state;
        self.changed.notify_all();
    }

    fn finish(&self, result: Result<ExportOutcome, String>) {
        let mut slot = self.lock();
        slot.state = if result.is_ok() { TaskState::Completed } else { TaskState::Failed };
        slot.result = Some(result);
        drop(slot);
        self.changed.notify_all();
    }
}

/// Caller-side view of a submitted task
#[derive(Clone)]
pub struct TaskHandle {
    shared: Arc<TaskShared>,
}

impl TaskHandle {
    pub fn id(&self) -> usize {
        self.shared.id
    }

    pub fn description(&self) -> &str {
        &self.shared.description
    }

    /// Current state, without blocking
    pub fn status(&self) -> TaskState {
        self.shared.lock().state
    }

    /// Blocks until the task has finished and returns its result
    pub fn wait(&self) -> PipelineResult<ExportOutcome> {
        let mut slot = self.shared.lock();
        while !slot.state.is_finished() {
            slot = self
                .shared
                .changed
                .wait(slot)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        let result = slot.result.clone();
        drop(slot);

        let worker = self
            .shared
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }

        match result {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(PipelineError::Export(format!("{}: {}", self.shared.description, message))),
            None => Err(PipelineError::Export(format!("{}: finished without a result", self.shared.description))),
        }
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.shared.id)
            .field("description", &self.shared.description)
            .field("state", &self.status())
            .finish()
    }
}

/// Registry of submitted export tasks
#[derive(Default)]
pub struct TaskManager {
    tasks: Vec<TaskHandle>,
}

impl TaskManager {
    pub fn new() -> Self {
        TaskManager { tasks: Vec::new() }
    }

    /// Registers `job` and starts it on a new thread
    ///
    /// # Arguments
    /// * `description` - Task name shown in logs and on the handle
    /// * `job` - Work to run; its error or panic marks the task failed
    ///
    /// # Returns
    /// The task's handle, or an I/O error if the thread cannot be spawned
    pub fn submit<F>(&mut self, description: &str, job: F) -> PipelineResult<TaskHandle>
    where
        F: FnOnce() -> PipelineResult<ExportOutcome> + Send + 'static,
    {
        let shared = Arc::new(TaskShared {
            id: self.tasks.len() + 1,
            description: description.to_string(),
            slot: Mutex::new(TaskSlot { state: TaskState::Ready, result: None }),
            changed: Condvar::new(),
            worker: Mutex::new(None),
        });

        let task = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(format!("export-{}", shared.id))
            .spawn(move || {
                task.set_state(TaskState::Running);
                info!("Export task #{} '{}' started", task.id, task.description);

                let result = match catch_unwind(AssertUnwindSafe(job)) {
                    Ok(Ok(outcome)) => Ok(outcome),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("export worker panicked".to_string()),
                };
                match &result {
                    Ok(outcome) => info!("Export task #{} '{}' completed: {}", task.id, task.description, outcome.path.display()),
                    Err(message) => error!("Export task #{} '{}' failed: {}", task.id, task.description, message),
                }
                task.finish(result);
            })?;

        *shared.worker.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(worker);

        let handle = TaskHandle { shared };
        self.tasks.push(handle.clone());
        Ok(handle)
    }

    pub fn tasks(&self) -> &[TaskHandle] {
        &self.tasks
    }

    /// Waits for every task, in submission order
    pub fn wait_all(&self) -> Vec<PipelineResult<ExportOutcome>> {
        self.tasks.iter().map(TaskHandle::wait).collect()
    }
}
