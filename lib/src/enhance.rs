use std::sync::mpsc;

use crate::error::Result;

/// Completion signal for a fire-and-forget enhancement task.
///
/// The pipeline never joins on these. Hosts that need the enhanced output
/// (snapshot tests, one-shot renderers) call [`wait`](TaskHandle::wait).
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    done: mpsc::Receiver<Result<()>>,
}

impl TaskHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Blocks until the task completes and returns its result.
    pub fn wait(self) -> Result<()> {
        self.done.recv().unwrap_or_else(|_| err! {
            "enhancement task exited without reporting",
            "task" => self.name,
        })
    }
}

/// Schedules `task` on the global thread pool and returns its completion
/// signal. Failures are logged here; the handle reports them as well for
/// callers that wait.
pub fn spawn<F>(name: &'static str, task: F) -> TaskHandle
    where F: FnOnce() -> Result<()> + Send + 'static
{
    let (tx, rx) = mpsc::channel();
    rayon::spawn(move || {
        let result = task();
        if let Err(e) = &result {
            tracing::warn!(task = name, "enhancement failed: {e}");
        }

        let _ = tx.send(result);
    });

    TaskHandle { name, done: rx }
}
