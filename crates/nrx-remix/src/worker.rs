//! Background workers
//!
//! Each accepted task goes to exactly one worker thread, which runs it to
//! a terminal state. Failures have already been recorded in the job store
//! by the orchestrator; the [`FailureSink`] lets the scheduling layer see
//! them too. A panicking collaborator fails its job and the worker moves
//! on to the next task.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{RemixError, RemixResult};
use crate::pipeline::{RemixOrchestrator, RemixTask};

/// Where the service hands accepted tasks
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, task: RemixTask) -> RemixResult<()>;
}

/// Called on the worker thread after a task fails
pub type FailureSink = Arc<dyn Fn(&RemixTask, &RemixError) + Send + Sync>;

/// Fixed pool of OS threads draining a task channel
pub struct WorkerPool {
    sender: Option<Sender<RemixTask>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start(
        orchestrator: Arc<RemixOrchestrator>,
        worker_count: usize,
        on_failure: Option<FailureSink>,
    ) -> RemixResult<Self> {
        let (sender, receiver) = unbounded::<RemixTask>();
        let mut workers = Vec::with_capacity(worker_count.max(1));

        for i in 0..worker_count.max(1) {
            let receiver = receiver.clone();
            let orchestrator = Arc::clone(&orchestrator);
            let on_failure = on_failure.clone();
            let handle = thread::Builder::new()
                .name(format!("nrx-worker-{}", i))
                .spawn(move || Self::worker_loop(receiver, orchestrator, on_failure))?;
            workers.push(handle);
        }

        log::info!("Started {} remix workers", workers.len());
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    fn worker_loop(
        receiver: Receiver<RemixTask>,
        orchestrator: Arc<RemixOrchestrator>,
        on_failure: Option<FailureSink>,
    ) {
        // Ends when every sender is dropped and the queue is drained
        for task in receiver.iter() {
            log::debug!("Picked up job {}", task.job_id);
            let error = match panic::catch_unwind(AssertUnwindSafe(|| orchestrator.run(&task))) {
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => e,
                Err(payload) => {
                    let e = RemixError::Pipeline(format!(
                        "worker panicked: {}",
                        panic_message(payload.as_ref())
                    ));
                    let message = format!("Error during remix: {}", e);
                    if let Err(store_err) = orchestrator.tracker().fail(&task.job_id, &message) {
                        log::error!(
                            "Job {}: could not record failure: {}",
                            task.job_id,
                            store_err
                        );
                    }
                    e
                }
            };

            if let Some(sink) = &on_failure {
                sink(&task, &error);
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting tasks, finish queued ones, join all workers
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("Remix worker panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

impl TaskQueue for WorkerPool {
    fn enqueue(&self, task: RemixTask) -> RemixResult<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| RemixError::Pipeline("worker pool is shut down".into()))?;
        sender
            .send(task)
            .map_err(|_| RemixError::Pipeline("worker pool is shut down".into()))
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let literal = panic::catch_unwind(|| panic!("static text")).unwrap_err();
        assert_eq!(panic_message(literal.as_ref()), "static text");

        let formatted = panic::catch_unwind(|| panic!("job {} broke", 7)).unwrap_err();
        assert_eq!(panic_message(formatted.as_ref()), "job 7 broke");

        let opaque = panic::catch_unwind(|| panic::panic_any(42_u8)).unwrap_err();
        assert_eq!(panic_message(opaque.as_ref()), "unknown panic");
    }
}
