use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

/// Background thread with a cooperative termination channel.
#[derive(Debug)]
pub struct Worker {
    pub join_handle: JoinHandle<()>,
    pub terminate_worker_tx: Sender<()>,
    finished_rx: Receiver<()>,
}

pub fn run_worker<T: Send + 'static, F: FnOnce(T, Receiver<()>) + Send + 'static>(
    worker: F,
    params: T,
) -> Worker {
    let (terminate_worker_tx, terminate_worker_rx): (Sender<()>, Receiver<()>) =
        crossbeam_channel::unbounded();
    let (finished_tx, finished_rx): (Sender<()>, Receiver<()>) = crossbeam_channel::bounded(0);

    let join_handle = thread::spawn(move || {
        // Dropped when the worker returns or panics, which wakes `stop`.
        let _finished_tx = finished_tx;
        worker(params, terminate_worker_rx)
    });

    Worker {
        join_handle,
        terminate_worker_tx,
        finished_rx,
    }
}

impl Worker {
    /// Requests termination and waits up to `timeout` for the worker to exit.
    /// Returns false when the worker is still running after the timeout; the
    /// thread is then left detached.
    pub fn stop(self, timeout: Duration) -> bool {
        if self.terminate_worker_tx.send(()).is_err() {
            trace!("Worker has already dropped its termination channel");
        }

        match self.finished_rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => false,
            _ => {
                if self.join_handle.join().is_err() {
                    error!("Worker returned an error")
                }
                true
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.finished_rx.try_recv(),
            Err(crossbeam_channel::TryRecvError::Disconnected)
        )
    }
}

/// Sleeps for `duration` unless a termination request arrives first.
/// Returns true when termination was requested.
pub fn wait_or_terminate(terminate_worker_rx: &Receiver<()>, duration: Duration) -> bool {
    match terminate_worker_rx.recv_timeout(duration) {
        Ok(()) => true,
        Err(RecvTimeoutError::Disconnected) => {
            error!("Termination channel closed unexpectedly");
            true
        }
        Err(RecvTimeoutError::Timeout) => false,
    }
}
