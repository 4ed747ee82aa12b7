use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

/// Task for a selection worker.
pub(crate) struct SelectionTask<I, O> {
    /// The request to process.
    pub req: I,
    /// The response sender.
    pub resp_tx: oneshot::Sender<O>,
}

/// State shared by the request handlers.
pub(crate) struct SelectionState<I, O> {
    pub tx: mpsc::Sender<SelectionTask<I, O>>,
}

impl<I, O> Clone for SelectionState<I, O> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Function signature for processing selection tasks.
pub(crate) type ProcessFn<P, I, O> = dyn Fn(&P, I) -> O + Send + Sync;

/// Distributes selection tasks to worker tasks that process them using the provided function.
/// Tasks are handed out in arrival order to the first idle worker.
///
/// # Arguments
///
/// * `rx` - Receiver for incoming selection tasks.
/// * `pipeline` - The pipeline shared by all the workers.
/// * `num_workers` - The number of worker tasks to spawn.
/// * `process_fn` - The function that processes a selection task.
pub(crate) async fn task_distributor<P, I, O>(
    mut rx: mpsc::Receiver<SelectionTask<I, O>>,
    pipeline: Arc<P>,
    num_workers: usize,
    process_fn: Arc<ProcessFn<P, I, O>>,
) where
    P: Send + Sync + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    let num_workers = num_workers.max(1);
    tracing::info!("Starting task distributor with {} workers", num_workers);
    let mut workers = Vec::with_capacity(num_workers);
    let (worker_tx, mut worker_rx) = mpsc::channel(num_workers);

    for id in 0..num_workers {
        let handle = tokio::spawn(worker_loop(
            id,
            Arc::clone(&pipeline),
            worker_tx.clone(),
            Arc::clone(&process_fn),
        ));
        workers.push(handle);
    }
    drop(worker_tx);

    let mut pending: VecDeque<SelectionTask<I, O>> = VecDeque::new();
    let mut idle_workers: Vec<oneshot::Sender<SelectionTask<I, O>>> = Vec::new();

    loop {
        tokio::select! {
            task = rx.recv() => {
                match task {
                    Some(task) => match idle_workers.pop() {
                        Some(worker) => {
                            if worker.send(task).is_err() {
                                tracing::error!("Failed to send task to worker");
                            }
                        }
                        None => pending.push_back(task),
                    },
                    // Channel closed, no more tasks will be coming
                    None => break,
                }
            }
            worker = worker_rx.recv() => {
                match worker {
                    Some(worker) => match pending.pop_front() {
                        Some(task) => {
                            if worker.send(task).is_err() {
                                tracing::error!("Failed to send task to worker");
                            }
                        }
                        None => idle_workers.push(worker),
                    },
                    // All workers have exited
                    None => break,
                }
            }
        }
    }

    // Closing the idle workers' channels lets them exit.
    drop(idle_workers);
    drop(worker_rx);
    for worker in workers {
        if let Err(e) = worker.await {
            tracing::error!("Worker task failed: {}", e);
        }
    }
}

/// Worker task that processes selection tasks using the provided function.
///
/// # Arguments
///
/// * `id` - Worker task identifier.
/// * `pipeline` - The pipeline used to process the tasks.
/// * `worker_tx` - Sender used to tell the task distributor that the worker is idle.
/// * `process_fn` - The function that processes a selection task.
async fn worker_loop<P, I, O>(
    id: usize,
    pipeline: Arc<P>,
    worker_tx: mpsc::Sender<oneshot::Sender<SelectionTask<I, O>>>,
    process_fn: Arc<ProcessFn<P, I, O>>,
) {
    loop {
        let (task_tx, task_rx) = oneshot::channel();
        if worker_tx.send(task_tx).await.is_err() {
            break;
        }

        // The distributor drops the sender without a task when shutting down.
        let Ok(task) = task_rx.await else {
            break;
        };
        let result = process_fn(pipeline.as_ref(), task.req);
        if task.resp_tx.send(result).is_err() {
            tracing::error!("Worker {} failed to send response", id);
        }
    }

    tracing::debug!("Worker {} stopped", id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_task_distributor() {
        let (tx, rx) = mpsc::channel::<SelectionTask<usize, usize>>(8);
        let process_fn: Arc<ProcessFn<usize, usize, usize>> =
            Arc::new(|offset: &usize, req: usize| offset + req);
        let distributor = tokio::spawn(task_distributor(rx, Arc::new(100), 2, process_fn));

        let mut responses = Vec::new();
        for req in 0..5 {
            let (resp_tx, resp_rx) = oneshot::channel();
            tx.send(SelectionTask { req, resp_tx }).await.unwrap();
            responses.push(resp_rx);
        }

        for (req, resp_rx) in responses.into_iter().enumerate() {
            assert_eq!(resp_rx.await.unwrap(), 100 + req);
        }

        drop(tx);
        distributor.await.unwrap();
    }
}
