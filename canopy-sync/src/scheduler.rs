//! Bounded worker pool that executes the plan.
//!
//! A producer feeds actions one at a time through a single-slot queue shared by
//! `jobs` workers. Each worker runs its action on the blocking pool and forwards
//! the event to one relay task that owns the reporter. A `Failed` event without
//! keep-going cancels the run: the producer stops enqueueing, workers stop
//! taking new actions, and actions already running finish and are reported.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::action::{Action, ActionExecutor, SyncOptions};
use crate::error::{io_err, SyncError};
use crate::event::{ActionEvent, EventKind, Reporter, RunSummary};

/// Execute `actions` and return the final tally.
///
/// The reporter sees `start`, then one `handle_event` per executed action, then
/// `finish` once every worker has exited.
pub async fn run<E: ActionExecutor>(
    actions: Vec<Action>,
    executor: Arc<E>,
    opts: SyncOptions,
    mut reporter: Box<dyn Reporter>,
) -> RunSummary {
    let total = actions.len();
    let workers = opts.worker_count();
    tracing::debug!(total, workers, "starting scheduler");

    let cancel = CancellationToken::new();
    let opts = Arc::new(opts);
    let (queue_tx, queue_rx) = mpsc::channel::<Action>(1);
    let queue_rx = Arc::new(Mutex::new(queue_rx));
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ActionEvent>();

    reporter.start(total);
    let relay = tokio::spawn(async move {
        let mut summary = RunSummary::new(total);
        while let Some(event) = event_rx.recv().await {
            summary.record(&event);
            reporter.handle_event(&event);
        }
        (reporter, summary)
    });

    let handles: Vec<_> = (0..workers)
        .map(|id| {
            tokio::spawn(worker(
                id,
                queue_rx.clone(),
                executor.clone(),
                opts.clone(),
                event_tx.clone(),
                cancel.clone(),
            ))
        })
        .collect();
    drop(event_tx);

    for action in actions {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = queue_tx.send(action) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    drop(queue_tx);

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "worker task failed");
        }
    }

    let (mut reporter, mut summary) = match relay.await {
        Ok(done) => done,
        Err(e) => {
            tracing::error!(error = %e, "reporter task failed");
            return RunSummary::new(total);
        }
    };
    summary.stopped_early = summary.executed() < total;
    reporter.finish(&summary);
    summary
}

async fn worker<E: ActionExecutor>(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Action>>>,
    executor: Arc<E>,
    opts: Arc<SyncOptions>,
    events: mpsc::UnboundedSender<ActionEvent>,
    cancel: CancellationToken,
) {
    loop {
        let next = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                action = rx.recv() => action,
            }
        };
        let Some(action) = next else { break };
        // Cancellation may have raced the dequeue; never start after it.
        if cancel.is_cancelled() {
            break;
        }

        let name = action.name().display().to_string();
        let exec = executor.clone();
        let run_opts = opts.clone();
        let event = tokio::task::spawn_blocking(move || exec.execute(&action, &run_opts))
            .await
            .unwrap_or_else(|e| {
                ActionEvent::new(EventKind::Failed, name, format!("action panicked: {e}"))
            });

        let stop = event.kind == EventKind::Failed && !opts.keep_going;
        if stop {
            tracing::debug!(worker = id, name = %event.name, "failure without keep-going; cancelling");
            cancel.cancel();
        }
        if events.send(event).is_err() || stop {
            break;
        }
    }
}

/// Run the scheduler on a fresh multi-threaded runtime, blocking the caller.
pub fn run_blocking<E: ActionExecutor>(
    actions: Vec<Action>,
    executor: Arc<E>,
    opts: SyncOptions,
    reporter: Box<dyn Reporter>,
) -> Result<RunSummary, SyncError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    Ok(runtime.block_on(run(actions, executor, opts, reporter)))
}
