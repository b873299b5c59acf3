//! Live status updates for a single job.
//!
//! A notifier task subscribes to the job's `updated` channel, emits the
//! caller's snapshot, then re-reads the job from the store each time a
//! publish arrives. Publish payloads are only wake-up signals; every emitted
//! snapshot comes from a fresh read.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use jobstatus_store::{ChannelSubscription, PubSub};

use crate::job::Job;
use crate::persistence::StatusPersistence;
use crate::status::JobStatus;

/// How long a notifier keeps listening after its first update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotifyMode {
    /// Emit the initial snapshot and the next update, then close.
    #[default]
    NextUpdate,
    /// Emit one snapshot per update until cancelled.
    Continuous,
}

/// Opens `StatusUpdates` sequences backed by a shared persistence.
#[derive(Clone)]
pub struct UpdateNotifier {
    persistence: StatusPersistence,
    mode: NotifyMode,
}

impl UpdateNotifier {
    pub fn new(persistence: StatusPersistence) -> Self {
        Self {
            persistence,
            mode: NotifyMode::default(),
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: NotifyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> NotifyMode {
        self.mode
    }

    /// Start watching `initial`'s job.
    ///
    /// The first element is `initial` itself, emitted once the subscription
    /// is live, so any write made after receiving it is observed. With
    /// `NotifyMode::NextUpdate` the second element is the job as re-read
    /// after the next publish, and the sequence then ends.
    ///
    /// Failures inside the background task (subscribe, receive, re-read) are
    /// logged and end the sequence; they are not surfaced to the consumer.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn open_channel(&self, initial: JobStatus) -> StatusUpdates {
        let (tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let job = initial.job();
        tracing::debug!(job_id = %job, mode = ?self.mode, "opening status update sequence");

        let handle = tokio::spawn(run_notifier(NotifierParams {
            persistence: self.persistence.clone(),
            initial,
            mode: self.mode,
            tx,
            token: token.clone(),
        }));

        StatusUpdates {
            job,
            rx,
            token,
            handle: Some(handle),
        }
    }
}

/// Consumer end of a notifier. Yields `JobStatus` snapshots, also as a
/// `Stream`. Dropping it cancels the background task.
pub struct StatusUpdates {
    job: Job,
    rx: mpsc::Receiver<JobStatus>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl StatusUpdates {
    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Next snapshot, or `None` once the sequence has ended.
    pub async fn recv(&mut self) -> Option<JobStatus> {
        self.rx.recv().await
    }

    /// Stop the background task. Snapshots already queued can still be
    /// received.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancel and wait for the background task to release its subscription.
    pub async fn close(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            tracing::error!(job_id = %self.job, error = %e, "status update task panicked");
        }
    }
}

impl Stream for StatusUpdates {
    type Item = JobStatus;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<JobStatus>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for StatusUpdates {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct NotifierParams {
    persistence: StatusPersistence,
    initial: JobStatus,
    mode: NotifyMode,
    tx: mpsc::Sender<JobStatus>,
    token: CancellationToken,
}

async fn run_notifier(params: NotifierParams) {
    let NotifierParams {
        persistence,
        initial,
        mode,
        tx,
        token,
    } = params;
    let job = initial.job();
    let channel = job.updated_channel();

    let subscribed = tokio::select! {
        () = token.cancelled() => return,
        result = persistence.store().subscribe(&channel) => result,
    };
    let mut subscription = match subscribed {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::error!(job_id = %job, %channel, error = %e, "failed to subscribe to status updates");
            return;
        }
    };

    if emit(&tx, &token, initial).await {
        watch(&persistence, &job, subscription.as_mut(), &tx, &token, mode).await;
    }

    if let Err(e) = subscription.unsubscribe().await {
        tracing::warn!(job_id = %job, %channel, error = %e, "failed to unsubscribe");
    }
    tracing::debug!(job_id = %job, "status update sequence closed");
}

/// Receive, re-read, emit. Returns when the sequence should close.
async fn watch(
    persistence: &StatusPersistence,
    job: &Job,
    subscription: &mut dyn ChannelSubscription,
    tx: &mpsc::Sender<JobStatus>,
    token: &CancellationToken,
    mode: NotifyMode,
) {
    loop {
        let received = tokio::select! {
            () = token.cancelled() => return,
            () = tx.closed() => return,
            result = subscription.receive_one() => result,
        };
        if let Err(e) = received {
            tracing::error!(job_id = %job, error = %e, "status update subscription failed");
            return;
        }

        let fresh = match persistence.read(job).await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(job_id = %job, error = %e, "failed to re-read job status");
                return;
            }
        };

        if !emit(tx, token, fresh).await || mode == NotifyMode::NextUpdate {
            return;
        }
    }
}

/// Send one snapshot, waiting for queue space. False if the consumer is gone.
async fn emit(tx: &mpsc::Sender<JobStatus>, token: &CancellationToken, status: JobStatus) -> bool {
    tokio::select! {
        () = token.cancelled() => false,
        sent = tx.send(status) => sent.is_ok(),
    }
}
