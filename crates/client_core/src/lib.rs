use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use async_trait::async_trait;
use shared::domain::{ContinuationToken, FormId, FormMethod, RegionName};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, trace, warn};

pub mod decode;
pub mod error;
pub mod render;
pub mod transport;

pub use decode::decode_snapshot;
pub use error::{DecodeError, PollError, TransportError};
pub use render::{Template, TemplateEngine, ViewRegion, ViewRegistry, ViewRenderer};
pub use transport::{HttpTransport, SnapshotTransport};

/// Delay between a settled poll and the next request.
pub const POLL_RESTART_DELAY: Duration = Duration::from_millis(100);

const SESSION_EVENT_CAPACITY: usize = 64;

/// A form captured at submit time, already serialized by the host.
#[derive(Debug, Clone)]
pub struct FormSubmission {
    pub form: FormId,
    pub method: FormMethod,
    pub action: String,
    pub fields: Vec<(String, String)>,
}

/// The document the client paints into. The host owns element lookup, HTML
/// injection and event delegation; submissions must be reported for any
/// descendant form, including ones inserted by a later render, because
/// region repaints replace form elements in place.
#[async_trait]
pub trait DocumentHost: Send + Sync {
    async fn region_html(&self, region: RegionName) -> String;
    async fn replace_region(&self, region: RegionName, markup: &str);
    async fn clear_text_inputs(&self, form: FormId);
    /// Let a submission proceed as a native navigation.
    async fn submit_natively(&self, submission: &FormSubmission);
    fn subscribe_submissions(&self) -> broadcast::Receiver<FormSubmission>;
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    SnapshotApplied { token: ContinuationToken },
    PollFailed(String),
    MutationCompleted { action: String },
    MutationFailed { action: String, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollPhase {
    Idle,
    Requesting,
}

struct PollSessionState {
    generation: u64,
    phase: PollPhase,
    driver: Option<JoinHandle<()>>,
    last_token: Option<ContinuationToken>,
}

/// Drives the fetch-render-reschedule cycle against one game resource.
///
/// At most one request is ever outstanding: `start` aborts the active driver
/// task and bumps the generation counter, and every completion path
/// re-checks the generation before rendering or rescheduling, so a
/// completion that races the abort is a no-op. The loop has no terminal
/// state; transient failures retry with the same continuation token,
/// indefinitely and without backoff.
pub struct PollSession {
    transport: Arc<dyn SnapshotTransport>,
    renderer: Arc<ViewRenderer>,
    inner: Mutex<PollSessionState>,
    events: broadcast::Sender<SessionEvent>,
    restart_delay: Duration,
}

impl PollSession {
    pub fn new(transport: Arc<dyn SnapshotTransport>, renderer: Arc<ViewRenderer>) -> Arc<Self> {
        Self::with_restart_delay(transport, renderer, POLL_RESTART_DELAY)
    }

    pub fn with_restart_delay(
        transport: Arc<dyn SnapshotTransport>,
        renderer: Arc<ViewRenderer>,
        restart_delay: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Arc::new(Self {
            transport,
            renderer,
            inner: Mutex::new(PollSessionState {
                generation: 0,
                phase: PollPhase::Idle,
                driver: None,
                last_token: None,
            }),
            events,
            restart_delay,
        })
    }

    /// Begin (or restart) the loop. A pending request, if any, is aborted
    /// first; its completion will not render and will not reschedule.
    /// No token requests the initial snapshot.
    pub async fn start(self: &Arc<Self>, token: Option<ContinuationToken>) {
        let mut inner = self.inner.lock().await;
        if let Some(active) = inner.driver.take() {
            active.abort();
        }
        inner.generation += 1;
        inner.phase = PollPhase::Requesting;
        inner.last_token = token;

        let generation = inner.generation;
        let session = Arc::clone(self);
        inner.driver = Some(tokio::spawn(async move {
            session.drive(generation, token).await;
        }));
    }

    /// Discard continuity and re-fetch the initial snapshot.
    pub async fn force_refresh(self: &Arc<Self>) {
        info!("poll: full resynchronization requested");
        self.start(None).await;
    }

    /// Stop the loop and return to idle. Used when the application root is
    /// disposed; the session can be started again afterwards.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(active) = inner.driver.take() {
            active.abort();
        }
        inner.generation += 1;
        inner.phase = PollPhase::Idle;
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn drive(
        self: Arc<Self>,
        generation: u64,
        token: Option<ContinuationToken>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let next_token = match self.poll_once(generation, token).await {
                Ok(Some(snapshot)) => {
                    let next = snapshot.id;
                    if let Err(err) = self.renderer.apply_snapshot(&snapshot).await {
                        warn!(token = next.0, "poll: render failed: {err}");
                    }
                    self.publish(SessionEvent::SnapshotApplied { token: next });
                    Some(next)
                }
                Ok(None) => {
                    trace!("poll: empty body, state unchanged");
                    token
                }
                Err(PollError::Aborted) => return,
                Err(err) => {
                    warn!("poll: {err}; retrying with same token");
                    self.publish(SessionEvent::PollFailed(err.to_string()));
                    token
                }
            };

            if !self.settle(generation, next_token).await {
                return;
            }
            tokio::time::sleep(self.restart_delay).await;
            self.restart(generation, next_token).await;
        })
    }

    async fn poll_once(
        &self,
        generation: u64,
        token: Option<ContinuationToken>,
    ) -> Result<Option<shared::protocol::StateSnapshot>, PollError> {
        let outcome = self.transport.fetch_state(token).await;
        // The transport's abort is best-effort; a completion that arrives
        // after this handle was superseded must not act.
        if !self.is_current(generation).await {
            return Err(PollError::Aborted);
        }
        let body = outcome.map_err(PollError::Transport)?;
        Ok(decode_snapshot(&body)?)
    }

    async fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().await.generation == generation
    }

    /// Requesting -> Idle(scheduled). False if this handle was superseded.
    async fn settle(&self, generation: u64, token: Option<ContinuationToken>) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            return false;
        }
        inner.phase = PollPhase::Idle;
        inner.last_token = token;
        true
    }

    async fn restart(self: &Arc<Self>, generation: u64, token: Option<ContinuationToken>) {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            return;
        }
        inner.generation += 1;
        inner.phase = PollPhase::Requesting;

        let next_generation = inner.generation;
        let session = Arc::clone(self);
        inner.driver = Some(tokio::spawn(async move {
            session.drive(next_generation, token).await;
        }));
    }
}

/// Intercepts form submissions so mutations go over the wire instead of
/// navigating, then resynchronizes the view through the session.
pub struct FormInterceptor {
    listener: JoinHandle<()>,
}

impl FormInterceptor {
    /// Subscribe once at the application root. The listener lives until
    /// [`FormInterceptor::detach`] or drop.
    pub fn attach(
        document: Arc<dyn DocumentHost>,
        transport: Arc<dyn SnapshotTransport>,
        session: Arc<PollSession>,
    ) -> Self {
        let mut submissions = document.subscribe_submissions();
        let listener = tokio::spawn(async move {
            while let Ok(submission) = submissions.recv().await {
                Self::handle_submission(&document, &transport, &session, submission).await;
            }
        });
        Self { listener }
    }

    async fn handle_submission(
        document: &Arc<dyn DocumentHost>,
        transport: &Arc<dyn SnapshotTransport>,
        session: &Arc<PollSession>,
        submission: FormSubmission,
    ) {
        if submission.method != FormMethod::Post {
            document.submit_natively(&submission).await;
            return;
        }

        match transport
            .submit_form(&submission.action, &submission.fields)
            .await
        {
            Ok(()) => {
                info!(action = %submission.action, "form: mutation applied, resynchronizing");
                document.clear_text_inputs(submission.form).await;
                session.publish(SessionEvent::MutationCompleted {
                    action: submission.action.clone(),
                });
                session.force_refresh().await;
            }
            Err(err) => {
                // The form stays populated and the poll loop is untouched.
                debug!(action = %submission.action, "form: mutation failed: {err}");
                session.publish(SessionEvent::MutationFailed {
                    action: submission.action.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    pub fn detach(self) {
        self.listener.abort();
    }
}

impl Drop for FormInterceptor {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
