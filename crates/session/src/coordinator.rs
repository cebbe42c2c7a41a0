use std::sync::{Arc, Weak};

use content::PreviewPayload;
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::transport::{OwnershipResponse, PreviewTransport, StartResponse};
use crate::{ConfigError, PreviewConfig, SessionError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Inactive,
    Initializing,
    Active,
    Expired,
}

/// Whether the host application is visible to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostVisibility {
    #[default]
    Foreground,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started { session_id: String },
    /// The server no longer recognizes this client as the display owner.
    Expired { session_id: String, reason: String },
    Stopped,
}

type PendingStart = Shared<BoxFuture<'static, Result<(), SessionError>>>;

enum Phase {
    Inactive,
    Initializing { pending: PendingStart },
    Active { session_id: String, keep_alive: JoinHandle<()> },
    Expired,
}

struct Inner {
    phase: Phase,
    /// Bumped on every teardown; work started under an older epoch is discarded.
    epoch: u64,
    current_payload: Option<PreviewPayload>,
    pending_update: Option<PreviewPayload>,
    debounce: Option<JoinHandle<()>>,
    visibility: HostVisibility,
}

struct SharedState<T> {
    transport: T,
    config: PreviewConfig,
    inner: Mutex<Inner>,
    subscribers: Mutex<Vec<Sender<SessionEvent>>>,
}

impl<T> SharedState<T> {
    fn is_current(&self, epoch: u64) -> bool {
        let inner = self.inner.lock();
        inner.epoch == epoch && matches!(inner.phase, Phase::Active { .. })
    }
}

/// Owns the one live preview session of this process.
///
/// Cloning yields another handle to the same session, which is how every
/// open editor shares it. Timers and requests run as tokio tasks, so all
/// methods must be called from within a runtime.
pub struct PreviewSessionCoordinator<T: PreviewTransport> {
    shared: Arc<SharedState<T>>,
}

impl<T: PreviewTransport> Clone for PreviewSessionCoordinator<T> {
    fn clone(&self) -> Self { Self { shared: self.shared.clone() } }
}

impl<T: PreviewTransport> PreviewSessionCoordinator<T> {
    pub fn new(transport: T, config: PreviewConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let inner = Inner {
            phase: Phase::Inactive,
            epoch: 0,
            current_payload: None,
            pending_update: None,
            debounce: None,
            visibility: HostVisibility::Foreground,
        };
        let shared = SharedState { transport, config, inner: Mutex::new(inner), subscribers: Mutex::new(Vec::new()) };
        Ok(Self { shared: Arc::new(shared) })
    }

    pub fn transport(&self) -> &T { &self.shared.transport }

    pub fn config(&self) -> &PreviewConfig { &self.shared.config }

    pub fn state(&self) -> SessionState {
        match self.shared.inner.lock().phase {
            Phase::Inactive => SessionState::Inactive,
            Phase::Initializing { .. } => SessionState::Initializing,
            Phase::Active { .. } => SessionState::Active,
            Phase::Expired => SessionState::Expired,
        }
    }

    pub fn session_id(&self) -> Option<String> {
        match &self.shared.inner.lock().phase {
            Phase::Active { session_id, .. } => Some(session_id.clone()),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool { self.state() == SessionState::Active }

    /// New receiver for session lifecycle events.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = unbounded();
        self.shared.subscribers.lock().push(tx);
        rx
    }

    fn emit(&self, event: SessionEvent) {
        self.shared.subscribers.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Acquires the display unless this process already holds it. Concurrent
    /// callers share a single start request.
    pub async fn ensure_started(&self, payload: &PreviewPayload) -> Result<(), SessionError> {
        let pending = {
            let mut inner = self.shared.inner.lock();
            match &inner.phase {
                Phase::Active { .. } => return Ok(()),
                Phase::Initializing { pending } => {
                    debug!("preview start already in flight, joining it");
                    pending.clone()
                }
                Phase::Inactive | Phase::Expired => {
                    let task = tokio::spawn(self.clone().start_session(payload.clone(), inner.epoch));
                    let pending = async move {
                        match task.await {
                            Ok(result) => result,
                            Err(err) => Err(SessionError::Transport(format!("start task failed: {err}"))),
                        }
                    }
                    .boxed()
                    .shared();
                    inner.phase = Phase::Initializing { pending: pending.clone() };
                    inner.current_payload = Some(payload.clone());
                    pending
                }
            }
        };
        pending.await
    }

    async fn start_session(self, payload: PreviewPayload, epoch: u64) -> Result<(), SessionError> {
        info!("starting preview session");
        let result = self.shared.transport.start(&payload).await;

        let mut inner = self.shared.inner.lock();
        let wanted = inner.epoch == epoch && matches!(inner.phase, Phase::Initializing { .. });
        match result {
            Ok(StartResponse { session_id }) if wanted => {
                let keep_alive = self.spawn_keep_alive(session_id.clone(), epoch);
                inner.phase = Phase::Active { session_id: session_id.clone(), keep_alive };
                drop(inner);
                info!(%session_id, "preview session active");
                self.emit(SessionEvent::Started { session_id });
                Ok(())
            }
            Ok(StartResponse { session_id }) => {
                drop(inner);
                warn!(%session_id, "preview session granted after stop, releasing it");
                let this = self.clone();
                tokio::spawn(async move { this.release(session_id).await });
                Err(SessionError::Stopped)
            }
            Err(err) => {
                if wanted { inner.phase = Phase::Inactive; }
                drop(inner);
                match err {
                    TransportError::Conflict => {
                        warn!("preview display is in use by another client");
                        Err(SessionError::InUseElsewhere)
                    }
                    other => {
                        warn!(error = %other, "failed to start preview session");
                        Err(SessionError::Transport(other.to_string()))
                    }
                }
            }
        }
    }

    fn spawn_keep_alive(&self, session_id: String, epoch: u64) -> JoinHandle<()> {
        let weak: Weak<SharedState<T>> = Arc::downgrade(&self.shared);
        let period = self.shared.config.keep_alive_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut missed: u32 = 0;
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else { break };
                if !shared.is_current(epoch) { break; }
                match shared.transport.ping(&session_id).await {
                    Ok(()) => {
                        if missed > 0 { debug!(%session_id, missed, "preview keep-alive recovered"); }
                        missed = 0;
                    }
                    // the server drops the session after consecutive misses; one failure is not fatal here
                    Err(err) => {
                        missed += 1;
                        warn!(%session_id, missed, error = %err, "preview keep-alive failed");
                    }
                }
            }
        })
    }

    /// Sends `payload` now. Does nothing unless a session is active.
    pub async fn update(&self, payload: &PreviewPayload) -> Result<(), SessionError> {
        let (session_id, epoch) = {
            let mut inner = self.shared.inner.lock();
            let session_id = match &inner.phase {
                Phase::Active { session_id, .. } => session_id.clone(),
                _ => return Ok(()),
            };
            // a queued debounced payload is older than this one
            if let Some(timer) = inner.debounce.take() { timer.abort(); }
            inner.pending_update = None;
            inner.current_payload = Some(payload.clone());
            (session_id, inner.epoch)
        };
        self.send(payload, &session_id, epoch).await
    }

    /// Queues `payload`, replacing whatever is queued, and (re)starts the
    /// quiescence timer. Does nothing unless a session is active.
    pub fn debounced_update(&self, payload: PreviewPayload) {
        let mut inner = self.shared.inner.lock();
        if !matches!(inner.phase, Phase::Active { .. }) { return; }
        inner.current_payload = Some(payload.clone());
        if inner.pending_update.replace(payload).is_some() { trace!("coalesced preview update"); }
        if let Some(timer) = inner.debounce.take() { timer.abort(); }

        let this = self.clone();
        let window = self.shared.config.debounce();
        let epoch = inner.epoch;
        inner.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Err(err) = this.flush_pending(epoch).await {
                debug!(error = %err, "debounced preview update failed");
            }
        }));
    }

    /// Sends the queued debounced payload immediately, if any.
    pub async fn flush(&self) -> Result<(), SessionError> {
        let epoch = {
            let mut inner = self.shared.inner.lock();
            if let Some(timer) = inner.debounce.take() { timer.abort(); }
            inner.epoch
        };
        self.flush_pending(epoch).await
    }

    async fn flush_pending(&self, epoch: u64) -> Result<(), SessionError> {
        let (payload, session_id) = {
            let mut inner = self.shared.inner.lock();
            if inner.epoch != epoch { return Ok(()); }
            // detach: once sending, a newer debounced call must not abort this request
            inner.debounce = None;
            let session_id = match &inner.phase {
                Phase::Active { session_id, .. } => session_id.clone(),
                _ => return Ok(()),
            };
            let Some(payload) = inner.pending_update.take() else { return Ok(()) };
            (payload, session_id)
        };
        self.send(&payload, &session_id, epoch).await
    }

    async fn send(&self, payload: &PreviewPayload, session_id: &str, epoch: u64) -> Result<(), SessionError> {
        match self.shared.transport.update(payload, session_id).await {
            Ok(_) => {
                trace!(session_id, "preview updated");
                Ok(())
            }
            Err(err @ (TransportError::Conflict | TransportError::NotFound)) => {
                let lost = match err {
                    TransportError::Conflict => SessionError::InUseElsewhere,
                    _ => SessionError::SessionLost,
                };
                if self.expire(epoch, &err.to_string()) { Err(lost) } else { Err(SessionError::Stopped) }
            }
            Err(err) => {
                warn!(session_id, error = %err, "preview update failed");
                Err(SessionError::Transport(err.to_string()))
            }
        }
    }

    /// Moves an active session of `epoch` to `Expired`. Returns false when
    /// the session was already torn down or replaced.
    fn expire(&self, epoch: u64, reason: &str) -> bool {
        let session_id = {
            let mut inner = self.shared.inner.lock();
            if inner.epoch != epoch || !matches!(inner.phase, Phase::Active { .. }) { return false; }
            let Phase::Active { session_id, keep_alive } = std::mem::replace(&mut inner.phase, Phase::Expired) else {
                return false;
            };
            keep_alive.abort();
            inner.epoch += 1;
            if let Some(timer) = inner.debounce.take() { timer.abort(); }
            inner.pending_update = None;
            session_id
        };
        warn!(%session_id, reason, "preview session expired");
        self.emit(SessionEvent::Expired { session_id, reason: reason.to_string() });
        true
    }

    /// Checks with the server that this client still owns the display after
    /// the host was in the background. Never recovers silently: a lost
    /// session becomes `Expired` and is reported through [`SessionEvent`].
    pub async fn revalidate_on_foreground(&self) {
        let (session_id, epoch) = {
            let inner = self.shared.inner.lock();
            match &inner.phase {
                Phase::Active { session_id, .. } => (session_id.clone(), inner.epoch),
                _ => return,
            }
        };

        match self.shared.transport.check_ownership(&session_id).await {
            Ok(OwnershipResponse { is_owner: true }) => {
                let payload = {
                    let mut inner = self.shared.inner.lock();
                    if inner.epoch != epoch { return; }
                    if let Some(timer) = inner.debounce.take() { timer.abort(); }
                    inner.pending_update = None;
                    let restarted = self.spawn_keep_alive(session_id.clone(), epoch);
                    if let Phase::Active { keep_alive, .. } = &mut inner.phase {
                        std::mem::replace(keep_alive, restarted).abort();
                    } else {
                        restarted.abort();
                    }
                    inner.current_payload.clone()
                };
                info!(%session_id, "preview ownership confirmed after foreground");
                if let Some(payload) = payload {
                    if let Err(err) = self.send(&payload, &session_id, epoch).await {
                        warn!(%session_id, error = %err, "failed to resend preview after foreground");
                    }
                }
            }
            Ok(_) => {
                self.expire(epoch, "display ownership lost while in background");
            }
            Err(err) => warn!(%session_id, error = %err, "could not verify preview ownership"),
        }
    }

    /// Host visibility signal. Returning to the foreground re-validates the session.
    pub async fn on_visibility_change(&self, visibility: HostVisibility) {
        let previous = std::mem::replace(&mut self.shared.inner.lock().visibility, visibility);
        match (previous, visibility) {
            (HostVisibility::Background, HostVisibility::Foreground) => self.revalidate_on_foreground().await,
            (_, HostVisibility::Background) => debug!("host moved to background"),
            _ => {}
        }
    }

    /// Tears the session down. Timers are cancelled and the state is
    /// `Inactive` before this returns; releasing the session on the server
    /// happens on the returned task, which callers may await or drop.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let (was_idle, session_id) = {
            let mut inner = self.shared.inner.lock();
            inner.epoch += 1;
            if let Some(timer) = inner.debounce.take() { timer.abort(); }
            inner.pending_update = None;
            inner.current_payload = None;
            match std::mem::replace(&mut inner.phase, Phase::Inactive) {
                Phase::Active { session_id, keep_alive } => {
                    keep_alive.abort();
                    (false, Some(session_id))
                }
                Phase::Initializing { .. } => (false, None),
                Phase::Expired => (false, None),
                Phase::Inactive => (true, None),
            }
        };
        if !was_idle { self.emit(SessionEvent::Stopped); }

        let session_id = session_id?;
        info!(%session_id, "stopping preview session");
        let this = self.clone();
        Some(tokio::spawn(async move { this.release(session_id).await }))
    }

    async fn release(&self, session_id: String) {
        if let Err(err) = self.shared.transport.stop(&session_id).await {
            warn!(%session_id, error = %err, "failed to release preview session");
        }
    }
}
