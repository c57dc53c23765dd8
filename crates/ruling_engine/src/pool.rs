//! Bounded pool of browser sessions.
//!
//! At most `max_sessions` sessions are lent out at once; further borrowers
//! queue in FIFO order, and once `max_waiting` are queued new borrowers fail
//! fast. Sessions are validated on borrow, evicted when idle too long, and
//! returned on every exit path of the work that borrowed them.
use std::collections::VecDeque;
use std::future::Future;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use ruling_logging::{crawl_debug, crawl_info, crawl_warn};
use thiserror::Error;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::PoolConfig;
use crate::session::{SessionError, SessionFactory, SharedSession, WebSession};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("session pool saturated: {max_waiting} borrowers already waiting")]
    Capacity { max_waiting: usize },
    #[error("failed to create session: {0}")]
    Create(#[source] SessionError),
    #[error("session pool is draining")]
    Draining,
}

/// Point-in-time counters, mostly for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Sessions created and not yet destroyed.
    pub live: usize,
    pub idle: usize,
    pub borrowed: usize,
    pub waiting: usize,
}

struct IdleSession {
    session: SharedSession,
    since: Instant,
}

struct PoolInner {
    factory: Arc<dyn SessionFactory>,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<IdleSession>>,
    waiting: AtomicUsize,
    live: AtomicUsize,
    draining: AtomicBool,
    destroyed: Notify,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, VecDeque<IdleSession>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, idle: &IdleSession) -> bool {
        idle.since.elapsed() >= self.config.idle_timeout
    }

    async fn create(&self) -> Result<SharedSession, PoolError> {
        let session = self.factory.create().await.map_err(PoolError::Create)?;
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        crawl_debug!("session created ({live} live)");
        Ok(session)
    }

    async fn destroy(&self, session: SharedSession) {
        let mut closing = Closing {
            pool: self,
            session: Some(Arc::clone(&session)),
        };
        session.close().await;
        closing.session = None;
    }

    fn forget(&self) {
        let live = self.live.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        crawl_debug!("session destroyed ({live} live)");
        self.destroyed.notify_one();
    }

    /// Destroys without awaiting, for paths that cannot be async.
    fn destroy_detached(self: &Arc<Self>, session: SharedSession) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(self);
                handle.spawn(async move { inner.destroy(session).await });
            }
            Err(_) => {
                crawl_warn!("no runtime to close a returned session; dropping it");
                drop(session);
                self.forget();
            }
        }
    }

    fn should_discard(&self, session: &SharedSession) -> bool {
        self.draining.load(Ordering::SeqCst) || session.is_closed()
    }

    fn give_back(self: &Arc<Self>, session: SharedSession) {
        if self.should_discard(&session) {
            self.destroy_detached(session);
            return;
        }
        self.idle().push_back(IdleSession {
            session,
            since: Instant::now(),
        });
    }

    async fn evict_idle(&self) {
        let expired: Vec<SharedSession> = {
            let mut idle = self.idle();
            let (stale, fresh): (VecDeque<_>, VecDeque<_>) = idle
                .drain(..)
                .partition(|entry| self.is_expired(entry) || entry.session.is_closed());
            *idle = fresh;
            stale.into_iter().map(|entry| entry.session).collect()
        };
        if !expired.is_empty() {
            crawl_debug!("evicting {} idle sessions", expired.len());
        }
        for session in expired {
            self.destroy(session).await;
        }
    }
}

/// Forgets a session being destroyed even if the close is cancelled; an
/// interrupted close is finished in the background.
struct Closing<'a> {
    pool: &'a PoolInner,
    session: Option<SharedSession>,
}

impl Drop for Closing<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            crawl_debug!("session close interrupted; finishing it in the background");
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move { session.close().await });
            }
        }
        self.pool.forget();
    }
}

/// Decrements the waiting count however the wait ends.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct SessionPool {
    inner: Arc<PoolInner>,
    evictor: CancellationToken,
}

impl SessionPool {
    /// Creates the pool and starts its eviction sweep. Must run inside a tokio runtime.
    pub fn new(factory: Arc<dyn SessionFactory>, config: PoolConfig) -> Self {
        let max_sessions = config.session_limit();
        let interval = config.eviction_interval;
        let inner = Arc::new(PoolInner {
            factory,
            config,
            permits: Arc::new(Semaphore::new(max_sessions)),
            idle: Mutex::new(VecDeque::new()),
            waiting: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            draining: AtomicBool::new(false),
            destroyed: Notify::new(),
        });
        let evictor = CancellationToken::new();
        if !interval.is_zero() {
            tokio::spawn(run_evictor(Arc::downgrade(&inner), interval, evictor.clone()));
        }
        Self { inner, evictor }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn status(&self) -> PoolStatus {
        let max_sessions = self.inner.config.session_limit();
        PoolStatus {
            live: self.inner.live.load(Ordering::SeqCst),
            idle: self.inner.idle().len(),
            borrowed: max_sessions.saturating_sub(self.inner.permits.available_permits()),
            waiting: self.inner.waiting.load(Ordering::SeqCst),
        }
    }

    /// Borrows a validated session, waiting in FIFO order when all are lent out.
    pub async fn acquire(&self) -> Result<PooledSession, PoolError> {
        let permit = self.permit().await?;
        let session = loop {
            let candidate = self.inner.idle().pop_front();
            match candidate {
                Some(entry) if self.inner.is_expired(&entry) => {
                    crawl_debug!("idle session expired on borrow");
                    self.inner.destroy(entry.session).await;
                }
                Some(entry) if entry.session.is_closed() => {
                    crawl_debug!("idle session failed validation");
                    self.inner.destroy(entry.session).await;
                }
                Some(entry) => break entry.session,
                None => break self.inner.create().await?,
            }
        };
        Ok(PooledSession {
            session,
            pool: Arc::clone(&self.inner),
            returned: false,
            _permit: permit,
        })
    }

    async fn permit(&self) -> Result<OwnedSemaphorePermit, PoolError> {
        if self.inner.draining.load(Ordering::SeqCst) {
            return Err(PoolError::Draining);
        }
        match Arc::clone(&self.inner.permits).try_acquire_owned() {
            Ok(permit) => return Ok(permit),
            Err(TryAcquireError::Closed) => return Err(PoolError::Draining),
            Err(TryAcquireError::NoPermits) => {}
        }

        let max_waiting = self.inner.config.max_waiting;
        let queued = self.inner.waiting.fetch_add(1, Ordering::SeqCst);
        let _waiting = WaitingGuard(&self.inner.waiting);
        if queued >= max_waiting {
            return Err(PoolError::Capacity { max_waiting });
        }
        Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Draining)
    }

    /// Runs `work` with a borrowed session and returns the session afterwards.
    ///
    /// If `work` panics or its future is dropped, the guard still returns the
    /// session; a session that closed during the work is destroyed instead.
    pub async fn with_session<T, E, W, Fut>(&self, work: W) -> Result<T, E>
    where
        W: FnOnce(SharedSession) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<PoolError>,
    {
        let pooled = self.acquire().await?;
        let outcome = work(pooled.session()).await;
        pooled.release().await;
        outcome
    }

    /// Stops lending, waits for every borrowed session to come back, then
    /// destroys all sessions.
    pub async fn drain(&self) {
        if self.inner.draining.swap(true, Ordering::SeqCst) {
            return;
        }
        self.evictor.cancel();
        let max_sessions = u32::try_from(self.inner.config.session_limit()).unwrap_or(u32::MAX);
        match self.inner.permits.acquire_many(max_sessions).await {
            Ok(all) => all.forget(),
            Err(_) => crawl_warn!("pool semaphore closed before drain"),
        }
        self.inner.permits.close();

        let idle: Vec<SharedSession> = self.inner.idle().drain(..).map(|entry| entry.session).collect();
        for session in idle {
            self.inner.destroy(session).await;
        }
        while self.inner.live.load(Ordering::SeqCst) > 0 {
            self.inner.destroyed.notified().await;
        }
        crawl_info!("session pool drained");
    }
}

async fn run_evictor(pool: Weak<PoolInner>, every: std::time::Duration, stop: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = pool.upgrade() else { break };
                inner.evict_idle().await;
            }
        }
    }
}

impl Drop for SessionPool {
    fn drop(&mut self) {
        // Only the last handle stops the sweep; the evictor holds a weak reference.
        if Arc::strong_count(&self.inner) == 1 {
            self.evictor.cancel();
        }
    }
}

/// A borrowed session. Dereferences to the session and goes back to the
/// pool when dropped.
pub struct PooledSession {
    session: SharedSession,
    pool: Arc<PoolInner>,
    returned: bool,
    _permit: OwnedSemaphorePermit,
}

impl PooledSession {
    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    /// Returns the session, closing it first if it is no longer usable.
    pub async fn release(mut self) {
        self.returned = true;
        let session = Arc::clone(&self.session);
        if self.pool.should_discard(&session) {
            self.pool.destroy(session).await;
        } else {
            self.pool.give_back(session);
        }
    }
}

impl Deref for PooledSession {
    type Target = dyn WebSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        if !self.returned {
            self.pool.give_back(Arc::clone(&self.session));
        }
    }
}
