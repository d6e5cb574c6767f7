//! Periodic session renewal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use vitrine_session::{RefreshedSession, SessionError, SessionRefresher};

use crate::context::SessionContext;

/// Default heartbeat period (5 minutes).
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_secs(5 * 60);

/// One way of renewing the current session.
#[async_trait]
pub trait SessionRenewal: Send + Sync + 'static {
    /// What a successful renewal yields.
    type Renewed: Send + 'static;

    /// Renew the session.
    async fn renew(&self) -> Result<Self::Renewed, SessionError>;
}

/// Renews by presenting a stored refresh cookie value to a
/// [`SessionRefresher`].
pub struct CookieRenewal {
    refresher: Arc<SessionRefresher>,
    refresh_cookie: String,
}

impl CookieRenewal {
    /// Renew with `refresh_cookie` on every beat.
    pub fn new(refresher: Arc<SessionRefresher>, refresh_cookie: impl Into<String>) -> Self {
        Self {
            refresher,
            refresh_cookie: refresh_cookie.into(),
        }
    }
}

#[async_trait]
impl SessionRenewal for CookieRenewal {
    type Renewed = RefreshedSession;

    async fn renew(&self) -> Result<RefreshedSession, SessionError> {
        self.refresher.refresh(&self.refresh_cookie)
    }
}

/// What one beat did.
#[derive(Debug)]
pub enum Beat<R> {
    /// No session expected; nothing was attempted.
    Inactive,
    /// Renewed, and the session is still the one that started the beat.
    Applied(R),
    /// Renewed, but the session ended or was replaced meanwhile.
    Discarded,
    /// Renewal failed; the session was ended.
    Expired(SessionError),
}

/// Keeps a session alive by renewing it on a timer.
pub struct SessionHeartbeat<R> {
    renewal: Arc<R>,
    context: SessionContext,
    period: Duration,
}

impl<R: SessionRenewal> SessionHeartbeat<R> {
    /// Heartbeat for the session tracked by `context`.
    pub fn new(renewal: Arc<R>, context: SessionContext) -> Self {
        Self {
            renewal,
            context,
            period: DEFAULT_HEARTBEAT_PERIOD,
        }
    }

    /// Override the period.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Renew once, applying the result only if the session is unchanged.
    pub async fn beat(&self) -> Beat<R::Renewed> {
        let Some(ticket) = self.context.ticket() else {
            return Beat::Inactive;
        };

        let result = self.renewal.renew().await;

        if !self.context.accepts(ticket) {
            log::debug!("Discarding renewal for a session that has ended");
            return Beat::Discarded;
        }

        match result {
            Ok(renewed) => Beat::Applied(renewed),
            Err(e) => {
                log::info!("Session renewal failed, ending session: {e}");
                self.context.end();
                Beat::Expired(e)
            }
        }
    }

    /// Run on a timer until the session ends, passing each applied renewal
    /// to `on_renewed`. The first beat fires one period after spawning.
    pub fn spawn<F>(self, mut on_renewed: F) -> JoinHandle<()>
    where
        F: FnMut(R::Renewed) + Send + 'static,
    {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                interval.tick().await;
                match self.beat().await {
                    Beat::Applied(renewed) => on_renewed(renewed),
                    Beat::Inactive | Beat::Discarded | Beat::Expired(_) => break,
                }
            }
            log::debug!("Session heartbeat stopped");
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use vitrine_core::{Clock, FixedClock, KeyRing, Principal, RoleSet, TokenError};
    use vitrine_session::{SessionIssuer, SessionSettings};

    #[derive(Default)]
    struct Counting {
        calls: AtomicU32,
    }

    #[async_trait]
    impl SessionRenewal for Counting {
        type Renewed = u32;

        async fn renew(&self) -> Result<u32, SessionError> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    /// Simulates a logout landing while the refresh is in flight.
    struct LogoutMidway {
        context: SessionContext,
    }

    #[async_trait]
    impl SessionRenewal for LogoutMidway {
        type Renewed = u32;

        async fn renew(&self) -> Result<u32, SessionError> {
            self.context.end();
            Ok(1)
        }
    }

    struct Failing;

    #[async_trait]
    impl SessionRenewal for Failing {
        type Renewed = u32;

        async fn renew(&self) -> Result<u32, SessionError> {
            Err(SessionError::Token(TokenError::Expired))
        }
    }

    fn active() -> SessionContext {
        let context = SessionContext::new();
        context.begin();
        context
    }

    #[tokio::test]
    async fn test_inactive_session_skips_renewal() {
        let renewal = Arc::new(Counting::default());
        let heartbeat = SessionHeartbeat::new(renewal.clone(), SessionContext::new());
        assert!(matches!(heartbeat.beat().await, Beat::Inactive));
        assert_eq!(renewal.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_active_session_applies_renewal() {
        let heartbeat = SessionHeartbeat::new(Arc::new(Counting::default()), active());
        assert!(matches!(heartbeat.beat().await, Beat::Applied(1)));
    }

    #[tokio::test]
    async fn test_logout_during_renewal_discards_result() {
        let context = active();
        let renewal = Arc::new(LogoutMidway {
            context: context.clone(),
        });
        let heartbeat = SessionHeartbeat::new(renewal, context.clone());
        assert!(matches!(heartbeat.beat().await, Beat::Discarded));
        assert!(!context.is_active());
    }

    #[tokio::test]
    async fn test_failed_renewal_ends_session() {
        let context = active();
        let heartbeat = SessionHeartbeat::new(Arc::new(Failing), context.clone());
        assert!(matches!(heartbeat.beat().await, Beat::Expired(_)));
        assert!(!context.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_heartbeat_runs_until_logout() {
        let context = active();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = SessionHeartbeat::new(Arc::new(Counting::default()), context.clone())
            .with_period(Duration::from_secs(300))
            .spawn(move |n| {
                let _ = tx.send(n);
            });

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));

        context.end();
        handle.await.unwrap();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_cookie_renewal() {
        let keys = KeyRing::new(&[1; 32], &[2; 32], &[3; 32]).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(1_700_000_000));
        let settings = SessionSettings::new("vitrine", false).unwrap();
        let issuer = SessionIssuer::new(&keys, settings.clone(), clock.clone());
        let refresher = Arc::new(SessionRefresher::new(&keys, settings, clock));

        let principal = Principal::new("42", "Alice", ["cliente"].into_iter().collect::<RoleSet>());
        let issued = issuer.issue(&principal).unwrap();

        let renewal = CookieRenewal::new(refresher, issued.refresh_cookie.value());
        let heartbeat = SessionHeartbeat::new(Arc::new(renewal), active());
        match heartbeat.beat().await {
            Beat::Applied(refreshed) => assert_eq!(refreshed.claims.sub.as_str(), "42"),
            _ => unreachable!("renewal should apply"),
        }
    }
}
