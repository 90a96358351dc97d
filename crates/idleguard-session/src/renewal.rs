//! Renewal coordinator: refresh the credential pair off the watch task.
//!
//! The refresh call is the only operation in idleguard that waits on the
//! network. It runs in its own Tokio task so the watch keeps handling
//! clicks, activity and countdown ticks while the request is outstanding.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use idleguard_token::LifetimeParser;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{CredentialRefresher, Session, SessionError, TokenPair};

/// Outcome of one refresh call.
#[derive(Debug)]
pub enum RenewalResult {
    /// The endpoint issued a new pair.
    Success(TokenPair),
    /// The endpoint rejected the refresh token, was unreachable, or the
    /// task died. Never retried.
    Failure(SessionError),
}

/// A single renewal: the token that was presented and what came back.
///
/// Exists only for the duration of one renewal; never persisted.
#[derive(Debug)]
pub struct RenewalAttempt {
    /// The refresh token presented to the endpoint.
    pub refresh_token: String,
    /// What the endpoint answered.
    pub result: RenewalResult,
}

impl RenewalAttempt {
    /// Whether the attempt produced a new pair.
    pub fn is_success(&self) -> bool {
        matches!(self.result, RenewalResult::Success(_))
    }
}

/// Performs credential refreshes on behalf of one session.
pub struct RenewalCoordinator<R> {
    refresher: Arc<R>,
}

impl<R> Clone for RenewalCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            refresher: Arc::clone(&self.refresher),
        }
    }
}

impl<R: CredentialRefresher> RenewalCoordinator<R> {
    /// Wraps the host's refresher.
    pub fn new(refresher: Arc<R>) -> Self {
        Self { refresher }
    }

    /// Calls the refresh endpoint once and reports the outcome.
    pub async fn renew(&self, refresh_token: String) -> RenewalAttempt {
        attempt(self.refresher.as_ref(), refresh_token).await
    }

    /// Starts a renewal in its own task.
    ///
    /// Must be called from within a Tokio runtime. Dropping the returned
    /// [`RenewalTask`] aborts the request.
    pub fn spawn(&self, refresh_token: String) -> RenewalTask {
        let refresher = Arc::clone(&self.refresher);
        let presented = refresh_token.clone();
        let handle = tokio::spawn(async move { attempt(refresher.as_ref(), refresh_token).await });
        debug!("renewal task spawned");
        RenewalTask {
            handle,
            refresh_token: presented,
        }
    }

    /// Stores a renewed pair in the session and recomputes its budget.
    ///
    /// Returns the new inactivity budget.
    pub fn commit(
        &self,
        session: &mut Session,
        tokens: TokenPair,
        parser: &LifetimeParser,
    ) -> Duration {
        let budget = session.replace_tokens(tokens, parser);
        info!(budget_ms = session.inactivity_budget_ms(), "session renewed");
        budget
    }
}

async fn attempt<R: CredentialRefresher>(refresher: &R, refresh_token: String) -> RenewalAttempt {
    if refresh_token.is_empty() {
        warn!("renewal requested without a refresh token");
        return RenewalAttempt {
            refresh_token,
            result: RenewalResult::Failure(SessionError::MissingRefreshToken),
        };
    }

    let result = match refresher.refresh(&refresh_token).await {
        Ok(tokens) => RenewalResult::Success(tokens),
        Err(e) => {
            warn!(error = %e, "credential refresh failed");
            RenewalResult::Failure(e)
        }
    };
    RenewalAttempt {
        refresh_token,
        result,
    }
}

/// Handle to an in-flight renewal.
///
/// Resolves to the [`RenewalAttempt`]. Aborts the underlying task when
/// dropped, so discarding a watch also cancels its outstanding refresh.
#[derive(Debug)]
pub struct RenewalTask {
    handle: JoinHandle<RenewalAttempt>,
    refresh_token: String,
}

impl RenewalTask {
    /// Whether the refresh call has finished (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for RenewalTask {
    type Output = RenewalAttempt;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(attempt)) => Poll::Ready(attempt),
            Poll::Ready(Err(e)) => Poll::Ready(RenewalAttempt {
                refresh_token: std::mem::take(&mut self.refresh_token),
                result: RenewalResult::Failure(SessionError::RenewalAborted(e.to_string())),
            }),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for RenewalTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::UserId;

    /// Answers from a script; records every token it was shown.
    struct ScriptedRefresher {
        answer: Result<(&'static str, &'static str), &'static str>,
        delay: Duration,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedRefresher {
        fn ok(access: &'static str, refresh: &'static str) -> Self {
            Self {
                answer: Ok((access, refresh)),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(reason: &'static str) -> Self {
            Self {
                answer: Err(reason),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl CredentialRefresher for ScriptedRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
            self.seen.lock().unwrap().push(refresh_token.to_string());
            tokio::time::sleep(self.delay).await;
            match self.answer {
                Ok((a, r)) => Ok(TokenPair::new(a, r)),
                Err(reason) => Err(SessionError::RefreshFailed(reason.into())),
            }
        }
    }

    #[tokio::test]
    async fn test_renew_success_returns_new_pair() {
        let refresher = Arc::new(ScriptedRefresher::ok("a2", "r2"));
        let coordinator = RenewalCoordinator::new(Arc::clone(&refresher));

        let attempt = coordinator.renew("r1".into()).await;

        assert!(attempt.is_success());
        assert_eq!(attempt.refresh_token, "r1");
        assert!(matches!(
            attempt.result,
            RenewalResult::Success(ref pair) if pair.refresh_token == "r2"
        ));
        assert_eq!(*refresher.seen.lock().unwrap(), vec!["r1".to_string()]);
    }

    #[tokio::test]
    async fn test_renew_failure_is_reported_not_retried() {
        let refresher = Arc::new(ScriptedRefresher::failing("revoked"));
        let coordinator = RenewalCoordinator::new(Arc::clone(&refresher));

        let attempt = coordinator.renew("r1".into()).await;

        assert!(matches!(
            attempt.result,
            RenewalResult::Failure(SessionError::RefreshFailed(ref m)) if m == "revoked"
        ));
        assert_eq!(refresher.seen.lock().unwrap().len(), 1, "no retry");
    }

    #[tokio::test]
    async fn test_renew_without_refresh_token_fails_without_calling_endpoint() {
        let refresher = Arc::new(ScriptedRefresher::ok("a2", "r2"));
        let coordinator = RenewalCoordinator::new(Arc::clone(&refresher));

        let attempt = coordinator.renew(String::new()).await;

        assert!(matches!(
            attempt.result,
            RenewalResult::Failure(SessionError::MissingRefreshToken)
        ));
        assert!(refresher.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_task_resolves_to_attempt() {
        let coordinator = RenewalCoordinator::new(Arc::new(ScriptedRefresher::ok("a2", "r2")));

        let attempt = coordinator.spawn("r1".into()).await;

        assert!(attempt.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_task_aborts_refresh() {
        let refresher = Arc::new(ScriptedRefresher {
            delay: Duration::from_secs(30),
            ..ScriptedRefresher::ok("a2", "r2")
        });
        let coordinator = RenewalCoordinator::new(Arc::clone(&refresher));

        let task = coordinator.spawn("r1".into());
        tokio::task::yield_now().await;
        drop(task);
        tokio::time::sleep(Duration::from_secs(60)).await;

        // The call started but its future was dropped before finishing;
        // the refresher's Arc is released along with it.
        assert_eq!(Arc::strong_count(&refresher), 2);
    }

    #[test]
    fn test_commit_replaces_tokens_and_budget() {
        let parser = LifetimeParser::default();
        let coordinator = RenewalCoordinator::new(Arc::new(ScriptedRefresher::ok("a2", "r2")));
        let mut session = Session::with_budget(
            Some(UserId::from("alice")),
            TokenPair::new("a1", "r1"),
            Duration::from_secs(60),
        );

        let budget = coordinator.commit(
            &mut session,
            TokenPair::new("opaque-a2", "r2"),
            &parser,
        );

        // Opaque token → fallback lifetime.
        assert_eq!(budget, parser.fallback());
        assert_eq!(session.refresh_token(), "r2");
    }
}
