//! One-time token handshake
//!
//! A local identity asks for a token with [`Authenticator::begin_auth`]. The
//! human carries the token to the remote side, where the remote account
//! presents it to [`Authenticator::attempt_verify`]. A matching, unexpired
//! token links the pair through the [`AuthenticationStore`].
//!
//! Stage transitions of the local identity:
//!
//! ```text
//! Unauthenticated --begin_auth--> Authenticating --verify--> Authenticated
//!        ^                              |                          |
//!        +------ expiry / invalidate ---+                          |
//!        +------------------- unauthenticate ----------------------+
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use tether_linker::AuthenticationStore;
use tether_types::{AuthStage, LocalId, LocalIdentity, RemoteAccount};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::events::AuthEvent;
use crate::scheduler::Scheduler;
use crate::token::{self, Token};

struct PendingAuth<L> {
    local: Arc<L>,
    local_id: LocalId,
    serial: u64,
    /// On the scheduler clock
    deadline: Duration,
}

/// Live tokens, indexed both ways. A local identity holds at most one.
struct PendingTokens<L> {
    by_token: HashMap<String, PendingAuth<L>>,
    by_local: HashMap<LocalId, String>,
}

impl<L> PendingTokens<L> {
    fn new() -> Self {
        Self {
            by_token: HashMap::new(),
            by_local: HashMap::new(),
        }
    }

    fn insert(&mut self, token: String, entry: PendingAuth<L>) {
        self.by_local.insert(entry.local_id, token.clone());
        self.by_token.insert(token, entry);
    }

    /// Remove the entry for `token`, but only the issuance numbered `serial`
    /// when one is given.
    fn remove(&mut self, token: &str, serial: Option<u64>) -> Option<PendingAuth<L>> {
        match (self.by_token.get(token), serial) {
            (Some(entry), Some(serial)) if entry.serial != serial => return None,
            (None, _) => return None,
            _ => {}
        }
        let entry = self.by_token.remove(token)?;
        self.by_local.remove(&entry.local_id);
        Some(entry)
    }

    fn token_for(&self, local: &LocalId) -> Option<&str> {
        self.by_local.get(local).map(String::as_str)
    }

    fn len(&self) -> usize {
        self.by_token.len()
    }
}

/// Drop a pending token and return its identity to `Unauthenticated`.
///
/// The stage only moves back if it is still `Authenticating`, so an identity
/// that got linked in the meantime stays linked.
fn retire<L: LocalIdentity>(
    pending: &Mutex<PendingTokens<L>>,
    events: &broadcast::Sender<AuthEvent>,
    token: &str,
    serial: Option<u64>,
    expired: bool,
) -> bool {
    let Some(entry) = pending.lock().remove(token, serial) else {
        return false;
    };
    release(events, entry, expired);
    true
}

/// Return the identity of a dropped entry to `Unauthenticated` and report it.
fn release<L: LocalIdentity>(
    events: &broadcast::Sender<AuthEvent>,
    entry: PendingAuth<L>,
    expired: bool,
) {
    entry
        .local
        .compare_and_set_stage(AuthStage::Authenticating, AuthStage::Unauthenticated);

    let event = if expired {
        debug!(local = %entry.local_id, "Token expired");
        AuthEvent::TokenExpired {
            local: entry.local_id,
        }
    } else {
        debug!(local = %entry.local_id, "Token invalidated");
        AuthEvent::TokenInvalidated {
            local: entry.local_id,
        }
    };
    let _ = events.send(event);
}

/// Issues and verifies one-time link tokens
pub struct Authenticator<L, R> {
    store: Arc<dyn AuthenticationStore<L, R>>,
    scheduler: Arc<dyn Scheduler>,
    pending: Arc<Mutex<PendingTokens<L>>>,
    next_serial: AtomicU64,
    events: broadcast::Sender<AuthEvent>,
    config: AuthConfig,
}

impl<L, R> Authenticator<L, R>
where
    L: LocalIdentity + 'static,
    R: RemoteAccount + 'static,
{
    pub fn new(
        store: Arc<dyn AuthenticationStore<L, R>>,
        scheduler: Arc<dyn Scheduler>,
        config: AuthConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            store,
            scheduler,
            pending: Arc::new(Mutex::new(PendingTokens::new())),
            next_serial: AtomicU64::new(0),
            events,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Subscribe to handshake events.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Issue a token for `local` and move it to `Authenticating`.
    ///
    /// Fails with [`AuthError::StateConflict`] if the identity is already
    /// linked, already holds a live token, or is not `Unauthenticated`, and
    /// with [`AuthError::Config`] if the configured lifetime is out of range.
    #[instrument(skip_all)]
    pub async fn begin_auth(&self, local: Arc<L>) -> Result<Token> {
        self.config.validate()?;
        let local_id = local.unique_id().await;

        if local.authentication_stage() != AuthStage::Unauthenticated {
            return Err(AuthError::StateConflict(format!(
                "{} is {}",
                local_id,
                local.authentication_stage()
            )));
        }
        if self.store.contains(Some(local.as_ref()), None).await? {
            return Err(AuthError::StateConflict(format!(
                "{} is already linked",
                local_id
            )));
        }

        let ttl = self.config.token_ttl();
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let value = {
            let mut pending = self.pending.lock();
            if pending.token_for(&local_id).is_some() {
                return Err(AuthError::StateConflict(format!(
                    "{} already holds a token",
                    local_id
                )));
            }
            if !local.compare_and_set_stage(AuthStage::Unauthenticated, AuthStage::Authenticating)
            {
                return Err(AuthError::StateConflict(format!(
                    "{} is {}",
                    local_id,
                    local.authentication_stage()
                )));
            }

            let mut rng = OsRng;
            let value = loop {
                let candidate = token::generate(&mut rng);
                if !pending.by_token.contains_key(&candidate) {
                    break candidate;
                }
            };
            pending.insert(
                value.clone(),
                PendingAuth {
                    local: local.clone(),
                    local_id,
                    serial,
                    deadline: self.scheduler.now() + ttl,
                },
            );
            value
        };

        let expires_at = Utc::now() + chrono::Duration::seconds(self.config.token_ttl_secs as i64);
        let token = Token::new(value.clone(), expires_at);

        let pending = self.pending.clone();
        let events = self.events.clone();
        self.scheduler.schedule(
            Box::new(move || {
                retire(&pending, &events, &value, Some(serial), true);
            }),
            ttl,
        );

        info!(local = %local_id, expires_at = %expires_at, "Issued link token");
        let _ = self.events.send(AuthEvent::TokenIssued {
            local: local_id,
            expires_at,
        });
        Ok(token)
    }

    /// Redeem `token` on behalf of `remote`, linking it to the identity that
    /// asked for the token.
    ///
    /// The token is taken out of the pending set before the link is pushed, so
    /// expiry and [`invalidate`](Self::invalidate) cannot act on it while the
    /// push is in flight. It is consumed on success. If the push fails, it goes
    /// back to the pending set when it is still within its lifetime; otherwise
    /// the identity returns to `Unauthenticated`. Of several concurrent
    /// attempts with the same token, at most one succeeds.
    #[instrument(skip_all)]
    pub async fn attempt_verify(&self, remote: Arc<R>, token: &str) -> Result<(Arc<L>, Arc<R>)> {
        let remote_id = remote.unique_id().await;

        let Some(entry) = self.pending.lock().remove(token, None) else {
            warn!(remote = %remote_id, "Rejected unknown token");
            return Err(AuthError::TokenInvalid);
        };
        if self.scheduler.now() >= entry.deadline {
            release(&self.events, entry, true);
            warn!(remote = %remote_id, "Rejected expired token");
            return Err(AuthError::TokenInvalid);
        }

        let local = entry.local.clone();
        let local_id = entry.local_id;
        match self.store.push(&local, &remote).await {
            Ok(true) => {}
            Ok(false) => {
                self.reinstate(token, entry);
                warn!(local = %local_id, remote = %remote_id, "Link already exists");
                return Err(AuthError::StateConflict(format!(
                    "{} or {} is already linked",
                    local_id, remote_id
                )));
            }
            Err(error) => {
                self.reinstate(token, entry);
                return Err(error.into());
            }
        }

        info!(local = %local_id, remote = %remote_id, "Linked");
        let _ = self.events.send(AuthEvent::Linked {
            local: local_id,
            remote: remote_id,
        });
        Ok((local, remote))
    }

    /// Put back a token whose redemption failed, unless it ran out meanwhile
    /// or its string was handed out again.
    fn reinstate(&self, token: &str, entry: PendingAuth<L>) {
        let expired = self.scheduler.now() >= entry.deadline;
        let leftover = {
            let mut pending = self.pending.lock();
            if pending.token_for(&entry.local_id).is_some() {
                // The identity's newer token governs its stage.
                None
            } else if expired || pending.by_token.contains_key(token) {
                Some(entry)
            } else {
                pending.insert(token.to_string(), entry);
                None
            }
        };
        if let Some(entry) = leftover {
            release(&self.events, entry, expired);
        }
    }

    /// Withdraw a live token before it expires.
    ///
    /// Returns `false` when no pending token matches, including one that a
    /// verification is redeeming right now.
    pub fn invalidate(&self, token: &str) -> bool {
        retire(&self.pending, &self.events, token, None, false)
    }

    /// Withdraw whatever token `local` holds.
    pub async fn cancel(&self, local: &L) -> bool {
        let local_id = local.unique_id().await;
        let Some(token) = self.pending.lock().token_for(&local_id).map(str::to_string) else {
            return false;
        };
        self.invalidate(&token)
    }

    /// Remove the link of `local`.
    pub async fn unauthenticate(&self, local: &L) -> Result<bool> {
        let removed = self.store.remove(Some(local), None).await?;
        if removed {
            let local_id = local.unique_id().await;
            info!(local = %local_id, "Unlinked");
            let _ = self.events.send(AuthEvent::Unlinked {
                local: Some(local_id),
                remote: None,
            });
        }
        Ok(removed)
    }

    /// Remove the link of `remote`.
    pub async fn unauthenticate_remote(&self, remote: &R) -> Result<bool> {
        let removed = self.store.remove(None, Some(remote)).await?;
        if removed {
            let remote_id = remote.unique_id().await;
            info!(remote = %remote_id, "Unlinked");
            let _ = self.events.send(AuthEvent::Unlinked {
                local: None,
                remote: Some(remote_id),
            });
        }
        Ok(removed)
    }

    /// Number of live tokens.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether `local` holds a live token.
    pub async fn is_pending(&self, local: &L) -> bool {
        let local_id = local.unique_id().await;
        self.pending.lock().token_for(&local_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ManualScheduler, ScheduledTask, TokioScheduler};
    use async_trait::async_trait;
    use tether_linker::{EntityLinker, InMemoryLinkStore, LocalLinker};
    use tether_translate::{FnTranslator, Lookup};
    use tether_types::testing::{TestAccount, TestIdentity};
    use tether_types::{Authenticatable, RemoteId, TranslateError};
    use tokio::sync::Notify;

    type Linker = LocalLinker<TestIdentity, TestAccount>;
    type Auth = Authenticator<TestIdentity, TestAccount>;

    fn linker(identities: &[Arc<TestIdentity>], accounts: &[Arc<TestAccount>]) -> Arc<Linker> {
        let by_local: HashMap<LocalId, Arc<TestIdentity>> =
            identities.iter().map(|i| (i.id(), i.clone())).collect();
        let by_remote: HashMap<RemoteId, Arc<TestAccount>> =
            accounts.iter().map(|a| (a.id(), a.clone())).collect();

        let locals = Lookup::with_builtin(
            "players",
            Arc::new(FnTranslator::new("players", move |id: LocalId| {
                let hit = by_local.get(&id).cloned();
                async move { Ok::<_, TranslateError>(hit) }
            })),
        );
        let remotes = Lookup::with_builtin(
            "users",
            Arc::new(FnTranslator::new("users", move |id: RemoteId| {
                let hit = by_remote.get(&id).cloned();
                async move { Ok::<_, TranslateError>(hit) }
            })),
        );
        Arc::new(LocalLinker::new(
            Arc::new(InMemoryLinkStore::new()),
            Arc::new(locals),
            Arc::new(remotes),
        ))
    }

    fn authenticator(linker: &Arc<Linker>, scheduler: Arc<dyn Scheduler>) -> Auth {
        Authenticator::new(linker.clone(), scheduler, AuthConfig::default())
    }

    /// Clock that moves by hand but never runs its tasks.
    #[derive(Default)]
    struct StoppedTimers {
        secs: AtomicU64,
    }

    impl StoppedTimers {
        fn advance(&self, by: Duration) {
            self.secs.fetch_add(by.as_secs(), Ordering::SeqCst);
        }
    }

    impl Scheduler for StoppedTimers {
        fn now(&self) -> Duration {
            Duration::from_secs(self.secs.load(Ordering::SeqCst))
        }

        fn schedule(&self, _task: ScheduledTask, _delay: Duration) {}

        fn execute_now(&self, _task: ScheduledTask) {}
    }

    /// Store whose pushes wait until the test lets them through.
    struct GatedStore {
        inner: Arc<Linker>,
        entered: Notify,
        release: Notify,
    }

    impl GatedStore {
        fn new(inner: Arc<Linker>) -> Arc<Self> {
            Arc::new(Self {
                inner,
                entered: Notify::new(),
                release: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl AuthenticationStore<TestIdentity, TestAccount> for GatedStore {
        async fn push(
            &self,
            local: &TestIdentity,
            remote: &TestAccount,
        ) -> tether_linker::Result<bool> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.push(local, remote).await
        }

        async fn remove(
            &self,
            local: Option<&TestIdentity>,
            remote: Option<&TestAccount>,
        ) -> tether_linker::Result<bool> {
            self.inner.remove(local, remote).await
        }

        async fn contains(
            &self,
            local: Option<&TestIdentity>,
            remote: Option<&TestAccount>,
        ) -> tether_linker::Result<bool> {
            self.inner.contains(local, remote).await
        }
    }

    fn spawn_verify(
        auth: &Arc<Auth>,
        user: &Arc<TestAccount>,
        token: &Token,
    ) -> tokio::task::JoinHandle<Result<(Arc<TestIdentity>, Arc<TestAccount>)>> {
        let auth = auth.clone();
        let user = user.clone();
        let token = token.to_string();
        tokio::spawn(async move { auth.attempt_verify(user, &token).await })
    }

    #[tokio::test]
    async fn test_begin_auth_issues_token() {
        let player = TestIdentity::new("steve");
        let linker = linker(&[player.clone()], &[]);
        let auth = authenticator(&linker, Arc::new(ManualScheduler::new()));

        let token = auth.begin_auth(player.clone()).await.unwrap();

        assert!(token::is_well_formed(token.as_str()));
        assert_eq!(player.authentication_stage(), AuthStage::Authenticating);
        assert_eq!(auth.pending_count(), 1);
        assert!(auth.is_pending(&player).await);
        assert!(token.expires_at() > Utc::now());
    }

    #[tokio::test]
    async fn test_begin_auth_twice_conflicts() {
        let player = TestIdentity::new("steve");
        let linker = linker(&[player.clone()], &[]);
        let auth = authenticator(&linker, Arc::new(ManualScheduler::new()));

        auth.begin_auth(player.clone()).await.unwrap();
        assert!(matches!(
            auth.begin_auth(player.clone()).await,
            Err(AuthError::StateConflict(_))
        ));
        assert_eq!(auth.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_begin_auth_when_linked_conflicts() {
        let player = TestIdentity::new("steve");
        let user = TestAccount::new("1001", "steve#0001");
        let linker = linker(&[player.clone()], &[user.clone()]);
        let auth = authenticator(&linker, Arc::new(ManualScheduler::new()));

        linker.push(&player, &user).await.unwrap();
        assert!(matches!(
            auth.begin_auth(player.clone()).await,
            Err(AuthError::StateConflict(_))
        ));

        // Linked but stage out of sync: the store still wins.
        player.set_authentication_stage(AuthStage::Unauthenticated);
        assert!(matches!(
            auth.begin_auth(player.clone()).await,
            Err(AuthError::StateConflict(_))
        ));
        assert_eq!(auth.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_verify_links_both_ways() {
        let player = TestIdentity::new("steve");
        let user = TestAccount::new("1001", "steve#0001");
        let linker = linker(&[player.clone()], &[user.clone()]);
        let auth = authenticator(&linker, Arc::new(ManualScheduler::new()));
        let mut events = auth.subscribe();

        let token = auth.begin_auth(player.clone()).await.unwrap();
        let (local, remote) = auth
            .attempt_verify(user.clone(), token.as_str())
            .await
            .unwrap();

        assert_eq!(local.id(), player.id());
        assert_eq!(remote.id(), user.id());
        assert_eq!(player.authentication_stage(), AuthStage::Authenticated);
        assert_eq!(auth.pending_count(), 0);
        assert_eq!(
            linker.translate_to_remote(&player).await.unwrap().unwrap().id(),
            user.id()
        );

        assert!(matches!(
            events.recv().await.unwrap(),
            AuthEvent::TokenIssued { local, .. } if local == player.id()
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent::Linked {
                local: player.id(),
                remote: user.id()
            }
        );
    }

    #[tokio::test]
    async fn test_token_is_single_use() {
        let player = TestIdentity::new("steve");
        let user = TestAccount::new("1001", "steve#0001");
        let other = TestAccount::new("1002", "alex#0002");
        let linker = linker(&[player.clone()], &[user.clone(), other.clone()]);
        let auth = authenticator(&linker, Arc::new(ManualScheduler::new()));

        let token = auth.begin_auth(player.clone()).await.unwrap();
        auth.attempt_verify(user.clone(), token.as_str()).await.unwrap();

        assert!(matches!(
            auth.attempt_verify(other, token.as_str()).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_wrong_token_is_rejected() {
        let player = TestIdentity::new("steve");
        let user = TestAccount::new("1001", "steve#0001");
        let linker = linker(&[player.clone()], &[user.clone()]);
        let auth = authenticator(&linker, Arc::new(ManualScheduler::new()));

        let token = auth.begin_auth(player.clone()).await.unwrap();
        let wrong = if token.as_str() == "00000" { "00001" } else { "00000" };

        assert!(matches!(
            auth.attempt_verify(user.clone(), wrong).await,
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(
            auth.attempt_verify(user.clone(), &format!("{token} ")).await,
            Err(AuthError::TokenInvalid)
        ));
        assert_eq!(player.authentication_stage(), AuthStage::Authenticating);
        assert_eq!(auth.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_token_expires_on_schedule() {
        let player = TestIdentity::new("steve");
        let user = TestAccount::new("1001", "steve#0001");
        let linker = linker(&[player.clone()], &[user.clone()]);
        let scheduler = Arc::new(ManualScheduler::new());
        let auth = authenticator(&linker, scheduler.clone());
        let mut events = auth.subscribe();

        let token = auth.begin_auth(player.clone()).await.unwrap();
        scheduler.advance(Duration::from_secs(59));
        assert_eq!(auth.pending_count(), 1);

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(auth.pending_count(), 0);
        assert_eq!(player.authentication_stage(), AuthStage::Unauthenticated);
        assert!(matches!(
            auth.attempt_verify(user.clone(), token.as_str()).await,
            Err(AuthError::TokenInvalid)
        ));

        events.recv().await.unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent::TokenExpired { local: player.id() }
        );

        // The identity can start over.
        auth.begin_auth(player.clone()).await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_checks_deadline_before_timer_runs() {
        let player = TestIdentity::new("steve");
        let user = TestAccount::new("1001", "steve#0001");
        let linker = linker(&[player.clone()], &[user.clone()]);
        let timers = Arc::new(StoppedTimers::default());
        let auth = authenticator(&linker, timers.clone());

        let token = auth.begin_auth(player.clone()).await.unwrap();
        timers.advance(Duration::from_secs(60));

        assert!(matches!(
            auth.attempt_verify(user.clone(), token.as_str()).await,
            Err(AuthError::TokenInvalid)
        ));
        assert_eq!(player.authentication_stage(), AuthStage::Unauthenticated);
        assert_eq!(auth.pending_count(), 0);
        assert!(linker.translate_to_remote(&player).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_expires_token() {
        let player = TestIdentity::new("steve");
        let linker = linker(&[player.clone()], &[]);
        let scheduler = Arc::new(TokioScheduler::new(tokio::runtime::Handle::current()));
        let auth = authenticator(&linker, scheduler);

        auth.begin_auth(player.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(auth.pending_count(), 0);
        assert_eq!(player.authentication_stage(), AuthStage::Unauthenticated);
    }

    #[tokio::test]
    async fn test_stale_timer_spares_new_token() {
        let player = TestIdentity::new("steve");
        let linker = linker(&[player.clone()], &[]);
        let scheduler = Arc::new(ManualScheduler::new());
        let auth = authenticator(&linker, scheduler.clone());

        let first = auth.begin_auth(player.clone()).await.unwrap();
        assert!(auth.invalidate(first.as_str()));
        assert_eq!(player.authentication_stage(), AuthStage::Unauthenticated);

        scheduler.advance(Duration::from_secs(30));
        auth.begin_auth(player.clone()).await.unwrap();

        // First timer fires now; the second issuance has 30s left.
        scheduler.advance(Duration::from_secs(31));
        assert!(auth.is_pending(&player).await);
        assert_eq!(player.authentication_stage(), AuthStage::Authenticating);

        scheduler.advance(Duration::from_secs(30));
        assert!(!auth.is_pending(&player).await);
    }

    #[tokio::test]
    async fn test_cancel_withdraws_token() {
        let player = TestIdentity::new("steve");
        let user = TestAccount::new("1001", "steve#0001");
        let linker = linker(&[player.clone()], &[user.clone()]);
        let auth = authenticator(&linker, Arc::new(ManualScheduler::new()));

        let token = auth.begin_auth(player.clone()).await.unwrap();
        assert!(auth.cancel(&player).await);
        assert!(!auth.cancel(&player).await);
        assert!(!auth.invalidate(token.as_str()));

        assert!(matches!(
            auth.attempt_verify(user, token.as_str()).await,
            Err(AuthError::TokenInvalid)
        ));
        assert_eq!(player.authentication_stage(), AuthStage::Unauthenticated);
    }

    #[tokio::test]
    async fn test_remote_already_linked_conflicts() {
        let steve = TestIdentity::new("steve");
        let alex = TestIdentity::new("alex");
        let user = TestAccount::new("1001", "steve#0001");
        let linker = linker(&[steve.clone(), alex.clone()], &[user.clone()]);
        let auth = authenticator(&linker, Arc::new(ManualScheduler::new()));

        let token = auth.begin_auth(steve.clone()).await.unwrap();
        auth.attempt_verify(user.clone(), token.as_str()).await.unwrap();

        let token = auth.begin_auth(alex.clone()).await.unwrap();
        assert!(matches!(
            auth.attempt_verify(user.clone(), token.as_str()).await,
            Err(AuthError::StateConflict(_))
        ));
        assert_eq!(alex.authentication_stage(), AuthStage::Authenticating);
        assert!(auth.is_pending(&alex).await);
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_is_rejected() {
        let player = TestIdentity::new("steve");
        let linker = linker(&[player.clone()], &[]);
        for token_ttl_secs in [0, u64::MAX] {
            let config = AuthConfig {
                token_ttl_secs,
                ..Default::default()
            };
            let auth: Auth =
                Authenticator::new(linker.clone(), Arc::new(ManualScheduler::new()), config);

            assert!(matches!(
                auth.begin_auth(player.clone()).await,
                Err(AuthError::Config(_))
            ));
            assert_eq!(player.authentication_stage(), AuthStage::Unauthenticated);
            assert_eq!(auth.pending_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_token_being_redeemed_cannot_be_invalidated() {
        let player = TestIdentity::new("steve");
        let user = TestAccount::new("1001", "steve#0001");
        let linker = linker(&[player.clone()], &[user.clone()]);
        let gate = GatedStore::new(linker.clone());
        let auth = Arc::new(Authenticator::new(
            gate.clone(),
            Arc::new(ManualScheduler::new()),
            AuthConfig::default(),
        ));

        let token = auth.begin_auth(player.clone()).await.unwrap();
        let verify = spawn_verify(&auth, &user, &token);
        gate.entered.notified().await;

        assert!(!auth.invalidate(token.as_str()));
        assert!(!auth.cancel(&player).await);
        gate.release.notify_one();

        verify.await.unwrap().unwrap();
        assert_eq!(player.authentication_stage(), AuthStage::Authenticated);
        assert_eq!(auth.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_expiry_during_redemption_does_not_undo_link() {
        let player = TestIdentity::new("steve");
        let user = TestAccount::new("1001", "steve#0001");
        let linker = linker(&[player.clone()], &[user.clone()]);
        let gate = GatedStore::new(linker.clone());
        let scheduler = Arc::new(ManualScheduler::new());
        let auth = Arc::new(Authenticator::new(
            gate.clone(),
            scheduler.clone(),
            AuthConfig::default(),
        ));
        let mut events = auth.subscribe();

        let token = auth.begin_auth(player.clone()).await.unwrap();
        let verify = spawn_verify(&auth, &user, &token);
        gate.entered.notified().await;

        assert_eq!(scheduler.advance(Duration::from_secs(61)), 1);
        gate.release.notify_one();

        verify.await.unwrap().unwrap();
        assert_eq!(player.authentication_stage(), AuthStage::Authenticated);
        assert_eq!(auth.pending_count(), 0);

        // Issued, then linked; the timer found nothing to expire.
        events.recv().await.unwrap();
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::Linked { .. }));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_redemption_after_deadline_releases_identity() {
        let steve = TestIdentity::new("steve");
        let alex = TestIdentity::new("alex");
        let user = TestAccount::new("1001", "steve#0001");
        let linker = linker(&[steve.clone(), alex.clone()], &[user.clone()]);
        linker.push(&steve, &user).await.unwrap();

        let gate = GatedStore::new(linker.clone());
        let scheduler = Arc::new(ManualScheduler::new());
        let auth = Arc::new(Authenticator::new(
            gate.clone(),
            scheduler.clone(),
            AuthConfig::default(),
        ));

        let token = auth.begin_auth(alex.clone()).await.unwrap();
        let verify = spawn_verify(&auth, &user, &token);
        gate.entered.notified().await;
        scheduler.advance(Duration::from_secs(61));
        gate.release.notify_one();

        assert!(matches!(
            verify.await.unwrap(),
            Err(AuthError::StateConflict(_))
        ));
        assert_eq!(alex.authentication_stage(), AuthStage::Unauthenticated);
        assert_eq!(auth.pending_count(), 0);
        assert!(matches!(
            auth.attempt_verify(user.clone(), token.as_str()).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_verify_links_once() {
        let player = TestIdentity::new("steve");
        let accounts: Vec<_> = (0..16)
            .map(|i| TestAccount::new(&format!("{}", 2000 + i), &format!("user#{i}")))
            .collect();
        let linker = linker(&[player.clone()], &accounts);
        let auth = Arc::new(authenticator(&linker, Arc::new(ManualScheduler::new())));

        let token = auth.begin_auth(player.clone()).await.unwrap();
        let attempts = accounts.iter().cloned().map(|account| {
            let auth = auth.clone();
            let token = token.as_str().to_string();
            tokio::spawn(async move { auth.attempt_verify(account, &token).await })
        });
        let results = futures::future::join_all(attempts).await;

        let wins = results
            .into_iter()
            .filter(|joined| matches!(joined, Ok(Ok(_))))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(linker.links().await.unwrap().len(), 1);
        assert_eq!(player.authentication_stage(), AuthStage::Authenticated);
    }

    #[tokio::test]
    async fn test_unauthenticate_from_either_side() {
        let player = TestIdentity::new("steve");
        let user = TestAccount::new("1001", "steve#0001");
        let linker = linker(&[player.clone()], &[user.clone()]);
        let auth = authenticator(&linker, Arc::new(ManualScheduler::new()));

        let token = auth.begin_auth(player.clone()).await.unwrap();
        auth.attempt_verify(user.clone(), token.as_str()).await.unwrap();
        assert!(auth.unauthenticate(&player).await.unwrap());
        assert!(!auth.unauthenticate(&player).await.unwrap());
        assert_eq!(player.authentication_stage(), AuthStage::Unauthenticated);

        let token = auth.begin_auth(player.clone()).await.unwrap();
        auth.attempt_verify(user.clone(), token.as_str()).await.unwrap();
        assert!(auth.unauthenticate_remote(&user).await.unwrap());
        assert_eq!(player.authentication_stage(), AuthStage::Unauthenticated);
        assert!(linker.translate_to_local(&user).await.unwrap().is_none());
    }
}
