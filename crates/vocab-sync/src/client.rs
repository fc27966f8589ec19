//! The sync client: keeps menus and cached permissions in step with the
//! backend over a push channel.
//!
//! One background task owns the channel. It connects, refetches every
//! configured menu position, then applies inbound messages strictly in
//! receipt order. Connection faults go through [`ConnectionMachine`] and
//! the [`ReconnectPolicy`] backoff; once retries run out the client goes
//! degraded and serves the last-known-good menus from the local store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vocab_auth::{PermissionResolver, Role};
use vocab_cache::StorageKeys;
use vocab_core::config::sync::SyncConfig;
use vocab_core::error::AppError;
use vocab_core::events::{ClientEvent, ConnectionEvent, ConnectionState, MenuEvent, PermissionEvent};
use vocab_core::result::AppResult;
use vocab_core::traits::LocalStore;
use vocab_core::types::SubjectId;

use crate::connection::transport::NORMAL_CLOSE;
use crate::connection::{
    Connection, ConnectionInput, ConnectionMachine, Effect, Frame, HeartbeatAction,
    HeartbeatTracker, ReconnectPolicy, Step, Transport,
};
use crate::menu::{ApplyOutcome, MenuNode, MenuSource, MenuTree};
use crate::message::{InboundMessage, MenuUpdate, OutboundMessage, encode_outbound, parse_inbound};
use crate::metrics::{SyncMetrics, SyncMetricsSnapshot};

/// Who the client syncs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSession {
    /// Signed-in user, or the anonymous subject.
    pub subject: SubjectId,
    /// The user's role.
    pub role: Role,
}

/// Collaborators handed to [`SyncClient::new`].
#[derive(Debug, Clone)]
pub struct SyncDependencies {
    /// `sync` configuration section.
    pub config: SyncConfig,
    /// WebSocket base URL, e.g. `ws://localhost:8000`.
    pub ws_base_url: String,
    /// Cached permission evaluation.
    pub resolver: Arc<PermissionResolver>,
    /// Full menu fetches.
    pub menus: Arc<dyn MenuSource>,
    /// Persisted client state.
    pub store: Arc<dyn LocalStore>,
    /// Local store key layout.
    pub keys: StorageKeys,
    /// Push-channel transport.
    pub transport: Arc<dyn Transport>,
}

/// Push-driven menu and permission sync.
pub struct SyncClient {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("subject", &self.inner.session.subject)
            .field("role", &self.inner.session.role)
            .field("state", &self.state())
            .finish()
    }
}

struct Inner {
    session: SyncSession,
    config: SyncConfig,
    ws_base_url: String,
    resolver: Arc<PermissionResolver>,
    menus: Arc<dyn MenuSource>,
    store: Arc<dyn LocalStore>,
    keys: StorageKeys,
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    machine: Mutex<ConnectionMachine>,
    state_tx: watch::Sender<ConnectionState>,
    online_tx: watch::Sender<bool>,
    trees: RwLock<HashMap<String, MenuTree>>,
    events: broadcast::Sender<ClientEvent>,
    cancel: CancellationToken,
    destroyed: AtomicBool,
    degraded: AtomicBool,
    last_failure: Mutex<Option<String>>,
    metrics: SyncMetrics,
}

impl SyncClient {
    /// Creates an idle client. Nothing happens until [`init`](Self::init).
    pub fn new(session: SyncSession, deps: SyncDependencies) -> Self {
        let (events, _) = broadcast::channel(deps.config.event_buffer_size.max(1));
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (online_tx, _) = watch::channel(true);

        let inner = Inner {
            policy: ReconnectPolicy::from_config(&deps.config),
            machine: Mutex::new(ConnectionMachine::new(deps.config.max_reconnect_attempts)),
            session,
            config: deps.config,
            ws_base_url: deps.ws_base_url.trim_end_matches('/').to_string(),
            resolver: deps.resolver,
            menus: deps.menus,
            store: deps.store,
            keys: deps.keys,
            transport: deps.transport,
            state_tx,
            online_tx,
            trees: RwLock::new(HashMap::new()),
            events,
            cancel: CancellationToken::new(),
            destroyed: AtomicBool::new(false),
            degraded: AtomicBool::new(false),
            last_failure: Mutex::new(None),
            metrics: SyncMetrics::new(),
        };

        Self {
            inner: Arc::new(inner),
            task: Mutex::new(None),
        }
    }

    /// Restores persisted state and starts the background task.
    ///
    /// Calling it again while running is a no-op; after
    /// [`destroy`](Self::destroy) it is an error.
    pub async fn init(&self) -> AppResult<()> {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return Err(AppError::internal("Sync client has been destroyed"));
        }
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Ok(());
        }

        let inner = &self.inner;
        match inner
            .resolver
            .restore_snapshot(&inner.store, &inner.keys, &inner.session.subject)
            .await
        {
            Ok(restored) => debug!(restored, "Permission cache warmed from snapshot"),
            Err(e) => warn!(error = %e, "Could not restore permission cache snapshot"),
        }
        for position in &inner.config.menu_positions {
            inner.restore_menu_if_missing(position).await;
        }

        let runner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(runner.run()));
        info!(
            subject = %inner.session.subject,
            role = %inner.session.role,
            push = inner.config.enabled,
            "Sync client started"
        );
        Ok(())
    }

    /// Stops the background task, cancels pending retries, and persists state.
    ///
    /// Messages handed in afterwards are ignored and no further events are
    /// published.
    pub async fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.cancel.cancel();

        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Sync task ended abnormally");
            }
        }

        let step = self.inner.machine.lock().await.handle(ConnectionInput::Disconnect);
        if step.changed() {
            self.inner.state_tx.send_replace(step.to);
            let event = ConnectionEvent::StateChanged {
                from: step.from,
                to: step.to,
                attempt: 0,
            };
            let _ = self.inner.events.send(event.into());
        }

        self.inner.persist_all().await;
        info!(subject = %self.inner.session.subject, "Sync client destroyed");
    }

    /// Subscribe to client events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Watch connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Whether retries ran out and menus are last-known-good.
    pub fn is_degraded(&self) -> bool {
        self.inner.degraded.load(Ordering::SeqCst)
    }

    /// Report network reachability. Going offline pauses reconnects;
    /// coming back starts a fresh connect cycle.
    pub fn set_online(&self, online: bool) {
        self.inner.online_tx.send_replace(online);
    }

    /// The session this client serves.
    pub fn session(&self) -> &SyncSession {
        &self.inner.session
    }

    /// Copy of the menu held for `position`.
    pub async fn menu(&self, position: &str) -> Option<MenuTree> {
        self.inner.trees.read().await.get(position).cloned()
    }

    /// The part of `position`'s menu the session's role may see.
    pub async fn visible_menu(&self, position: &str) -> Vec<MenuNode> {
        let session = &self.inner.session;
        let granted = self
            .inner
            .resolver
            .permissions_for(&session.subject, session.role);
        self.inner
            .trees
            .read()
            .await
            .get(position)
            .map(|tree| tree.visible(&granted))
            .unwrap_or_default()
    }

    /// Refetch every configured position now.
    pub async fn refresh(&self) {
        self.inner.refetch_all().await;
    }

    /// Apply one inbound text frame, returning the reply to send, if any.
    ///
    /// Pongs and server heartbeats are accepted but only feed latency
    /// tracking on a live channel.
    pub async fn handle_text(&self, raw: &str) -> Option<OutboundMessage> {
        match parse_inbound(raw) {
            Ok(message) => self.inner.dispatch(message).await,
            Err(e) => {
                SyncMetrics::bump(&self.inner.metrics.messages_dropped);
                warn!(error = %e, "Dropping malformed push message");
                None
            }
        }
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl Inner {
    async fn run(self: Arc<Self>) {
        if !self.config.enabled {
            self.refetch_all().await;
            return;
        }

        let mut online_rx = self.online_tx.subscribe();
        let mut step = self.transition(ConnectionInput::Connect).await;
        loop {
            let next = match step.effect {
                Effect::Open => self.open_and_serve(&mut online_rx).await,
                Effect::ScheduleRetry { attempt } => self.wait_retry(attempt, &mut online_rx).await,
                Effect::GiveUp { attempts } => {
                    self.enter_degraded(attempts).await;
                    self.wait_reachability(&mut online_rx).await
                }
                Effect::None | Effect::Stop => self.wait_reachability(&mut online_rx).await,
            };
            let Some(input) = next else {
                debug!("Sync task cancelled");
                return;
            };
            step = self.transition(input).await;
        }
    }

    /// Connect, refetch, then pump the channel until it ends.
    async fn open_and_serve(
        &self,
        online_rx: &mut watch::Receiver<bool>,
    ) -> Option<ConnectionInput> {
        let url = self.channel_url();
        let connected = tokio::select! {
            _ = self.cancel.cancelled() => return None,
            result = self.transport.connect(&url) => result,
        };
        let mut conn = match connected {
            Ok(conn) => conn,
            Err(e) => {
                warn!(url = %url, error = %e, "Push channel connect failed");
                *self.last_failure.lock().await = Some(e.to_string());
                return Some(ConnectionInput::Failed);
            }
        };

        let step = self.transition(ConnectionInput::Opened).await;
        if step.to != ConnectionState::Connected {
            let _ = conn.close(NORMAL_CLOSE).await;
            return None;
        }
        SyncMetrics::bump(&self.metrics.connections_opened);
        self.degraded.store(false, Ordering::SeqCst);
        info!(url = %url, "Push channel connected");

        self.refetch_all().await;
        self.serve(conn.as_mut(), online_rx).await
    }

    async fn serve(
        &self,
        conn: &mut dyn Connection,
        online_rx: &mut watch::Receiver<bool>,
    ) -> Option<ConnectionInput> {
        let mut heartbeat = HeartbeatTracker::new(self.config.max_missed_pongs);
        let period = Duration::from_secs(self.config.heartbeat_interval_seconds.max(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    if let Err(e) = conn.close(NORMAL_CLOSE).await {
                        debug!(error = %e, "Close on shutdown failed");
                    }
                    return None;
                }
                frame = conn.recv() => match frame {
                    Some(Ok(Frame::Text(text))) => {
                        if let Err(e) = self.on_frame(conn, &text, &mut heartbeat).await {
                            warn!(error = %e, "Push channel send failed");
                            return Some(ConnectionInput::Closed { clean: false });
                        }
                    }
                    Some(Ok(close)) => {
                        let clean = close.is_clean_close();
                        info!(?close, "Push channel closed by server");
                        if !clean {
                            *self.last_failure.lock().await = Some(format!("{close:?}"));
                        }
                        return Some(ConnectionInput::Closed { clean });
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Push channel failed");
                        *self.last_failure.lock().await = Some(e.to_string());
                        return Some(ConnectionInput::Closed { clean: false });
                    }
                    None => {
                        warn!("Push channel ended without a close frame");
                        return Some(ConnectionInput::Closed { clean: false });
                    }
                },
                _ = ticker.tick() => match heartbeat.on_tick(Instant::now()) {
                    HeartbeatAction::Ping => {
                        if let Err(e) = self.send(conn, &OutboundMessage::ping(Utc::now())).await {
                            warn!(error = %e, "Ping send failed");
                            return Some(ConnectionInput::Closed { clean: false });
                        }
                    }
                    HeartbeatAction::Dead { missed } => {
                        warn!(missed, "Push channel unresponsive");
                        *self.last_failure.lock().await =
                            Some(format!("{missed} pings unanswered"));
                        self.emit(ConnectionEvent::HeartbeatTimeout { missed });
                        let _ = conn.close(NORMAL_CLOSE).await;
                        return Some(ConnectionInput::HeartbeatLost);
                    }
                },
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                    if !*online_rx.borrow_and_update() {
                        info!("Network offline, closing push channel");
                        let _ = conn.close(NORMAL_CLOSE).await;
                        return Some(ConnectionInput::Online(false));
                    }
                }
            }
        }
    }

    async fn on_frame(
        &self,
        conn: &mut dyn Connection,
        text: &str,
        heartbeat: &mut HeartbeatTracker,
    ) -> AppResult<()> {
        SyncMetrics::bump(&self.metrics.messages_received);
        let message = match parse_inbound(text) {
            Ok(message) => message,
            Err(e) => {
                SyncMetrics::bump(&self.metrics.messages_dropped);
                warn!(error = %e, "Dropping malformed push message");
                return Ok(());
            }
        };

        match message {
            InboundMessage::Pong { .. } | InboundMessage::Heartbeat { .. } => {
                if let Some(rtt) = heartbeat.on_pong(Instant::now()) {
                    let rtt_ms = rtt.as_millis() as i64;
                    self.metrics
                        .last_rtt_ms
                        .store(rtt_ms as u64, Ordering::Relaxed);
                    debug!(rtt_ms, "Heartbeat round trip");
                    self.emit(ConnectionEvent::LatencySample { rtt_ms });
                }
                Ok(())
            }
            other => match self.dispatch(other).await {
                Some(reply) => self.send(conn, &reply).await,
                None => Ok(()),
            },
        }
    }

    async fn send(&self, conn: &mut dyn Connection, message: &OutboundMessage) -> AppResult<()> {
        conn.send(encode_outbound(message)?).await?;
        SyncMetrics::bump(&self.metrics.messages_sent);
        Ok(())
    }

    async fn dispatch(&self, message: InboundMessage) -> Option<OutboundMessage> {
        if self.destroyed.load(Ordering::SeqCst) {
            debug!(kind = message.kind(), "Ignoring message after destroy");
            return None;
        }

        match message {
            InboundMessage::PermissionChanged { user_id } => {
                self.on_permission_changed(user_id).await;
                None
            }
            InboundMessage::MenuUpdated(update) => {
                self.on_menu_updated(update).await;
                None
            }
            InboundMessage::Ping { timestamp } => Some(OutboundMessage::Pong { timestamp }),
            InboundMessage::Pong { .. } | InboundMessage::Heartbeat { .. } => None,
            InboundMessage::Unknown { kind } => {
                debug!(kind = %kind, "Ignoring unhandled push message type");
                None
            }
        }
    }

    async fn on_permission_changed(&self, user_id: Option<SubjectId>) {
        let subject = user_id.unwrap_or_else(|| self.session.subject.clone());
        info!(subject = %subject, "Backend reported permission change");
        self.emit(PermissionEvent::Changed {
            subject: subject.clone(),
        });
        self.invalidate(&subject);

        if subject == self.session.subject {
            self.refetch_all().await;
        }
    }

    async fn on_menu_updated(&self, update: MenuUpdate) {
        self.invalidate(&self.session.subject);

        let positions = match &update.position {
            Some(position) => vec![position.clone()],
            None => self.config.menu_positions.clone(),
        };
        for position in positions {
            if update.is_refetch() {
                self.refetch(&position).await;
                continue;
            }

            let outcome = {
                let mut trees = self.trees.write().await;
                trees.get_mut(&position).map(|tree| {
                    tree.apply(&update)
                        .map(|outcome| (outcome, tree.version().unwrap_or(0)))
                })
            };
            match outcome {
                None => {
                    debug!(position = %position, "No local menu to patch, refetching");
                    self.refetch(&position).await;
                }
                Some(Ok((ApplyOutcome::Applied { operations }, version))) => {
                    SyncMetrics::bump(&self.metrics.patches_applied);
                    debug!(position = %position, version, operations, "Menu patched");
                    self.emit(MenuEvent::Patched {
                        position: position.clone(),
                        version,
                        operations,
                    });
                    self.persist_menu(&position).await;
                }
                Some(Ok((ApplyOutcome::Stale, version))) => {
                    debug!(position = %position, version, "Ignoring stale menu update");
                }
                Some(Err(inconsistency)) => {
                    warn!(
                        position = %position,
                        reason = %inconsistency,
                        "Menu update inconsistent with local tree, refetching"
                    );
                    self.refetch(&position).await;
                }
            }
        }
    }

    fn invalidate(&self, subject: &SubjectId) {
        let removed = self.resolver.invalidate_subject(subject);
        self.emit(PermissionEvent::Invalidated {
            subject: subject.clone(),
            removed,
        });
    }

    async fn refetch_all(&self) {
        for position in &self.config.menu_positions {
            self.refetch(position).await;
        }
    }

    /// Replace a position's menu with a full fetch. On failure the previous
    /// menu stays, or the persisted one is loaded if memory is empty.
    async fn refetch(&self, position: &str) {
        SyncMetrics::bump(&self.metrics.refetches);
        let token = match self.store.get(&self.keys.auth_token()).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read auth token for menu fetch");
                None
            }
        };

        match self.menus.fetch_menu(position, token.as_deref()).await {
            Ok(listing) => {
                let tree = MenuTree::from_entries(position, listing.entries, listing.version);
                let entries = tree.len();
                let version = tree.version().unwrap_or(0);
                self.trees.write().await.insert(position.to_string(), tree);
                info!(position, entries, version, "Menu refreshed");
                self.emit(MenuEvent::Refreshed {
                    position: position.to_string(),
                    entries,
                    version,
                });
                self.persist_menu(position).await;
            }
            Err(e) => {
                warn!(position, error = %e, "Menu refetch failed");
                self.emit(MenuEvent::RefetchFailed {
                    position: position.to_string(),
                    reason: e.to_string(),
                });
                self.restore_menu_if_missing(position).await;
            }
        }
    }

    async fn restore_menu_if_missing(&self, position: &str) -> bool {
        if self.trees.read().await.contains_key(position) {
            return false;
        }

        let key = self.menu_key(position);
        let tree: MenuTree = match self.store.get_json(&key).await {
            Ok(Some(tree)) => tree,
            Ok(None) => return false,
            Err(e) => {
                warn!(position, error = %e, "Menu snapshot unreadable");
                return false;
            }
        };

        let entries = tree.len();
        let mut trees = self.trees.write().await;
        if trees.contains_key(position) {
            return false;
        }
        trees.insert(position.to_string(), tree);
        drop(trees);

        info!(position, entries, "Menu restored from snapshot");
        self.emit(MenuEvent::RestoredFromSnapshot {
            position: position.to_string(),
            entries,
        });
        true
    }

    async fn persist_menu(&self, position: &str) {
        let Some(tree) = self.trees.read().await.get(position).cloned() else {
            return;
        };
        if let Err(e) = self.store.set_json(&self.menu_key(position), &tree).await {
            warn!(position, error = %e, "Could not persist menu snapshot");
        }
    }

    async fn persist_all(&self) {
        let positions: Vec<String> = self.trees.read().await.keys().cloned().collect();
        for position in positions {
            self.persist_menu(&position).await;
        }
        if let Err(e) = self
            .resolver
            .save_snapshot(&self.store, &self.keys, &self.session.subject)
            .await
        {
            warn!(error = %e, "Could not persist permission cache snapshot");
        }
    }

    async fn enter_degraded(&self, attempts: u32) {
        self.degraded.store(true, Ordering::SeqCst);
        let reason = self
            .last_failure
            .lock()
            .await
            .clone()
            .unwrap_or_else(|| "reconnect attempts exhausted".to_string());
        warn!(attempts, reason = %reason, "Push channel unavailable, serving last-known-good menus");
        self.emit(ConnectionEvent::Degraded { attempts, reason });

        for position in &self.config.menu_positions {
            self.restore_menu_if_missing(position).await;
        }
    }

    async fn wait_retry(
        &self,
        attempt: u32,
        online_rx: &mut watch::Receiver<bool>,
    ) -> Option<ConnectionInput> {
        let delay = self.policy.delay(attempt);
        SyncMetrics::bump(&self.metrics.reconnect_attempts);
        info!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                _ = &mut sleep => return Some(ConnectionInput::RetryDue),
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                    if !*online_rx.borrow_and_update() {
                        return Some(ConnectionInput::Online(false));
                    }
                }
            }
        }
    }

    async fn wait_reachability(
        &self,
        online_rx: &mut watch::Receiver<bool>,
    ) -> Option<ConnectionInput> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            changed = online_rx.changed() => match changed {
                Ok(()) => Some(ConnectionInput::Online(*online_rx.borrow_and_update())),
                Err(_) => None,
            },
        }
    }

    async fn transition(&self, input: ConnectionInput) -> Step {
        let (step, attempt) = {
            let mut machine = self.machine.lock().await;
            let step = machine.handle(input);
            (step, machine.attempt())
        };
        if step.changed() {
            info!(from = %step.from, to = %step.to, attempt, "Push channel state changed");
            self.state_tx.send_replace(step.to);
            self.emit(ConnectionEvent::StateChanged {
                from: step.from,
                to: step.to,
                attempt,
            });
        }
        step
    }

    fn emit(&self, event: impl Into<ClientEvent>) {
        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        // No subscribers is fine.
        let _ = self.events.send(event.into());
    }

    fn channel_url(&self) -> String {
        format!(
            "{}/ws/permissions/{}",
            self.ws_base_url, self.session.subject
        )
    }

    fn menu_key(&self, position: &str) -> String {
        self.keys
            .menu_snapshot(&self.session.subject, self.session.role.as_str(), position)
    }
}
