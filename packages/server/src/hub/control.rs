//! The hub handle and its control loop.
//!
//! [`Hub`] is a cheap, cloneable handle. Mutations are sent as commands to the
//! [`HubLoop`], the single writer of the registry and room index. Read-only
//! accessors take the registry's read lock and never go through the loop.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use parking_lot::RwLock;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tsudoi_shared::time::Clock;

use crate::{
    domain::{ChatId, ConnectionId, OutboundEnvelope, PresenceStatus, UserId},
    infrastructure::dto::conversion::encode_outbound,
};

use super::{
    BroadcastEnvelope, Connection, OutboundQueue, RoomIndex,
    command::HubCommand,
    metrics::{HubCounters, MetricsSnapshot, run_metrics_ticker},
    presence::{PresenceSnapshot, membership_envelope, presence_envelope, typing_envelope},
};

/// Sizing and timing of the hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Frames a connection may have queued before it is dropped as unresponsive.
    pub outbound_queue_capacity: usize,
    /// Commands that may wait for the control loop before submitters wait.
    pub command_capacity: usize,
    /// Period of the metrics ticker.
    pub metrics_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: 256,
            command_capacity: 1024,
            metrics_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Default)]
struct HubState {
    connections: HashMap<UserId, Arc<Connection>>,
    rooms: RoomIndex,
}

struct HubShared {
    state: RwLock<HubState>,
    counters: HubCounters,
    latest_metrics: RwLock<Option<MetricsSnapshot>>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    outbound_queue_capacity: usize,
    started_at: i64,
}

/// Handle to the hub. Clones share the same registry and control loop.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::Sender<HubCommand>,
    shared: Arc<HubShared>,
}

/// The control loop. Run it with [`HubLoop::run`] on its own task.
pub struct HubLoop {
    commands: mpsc::Receiver<HubCommand>,
    shared: Arc<HubShared>,
}

impl Hub {
    /// Create a hub handle and its (not yet running) control loop.
    pub fn new(config: &HubConfig, clock: Arc<dyn Clock>) -> (Self, HubLoop) {
        let (tx, rx) = mpsc::channel(config.command_capacity.max(1));
        let started_at = clock.now_millis();
        let shared = Arc::new(HubShared {
            state: RwLock::new(HubState::default()),
            counters: HubCounters::default(),
            latest_metrics: RwLock::new(None),
            clock,
            shutdown: CancellationToken::new(),
            outbound_queue_capacity: config.outbound_queue_capacity.max(1),
            started_at,
        });
        let hub = Self {
            commands: tx,
            shared: shared.clone(),
        };
        let control_loop = HubLoop {
            commands: rx,
            shared,
        };
        (hub, control_loop)
    }

    /// Create a hub and spawn its control loop and metrics ticker.
    ///
    /// The returned handle completes once the control loop has exited.
    pub fn spawn(config: &HubConfig, clock: Arc<dyn Clock>) -> (Self, JoinHandle<()>) {
        let (hub, control_loop) = Self::new(config, clock);
        let handle = tokio::spawn(control_loop.run());
        tokio::spawn(run_metrics_ticker(hub.clone(), config.metrics_interval));
        (hub, handle)
    }

    /// Current time on the hub's clock (Unix milliseconds).
    pub fn now(&self) -> i64 {
        self.shared.clock.now_millis()
    }

    /// Create an unregistered connection for `user_id` with the configured
    /// outbound queue capacity.
    pub fn connection(&self, user_id: UserId) -> (Arc<Connection>, OutboundQueue) {
        Connection::new(user_id, self.shared.outbound_queue_capacity, self.now())
    }

    async fn submit(&self, command: HubCommand) -> bool {
        let name = command.name();
        if self.commands.send(command).await.is_err() {
            tracing::debug!(command = name, "hub is stopped; command dropped");
            return false;
        }
        true
    }

    /// Register `connection`, superseding any connection the user already has.
    pub async fn register(&self, connection: Arc<Connection>) {
        if !self.submit(HubCommand::Register(connection.clone())).await {
            connection.close();
        }
    }

    /// Unregister `connection`. A no-op if it is no longer the user's live one.
    pub async fn unregister(&self, connection: Arc<Connection>) {
        if !self.submit(HubCommand::Unregister(connection.clone())).await {
            connection.close();
        }
    }

    /// Add the user's live connection to `chat_id`.
    pub async fn join_room(&self, user_id: UserId, chat_id: ChatId) {
        self.submit(HubCommand::Join {
            user_id,
            chat_id,
            origin: None,
        })
        .await;
    }

    /// Like [`Hub::join_room`], but ignored unless `origin` is still the
    /// user's live connection.
    pub async fn join_room_from(&self, origin: ConnectionId, user_id: UserId, chat_id: ChatId) {
        self.submit(HubCommand::Join {
            user_id,
            chat_id,
            origin: Some(origin),
        })
        .await;
    }

    pub async fn leave_room(&self, user_id: UserId, chat_id: ChatId) {
        self.submit(HubCommand::Leave {
            user_id,
            chat_id,
            origin: None,
        })
        .await;
    }

    /// Like [`Hub::leave_room`], but ignored unless `origin` is still the
    /// user's live connection.
    pub async fn leave_room_from(&self, origin: ConnectionId, user_id: UserId, chat_id: ChatId) {
        self.submit(HubCommand::Leave {
            user_id,
            chat_id,
            origin: Some(origin),
        })
        .await;
    }

    /// Change a user's presence status and tell every room they are in.
    pub async fn set_status(&self, user_id: UserId, status: PresenceStatus) {
        self.submit(HubCommand::SetStatus {
            user_id,
            status,
            origin: None,
        })
        .await;
    }

    /// Like [`Hub::set_status`], but ignored unless `origin` is still the
    /// user's live connection.
    pub async fn set_status_from(
        &self,
        origin: ConnectionId,
        user_id: UserId,
        status: PresenceStatus,
    ) {
        self.submit(HubCommand::SetStatus {
            user_id,
            status,
            origin: Some(origin),
        })
        .await;
    }

    pub async fn broadcast(&self, envelope: BroadcastEnvelope) {
        self.submit(HubCommand::Broadcast(envelope)).await;
    }

    /// Broadcast a typing indicator from `user_id` to the rest of `chat_id`.
    pub async fn typing(&self, user_id: UserId, chat_id: ChatId, is_typing: bool) {
        self.broadcast(typing_envelope(chat_id, user_id, is_typing, self.now()))
            .await;
    }

    /// Deliver `envelope` to one user. Nothing happens if the user is offline.
    pub async fn send_direct(&self, user_id: UserId, envelope: OutboundEnvelope) {
        self.submit(HubCommand::Direct { user_id, envelope }).await;
    }

    /// Wait until every command this caller submitted earlier has been applied.
    ///
    /// Returns immediately once the hub has stopped.
    pub async fn barrier(&self) {
        let (tx, rx) = oneshot::channel();
        if self.submit(HubCommand::Barrier(tx)).await {
            let _ = rx.await;
        }
    }

    /// Stop the control loop. Every live connection is closed on exit.
    pub fn shutdown(&self) {
        self.shared.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shared.shutdown.clone()
    }

    /// Count one decoded inbound frame.
    pub fn record_received(&self) {
        self.shared.counters.add_received();
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.shared.state.read().connections.contains_key(&user_id)
    }

    /// Whether `connection_id` is the registered connection of `user_id`.
    pub fn is_current(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        self.shared
            .state
            .read()
            .connections
            .get(&user_id)
            .is_some_and(|connection| connection.id() == connection_id)
    }

    /// Connected users in ascending order.
    pub fn connected_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.shared.state.read().connections.keys().copied().collect();
        users.sort();
        users
    }

    pub fn presence(&self, user_id: UserId) -> Option<PresenceSnapshot> {
        self.shared
            .state
            .read()
            .connections
            .get(&user_id)
            .map(|connection| PresenceSnapshot::of(connection))
    }

    /// Members of `chat_id` in ascending order; empty if the room does not exist.
    pub fn room_users(&self, chat_id: ChatId) -> Vec<UserId> {
        self.shared.state.read().rooms.members(chat_id)
    }

    /// Rooms `user_id` has joined; empty if the user is offline.
    pub fn user_rooms(&self, user_id: UserId) -> Vec<ChatId> {
        self.shared
            .state
            .read()
            .connections
            .get(&user_id)
            .map(|connection| connection.rooms())
            .unwrap_or_default()
    }

    pub fn is_member(&self, chat_id: ChatId, user_id: UserId) -> bool {
        self.shared.state.read().rooms.is_member(chat_id, user_id)
    }

    /// Metrics computed now.
    pub fn metrics(&self) -> MetricsSnapshot {
        let (connected, rooms) = {
            let state = self.shared.state.read();
            (state.connections.len(), state.rooms.room_count())
        };
        MetricsSnapshot::collect(
            &self.shared.counters,
            connected,
            rooms,
            self.shared.started_at,
            self.now(),
        )
    }

    /// The snapshot taken by the last metrics tick, or a fresh one before the first tick.
    pub fn cached_metrics(&self) -> MetricsSnapshot {
        if let Some(snapshot) = self.shared.latest_metrics.read().clone() {
            return snapshot;
        }
        self.refresh_metrics()
    }

    pub(crate) fn refresh_metrics(&self) -> MetricsSnapshot {
        let snapshot = self.metrics();
        *self.shared.latest_metrics.write() = Some(snapshot.clone());
        snapshot
    }
}

impl HubLoop {
    /// Apply commands one at a time until shutdown, then close every connection.
    pub async fn run(mut self) {
        tracing::info!("hub control loop started");

        loop {
            let command = tokio::select! {
                biased;
                () = self.shared.shutdown.cancelled() => break,
                command = self.commands.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };
            self.handle(command);
        }

        self.teardown();
    }

    fn handle(&self, command: HubCommand) {
        let now = self.shared.clock.now_millis();
        let mut state = self.shared.state.write();

        let pending = match command {
            HubCommand::Register(connection) => self.register(&mut state, connection, now),
            HubCommand::Unregister(connection) => self.unregister(&mut state, &connection, now),
            HubCommand::Join {
                user_id,
                chat_id,
                origin,
            } => self.join(&mut state, user_id, chat_id, origin, now),
            HubCommand::Leave {
                user_id,
                chat_id,
                origin,
            } => self.leave(&mut state, user_id, chat_id, origin, now),
            HubCommand::SetStatus {
                user_id,
                status,
                origin,
            } => self.set_status(&state, user_id, status, origin, now),
            HubCommand::Broadcast(envelope) => vec![envelope],
            HubCommand::Direct { user_id, envelope } => {
                self.direct(&mut state, user_id, &envelope, now)
            }
            HubCommand::Barrier(done) => {
                let _ = done.send(());
                Vec::new()
            }
        };

        self.fan_out(&mut state, pending, now);
    }

    fn register(
        &self,
        state: &mut HubState,
        connection: Arc<Connection>,
        now: i64,
    ) -> Vec<BroadcastEnvelope> {
        let user_id = connection.user_id();
        if connection.is_closed() {
            tracing::debug!(%user_id, connection_id = %connection.id(), "connection closed before registration");
            return Vec::new();
        }

        let mut pending = Vec::new();
        if let Some(previous) = state.connections.get(&user_id).cloned() {
            if previous.id() == connection.id() {
                return pending;
            }
            tracing::info!(
                %user_id,
                previous = %previous.id(),
                current = %connection.id(),
                "superseding existing connection"
            );
            pending = self.evict(state, &previous, now);
        }

        connection.mark_online(now);
        state.connections.insert(user_id, connection.clone());
        self.shared.counters.add_registered();
        tracing::info!(
            %user_id,
            connection_id = %connection.id(),
            connected = state.connections.len(),
            "connection registered"
        );
        pending
    }

    fn unregister(
        &self,
        state: &mut HubState,
        connection: &Arc<Connection>,
        now: i64,
    ) -> Vec<BroadcastEnvelope> {
        let user_id = connection.user_id();
        let is_current = state
            .connections
            .get(&user_id)
            .is_some_and(|current| current.id() == connection.id());
        if !is_current {
            // A superseded connection is already closed; `close` is idempotent
            // and leaves the registry and rooms untouched.
            connection.close();
            tracing::debug!(%user_id, connection_id = %connection.id(), "stale unregister ignored");
            return Vec::new();
        }

        let pending = self.evict(state, connection, now);
        tracing::info!(
            %user_id,
            connection_id = %connection.id(),
            connected = state.connections.len(),
            "connection unregistered"
        );
        pending
    }

    /// Remove `connection` from the registry and every room, close it, and
    /// return the offline presence events for the rooms it left.
    fn evict(
        &self,
        state: &mut HubState,
        connection: &Arc<Connection>,
        now: i64,
    ) -> Vec<BroadcastEnvelope> {
        let user_id = connection.user_id();
        if state
            .connections
            .get(&user_id)
            .is_some_and(|current| current.id() == connection.id())
        {
            state.connections.remove(&user_id);
        }
        connection.close();

        let rooms = connection.take_rooms();
        for chat_id in &rooms {
            state.rooms.remove_member(*chat_id, user_id);
        }
        rooms
            .into_iter()
            .map(|chat_id| presence_envelope(chat_id, user_id, PresenceStatus::Offline, now))
            .collect()
    }

    /// The user's live connection, unless `origin` names a different one.
    fn live_connection(
        state: &HubState,
        user_id: UserId,
        origin: Option<ConnectionId>,
    ) -> Option<Arc<Connection>> {
        let connection = state.connections.get(&user_id)?;
        match origin {
            Some(origin) if origin != connection.id() => None,
            _ => Some(connection.clone()),
        }
    }

    fn join(
        &self,
        state: &mut HubState,
        user_id: UserId,
        chat_id: ChatId,
        origin: Option<ConnectionId>,
        now: i64,
    ) -> Vec<BroadcastEnvelope> {
        let Some(connection) = Self::live_connection(state, user_id, origin) else {
            tracing::debug!(%user_id, %chat_id, "join from stale or unregistered connection ignored");
            return Vec::new();
        };

        let added = state.rooms.add_member(chat_id, user_id);
        connection.join_room(chat_id);
        if !added {
            tracing::debug!(%user_id, %chat_id, "already a member");
            return Vec::new();
        }

        tracing::info!(%user_id, %chat_id, members = state.rooms.member_count(chat_id), "joined room");
        vec![membership_envelope(chat_id, user_id, true, now)]
    }

    fn leave(
        &self,
        state: &mut HubState,
        user_id: UserId,
        chat_id: ChatId,
        origin: Option<ConnectionId>,
        now: i64,
    ) -> Vec<BroadcastEnvelope> {
        match Self::live_connection(state, user_id, origin) {
            Some(connection) => {
                connection.leave_room(chat_id);
            }
            None if origin.is_some() => {
                tracing::debug!(%user_id, %chat_id, "leave from stale connection ignored");
                return Vec::new();
            }
            None => {}
        }
        if !state.rooms.remove_member(chat_id, user_id) {
            tracing::debug!(%user_id, %chat_id, "leave from non-member ignored");
            return Vec::new();
        }

        tracing::info!(%user_id, %chat_id, members = state.rooms.member_count(chat_id), "left room");
        vec![membership_envelope(chat_id, user_id, false, now)]
    }

    fn set_status(
        &self,
        state: &HubState,
        user_id: UserId,
        status: PresenceStatus,
        origin: Option<ConnectionId>,
        now: i64,
    ) -> Vec<BroadcastEnvelope> {
        let Some(connection) = Self::live_connection(state, user_id, origin) else {
            tracing::debug!(%user_id, "status change from stale or unregistered connection ignored");
            return Vec::new();
        };
        if !connection.set_status(status) {
            return Vec::new();
        }

        tracing::info!(%user_id, %status, "presence status changed");
        connection
            .rooms()
            .into_iter()
            .map(|chat_id| presence_envelope(chat_id, user_id, status, now))
            .collect()
    }

    fn direct(
        &self,
        state: &mut HubState,
        user_id: UserId,
        envelope: &OutboundEnvelope,
        now: i64,
    ) -> Vec<BroadcastEnvelope> {
        let Some(connection) = state.connections.get(&user_id).cloned() else {
            tracing::debug!(%user_id, kind = envelope.event.kind(), "direct send to offline user skipped");
            return Vec::new();
        };
        let frame = match encode_outbound(envelope) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(%user_id, "failed to encode direct envelope: {}", e);
                return Vec::new();
            }
        };

        match connection.try_enqueue(frame) {
            Ok(()) => {
                self.shared.counters.add_sent(1);
                Vec::new()
            }
            Err(reason) => {
                tracing::warn!(%user_id, %reason, "dropping unresponsive connection");
                self.shared.counters.add_dropped();
                self.evict(state, &connection, now)
            }
        }
    }

    /// Deliver each envelope to its room. Recipients whose queue rejects a
    /// frame are evicted, and the resulting presence events are delivered in
    /// turn.
    fn fan_out(&self, state: &mut HubState, envelopes: Vec<BroadcastEnvelope>, now: i64) {
        let mut pending: VecDeque<BroadcastEnvelope> = envelopes.into();

        while let Some(envelope) = pending.pop_front() {
            let frame = match encode_outbound(&envelope.to_outbound()) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(chat_id = %envelope.chat_id, kind = envelope.kind(), "failed to encode broadcast: {}", e);
                    continue;
                }
            };

            let mut delivered = 0;
            let mut unresponsive = Vec::new();
            for member in state.rooms.members(envelope.chat_id) {
                if envelope.exclude == Some(member) {
                    continue;
                }
                let Some(connection) = state.connections.get(&member) else {
                    continue;
                };
                match connection.try_enqueue(frame.clone()) {
                    Ok(()) => delivered += 1,
                    Err(reason) => {
                        tracing::warn!(
                            user_id = %member,
                            chat_id = %envelope.chat_id,
                            %reason,
                            "dropping unresponsive connection"
                        );
                        unresponsive.push(connection.clone());
                    }
                }
            }

            self.shared.counters.add_sent(delivered);
            tracing::debug!(
                chat_id = %envelope.chat_id,
                kind = envelope.kind(),
                delivered,
                "broadcast delivered"
            );

            for connection in unresponsive {
                self.shared.counters.add_dropped();
                pending.extend(self.evict(state, &connection, now));
            }
        }
    }

    fn teardown(&mut self) {
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            match command {
                HubCommand::Register(connection) | HubCommand::Unregister(connection) => {
                    connection.close();
                }
                HubCommand::Barrier(done) => {
                    let _ = done.send(());
                }
                _ => {}
            }
        }

        let mut state = self.shared.state.write();
        let closed = state.connections.len();
        for (_, connection) in state.connections.drain() {
            connection.close();
        }
        state.rooms.clear();
        self.shared.shutdown.cancel();
        tracing::info!(closed, "hub control loop stopped");
    }
}
