//! Live connection state shared between the hub and a connection's pumps.
//!
//! A [`Connection`] is created once the handshake has produced a user id and is
//! owned by the hub's registry while registered. The hub and other senders
//! enqueue onto its bounded outbound queue without blocking; the write pump
//! is the single consumer. Closing the connection drops the queue's sender,
//! which ends the write pump once the queue drains, and cancels
//! [`Connection::closed`], which ends the read pump immediately.

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::domain::{ChatId, ConnectionId, PresenceStatus, UserId};

/// Receiving half of a connection's outbound queue, drained by the write pump.
pub type OutboundQueue = mpsc::Receiver<Arc<str>>;

/// Lifecycle of a connection instance.
///
/// `Connecting → Online → Closing → Closed`. Reconnecting is never modelled
/// here: a reconnect is a new `Connection` that supersedes this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Online,
    Closing,
    Closed,
}

/// Why a frame could not be enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    #[error("outbound queue is full")]
    Full,
    #[error("outbound queue is closed")]
    Closed,
}

pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    /// `None` once the connection has been closed.
    outbound: Mutex<Option<mpsc::Sender<Arc<str>>>>,
    rooms: Mutex<HashSet<ChatId>>,
    status: Mutex<PresenceStatus>,
    state: Mutex<ConnectionState>,
    /// Unix milliseconds (UTC)
    connected_at: i64,
    /// Unix milliseconds (UTC)
    last_activity: AtomicI64,
    closed: CancellationToken,
}

impl Connection {
    /// Create a connection for `user_id` with an outbound queue of `capacity` frames.
    pub fn new(user_id: UserId, capacity: usize, now: i64) -> (Arc<Self>, OutboundQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let connection = Arc::new(Self {
            id: ConnectionId::generate(),
            user_id,
            outbound: Mutex::new(Some(tx)),
            rooms: Mutex::new(HashSet::new()),
            status: Mutex::new(PresenceStatus::Offline),
            state: Mutex::new(ConnectionState::Connecting),
            connected_at: now,
            last_activity: AtomicI64::new(now),
            closed: CancellationToken::new(),
        });
        (connection, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn connected_at(&self) -> i64 {
        self.connected_at
    }

    /// Enqueue a frame without waiting for room in the queue.
    pub fn try_enqueue(&self, frame: Arc<str>) -> Result<(), EnqueueError> {
        let outbound = self.outbound.lock();
        let Some(tx) = outbound.as_ref() else {
            return Err(EnqueueError::Closed);
        };
        tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => EnqueueError::Full,
            TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Mark the connection as registered and online.
    pub fn mark_online(&self, now: i64) {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Connecting {
                return;
            }
            *state = ConnectionState::Online;
        }
        *self.status.lock() = PresenceStatus::Online;
        self.touch(now);
    }

    /// Close the outbound queue and signal both pumps to stop. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if matches!(*state, ConnectionState::Closing | ConnectionState::Closed) {
                return;
            }
            *state = ConnectionState::Closing;
        }
        self.outbound.lock().take();
        *self.status.lock() = PresenceStatus::Offline;
        self.closed.cancel();
    }

    /// Record that the transport is gone. Called by the write pump on exit.
    pub fn mark_closed(&self) {
        self.close();
        *self.state.lock() = ConnectionState::Closed;
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the connection has been closed by anyone.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }

    pub fn touch(&self, now: i64) {
        self.last_activity.fetch_max(now, Ordering::Relaxed);
    }

    pub fn last_activity(&self) -> i64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> PresenceStatus {
        *self.status.lock()
    }

    /// Set the presence status. Ignored once the connection is closing.
    pub fn set_status(&self, status: PresenceStatus) -> bool {
        if self.is_closed() {
            return false;
        }
        let mut current = self.status.lock();
        if *current == status {
            return false;
        }
        *current = status;
        true
    }

    /// Rooms this connection has joined, in ascending order.
    pub fn rooms(&self) -> Vec<ChatId> {
        let mut rooms: Vec<ChatId> = self.rooms.lock().iter().copied().collect();
        rooms.sort();
        rooms
    }

    pub fn in_room(&self, chat_id: ChatId) -> bool {
        self.rooms.lock().contains(&chat_id)
    }

    pub(crate) fn join_room(&self, chat_id: ChatId) -> bool {
        self.rooms.lock().insert(chat_id)
    }

    pub(crate) fn leave_room(&self, chat_id: ChatId) -> bool {
        self.rooms.lock().remove(&chat_id)
    }

    /// Empty the room set, returning what it held in ascending order.
    pub(crate) fn take_rooms(&self) -> Vec<ChatId> {
        let mut rooms: Vec<ChatId> = self.rooms.lock().drain().collect();
        rooms.sort();
        rooms
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("state", &self.state())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_until_full() {
        // テスト項目: キューが満杯になると Full が返される
        // given (前提条件):
        let (conn, mut queue) = Connection::new(UserId::new(1), 2, 0);

        // when (操作):
        let first = conn.try_enqueue(Arc::from("a"));
        let second = conn.try_enqueue(Arc::from("b"));
        let third = conn.try_enqueue(Arc::from("c"));

        // then (期待する結果):
        assert_eq!(first, Ok(()));
        assert_eq!(second, Ok(()));
        assert_eq!(third, Err(EnqueueError::Full));
        assert_eq!(queue.recv().await.as_deref(), Some("a"));
        assert_eq!(queue.recv().await.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_close_ends_queue_after_draining() {
        // テスト項目: close 後はキュー内のメッセージを流し切った後に終端する
        // given (前提条件):
        let (conn, mut queue) = Connection::new(UserId::new(1), 4, 0);
        conn.try_enqueue(Arc::from("pending")).unwrap();

        // when (操作):
        conn.close();

        // then (期待する結果):
        assert_eq!(conn.try_enqueue(Arc::from("late")), Err(EnqueueError::Closed));
        assert_eq!(queue.recv().await.as_deref(), Some("pending"));
        assert_eq!(queue.recv().await, None);
        assert!(conn.is_closed());
        assert_eq!(conn.state(), ConnectionState::Closing);
        assert_eq!(conn.status(), PresenceStatus::Offline);
    }

    #[tokio::test]
    async fn test_closed_future_resolves_after_close() {
        // テスト項目: close すると closed() の Future が完了する
        // given (前提条件):
        let (conn, _queue) = Connection::new(UserId::new(1), 1, 0);
        let waiter = conn.clone();
        let handle = tokio::spawn(async move { waiter.closed().await });

        // when (操作):
        conn.close();

        // then (期待する結果):
        assert!(handle.await.is_ok());
    }

    #[test]
    fn test_lifecycle_transitions() {
        // テスト項目: connecting → online → closing → closed の順に遷移する
        // given (前提条件):
        let (conn, _queue) = Connection::new(UserId::new(1), 1, 100);
        let initial = conn.state();

        // when (操作):
        conn.mark_online(200);
        let online = conn.state();
        conn.close();
        let closing = conn.state();
        conn.mark_closed();

        // then (期待する結果):
        assert_eq!(initial, ConnectionState::Connecting);
        assert_eq!(online, ConnectionState::Online);
        assert_eq!(closing, ConnectionState::Closing);
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.last_activity(), 200);
    }

    #[test]
    fn test_room_set_tracking() {
        // テスト項目: 参加ルームの集合が追加・削除・取り出しに追従する
        // given (前提条件):
        let (conn, _queue) = Connection::new(UserId::new(1), 1, 0);

        // when (操作):
        conn.join_room(ChatId::new(20));
        conn.join_room(ChatId::new(10));
        let joined_twice = conn.join_room(ChatId::new(10));
        conn.leave_room(ChatId::new(20));
        conn.join_room(ChatId::new(30));
        let taken = conn.take_rooms();

        // then (期待する結果):
        assert!(!joined_twice);
        assert_eq!(taken, vec![ChatId::new(10), ChatId::new(30)]);
        assert!(conn.rooms().is_empty());
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        // テスト項目: 最終アクティビティ時刻は過去に戻らない
        // given (前提条件):
        let (conn, _queue) = Connection::new(UserId::new(1), 1, 500);

        // when (操作):
        conn.touch(400);
        conn.touch(900);
        conn.touch(800);

        // then (期待する結果):
        assert_eq!(conn.last_activity(), 900);
    }

    #[test]
    fn test_set_status_after_close_is_ignored() {
        // テスト項目: close 後のステータス変更は無視される
        // given (前提条件):
        let (conn, _queue) = Connection::new(UserId::new(1), 1, 0);
        conn.mark_online(0);
        let changed = conn.set_status(PresenceStatus::Away);

        // when (操作):
        conn.close();
        let changed_after_close = conn.set_status(PresenceStatus::Busy);

        // then (期待する結果):
        assert!(changed);
        assert!(!changed_after_close);
        assert_eq!(conn.status(), PresenceStatus::Offline);
    }
}
