//! The session gateway: one actor task owning all room state.
//!
//! Every mutation — joins, strokes, guesses, disconnects, deferred round
//! advances, remote frames — arrives as a [`GatewayCommand`] on a single
//! mpsc channel and is processed to completion before the next one. That
//! serialization is the whole concurrency story: the presenter/secret
//! pair can't be observed half-written because nothing preempts a
//! command mid-handling.
//!
//! Outbound delivery is indirect. Each connection registers an unbounded
//! event sender; the gateway resolves a [`Recipient`] against the room's
//! membership and pushes events into the matching senders. The writer
//! task on the connection side drains them onto the socket.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use scrawl_backplane::{Frame, RedisBackplane};
use scrawl_protocol::{
    ClientEvent, ConnectionId, Recipient, RoomId, ServerEvent,
};
use scrawl_room::round;
use scrawl_room::{Room, RoomRegistry, WordSource};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Tunables for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Settle window between a correct guess and the next round.
    pub advance_delay: Duration,

    /// When set, empty rooms idle longer than this are reaped on a
    /// timer. The default keeps every room forever.
    pub idle_ttl: Option<Duration>,

    /// When enabled, a presenter disconnecting advances their room's
    /// round immediately instead of leaving it stalled.
    pub forfeit_on_disconnect: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            advance_delay: Duration::from_secs(3),
            idle_ttl: None,
            forfeit_on_disconnect: false,
        }
    }
}

/// A command posted to the gateway actor.
pub(crate) enum GatewayCommand {
    /// A new connection's outbound event channel.
    Register {
        conn: ConnectionId,
        tx: mpsc::UnboundedSender<ServerEvent>,
    },
    /// A decoded client event.
    Inbound {
        conn: ConnectionId,
        event: ClientEvent,
    },
    /// Tell one connection its last event was no good.
    Reject {
        conn: ConnectionId,
        message: String,
    },
    /// The connection's socket is gone.
    Disconnect { conn: ConnectionId },
    /// A settle window elapsed; rotate the room into a new round.
    AdvanceRound { room: RoomId },
    /// A frame published by a sibling instance.
    Remote(Frame),
    /// Reap idle rooms (posted by the reaper interval, if configured).
    Reap,
}

/// Cloneable handle for posting commands to the gateway actor.
///
/// Sends are fire-and-forget: if the actor is gone the server is
/// shutting down and there is nobody left to tell.
#[derive(Clone)]
pub struct GatewayHandle {
    tx: mpsc::UnboundedSender<GatewayCommand>,
}

impl GatewayHandle {
    pub(crate) fn register(
        &self,
        conn: ConnectionId,
        tx: mpsc::UnboundedSender<ServerEvent>,
    ) {
        let _ = self.tx.send(GatewayCommand::Register { conn, tx });
    }

    pub(crate) fn inbound(&self, conn: ConnectionId, event: ClientEvent) {
        let _ = self.tx.send(GatewayCommand::Inbound { conn, event });
    }

    pub(crate) fn reject(&self, conn: ConnectionId, message: String) {
        let _ = self.tx.send(GatewayCommand::Reject { conn, message });
    }

    pub(crate) fn disconnect(&self, conn: ConnectionId) {
        let _ = self.tx.send(GatewayCommand::Disconnect { conn });
    }

    pub(crate) fn advance(&self, room: RoomId) {
        let _ = self.tx.send(GatewayCommand::AdvanceRound { room });
    }

    pub(crate) fn remote(&self, frame: Frame) {
        let _ = self.tx.send(GatewayCommand::Remote(frame));
    }

    pub(crate) fn reap(&self) {
        let _ = self.tx.send(GatewayCommand::Reap);
    }
}

/// A broadcast queued for the sibling instances.
pub(crate) type OutboundFrame = (RoomId, Recipient, ServerEvent);

/// The actor state. Lives on its own task; never shared.
pub(crate) struct Gateway {
    config: GatewayConfig,
    words: Arc<dyn WordSource>,
    /// Ordered queue into the backplane publisher task, when one is
    /// connected. Frames are queued synchronously during emission, so
    /// they leave in the order the handler produced them.
    publish: Option<mpsc::UnboundedSender<OutboundFrame>>,
    registry: RoomRegistry,
    /// Outbound event channel per registered connection.
    senders: HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
    /// In-flight settle timers by room. Entries are removed when the
    /// advance fires; nothing aborts them today, but this is where a
    /// cancellation path would start.
    pending_advances: HashMap<RoomId, JoinHandle<()>>,
    /// Self-handle, cloned into settle timers so they can post back.
    handle: GatewayHandle,
}

impl Gateway {
    /// Spawns the gateway actor and returns its handle.
    pub(crate) fn spawn(
        config: GatewayConfig,
        words: Arc<dyn WordSource>,
        backplane: Option<RedisBackplane>,
    ) -> GatewayHandle {
        Self::spawn_with_publish(config, words, backplane.map(spawn_publisher))
    }

    /// Spawns the actor with an already-wired publish queue.
    pub(crate) fn spawn_with_publish(
        config: GatewayConfig,
        words: Arc<dyn WordSource>,
        publish: Option<mpsc::UnboundedSender<OutboundFrame>>,
    ) -> GatewayHandle {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = GatewayHandle { tx };

        let mut gateway = Gateway {
            config,
            words,
            publish,
            registry: RoomRegistry::new(),
            senders: HashMap::new(),
            pending_advances: HashMap::new(),
            handle: handle.clone(),
        };

        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                gateway.handle_command(cmd);
            }
            info!("gateway stopped");
        });

        handle
    }

    fn handle_command(&mut self, cmd: GatewayCommand) {
        match cmd {
            GatewayCommand::Register { conn, tx } => {
                self.senders.insert(conn, tx);
            }
            GatewayCommand::Inbound { conn, event } => {
                self.on_inbound(conn, event);
            }
            GatewayCommand::Reject { conn, message } => {
                self.send_local(conn, ServerEvent::Rejected { message });
            }
            GatewayCommand::Disconnect { conn } => self.on_disconnect(conn),
            GatewayCommand::AdvanceRound { room } => self.on_advance(room),
            GatewayCommand::Remote(frame) => self.on_remote(frame),
            GatewayCommand::Reap => {
                if let Some(ttl) = self.config.idle_ttl {
                    self.registry.reap_idle(ttl);
                }
            }
        }
    }

    fn on_inbound(&mut self, conn: ConnectionId, event: ClientEvent) {
        if let Err(e) = event.validate() {
            debug!(%conn, error = %e, "event failed validation");
            self.send_local(
                conn,
                ServerEvent::Rejected {
                    message: e.to_string(),
                },
            );
            return;
        }

        match event {
            ClientEvent::Join { room, name } => self.on_join(conn, room, name),
            ClientEvent::Draw { room, stroke } => {
                self.on_draw(conn, room, stroke);
            }
            ClientEvent::Guess { room, text } => self.on_guess(conn, room, text),
            ClientEvent::Leave { room } => self.on_leave(conn, room),
        }
    }

    fn on_join(&mut self, conn: ConnectionId, room_id: RoomId, name: String) {
        let room = self.registry.ensure_room(&room_id);

        if room.player(conn).is_some() {
            // Re-join of an existing member: just refresh their view.
            debug!(%conn, room = %room_id, "duplicate join, resending snapshot");
            let snapshot = snapshot_of(room);
            self.send_local(conn, snapshot);
            return;
        }

        let mut out = Vec::new();
        match room.add_player(conn, name.clone()) {
            Ok(()) => {
                info!(%conn, room = %room_id, name = %name, "player joined");
            }
            Err(e) => {
                warn!(%conn, room = %room_id, error = %e, "join failed");
                self.send_local(
                    conn,
                    ServerEvent::Rejected {
                        message: e.to_string(),
                    },
                );
                return;
            }
        }

        let mut round_events = Vec::new();
        if !room.phase().has_started() {
            // First member ever: they present the first round.
            let words = Arc::clone(&self.words);
            match round::assign_first_presenter(room, conn, words.as_ref()) {
                Ok(()) => {
                    round_events.push((
                        Recipient::All,
                        ServerEvent::PresenterAssigned {
                            conn,
                            name: name.clone(),
                        },
                    ));
                    if let Some(secret) = room.secret() {
                        round_events.push((
                            Recipient::Conn(conn),
                            ServerEvent::RoundStarted {
                                secret: secret.to_string(),
                            },
                        ));
                    }
                }
                Err(e) => {
                    warn!(room = %room_id, error = %e, "first round not started");
                }
            }
        }

        // The snapshot is taken after any round the join itself starts,
        // so a first joiner already sees themselves as presenter.
        out.push((Recipient::Conn(conn), snapshot_of(room)));
        out.push((
            Recipient::AllExcept(conn),
            ServerEvent::PlayerJoined { conn, name },
        ));
        out.extend(round_events);

        for (recipient, event) in out {
            self.emit(&room_id, recipient, event);
        }
    }

    fn on_draw(
        &mut self,
        conn: ConnectionId,
        room_id: RoomId,
        stroke: serde_json::Value,
    ) {
        let Some(room) = self.registry.get_mut(&room_id) else {
            return;
        };
        if room.presenter() != Some(conn) {
            // Not an error the sender hears about: stale strokes race in
            // right after rotation and are expected noise.
            debug!(%conn, room = %room_id, "stroke from non-presenter dropped");
            return;
        }
        room.push_stroke(stroke.clone());
        self.emit(
            &room_id,
            Recipient::AllExcept(conn),
            ServerEvent::Draw { from: conn, stroke },
        );
    }

    fn on_guess(&mut self, conn: ConnectionId, room_id: RoomId, text: String) {
        let Some(room) = self.registry.get_mut(&room_id) else {
            return;
        };
        let Some(player) = room.player(conn) else {
            debug!(%conn, room = %room_id, "guess from non-member dropped");
            return;
        };
        let name = player.name.clone();

        let outcome = round::evaluate_guess(room, conn, &text);
        let mut out = vec![(
            Recipient::All,
            ServerEvent::GuessResult {
                conn,
                name: name.clone(),
                text,
                correct: outcome.correct,
                score: outcome.score,
            },
        )];

        if let (true, Some(score)) = (outcome.correct, outcome.score) {
            info!(%conn, room = %room_id, score, "round won");
            out.push((
                Recipient::All,
                ServerEvent::RoundEnded {
                    winner: conn,
                    name,
                    score,
                },
            ));
            self.schedule_advance(room_id.clone());
        }

        for (recipient, event) in out {
            self.emit(&room_id, recipient, event);
        }
    }

    fn on_leave(&mut self, conn: ConnectionId, room_id: RoomId) {
        let Some(room) = self.registry.get_mut(&room_id) else {
            return;
        };
        let Some(player) = room.remove_player(conn) else {
            return;
        };
        info!(%conn, room = %room_id, "player left");
        // Removal first, so the leaver isn't addressed by the broadcast.
        self.emit(
            &room_id,
            Recipient::All,
            ServerEvent::PlayerLeft {
                conn,
                name: player.name,
            },
        );
    }

    /// Sweeps the connection out of every room. Unlike an explicit
    /// leave, a disconnect broadcasts nothing to the remaining members —
    /// the asymmetry is intentional and long-standing.
    fn on_disconnect(&mut self, conn: ConnectionId) {
        self.senders.remove(&conn);
        let removed = self.registry.remove_connection(conn);
        for (room_id, player) in removed {
            debug!(%conn, room = %room_id, name = %player.name, "membership swept");
            if self.config.forfeit_on_disconnect {
                let was_presenter = self
                    .registry
                    .get(&room_id)
                    .is_some_and(|r| r.presenter() == Some(conn));
                if was_presenter {
                    debug!(%conn, room = %room_id, "presenter forfeited on disconnect");
                    self.on_advance(room_id);
                }
            }
        }
        info!(%conn, "connection removed");
    }

    /// Spawns the settle timer that posts `AdvanceRound` back to the
    /// actor after the configured delay.
    fn schedule_advance(&mut self, room_id: RoomId) {
        let handle = self.handle.clone();
        let delay = self.config.advance_delay;
        let room = room_id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.advance(room);
        });
        self.pending_advances.insert(room_id, task);
    }

    fn on_advance(&mut self, room_id: RoomId) {
        self.pending_advances.remove(&room_id);

        let words = Arc::clone(&self.words);
        let Some(room) = self.registry.get_mut(&room_id) else {
            return;
        };
        let Some(next) = round::advance_round(room, words.as_ref()) else {
            return;
        };

        let presenter = next.presenter;
        let name = room
            .player(presenter)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let secret = room.secret().map(str::to_string);

        self.emit(&room_id, Recipient::All, ServerEvent::NewRound);
        self.emit(
            &room_id,
            Recipient::All,
            ServerEvent::PresenterAssigned {
                conn: presenter,
                name,
            },
        );
        if let Some(secret) = secret {
            self.emit(
                &room_id,
                Recipient::Conn(presenter),
                ServerEvent::RoundStarted { secret },
            );
        }
    }

    /// Applies a sibling's frame to this instance's local members of the
    /// room. Remote frames never mutate room state — each instance is
    /// authoritative only for events its own connections produced.
    fn on_remote(&mut self, frame: Frame) {
        let Some(room) = self.registry.get(&frame.room) else {
            return;
        };
        // The id inside a remote `AllExcept` names a connection on the
        // origin instance. Ids are allocated per instance, so applying
        // the exclusion here would drop an unrelated local member that
        // happens to share the number. Every local member is a
        // legitimate recipient of a sibling's broadcast.
        let recipient = match frame.recipient {
            Recipient::AllExcept(_) => Recipient::All,
            other => other,
        };
        let targets: Vec<ConnectionId> = room
            .players()
            .iter()
            .map(|p| p.conn)
            .filter(|c| recipient_matches(recipient, *c))
            .collect();
        for conn in targets {
            self.send_local(conn, frame.event.clone());
        }
    }

    /// Delivers an event to the room's local members per `recipient`,
    /// then queues broadcast frames for the sibling instances.
    ///
    /// `Conn`-addressed events stay local: connection ids are allocated
    /// per instance and would collide across siblings.
    fn emit(&self, room_id: &RoomId, recipient: Recipient, event: ServerEvent) {
        if let Some(room) = self.registry.get(room_id) {
            for player in room.players() {
                if recipient_matches(recipient, player.conn) {
                    self.send_local(player.conn, event.clone());
                }
            }
        }

        let Some(publish) = &self.publish else {
            return;
        };
        if matches!(recipient, Recipient::Conn(_)) {
            return;
        }
        let _ = publish.send((room_id.clone(), recipient, event));
    }

    fn send_local(&self, conn: ConnectionId, event: ServerEvent) {
        if let Some(tx) = self.senders.get(&conn) {
            let _ = tx.send(event);
        }
    }
}

/// Spawns the single publisher task draining the outbound queue onto
/// the backplane. One task, one queue: frames hit the wire in the
/// order they were emitted.
fn spawn_publisher(
    backplane: RedisBackplane,
) -> mpsc::UnboundedSender<OutboundFrame> {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundFrame>();
    tokio::spawn(async move {
        while let Some((room, recipient, event)) = rx.recv().await {
            if let Err(e) = backplane.publish(&room, recipient, event).await {
                warn!(room = %room, error = %e, "backplane publish failed");
            }
        }
    });
    tx
}

fn recipient_matches(recipient: Recipient, conn: ConnectionId) -> bool {
    match recipient {
        Recipient::All => true,
        Recipient::Conn(target) => target == conn,
        Recipient::AllExcept(excluded) => excluded != conn,
    }
}

fn snapshot_of(room: &Room) -> ServerEvent {
    ServerEvent::Snapshot {
        room: room.id().clone(),
        players: room.roster(),
        strokes: room.strokes().to_vec(),
        secret_set: room.secret().is_some(),
        presenter: room.presenter(),
    }
}
