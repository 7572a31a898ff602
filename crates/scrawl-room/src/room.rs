//! A single room: membership, stroke log, and the current round.
//!
//! The presenter and the secret are a pair — both set or both unset,
//! never one without the other. All mutation goes through methods here
//! so that invariant can't be broken from outside.

use std::fmt;
use std::time::Instant;

use scrawl_protocol::{ConnectionId, PlayerInfo, RoomId};

use crate::RoomError;

/// One participant in a room. Identity is the connection id; the score
/// only ever goes up.
#[derive(Debug, Clone)]
pub struct Player {
    pub conn: ConnectionId,
    pub name: String,
    pub score: u32,
}

impl Player {
    /// The public view of this player, as sent in snapshots.
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            conn: self.conn,
            name: self.name.clone(),
            score: self.score,
        }
    }
}

// ---------------------------------------------------------------------------
// RoundPhase
// ---------------------------------------------------------------------------

/// The round state machine, observable externally through emitted events:
///
/// ```text
/// Idle --(first join)--> Active
/// Active --(correct guess)--> Settling --(advance delay)--> Active
/// ```
///
/// There is no transition out of `Active` on disconnect. A room that
/// loses its presenter stalls until the next correct guess or an
/// external advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No presenter yet: the room exists but nobody has joined.
    Idle,
    /// A round is running: presenter and secret are set.
    Active,
    /// A correct guess landed; the advance delay is ticking.
    Settling,
}

impl RoundPhase {
    /// Returns `true` once a first presenter has been assigned.
    pub fn has_started(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Active => write!(f, "Active"),
            Self::Settling => write!(f, "Settling"),
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// An isolated game session.
///
/// Created lazily by the [`RoomRegistry`](crate::RoomRegistry) and never
/// destroyed by gameplay; `last_activity` feeds the opt-in idle reaper.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    /// Members in join order. Round rotation walks this order.
    players: Vec<Player>,
    /// Strokes for the current round, append-only until the next
    /// round-start clears it.
    strokes: Vec<serde_json::Value>,
    secret: Option<String>,
    presenter: Option<ConnectionId>,
    phase: RoundPhase,
    last_activity: Instant,
}

impl Room {
    pub(crate) fn new(id: RoomId) -> Self {
        Self {
            id,
            players: Vec::new(),
            strokes: Vec::new(),
            secret: None,
            presenter: None,
            phase: RoundPhase::Idle,
            last_activity: Instant::now(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn strokes(&self) -> &[serde_json::Value] {
        &self.strokes
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn presenter(&self) -> Option<ConnectionId> {
        self.presenter
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn player(&self, conn: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.conn == conn)
    }

    pub(crate) fn player_mut(&mut self, conn: ConnectionId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.conn == conn)
    }

    /// Adds a member at the end of the join order with a zero score.
    pub fn add_player(
        &mut self,
        conn: ConnectionId,
        name: String,
    ) -> Result<(), RoomError> {
        if self.player(conn).is_some() {
            return Err(RoomError::AlreadyJoined(conn, self.id.clone()));
        }
        self.players.push(Player {
            conn,
            name,
            score: 0,
        });
        self.touch();
        Ok(())
    }

    /// Removes a member. Returns the removed player, or `None` if the
    /// connection wasn't a member. The presenter slot is left untouched
    /// even if the presenter is the one leaving.
    pub fn remove_player(&mut self, conn: ConnectionId) -> Option<Player> {
        let idx = self.players.iter().position(|p| p.conn == conn)?;
        self.touch();
        Some(self.players.remove(idx))
    }

    /// Appends a stroke to the current round's log.
    pub fn push_stroke(&mut self, stroke: serde_json::Value) {
        self.strokes.push(stroke);
        self.touch();
    }

    /// Starts a round: sets the presenter and the secret as a pair and
    /// clears the stroke log. This is the only way either field is
    /// written, which is what keeps them in lockstep.
    pub(crate) fn begin_round(&mut self, presenter: ConnectionId, secret: String) {
        self.presenter = Some(presenter);
        self.secret = Some(secret);
        self.strokes.clear();
        self.phase = RoundPhase::Active;
        self.touch();
    }

    /// Marks the settle window after a correct guess.
    pub(crate) fn begin_settling(&mut self) {
        self.phase = RoundPhase::Settling;
        self.touch();
    }

    /// Public membership view for snapshots.
    pub fn roster(&self) -> Vec<PlayerInfo> {
        self.players.iter().map(Player::info).collect()
    }

    /// How long since anything happened in this room.
    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}
