//! Room registry: lazily creates and exclusively owns all rooms.

use std::collections::HashMap;
use std::time::Duration;

use scrawl_protocol::{ConnectionId, RoomId};

use crate::{Player, Room};

/// Owns the mapping from room id to [`Room`].
///
/// Rooms come into existence on first reference and are retained for the
/// registry's lifetime — there is no automatic eviction. Deployments that
/// care can opt into [`reap_idle`](Self::reap_idle) on a timer.
///
/// The registry is a plain struct, not a global: the gateway owns exactly
/// one and all mutation flows through it.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
}

impl RoomRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// Returns the room with the given id, creating it empty if it
    /// doesn't exist yet. Idempotent, never fails.
    pub fn ensure_room(&mut self, id: &RoomId) -> &mut Room {
        self.rooms.entry(id.clone()).or_insert_with(|| {
            tracing::info!(room = %id, "room created");
            Room::new(id.clone())
        })
    }

    /// Looks up an existing room without creating one.
    pub fn get(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    /// Mutable lookup without creating. Events other than `join` never
    /// bring a room into existence.
    pub fn get_mut(&mut self, id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    /// Removes the connection from every room it is a member of.
    ///
    /// Used on disconnect. Returns the affected memberships so the caller
    /// can react per room. Never advances a round: a departing presenter
    /// leaves their room stalled.
    pub fn remove_connection(
        &mut self,
        conn: ConnectionId,
    ) -> Vec<(RoomId, Player)> {
        let mut removed = Vec::new();
        for room in self.rooms.values_mut() {
            if let Some(player) = room.remove_player(conn) {
                removed.push((room.id().clone(), player));
            }
        }
        removed
    }

    /// Drops rooms that are empty and have seen no activity for at least
    /// `ttl`. Returns the reaped ids.
    ///
    /// This is the opt-in counterweight to the retain-forever default;
    /// nothing calls it unless an idle TTL is configured.
    pub fn reap_idle(&mut self, ttl: Duration) -> Vec<RoomId> {
        let mut reaped = Vec::new();
        self.rooms.retain(|id, room| {
            if room.is_empty() && room.idle_for() >= ttl {
                reaped.push(id.clone());
                false
            } else {
                true
            }
        });
        for id in &reaped {
            tracing::info!(room = %id, "idle room reaped");
        }
        reaped
    }

    /// Number of rooms currently held.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
