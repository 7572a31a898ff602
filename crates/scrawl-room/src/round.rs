//! Round logic: presenter assignment, guess evaluation, rotation.
//!
//! Pure functions over a single [`Room`]. Nothing here creates rooms,
//! schedules timers, or talks to sockets — the gateway sequences these
//! calls and handles the fan-out.

use scrawl_protocol::ConnectionId;
use tracing::debug;

use crate::{Room, RoomError, WordSource};

/// Points awarded for a correct guess.
pub const GUESS_AWARD: u32 = 10;

/// The result of evaluating one guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessOutcome {
    pub correct: bool,
    /// The guesser's new total, present only when `correct`.
    pub score: Option<u32>,
}

impl GuessOutcome {
    fn miss() -> Self {
        Self {
            correct: false,
            score: None,
        }
    }
}

/// The outcome of a round rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextRound {
    pub presenter: ConnectionId,
}

/// Starts the first round of a room: called exactly once, when the first
/// player joins. Picks a secret and sets the presenter/secret pair.
///
/// # Errors
/// Returns [`RoomError::AlreadyStarted`] if the room already has a
/// presenter — that's a sequencing bug in the caller, not a game event.
pub fn assign_first_presenter(
    room: &mut Room,
    conn: ConnectionId,
    words: &dyn WordSource,
) -> Result<(), RoomError> {
    if room.presenter().is_some() {
        return Err(RoomError::AlreadyStarted(room.id().clone()));
    }
    let secret = words.pick();
    room.begin_round(conn, secret);
    debug!(room = %room.id(), presenter = %conn, "first presenter assigned");
    Ok(())
}

/// Evaluates a guess against the room's secret.
///
/// Matching trims surrounding whitespace and case-folds both sides, then
/// compares for exact equality. A correct guess awards [`GUESS_AWARD`]
/// points to the guesser and moves the room into its settle window; an
/// incorrect guess changes nothing. With no secret set (or a guesser who
/// isn't a member) the guess is simply wrong.
pub fn evaluate_guess(
    room: &mut Room,
    conn: ConnectionId,
    text: &str,
) -> GuessOutcome {
    let Some(secret) = room.secret() else {
        return GuessOutcome::miss();
    };
    if normalize(secret) != normalize(text) {
        return GuessOutcome::miss();
    }
    let Some(player) = room.player_mut(conn) else {
        debug!(room = %room.id(), %conn, "correct guess from non-member ignored");
        return GuessOutcome::miss();
    };
    player.score += GUESS_AWARD;
    let score = player.score;
    room.begin_settling();
    GuessOutcome {
        correct: true,
        score: Some(score),
    }
}

/// Rotates the room into a new round.
///
/// Returns `None` if the room has no players — the caller (typically the
/// deferred advance timer) treats that as a no-op. Otherwise the next
/// presenter is chosen round-robin over join order, anchored at the
/// current presenter's position; if the current presenter is no longer a
/// member, rotation restarts at index 0. A single remaining player
/// rotates onto themselves. A fresh secret is drawn (repeats allowed)
/// and the stroke log is cleared.
pub fn advance_round(room: &mut Room, words: &dyn WordSource) -> Option<NextRound> {
    if room.is_empty() {
        debug!(room = %room.id(), "advance skipped: room is empty");
        return None;
    }

    let next_idx = match room
        .presenter()
        .and_then(|p| room.players().iter().position(|pl| pl.conn == p))
    {
        Some(idx) => (idx + 1) % room.player_count(),
        // Presenter left (or never matched): restart the rotation.
        None => 0,
    };
    let presenter = room.players()[next_idx].conn;

    let secret = words.pick();
    room.begin_round(presenter, secret);
    debug!(room = %room.id(), presenter = %presenter, "round advanced");
    Some(NextRound { presenter })
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoundPhase;
    use scrawl_protocol::RoomId;

    /// A word source that always returns the same word, so tests can
    /// guess it.
    struct Fixed(&'static str);

    impl WordSource for Fixed {
        fn pick(&self) -> String {
            self.0.to_string()
        }
    }

    fn conn(id: u64) -> ConnectionId {
        ConnectionId(id)
    }

    fn room_with(players: &[u64]) -> Room {
        let mut room = Room::new(RoomId::from("r1"));
        for &id in players {
            room.add_player(conn(id), format!("p{id}")).unwrap();
        }
        room
    }

    // =====================================================================
    // assign_first_presenter
    // =====================================================================

    #[test]
    fn test_first_presenter_sets_pair_atomically() {
        let mut room = room_with(&[1]);
        assign_first_presenter(&mut room, conn(1), &Fixed("apple")).unwrap();
        assert_eq!(room.presenter(), Some(conn(1)));
        assert_eq!(room.secret(), Some("apple"));
        assert_eq!(room.phase(), RoundPhase::Active);
    }

    #[test]
    fn test_first_presenter_twice_is_an_error() {
        let mut room = room_with(&[1, 2]);
        assign_first_presenter(&mut room, conn(1), &Fixed("apple")).unwrap();
        assert!(matches!(
            assign_first_presenter(&mut room, conn(2), &Fixed("pear")),
            Err(RoomError::AlreadyStarted(_))
        ));
        // Pair untouched by the failed call.
        assert_eq!(room.presenter(), Some(conn(1)));
        assert_eq!(room.secret(), Some("apple"));
    }

    // =====================================================================
    // evaluate_guess
    // =====================================================================

    #[test]
    fn test_guess_with_no_secret_is_incorrect() {
        let mut room = room_with(&[1]);
        let outcome = evaluate_guess(&mut room, conn(1), "anything");
        assert_eq!(outcome, GuessOutcome { correct: false, score: None });
    }

    #[test]
    fn test_guess_matching_is_trimmed_and_case_folded() {
        let mut room = room_with(&[1, 2]);
        assign_first_presenter(&mut room, conn(1), &Fixed("Apple ")).unwrap();
        let outcome = evaluate_guess(&mut room, conn(2), "apple");
        assert!(outcome.correct);
        assert_eq!(outcome.score, Some(10));
    }

    #[test]
    fn test_guess_requires_exact_equality_after_normalize() {
        let mut room = room_with(&[1, 2]);
        assign_first_presenter(&mut room, conn(1), &Fixed("apple")).unwrap();
        let outcome = evaluate_guess(&mut room, conn(2), "apples");
        assert!(!outcome.correct);
        assert_eq!(room.player(conn(2)).unwrap().score, 0);
    }

    #[test]
    fn test_correct_guess_awards_only_the_guesser() {
        let mut room = room_with(&[1, 2, 3]);
        assign_first_presenter(&mut room, conn(1), &Fixed("apple")).unwrap();
        evaluate_guess(&mut room, conn(2), "apple");
        assert_eq!(room.player(conn(1)).unwrap().score, 0);
        assert_eq!(room.player(conn(2)).unwrap().score, 10);
        assert_eq!(room.player(conn(3)).unwrap().score, 0);
    }

    #[test]
    fn test_correct_guess_enters_settling() {
        let mut room = room_with(&[1, 2]);
        assign_first_presenter(&mut room, conn(1), &Fixed("apple")).unwrap();
        evaluate_guess(&mut room, conn(2), "apple");
        assert_eq!(room.phase(), RoundPhase::Settling);
    }

    #[test]
    fn test_scores_accumulate_across_rounds() {
        let mut room = room_with(&[1, 2]);
        assign_first_presenter(&mut room, conn(1), &Fixed("apple")).unwrap();
        evaluate_guess(&mut room, conn(2), "apple");
        advance_round(&mut room, &Fixed("apple"));
        let outcome = evaluate_guess(&mut room, conn(2), " APPLE ");
        assert_eq!(outcome.score, Some(20));
    }

    #[test]
    fn test_incorrect_guess_leaves_round_running() {
        let mut room = room_with(&[1, 2]);
        assign_first_presenter(&mut room, conn(1), &Fixed("apple")).unwrap();
        evaluate_guess(&mut room, conn(2), "banana");
        assert_eq!(room.phase(), RoundPhase::Active);
        assert_eq!(room.secret(), Some("apple"));
    }

    #[test]
    fn test_correct_guess_from_non_member_scores_nothing() {
        let mut room = room_with(&[1]);
        assign_first_presenter(&mut room, conn(1), &Fixed("apple")).unwrap();
        let outcome = evaluate_guess(&mut room, conn(99), "apple");
        assert!(!outcome.correct);
    }

    // =====================================================================
    // advance_round
    // =====================================================================

    #[test]
    fn test_advance_on_empty_room_returns_none() {
        let mut room = room_with(&[]);
        assert!(advance_round(&mut room, &Fixed("apple")).is_none());
    }

    #[test]
    fn test_round_robin_follows_join_order() {
        // Join order [1, 2, 3], presenter 2 → next is 3.
        let mut room = room_with(&[1, 2, 3]);
        assign_first_presenter(&mut room, conn(2), &Fixed("apple")).unwrap();
        let next = advance_round(&mut room, &Fixed("pear")).unwrap();
        assert_eq!(next.presenter, conn(3));
    }

    #[test]
    fn test_round_robin_wraps_to_first() {
        // Presenter 3 (last in join order) → next is 1.
        let mut room = room_with(&[1, 2, 3]);
        assign_first_presenter(&mut room, conn(3), &Fixed("apple")).unwrap();
        let next = advance_round(&mut room, &Fixed("pear")).unwrap();
        assert_eq!(next.presenter, conn(1));
    }

    #[test]
    fn test_missing_presenter_falls_back_to_index_zero() {
        let mut room = room_with(&[1, 2, 3]);
        assign_first_presenter(&mut room, conn(2), &Fixed("apple")).unwrap();
        room.remove_player(conn(2));
        let next = advance_round(&mut room, &Fixed("pear")).unwrap();
        assert_eq!(next.presenter, conn(1));
    }

    #[test]
    fn test_single_player_rotates_onto_themselves() {
        let mut room = room_with(&[7]);
        assign_first_presenter(&mut room, conn(7), &Fixed("apple")).unwrap();
        let next = advance_round(&mut room, &Fixed("pear")).unwrap();
        assert_eq!(next.presenter, conn(7));
    }

    #[test]
    fn test_advance_clears_strokes_and_resets_phase() {
        let mut room = room_with(&[1, 2]);
        assign_first_presenter(&mut room, conn(1), &Fixed("apple")).unwrap();
        room.push_stroke(serde_json::json!({"x": 1}));
        evaluate_guess(&mut room, conn(2), "apple");
        advance_round(&mut room, &Fixed("pear")).unwrap();
        assert!(room.strokes().is_empty());
        assert_eq!(room.phase(), RoundPhase::Active);
        assert_eq!(room.secret(), Some("pear"));
    }

    #[test]
    fn test_pair_invariant_holds_through_full_rotation() {
        let mut room = room_with(&[1, 2, 3]);
        assert_eq!(room.presenter().is_some(), room.secret().is_some());
        assign_first_presenter(&mut room, conn(1), &Fixed("apple")).unwrap();
        for _ in 0..5 {
            assert_eq!(room.presenter().is_some(), room.secret().is_some());
            advance_round(&mut room, &Fixed("pear")).unwrap();
        }
        assert_eq!(room.presenter().is_some(), room.secret().is_some());
    }
}
