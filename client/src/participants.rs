//! Local mirror of every participant the relay has told us about

use log::debug;
use rand::Rng;
use shared::{Position, PositionPatch};
use std::collections::hash_map::{Entry, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// RGB display color, each channel in `[0, 1]`.
pub type Color = [f32; 3];

/// Cached view of one participant
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteParticipant {
    pub player_id: u32,
    pub position: Position,
    /// Picked once when the participant is first seen
    pub color: Color,
}

pub fn random_color() -> Color {
    let mut rng = rand::thread_rng();
    [
        rng.gen_range(0.0..=1.0),
        rng.gen_range(0.0..=1.0),
        rng.gen_range(0.0..=1.0),
    ]
}

/// Participants keyed by player id
///
/// Entries are created lazily and never removed: the relay sends no leave
/// notification, so a departed participant stays at its last position.
#[derive(Debug, Default)]
pub struct ParticipantMap {
    players: HashMap<u32, RemoteParticipant>,
}

impl ParticipantMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a broadcast, creating the participant with a fresh color if unseen.
    pub fn apply_broadcast(&mut self, player_id: u32, patch: PositionPatch) -> &RemoteParticipant {
        match self.players.entry(player_id) {
            Entry::Occupied(entry) => {
                let participant = entry.into_mut();
                participant.position = patch.apply(participant.position);
                participant
            }
            Entry::Vacant(entry) => {
                debug!("New participant {}", player_id);
                entry.insert(RemoteParticipant {
                    player_id,
                    position: patch.apply(Position::default()),
                    color: random_color(),
                })
            }
        }
    }

    /// Overwrites a participant's position, creating it if needed.
    pub fn set_position(&mut self, player_id: u32, position: Position) {
        self.apply_broadcast(player_id, PositionPatch::from(position));
    }

    pub fn get(&self, player_id: u32) -> Option<&RemoteParticipant> {
        self.players.get(&player_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteParticipant> {
        self.players.values()
    }

    /// Copies every participant out, ordered by id.
    pub fn snapshot(&self) -> Vec<RemoteParticipant> {
        let mut participants: Vec<RemoteParticipant> = self.players.values().cloned().collect();
        participants.sort_by_key(|participant| participant.player_id);
        participants
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Participant map shared between the receive loop and its readers
#[derive(Debug, Clone, Default)]
pub struct SharedParticipants(Arc<Mutex<ParticipantMap>>);

impl SharedParticipants {
    /// Locks the map. A panic in another holder does not invalidate the data,
    /// so a poisoned lock is recovered.
    pub fn lock(&self) -> MutexGuard<'_, ParticipantMap> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(x: i32, y: i32) -> PositionPatch {
        PositionPatch::from(Position::new(x, y))
    }

    fn assert_valid_color(color: Color) {
        for channel in color {
            assert!((0.0..=1.0).contains(&channel), "channel {} out of range", channel);
        }
    }

    #[test]
    fn test_broadcast_creates_participant() {
        let mut map = ParticipantMap::new();

        let participant = map.apply_broadcast(1, patch(4, 4)).clone();

        assert_eq!(participant.player_id, 1);
        assert_eq!(participant.position, Position::new(4, 4));
        assert_valid_color(participant.color);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_broadcast_updates_in_place_and_keeps_color() {
        let mut map = ParticipantMap::new();
        let color = map.apply_broadcast(2, patch(1, 1)).color;

        map.apply_broadcast(2, patch(5, 6));

        let participant = map.get(2).unwrap();
        assert_eq!(participant.position, Position::new(5, 6));
        assert_eq!(participant.color, color);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_partial_broadcast_keeps_prior_coordinates() {
        let mut map = ParticipantMap::new();
        map.apply_broadcast(3, patch(7, 9));

        map.apply_broadcast(
            3,
            PositionPatch {
                x: Some(2),
                y: None,
            },
        );
        assert_eq!(map.get(3).unwrap().position, Position::new(2, 9));

        map.apply_broadcast(3, PositionPatch::default());
        assert_eq!(map.get(3).unwrap().position, Position::new(2, 9));
    }

    #[test]
    fn test_partial_broadcast_for_new_participant_defaults_to_origin() {
        let mut map = ParticipantMap::new();

        map.apply_broadcast(
            4,
            PositionPatch {
                x: Some(3),
                y: None,
            },
        );

        assert_eq!(map.get(4).unwrap().position, Position::new(3, 0));
    }

    #[test]
    fn test_set_position_upserts() {
        let mut map = ParticipantMap::new();

        map.set_position(0, Position::new(1, 2));
        assert_eq!(map.get(0).unwrap().position, Position::new(1, 2));

        map.set_position(0, Position::new(1, 3));
        assert_eq!(map.get(0).unwrap().position, Position::new(1, 3));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let mut map = ParticipantMap::new();
        map.apply_broadcast(5, patch(0, 0));
        map.apply_broadcast(2, patch(0, 0));
        map.apply_broadcast(9, patch(0, 0));

        let ids: Vec<u32> = map.snapshot().iter().map(|p| p.player_id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
        assert_eq!(map.iter().count(), 3);
    }

    #[test]
    fn test_random_color_in_range() {
        for _ in 0..100 {
            assert_valid_color(random_color());
        }
    }

    #[test]
    fn test_shared_participants_clone_shares_map() {
        let shared = SharedParticipants::default();
        let other = shared.clone();

        shared.lock().set_position(1, Position::new(8, 8));

        assert_eq!(other.lock().get(1).unwrap().position, Position::new(8, 8));
        assert!(!other.lock().is_empty());
    }
}
