//! The game snapshot.
//!
//! The authority owns the only mutable [`GameState`]. Followers receive
//! complete copies of it and replace their view wholesale on every update.

use serde::{Deserialize, Serialize};

use crate::{Card, Color, PlayerId};

/// A seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Peer id of the link this player plays through
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Cards in hand, in the order they were received
    pub hand: Vec<Card>,
    /// True only for the first player, the peer holding the canonical state
    pub is_authority: bool,
    /// Always true; kept for wire compatibility
    pub is_ready: bool,
}

impl Player {
    /// Create a player with an empty hand.
    pub fn new(id: PlayerId, name: &str, is_authority: bool) -> Self {
        Self {
            id,
            name: name.to_string(),
            hand: Vec::new(),
            is_authority,
            is_ready: true,
        }
    }
}

/// Game lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Waiting for players; the only status in which joins are accepted
    Lobby,
    /// Cards dealt, turns in progress
    Playing,
    /// A player emptied their hand
    Ended,
}

/// Turn rotation direction. Serialized as `1` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Direction {
    /// Increasing player index (+1)
    Clockwise,
    /// Decreasing player index (-1)
    CounterClockwise,
}

impl Direction {
    /// Signed index step for this direction.
    pub fn step(&self) -> isize {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }

    /// The opposite direction.
    pub fn reversed(&self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

impl From<Direction> for i8 {
    fn from(direction: Direction) -> Self {
        direction.step() as i8
    }
}

impl TryFrom<i8> for Direction {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::Clockwise),
            -1 => Ok(Direction::CounterClockwise),
            other => Err(format!("invalid direction: {other}")),
        }
    }
}

/// Complete shared game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Draw pile; the top is the last element
    pub deck: Vec<Card>,
    /// Played cards; the top is the last element
    pub discard_pile: Vec<Card>,
    /// Seats in turn order; the first is the authority
    pub players: Vec<Player>,
    /// Index into `players` of whoever moves next
    pub current_player_index: usize,
    /// Turn rotation
    pub direction: Direction,
    /// Lifecycle status
    pub status: GameStatus,
    /// Name of the winner once the game has ended
    pub winner: Option<String>,
    /// Color the next play must match (the chosen color after a wild)
    pub active_color: Color,
    /// Description of the most recent transition
    pub last_action: Option<String>,
}

impl GameState {
    /// A fresh lobby holding only its creator, who becomes the authority.
    pub fn lobby(host_id: PlayerId, host_name: &str) -> Self {
        Self {
            deck: Vec::new(),
            discard_pile: Vec::new(),
            players: vec![Player::new(host_id, host_name, true)],
            current_player_index: 0,
            direction: Direction::Clockwise,
            status: GameStatus::Lobby,
            winner: None,
            active_color: Color::Red,
            last_action: None,
        }
    }

    /// The card every play is checked against.
    pub fn top_card(&self) -> Option<&Card> {
        self.discard_pile.last()
    }

    /// The player whose turn it is.
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    /// The authority player (always the first seat).
    pub fn authority(&self) -> Option<&Player> {
        self.players.first()
    }

    /// Look up a player by peer id.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *id)
    }

    /// Seat index of a peer, if it has joined.
    pub fn player_index(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == *id)
    }

    /// Whether the given peer holds the authority seat.
    pub fn is_authority(&self, id: &PlayerId) -> bool {
        self.authority().is_some_and(|p| p.id == *id)
    }

    /// Total cards in deck, discard pile and every hand.
    ///
    /// While playing this is always the full deck size.
    pub fn card_total(&self) -> usize {
        self.deck.len()
            + self.discard_pile.len()
            + self.players.iter().map(|p| p.hand.len()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn lobby_has_single_authority() {
        let host = PlayerId::new();
        let state = GameState::lobby(host, "Host");

        assert_eq!(state.status, GameStatus::Lobby);
        assert_eq!(state.players.len(), 1);
        assert!(state.players[0].is_authority);
        assert!(state.players[0].is_ready);
        assert!(state.is_authority(&host));
        assert!(state.deck.is_empty());
        assert!(state.top_card().is_none());
        assert_eq!(state.card_total(), 0);
    }

    #[test]
    fn direction_serializes_as_signed_step() {
        assert_eq!(serde_json::to_string(&Direction::Clockwise).unwrap(), "1");
        assert_eq!(
            serde_json::to_string(&Direction::CounterClockwise).unwrap(),
            "-1"
        );
        let restored: Direction = serde_json::from_str("-1").unwrap();
        assert_eq!(restored, Direction::CounterClockwise);
        assert!(serde_json::from_str::<Direction>("0").is_err());
    }

    #[test]
    fn reversed_flips() {
        assert_eq!(Direction::Clockwise.reversed(), Direction::CounterClockwise);
        assert_eq!(Direction::CounterClockwise.reversed(), Direction::Clockwise);
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&GameStatus::Playing).unwrap(),
            "\"playing\""
        );
    }

    #[test]
    fn lookups_by_peer_id() {
        let host = PlayerId::new();
        let guest = PlayerId::new();
        let mut state = GameState::lobby(host, "Host");
        state.players.push(Player::new(guest, "Guest", false));
        state.players[1].hand.push(Card::new(Color::Blue, Value::Two));

        assert_eq!(state.player_index(&guest), Some(1));
        assert_eq!(state.player(&guest).unwrap().name, "Guest");
        assert!(!state.is_authority(&guest));
        assert_eq!(state.card_total(), 1);
    }
}
