//! Authority state machine.
//!
//! [`AuthorityState`] owns the canonical [`GameState`] and chat log. It
//! applies one [`Intent`] at a time and answers with the [`Action`]s the
//! runtime should perform, or a [`Rejection`] explaining why nothing
//! happened.
//!
//! Every transition is computed on a working copy of the state and
//! committed only on success, so a rejected intent never leaves partial
//! changes behind.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uno_types::{
    Card, CardId, ChatMessage, Color, Direction, GameState, GameStatus, Intent, Player, PlayerId,
    Value,
};

use crate::rules::{self, DECK_SIZE, HAND_SIZE};

/// Table rules, embedded as the `[game]` section of the host config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Cards dealt to each player on start.
    #[serde(default = "default_hand_size")]
    pub hand_size: usize,

    /// Fewest players the authority may start with.
    #[serde(default = "default_min_players")]
    pub min_players: usize,

    /// Most seats the lobby accepts.
    #[serde(default = "default_max_players")]
    pub max_players: usize,
}

fn default_hand_size() -> usize {
    HAND_SIZE
}

fn default_min_players() -> usize {
    2
}

fn default_max_players() -> usize {
    10
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            hand_size: default_hand_size(),
            min_players: default_min_players(),
            max_players: default_max_players(),
        }
    }
}

/// Instructions for the runtime. The state machine never sends anything
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send this snapshot to every connected follower.
    BroadcastState(GameState),
    /// Send the whole chat log to every connected follower.
    BroadcastChat(Vec<ChatMessage>),
    /// Send the chat log to one peer only.
    SendChat {
        /// Recipient
        to: PlayerId,
        /// The whole chat log
        messages: Vec<ChatMessage>,
    },
}

/// Why an intent was ignored. Never sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Joins are only accepted in the lobby
    #[error("game is not in the lobby")]
    NotInLobby,

    /// Sender already holds a seat
    #[error("player already joined")]
    AlreadyJoined,

    /// Lobby is at capacity
    #[error("table is full ({max} players)")]
    TableFull {
        /// Configured seat limit
        max: usize,
    },

    /// Only the authority may start the game
    #[error("only the authority can start the game")]
    NotAuthority,

    /// Not enough seats filled to start
    #[error("need {need} players to start, have {have}")]
    NotEnoughPlayers {
        /// Seats filled
        have: usize,
        /// Configured minimum
        need: usize,
    },

    /// Deal would exhaust the deck
    #[error("deck cannot deal {needed} cards from {available}")]
    DeckTooSmall {
        /// Cards the deal requires (hands plus a starting card)
        needed: usize,
        /// Cards in a fresh deck
        available: usize,
    },

    /// No non-wild card left to start the discard pile
    #[error("no starting card available")]
    NoStartingCard,

    /// Intent requires a game in progress
    #[error("game is not in progress")]
    NotPlaying,

    /// Sender has no seat
    #[error("unknown sender")]
    UnknownSender,

    /// Sender is not the current player
    #[error("not this player's turn")]
    NotYourTurn,

    /// Card is not in the sender's hand
    #[error("card {0:?} is not in hand")]
    CardNotInHand(CardId),

    /// Card does not match the top card or active color
    #[error("{card} cannot be played on {top} with {active_color} active")]
    IllegalPlay {
        /// Attempted card
        card: String,
        /// Discard top
        top: String,
        /// Color in force
        active_color: Color,
    },
}

/// A card taken from the deck, noting whether the discard pile had to be
/// recycled to supply it.
struct Drawn {
    card: Card,
    reshuffled: bool,
}

/// The canonical game and chat state, plus the random source that deals.
#[derive(Debug)]
pub struct AuthorityState<R = StdRng> {
    state: GameState,
    chat: Vec<ChatMessage>,
    config: RulesConfig,
    rng: R,
}

impl AuthorityState<StdRng> {
    /// Open a lobby with the creator as its authority, seeded from the OS.
    pub fn new(host_id: PlayerId, host_name: &str, config: RulesConfig) -> Self {
        Self::with_rng(host_id, host_name, config, StdRng::from_entropy())
    }

    /// Open a lobby with a reproducible shuffle sequence.
    pub fn seeded(host_id: PlayerId, host_name: &str, config: RulesConfig, seed: u64) -> Self {
        Self::with_rng(host_id, host_name, config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> AuthorityState<R> {
    /// Open a lobby using the given random source.
    pub fn with_rng(host_id: PlayerId, host_name: &str, config: RulesConfig, rng: R) -> Self {
        Self::from_state(GameState::lobby(host_id, host_name), Vec::new(), config, rng)
    }

    /// Resume from an existing snapshot and chat log.
    pub fn from_state(
        state: GameState,
        chat: Vec<ChatMessage>,
        config: RulesConfig,
        rng: R,
    ) -> Self {
        Self {
            state,
            chat,
            config,
            rng,
        }
    }

    /// Current canonical state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Current chat log, oldest first.
    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    /// Rules in force.
    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Apply one intent from `sender`.
    ///
    /// On success the canonical state has been replaced and the returned
    /// actions describe what to send. On rejection nothing changed.
    pub fn handle(&mut self, sender: PlayerId, intent: Intent) -> Result<Vec<Action>, Rejection> {
        match intent {
            Intent::Join { name } => self.join(sender, &name),
            Intent::StartGame => self.start(sender),
            Intent::PlayCard {
                card_id,
                chosen_color,
            } => self.play(sender, card_id, chosen_color),
            Intent::DrawCard => self.draw(sender),
            Intent::Chat { text } => self.post_chat(sender, &text),
        }
    }

    fn join(&mut self, sender: PlayerId, name: &str) -> Result<Vec<Action>, Rejection> {
        if self.state.status != GameStatus::Lobby {
            return Err(Rejection::NotInLobby);
        }
        if self.state.player(&sender).is_some() {
            return Err(Rejection::AlreadyJoined);
        }
        if self.state.players.len() >= self.config.max_players {
            return Err(Rejection::TableFull {
                max: self.config.max_players,
            });
        }

        let mut next = self.state.clone();
        next.players.push(Player::new(sender, name, false));

        Ok(self.commit(
            next,
            vec![Action::SendChat {
                to: sender,
                messages: self.chat.clone(),
            }],
        ))
    }

    fn start(&mut self, sender: PlayerId) -> Result<Vec<Action>, Rejection> {
        if !self.state.is_authority(&sender) {
            return Err(Rejection::NotAuthority);
        }
        let seats = self.state.players.len();
        if seats < self.config.min_players {
            return Err(Rejection::NotEnoughPlayers {
                have: seats,
                need: self.config.min_players,
            });
        }
        let needed = seats * self.config.hand_size + 1;
        if needed > DECK_SIZE {
            return Err(Rejection::DeckTooSmall {
                needed,
                available: DECK_SIZE,
            });
        }

        let mut next = self.state.clone();
        let mut deck = rules::build_deck(&mut self.rng);

        for player in &mut next.players {
            player.hand.clear();
        }
        for player in &mut next.players {
            let split = deck.len() - self.config.hand_size;
            player.hand.extend(deck.drain(split..).rev());
        }

        let starter = loop {
            let card = deck.pop().ok_or(Rejection::NoStartingCard)?;
            if !card.is_wild() {
                break card;
            }
            deck.push(card);
            if deck.iter().all(Card::is_wild) {
                return Err(Rejection::NoStartingCard);
            }
            deck = rules::shuffle(&deck, &mut self.rng);
        };

        next.active_color = starter.color;
        next.discard_pile = vec![starter];
        next.deck = deck;
        next.status = GameStatus::Playing;
        next.current_player_index = 0;
        next.direction = Direction::Clockwise;
        next.winner = None;
        next.last_action = Some("Game Started".to_string());

        Ok(self.commit(next, Vec::new()))
    }

    fn play(
        &mut self,
        sender: PlayerId,
        card_id: CardId,
        chosen_color: Option<Color>,
    ) -> Result<Vec<Action>, Rejection> {
        let seat = self.turn_holder(sender)?;
        let mut next = self.state.clone();

        let position = next.players[seat]
            .hand
            .iter()
            .position(|c| c.id == card_id)
            .ok_or(Rejection::CardNotInHand(card_id))?;
        let card = next.players[seat].hand[position].clone();
        let top = next.top_card().ok_or(Rejection::NotPlaying)?;
        if !rules::is_legal_play(&card, top, next.active_color) {
            return Err(Rejection::IllegalPlay {
                card: card.to_string(),
                top: top.to_string(),
                active_color: next.active_color,
            });
        }

        next.players[seat].hand.remove(position);
        next.active_color = if card.is_wild() {
            chosen_color
                .filter(|c| *c != Color::Wild)
                .unwrap_or(Color::Red)
        } else {
            card.color
        };
        next.discard_pile.push(card.clone());

        let name = next.players[seat].name.clone();
        if next.players[seat].hand.is_empty() {
            next.status = GameStatus::Ended;
            next.winner = Some(name.clone());
            next.last_action = Some(format!("{name} Won!"));
            return Ok(self.commit(next, Vec::new()));
        }

        let mut last_action = format!("{name} played {card}");
        let count = next.players.len();
        let mut upcoming = rules::next_player_index(seat, next.direction, count);

        match card.value {
            Value::Skip => {
                upcoming = rules::next_player_index(upcoming, next.direction, count);
                last_action.push_str(" (Skipped)");
            }
            Value::Reverse => {
                if count == 2 {
                    upcoming = rules::next_player_index(upcoming, next.direction, count);
                } else {
                    next.direction = next.direction.reversed();
                    upcoming = rules::next_player_index(seat, next.direction, count);
                }
                last_action.push_str(" (Reversed)");
            }
            Value::DrawTwo | Value::WildDrawFour => {
                let penalty = card.value.forced_draw().unwrap_or(0);
                for _ in 0..penalty {
                    if let Some(drawn) = draw_with_reshuffle(&mut next, &mut self.rng) {
                        next.players[upcoming].hand.push(drawn.card);
                    }
                }
                upcoming = rules::next_player_index(upcoming, next.direction, count);
                last_action.push_str(if card.value == Value::DrawTwo {
                    " (Draw 2)"
                } else {
                    " (Wild Draw 4)"
                });
            }
            _ => {}
        }

        next.current_player_index = upcoming;
        next.last_action = Some(last_action);

        Ok(self.commit(next, Vec::new()))
    }

    fn draw(&mut self, sender: PlayerId) -> Result<Vec<Action>, Rejection> {
        let seat = self.turn_holder(sender)?;
        let mut next = self.state.clone();
        let name = next.players[seat].name.clone();

        let description = match draw_with_reshuffle(&mut next, &mut self.rng) {
            Some(Drawn {
                card,
                reshuffled: false,
            }) => {
                next.players[seat].hand.push(card);
                format!("{name} drew a card")
            }
            Some(Drawn {
                card,
                reshuffled: true,
            }) => {
                next.players[seat].hand.push(card);
                format!("{name} drew a card (Reshuffled)")
            }
            None => "Deck empty!".to_string(),
        };
        next.last_action = Some(description);
        next.current_player_index =
            rules::next_player_index(seat, next.direction, next.players.len());

        Ok(self.commit(next, Vec::new()))
    }

    fn post_chat(&mut self, sender: PlayerId, text: &str) -> Result<Vec<Action>, Rejection> {
        let player = self
            .state
            .player(&sender)
            .ok_or(Rejection::UnknownSender)?;
        let message = ChatMessage::new(sender, &player.name, text);
        self.chat.push(message);
        Ok(vec![Action::BroadcastChat(self.chat.clone())])
    }

    /// Seat of `sender` if a game is running and it is their turn.
    fn turn_holder(&self, sender: PlayerId) -> Result<usize, Rejection> {
        if self.state.status != GameStatus::Playing {
            return Err(Rejection::NotPlaying);
        }
        let seat = self
            .state
            .player_index(&sender)
            .ok_or(Rejection::UnknownSender)?;
        if seat != self.state.current_player_index {
            return Err(Rejection::NotYourTurn);
        }
        Ok(seat)
    }

    /// Replace canonical state; the snapshot broadcast always comes first.
    fn commit(&mut self, next: GameState, extra: Vec<Action>) -> Vec<Action> {
        self.state = next;
        let mut actions = Vec::with_capacity(1 + extra.len());
        actions.push(Action::BroadcastState(self.state.clone()));
        actions.extend(extra);
        actions
    }
}

/// Pop the deck, recycling all but the discard top when the deck is empty.
///
/// Returns `None` only when the discard pile holds at most one card.
fn draw_with_reshuffle<R: Rng + ?Sized>(state: &mut GameState, rng: &mut R) -> Option<Drawn> {
    if let Some(card) = state.deck.pop() {
        return Some(Drawn {
            card,
            reshuffled: false,
        });
    }
    if state.discard_pile.len() <= 1 {
        return None;
    }

    let top = state.discard_pile.pop()?;
    state.deck = rules::shuffle(&state.discard_pile, rng);
    state.discard_pile = vec![top];
    state.deck.pop().map(|card| Drawn {
        card,
        reshuffled: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn card(color: Color, value: Value) -> Card {
        Card::new(color, value)
    }

    /// A lobby with `n` seats, P0 being the authority.
    fn lobby(n: usize) -> (AuthorityState, Vec<PlayerId>) {
        let ids: Vec<PlayerId> = (0..n).map(|_| PlayerId::new()).collect();
        let mut auth = AuthorityState::seeded(ids[0], "P0", RulesConfig::default(), 7);
        for (i, id) in ids.iter().enumerate().skip(1) {
            auth.handle(
                *id,
                Intent::Join {
                    name: format!("P{i}"),
                },
            )
            .unwrap();
        }
        (auth, ids)
    }

    /// A game in progress with hand-picked cards. P0 to move, clockwise.
    fn rigged(
        n: usize,
        hands: Vec<Vec<Card>>,
        top: Card,
        deck: Vec<Card>,
    ) -> (AuthorityState, Vec<PlayerId>) {
        let (auth, ids) = lobby(n);
        let mut state = auth.state().clone();
        for (player, hand) in state.players.iter_mut().zip(hands) {
            player.hand = hand;
        }
        state.active_color = top.color;
        state.discard_pile = vec![top];
        state.deck = deck;
        state.status = GameStatus::Playing;
        state.current_player_index = 0;
        state.direction = Direction::Clockwise;

        let auth = AuthorityState::from_state(
            state,
            Vec::new(),
            RulesConfig::default(),
            StdRng::seed_from_u64(11),
        );
        (auth, ids)
    }

    fn filler(n: usize) -> Vec<Card> {
        (0..n)
            .map(|i| card(Color::Yellow, Value::from_digit((i % 10) as u8).unwrap()))
            .collect()
    }

    fn play(auth: &mut AuthorityState, who: PlayerId, card: &Card) -> Result<Vec<Action>, Rejection> {
        auth.handle(
            who,
            Intent::PlayCard {
                card_id: card.id,
                chosen_color: None,
            },
        )
    }

    // ===========================================
    // Join Tests
    // ===========================================

    #[test]
    fn join_appends_player_and_unicasts_chat() {
        let host = PlayerId::new();
        let guest = PlayerId::new();
        let mut auth = AuthorityState::seeded(host, "Host", RulesConfig::default(), 1);
        auth.handle(host, Intent::Chat { text: "welcome".into() })
            .unwrap();

        let actions = auth
            .handle(guest, Intent::Join { name: "Guest".into() })
            .unwrap();

        let state = auth.state();
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.players[1].name, "Guest");
        assert!(!state.players[1].is_authority);
        assert!(state.players[1].is_ready);
        assert!(state.players[1].hand.is_empty());

        assert_eq!(actions.len(), 2);
        assert!(matches!(&actions[0], Action::BroadcastState(s) if s == state));
        match &actions[1] {
            Action::SendChat { to, messages } => {
                assert_eq!(*to, guest);
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].text, "welcome");
            }
            other => panic!("Expected SendChat, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_join_is_rejected() {
        let (mut auth, ids) = lobby(2);
        let before = auth.state().clone();

        let result = auth.handle(ids[1], Intent::Join { name: "again".into() });

        assert_eq!(result, Err(Rejection::AlreadyJoined));
        assert_eq!(auth.state(), &before);
    }

    #[test]
    fn join_while_playing_is_noop() {
        let (mut auth, ids) = lobby(2);
        auth.handle(ids[0], Intent::StartGame).unwrap();
        let before = auth.state().clone();

        let result = auth.handle(PlayerId::new(), Intent::Join { name: "Late".into() });

        assert_eq!(result, Err(Rejection::NotInLobby));
        assert_eq!(auth.state(), &before);
    }

    #[test]
    fn join_rejected_when_table_full() {
        let (mut auth, _) = lobby(10);

        let result = auth.handle(PlayerId::new(), Intent::Join { name: "P10".into() });

        assert_eq!(result, Err(Rejection::TableFull { max: 10 }));
        assert_eq!(auth.state().players.len(), 10);
    }

    // ===========================================
    // StartGame Tests
    // ===========================================

    #[test]
    fn only_authority_can_start() {
        let (mut auth, ids) = lobby(3);
        let result = auth.handle(ids[1], Intent::StartGame);
        assert_eq!(result, Err(Rejection::NotAuthority));
        assert_eq!(auth.state().status, GameStatus::Lobby);
    }

    #[test]
    fn start_needs_two_players() {
        let (mut auth, ids) = lobby(1);
        let result = auth.handle(ids[0], Intent::StartGame);
        assert_eq!(result, Err(Rejection::NotEnoughPlayers { have: 1, need: 2 }));
    }

    #[test]
    fn start_rejects_oversized_deal() {
        let config = RulesConfig {
            hand_size: 60,
            ..RulesConfig::default()
        };
        let host = PlayerId::new();
        let mut auth = AuthorityState::seeded(host, "Host", config, 3);
        auth.handle(PlayerId::new(), Intent::Join { name: "G".into() })
            .unwrap();

        let result = auth.handle(host, Intent::StartGame);

        assert!(matches!(result, Err(Rejection::DeckTooSmall { needed: 121, .. })));
        assert_eq!(auth.state().status, GameStatus::Lobby);
    }

    #[test]
    fn start_deals_and_flips_non_wild() {
        for seed in 0..20 {
            let ids: Vec<PlayerId> = (0..4).map(|_| PlayerId::new()).collect();
            let mut auth = AuthorityState::seeded(ids[0], "P0", RulesConfig::default(), seed);
            for id in &ids[1..] {
                auth.handle(*id, Intent::Join { name: "x".into() }).unwrap();
            }

            let actions = auth.handle(ids[0], Intent::StartGame).unwrap();
            let state = auth.state();

            assert_eq!(actions, vec![Action::BroadcastState(state.clone())]);
            assert_eq!(state.status, GameStatus::Playing);
            assert!(state.players.iter().all(|p| p.hand.len() == HAND_SIZE));
            assert_eq!(state.discard_pile.len(), 1);
            let top = state.top_card().unwrap();
            assert!(!top.is_wild());
            assert_eq!(state.active_color, top.color);
            assert_eq!(state.current_player_index, 0);
            assert_eq!(state.direction, Direction::Clockwise);
            assert_eq!(state.winner, None);
            assert_eq!(state.last_action.as_deref(), Some("Game Started"));
            assert_eq!(state.card_total(), DECK_SIZE);
        }
    }

    #[test]
    fn seeded_authorities_deal_identically() {
        let host = PlayerId::new();
        let guest = PlayerId::new();
        let deal = |seed| {
            let mut auth = AuthorityState::seeded(host, "Host", RulesConfig::default(), seed);
            auth.handle(guest, Intent::Join { name: "G".into() }).unwrap();
            auth.handle(host, Intent::StartGame).unwrap();
            auth.state()
                .players
                .iter()
                .map(|p| p.hand.iter().map(|c| (c.color, c.value)).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        };
        assert_eq!(deal(42), deal(42));
    }

    // ===========================================
    // PlayCard Tests
    // ===========================================

    #[test]
    fn illegal_play_leaves_state_untouched() {
        let red5 = card(Color::Red, Value::Five);
        let (mut auth, ids) = rigged(
            2,
            vec![vec![red5.clone(), card(Color::Red, Value::One)], filler(3)],
            card(Color::Blue, Value::Seven),
            filler(5),
        );
        let before = auth.state().clone();

        let result = play(&mut auth, ids[0], &red5);

        assert!(matches!(result, Err(Rejection::IllegalPlay { .. })));
        assert_eq!(auth.state(), &before);
    }

    #[test]
    fn out_of_turn_play_is_rejected() {
        let blue1 = card(Color::Blue, Value::One);
        let (mut auth, ids) = rigged(
            2,
            vec![filler(3), vec![blue1.clone(), card(Color::Red, Value::One)]],
            card(Color::Blue, Value::Seven),
            filler(5),
        );
        assert_eq!(play(&mut auth, ids[1], &blue1), Err(Rejection::NotYourTurn));
    }

    #[test]
    fn card_must_be_in_hand() {
        let (mut auth, ids) = rigged(
            2,
            vec![filler(3), filler(3)],
            card(Color::Yellow, Value::Seven),
            filler(5),
        );
        let stranger = card(Color::Yellow, Value::Two);
        assert_eq!(
            play(&mut auth, ids[0], &stranger),
            Err(Rejection::CardNotInHand(stranger.id))
        );
    }

    #[test]
    fn numeral_play_advances_one_seat() {
        let blue3 = card(Color::Blue, Value::Three);
        let (mut auth, ids) = rigged(
            3,
            vec![vec![blue3.clone(), card(Color::Red, Value::One)], filler(3), filler(3)],
            card(Color::Blue, Value::Seven),
            filler(5),
        );

        play(&mut auth, ids[0], &blue3).unwrap();

        let state = auth.state();
        assert_eq!(state.current_player_index, 1);
        assert_eq!(state.top_card(), Some(&blue3));
        assert_eq!(state.active_color, Color::Blue);
        assert_eq!(state.last_action.as_deref(), Some("P0 played blue 3"));
    }

    #[test]
    fn skip_jumps_one_seat() {
        let skip = card(Color::Green, Value::Skip);
        let (mut auth, ids) = rigged(
            3,
            vec![vec![skip.clone(), card(Color::Red, Value::One)], filler(3), filler(3)],
            card(Color::Green, Value::Two),
            filler(5),
        );

        play(&mut auth, ids[0], &skip).unwrap();

        assert_eq!(auth.state().current_player_index, 2);
        assert_eq!(
            auth.state().last_action.as_deref(),
            Some("P0 played green skip (Skipped)")
        );
    }

    #[test]
    fn reverse_with_two_players_acts_as_skip() {
        let reverse = card(Color::Red, Value::Reverse);
        let (mut auth, ids) = rigged(
            2,
            vec![vec![reverse.clone(), card(Color::Red, Value::One)], filler(3)],
            card(Color::Red, Value::Two),
            filler(5),
        );

        play(&mut auth, ids[0], &reverse).unwrap();

        let state = auth.state();
        assert_eq!(state.current_player_index, 0);
        assert_eq!(state.direction, Direction::Clockwise);
        assert!(state.last_action.as_deref().unwrap().ends_with(" (Reversed)"));
    }

    #[test]
    fn reverse_with_three_players_flips_direction() {
        let reverse = card(Color::Red, Value::Reverse);
        let (mut auth, ids) = rigged(
            3,
            vec![vec![reverse.clone(), card(Color::Red, Value::One)], filler(3), filler(3)],
            card(Color::Red, Value::Two),
            filler(5),
        );

        play(&mut auth, ids[0], &reverse).unwrap();

        let state = auth.state();
        assert_eq!(state.direction, Direction::CounterClockwise);
        assert_eq!(state.current_player_index, 2);
    }

    #[test]
    fn draw_two_feeds_next_and_skips_them() {
        let draw2 = card(Color::Blue, Value::DrawTwo);
        let (mut auth, ids) = rigged(
            3,
            vec![vec![draw2.clone(), card(Color::Red, Value::One)], filler(3), filler(3)],
            card(Color::Blue, Value::Two),
            filler(5),
        );

        play(&mut auth, ids[0], &draw2).unwrap();

        let state = auth.state();
        assert_eq!(state.players[1].hand.len(), 5);
        assert_eq!(state.players[2].hand.len(), 3);
        assert_eq!(state.deck.len(), 3);
        assert_eq!(state.current_player_index, 2);
        assert_eq!(
            state.last_action.as_deref(),
            Some("P0 played blue draw2 (Draw 2)")
        );
    }

    #[test]
    fn draw_two_reshuffles_when_deck_runs_out() {
        let draw2 = card(Color::Blue, Value::DrawTwo);
        let (auth, ids) = rigged(
            3,
            vec![vec![draw2.clone(), card(Color::Red, Value::One)], filler(3), filler(3)],
            card(Color::Blue, Value::Two),
            Vec::new(),
        );
        let mut state = auth.state().clone();
        let mut discard = filler(4);
        discard.push(card(Color::Blue, Value::Two));
        state.discard_pile = discard;
        let total = state.card_total();
        let mut auth = AuthorityState::from_state(
            state,
            Vec::new(),
            RulesConfig::default(),
            StdRng::seed_from_u64(3),
        );

        play(&mut auth, ids[0], &draw2).unwrap();

        let state = auth.state();
        assert_eq!(state.players[1].hand.len(), 5);
        assert_eq!(state.discard_pile, vec![draw2]);
        assert_eq!(state.deck.len(), 3);
        assert_eq!(state.card_total(), total);
        assert_eq!(state.current_player_index, 2);
        assert_eq!(
            state.last_action.as_deref(),
            Some("P0 played blue draw2 (Draw 2)")
        );
    }

    #[test]
    fn wild_draw_four_sets_chosen_color() {
        let wild4 = card(Color::Wild, Value::WildDrawFour);
        let (mut auth, ids) = rigged(
            3,
            vec![vec![wild4.clone(), card(Color::Red, Value::One)], filler(3), filler(3)],
            card(Color::Blue, Value::Two),
            filler(6),
        );

        auth.handle(
            ids[0],
            Intent::PlayCard {
                card_id: wild4.id,
                chosen_color: Some(Color::Green),
            },
        )
        .unwrap();

        let state = auth.state();
        assert_eq!(state.active_color, Color::Green);
        assert_eq!(state.players[1].hand.len(), 7);
        assert_eq!(state.current_player_index, 2);
        assert!(state.last_action.as_deref().unwrap().ends_with(" (Wild Draw 4)"));
    }

    #[test]
    fn wild_without_color_defaults_to_red() {
        let wild = card(Color::Wild, Value::Wild);
        let (mut auth, ids) = rigged(
            2,
            vec![vec![wild.clone(), card(Color::Blue, Value::One)], filler(3)],
            card(Color::Blue, Value::Two),
            filler(5),
        );

        play(&mut auth, ids[0], &wild).unwrap();

        assert_eq!(auth.state().active_color, Color::Red);
        assert_eq!(auth.state().current_player_index, 1);
    }

    #[test]
    fn wild_choosing_wild_defaults_to_red() {
        let wild = card(Color::Wild, Value::Wild);
        let (mut auth, ids) = rigged(
            2,
            vec![vec![wild.clone(), card(Color::Blue, Value::One)], filler(3)],
            card(Color::Blue, Value::Two),
            filler(5),
        );

        auth.handle(
            ids[0],
            Intent::PlayCard {
                card_id: wild.id,
                chosen_color: Some(Color::Wild),
            },
        )
        .unwrap();

        assert_eq!(auth.state().active_color, Color::Red);
    }

    #[test]
    fn emptying_hand_wins_without_effects() {
        let draw2 = card(Color::Blue, Value::DrawTwo);
        let (mut auth, ids) = rigged(
            3,
            vec![vec![draw2.clone()], filler(3), filler(3)],
            card(Color::Blue, Value::Two),
            filler(5),
        );

        play(&mut auth, ids[0], &draw2).unwrap();

        let state = auth.state();
        assert_eq!(state.status, GameStatus::Ended);
        assert_eq!(state.winner.as_deref(), Some("P0"));
        assert_eq!(state.last_action.as_deref(), Some("P0 Won!"));
        assert_eq!(state.players[1].hand.len(), 3);
        assert_eq!(state.current_player_index, 0);

        let leftover = state.players[1].hand[0].clone();
        let after = play(&mut auth, ids[1], &leftover);
        assert_eq!(after, Err(Rejection::NotPlaying));
    }

    // ===========================================
    // DrawCard Tests
    // ===========================================

    #[test]
    fn draw_takes_top_of_deck_and_passes() {
        let deck = filler(4);
        let expected = deck.last().unwrap().clone();
        let (mut auth, ids) = rigged(
            2,
            vec![filler(2), filler(2)],
            card(Color::Red, Value::Two),
            deck,
        );

        auth.handle(ids[0], Intent::DrawCard).unwrap();

        let state = auth.state();
        assert_eq!(state.players[0].hand.last(), Some(&expected));
        assert_eq!(state.deck.len(), 3);
        assert_eq!(state.current_player_index, 1);
        assert_eq!(state.last_action.as_deref(), Some("P0 drew a card"));
    }

    #[test]
    fn restart_after_win_redeals_same_table() {
        let last = card(Color::Red, Value::Four);
        let (mut auth, ids) = rigged(
            3,
            vec![vec![last.clone()], filler(3), filler(3)],
            card(Color::Red, Value::Two),
            filler(5),
        );
        play(&mut auth, ids[0], &last).unwrap();
        assert_eq!(auth.state().status, GameStatus::Ended);

        let actions = auth.handle(ids[0], Intent::StartGame).unwrap();

        let state = auth.state();
        assert_eq!(actions, vec![Action::BroadcastState(state.clone())]);
        assert_eq!(state.status, GameStatus::Playing);
        let seats: Vec<PlayerId> = state.players.iter().map(|p| p.id).collect();
        assert_eq!(seats, ids);
        assert!(state.players.iter().all(|p| p.hand.len() == 7));
        assert_eq!(state.winner, None);
        assert_eq!(state.card_total(), DECK_SIZE);
        assert_eq!(state.current_player_index, 0);
        assert_eq!(state.last_action.as_deref(), Some("Game Started"));
    }

    #[test]
    fn draw_from_empty_deck_reshuffles_discard() {
        let (auth, ids) = rigged(
            2,
            vec![filler(2), filler(2)],
            card(Color::Red, Value::Two),
            Vec::new(),
        );
        let mut state = auth.state().clone();
        state.discard_pile = filler(4);
        let top = card(Color::Green, Value::Nine);
        state.discard_pile.push(top.clone());
        state.active_color = Color::Green;
        let mut auth = AuthorityState::from_state(
            state,
            Vec::new(),
            RulesConfig::default(),
            StdRng::seed_from_u64(5),
        );

        auth.handle(ids[0], Intent::DrawCard).unwrap();

        let state = auth.state();
        assert_eq!(state.discard_pile, vec![top]);
        assert_eq!(state.deck.len(), 3);
        assert_eq!(state.players[0].hand.len(), 3);
        assert_eq!(state.current_player_index, 1);
        assert_eq!(
            state.last_action.as_deref(),
            Some("P0 drew a card (Reshuffled)")
        );
    }

    #[test]
    fn draw_with_nothing_left_still_passes_turn() {
        let (mut auth, ids) = rigged(
            2,
            vec![filler(2), filler(2)],
            card(Color::Red, Value::Two),
            Vec::new(),
        );

        auth.handle(ids[0], Intent::DrawCard).unwrap();

        let state = auth.state();
        assert_eq!(state.players[0].hand.len(), 2);
        assert_eq!(state.current_player_index, 1);
        assert_eq!(state.last_action.as_deref(), Some("Deck empty!"));
    }

    #[test]
    fn draw_out_of_turn_is_rejected() {
        let (mut auth, ids) = rigged(
            2,
            vec![filler(2), filler(2)],
            card(Color::Red, Value::Two),
            filler(3),
        );
        assert_eq!(
            auth.handle(ids[1], Intent::DrawCard),
            Err(Rejection::NotYourTurn)
        );
        assert_eq!(
            auth.handle(PlayerId::new(), Intent::DrawCard),
            Err(Rejection::UnknownSender)
        );
    }

    // ===========================================
    // Chat Tests
    // ===========================================

    #[test]
    fn chat_appends_and_broadcasts_log() {
        let (mut auth, ids) = lobby(2);

        auth.handle(ids[1], Intent::Chat { text: "hi".into() })
            .unwrap();
        let actions = auth
            .handle(ids[0], Intent::Chat { text: "hello".into() })
            .unwrap();

        assert_eq!(auth.chat().len(), 2);
        assert_eq!(auth.chat()[0].sender_name, "P1");
        assert_eq!(auth.chat()[1].sender_id, ids[0]);
        assert_eq!(actions, vec![Action::BroadcastChat(auth.chat().to_vec())]);
    }

    #[test]
    fn chat_from_stranger_is_rejected() {
        let (mut auth, _) = lobby(2);
        let result = auth.handle(PlayerId::new(), Intent::Chat { text: "spam".into() });
        assert_eq!(result, Err(Rejection::UnknownSender));
        assert!(auth.chat().is_empty());
    }

    // ===========================================
    // Conservation Property
    // ===========================================

    #[derive(Debug, Clone)]
    enum Move {
        Play { seat: usize, pick: usize, color: u8 },
        Draw { seat: usize },
        Chat { seat: usize },
    }

    fn move_strategy() -> impl Strategy<Value = Move> {
        prop_oneof![
            (0usize..6, 0usize..30, 0u8..6).prop_map(|(seat, pick, color)| Move::Play {
                seat,
                pick,
                color
            }),
            (0usize..6).prop_map(|seat| Move::Draw { seat }),
            (0usize..6).prop_map(|seat| Move::Chat { seat }),
        ]
    }

    proptest! {
        #[test]
        fn cards_are_conserved(
            seed in any::<u64>(),
            players in 2usize..6,
            moves in proptest::collection::vec(move_strategy(), 1..200),
        ) {
            let ids: Vec<PlayerId> = (0..players).map(|_| PlayerId::new()).collect();
            let mut auth = AuthorityState::seeded(ids[0], "P0", RulesConfig::default(), seed);
            for id in &ids[1..] {
                auth.handle(*id, Intent::Join { name: "p".into() }).unwrap();
            }
            auth.handle(ids[0], Intent::StartGame).unwrap();
            prop_assert_eq!(auth.state().card_total(), DECK_SIZE);

            for m in moves {
                let before = auth.state().clone();
                let result = match m {
                    Move::Play { seat, pick, color } => {
                        let seat = seat % players;
                        let hand = &before.players[seat].hand;
                        let card_id = if hand.is_empty() {
                            CardId::new()
                        } else {
                            hand[pick % hand.len()].id
                        };
                        let chosen_color = match color {
                            0..=3 => Some(uno_types::PLAYABLE_COLORS[color as usize]),
                            4 => Some(Color::Wild),
                            _ => None,
                        };
                        auth.handle(ids[seat], Intent::PlayCard { card_id, chosen_color })
                    }
                    Move::Draw { seat } => auth.handle(ids[seat % players], Intent::DrawCard),
                    Move::Chat { seat } => {
                        auth.handle(ids[seat % players], Intent::Chat { text: "x".into() })
                    }
                };

                if result.is_err() {
                    prop_assert_eq!(auth.state(), &before);
                }
                prop_assert_eq!(auth.state().card_total(), DECK_SIZE);
                prop_assert!(auth.state().current_player_index < players);
                prop_assert_ne!(auth.state().active_color, Color::Wild);
            }
        }
    }
}
