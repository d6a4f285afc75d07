//! Bot strategy for simulated players.

use uno_core::playable_cards;
use uno_types::{Card, CardId, Color, GameState, GameStatus, PlayerId, PLAYABLE_COLORS};

/// What a bot does on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Play a card, naming a color for wilds.
    Play {
        card_id: CardId,
        chosen_color: Option<Color>,
    },
    /// No legal card: draw one.
    Draw,
}

/// Pick a move for `me`, or `None` when it is not their turn.
///
/// Plays the first legal card in hand order. Wilds name the color the bot
/// holds most of.
pub fn choose_move(state: &GameState, me: PlayerId) -> Option<Move> {
    if state.status != GameStatus::Playing {
        return None;
    }
    let player = state.current_player().filter(|p| p.id == me)?;
    let top = state.top_card()?;

    let chosen = playable_cards(&player.hand, top, state.active_color).next();
    Some(match chosen {
        Some(card) => Move::Play {
            card_id: card.id,
            chosen_color: card.is_wild().then(|| favorite_color(&player.hand)),
        },
        None => Move::Draw,
    })
}

/// Most common non-wild color in `hand`; ties go to the earlier of
/// red, blue, green, yellow. Red for a hand of only wilds.
pub fn favorite_color(hand: &[Card]) -> Color {
    let mut best = (Color::Red, 0);
    for color in PLAYABLE_COLORS {
        let count = hand.iter().filter(|c| c.color == color).count();
        if count > best.1 {
            best = (color, count);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use uno_types::{Player, Value};

    fn table(hand: Vec<Card>, top: Card, active: Color) -> (GameState, PlayerId) {
        let me = PlayerId::new();
        let mut state = GameState::lobby(me, "Bot");
        state.players[0].hand = hand;
        state
            .players
            .push(Player::new(PlayerId::new(), "Other", false));
        state.discard_pile.push(top);
        state.active_color = active;
        state.status = GameStatus::Playing;
        (state, me)
    }

    // ===========================================
    // Move Selection Tests
    // ===========================================

    #[test]
    fn plays_first_legal_card() {
        let blue_three = Card::new(Color::Blue, Value::Three);
        let red_nine = Card::new(Color::Red, Value::Nine);
        let red_two = Card::new(Color::Red, Value::Two);
        let (state, me) = table(
            vec![blue_three, red_nine.clone(), red_two],
            Card::new(Color::Red, Value::Five),
            Color::Red,
        );

        assert_eq!(
            choose_move(&state, me),
            Some(Move::Play {
                card_id: red_nine.id,
                chosen_color: None,
            })
        );
    }

    #[test]
    fn draws_without_a_legal_card() {
        let (state, me) = table(
            vec![Card::new(Color::Blue, Value::Three)],
            Card::new(Color::Red, Value::Five),
            Color::Red,
        );

        assert_eq!(choose_move(&state, me), Some(Move::Draw));
    }

    #[test]
    fn wild_names_the_most_held_color() {
        let wild = Card::new(Color::Wild, Value::WildDrawFour);
        let (state, me) = table(
            vec![
                Card::new(Color::Blue, Value::Three),
                wild.clone(),
                Card::new(Color::Green, Value::One),
                Card::new(Color::Green, Value::Skip),
            ],
            Card::new(Color::Red, Value::Five),
            Color::Red,
        );

        assert_eq!(
            choose_move(&state, me),
            Some(Move::Play {
                card_id: wild.id,
                chosen_color: Some(Color::Green),
            })
        );
    }

    #[test]
    fn waits_when_not_its_turn() {
        let (mut state, me) = table(
            vec![Card::new(Color::Red, Value::Three)],
            Card::new(Color::Red, Value::Five),
            Color::Red,
        );
        state.current_player_index = 1;

        assert_eq!(choose_move(&state, me), None);
    }

    #[test]
    fn idle_outside_play() {
        let (mut state, me) = table(
            vec![Card::new(Color::Red, Value::Three)],
            Card::new(Color::Red, Value::Five),
            Color::Red,
        );
        state.status = GameStatus::Ended;

        assert_eq!(choose_move(&state, me), None);
    }

    // ===========================================
    // Color Preference Tests
    // ===========================================

    #[test]
    fn ties_prefer_earlier_colors() {
        let hand = vec![
            Card::new(Color::Yellow, Value::One),
            Card::new(Color::Blue, Value::One),
        ];
        assert_eq!(favorite_color(&hand), Color::Blue);
    }

    #[test]
    fn all_wild_hand_names_red() {
        let hand = vec![
            Card::new(Color::Wild, Value::Wild),
            Card::new(Color::Wild, Value::WildDrawFour),
        ];
        assert_eq!(favorite_color(&hand), Color::Red);
        assert_eq!(favorite_color(&[]), Color::Red);
    }
}
