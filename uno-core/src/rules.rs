//! Rule engine: deck composition, legality, and turn arithmetic.
//!
//! Nothing here holds state. Special effects (skip, reverse, forced draws)
//! are resolved by the authority as successive calls to
//! [`next_player_index`].

use rand::seq::SliceRandom;
use rand::Rng;
use uno_types::{Card, Color, Direction, Value, PLAYABLE_COLORS};

/// Cards in a complete deck.
pub const DECK_SIZE: usize = 108;

/// Cards dealt to each player at the start of a game.
pub const HAND_SIZE: usize = 7;

/// Build all 108 cards with fresh ids, shuffled.
///
/// Per color: one 0, two each of 1-9, skip, reverse and draw2 (25 cards).
/// Plus four wild and four wild draw four.
pub fn build_deck<R: Rng + ?Sized>(rng: &mut R) -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);

    for color in PLAYABLE_COLORS {
        deck.push(Card::new(color, Value::Zero));
        for _ in 0..2 {
            for value in Value::NUMBERS[1..].iter().chain(Value::ACTIONS.iter()) {
                deck.push(Card::new(color, *value));
            }
        }
    }

    for _ in 0..4 {
        deck.push(Card::new(Color::Wild, Value::Wild));
        deck.push(Card::new(Color::Wild, Value::WildDrawFour));
    }

    shuffle(&deck, rng)
}

/// Return a uniformly shuffled copy of `cards`. The input is left untouched.
pub fn shuffle<R: Rng + ?Sized>(cards: &[Card], rng: &mut R) -> Vec<Card> {
    let mut shuffled = cards.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

/// Whether `card` may be played on `top` while `active_color` is in force.
///
/// Legal iff the card is wild, matches the active color, or matches the
/// top card's value.
pub fn is_legal_play(card: &Card, top: &Card, active_color: Color) -> bool {
    card.is_wild() || card.color == active_color || card.value == top.value
}

/// Cards in `hand` that could legally be played right now.
pub fn playable_cards<'a>(
    hand: &'a [Card],
    top: &'a Card,
    active_color: Color,
) -> impl Iterator<Item = &'a Card> + 'a {
    hand.iter()
        .filter(move |card| is_legal_play(card, top, active_color))
}

/// Seat that follows `current` in `direction`, wrapping into
/// `[0, player_count)`.
///
/// Returns 0 for an empty table.
pub fn next_player_index(current: usize, direction: Direction, player_count: usize) -> usize {
    if player_count == 0 {
        return 0;
    }
    let count = player_count as isize;
    (current as isize + direction.step()).rem_euclid(count) as usize
}
