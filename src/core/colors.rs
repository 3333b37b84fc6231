use std::collections::BTreeSet;

use super::models::{
    Card,
    Color,
    Deck,
};

/// The commander's color identity. The database reports color identity (mana
/// cost plus rules text symbols) directly on the card, so the identity is the
/// commander's color set itself.
pub fn identity(commander: &Card) -> BTreeSet<Color> {
    commander.colors.clone()
}

/// Flags every card whose colors are not a subset of the identity. Colorless
/// cards never violate. Annotation is additive, nothing is removed.
pub fn annotate(deck: &mut Deck, identity: &BTreeSet<Color>) {
    for card in &mut deck.cards {
        card.violates_identity =
            !card.is_colorless() && !card.colors.is_subset(identity);
    }
}

/// Cards that may legally accompany the identity.
pub fn filter_by_identity<'a>(cards: &'a [Card], identity: &BTreeSet<Color>) -> Vec<&'a Card> {
    cards
        .iter()
        .filter(|card| card.is_colorless() || card.colors.is_subset(identity))
        .collect()
}

/// Parses a free-text color field ("UB", "Blue/Black", "W, U") into the
/// canonical color set. Unrecognized tokens are dropped with a warning.
pub fn parse_color_tokens(text: &str) -> BTreeSet<Color> {
    let mut colors = BTreeSet::new();

    for token in text.split(|c: char| !c.is_ascii_alphabetic()).filter(|t| !t.is_empty()) {
        match token_colors(token) {
            Some(parsed) => colors.extend(parsed),
            None => eprintln!("Ignoring unrecognized color token '{}'", token),
        }
    }

    colors
}

/// A token is either a color word, the colorless marker, or a run of color
/// letters ("UB", "wubrg").
fn token_colors(token: &str) -> Option<Vec<Color>> {
    match token.to_ascii_lowercase().as_str() {
        "white" => return Some(vec![Color::White]),
        "blue" => return Some(vec![Color::Blue]),
        "black" => return Some(vec![Color::Black]),
        "red" => return Some(vec![Color::Red]),
        "green" => return Some(vec![Color::Green]),
        "c" | "colorless" => return Some(Vec::new()),
        _ => {}
    }
    token.chars().map(Color::from_letter).collect()
}

/// Renders a color set as its letters, "C" when colorless.
pub fn color_letters(colors: &BTreeSet<Color>) -> String {
    if colors.is_empty() {
        return "C".to_string();
    }
    colors.iter().map(Color::letter).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colored(letters: &str) -> BTreeSet<Color> {
        letters.chars().filter_map(Color::from_letter).collect()
    }

    #[test]
    fn parses_letters_words_and_separators() {
        assert_eq!(parse_color_tokens("UB"), colored("UB"));
        assert_eq!(parse_color_tokens("wubrg"), colored("WUBRG"));
        assert_eq!(parse_color_tokens("Blue/Black"), colored("UB"));
        assert_eq!(parse_color_tokens("w, g"), colored("WG"));
        assert_eq!(parse_color_tokens("colorless"), BTreeSet::new());
        assert_eq!(parse_color_tokens("U, banana"), colored("U"));
    }

    #[test]
    fn colorless_never_violates() {
        let mut artifact = Card::new("Sol Ring".to_string(), 1);
        artifact.type_line = "Artifact".to_string();
        let mut deck = Deck::new(vec![artifact]);

        annotate(&mut deck, &colored("U"));
        assert!(!deck.cards[0].violates_identity);
        annotate(&mut deck, &BTreeSet::new());
        assert!(!deck.cards[0].violates_identity);
    }

    #[test]
    fn subset_never_violates_and_outside_does() {
        let mut blue = Card::new("Counterspell".to_string(), 1);
        blue.colors = colored("U");
        let mut golgari = Card::new("Deathrite Shaman".to_string(), 1);
        golgari.colors = colored("BG");
        let mut deck = Deck::new(vec![blue, golgari]);

        annotate(&mut deck, &colored("UBW"));
        assert!(!deck.cards[0].violates_identity);
        assert!(deck.cards[1].violates_identity);

        let kept = filter_by_identity(&deck.cards, &colored("UBW"));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Counterspell");
    }

    #[test]
    fn letters_render_with_colorless_symbol() {
        assert_eq!(color_letters(&colored("GUW")), "WUG");
        assert_eq!(color_letters(&BTreeSet::new()), "C");
    }
}
