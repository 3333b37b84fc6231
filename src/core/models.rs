use std::{
    collections::{
        BTreeMap,
        BTreeSet,
    },
    fmt,
    sync::OnceLock,
};

use regex::Regex;
use serde::{
    Deserialize,
    Serialize,
};

/// The five mana colors. A colorless card is represented by an empty color
/// set and rendered as "C".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
}

impl Color {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'W' => Some(Color::White),
            'U' => Some(Color::Blue),
            'B' => Some(Color::Black),
            'R' => Some(Color::Red),
            'G' => Some(Color::Green),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Color::White => 'W',
            Color::Blue => 'U',
            Color::Black => 'B',
            Color::Red => 'R',
            Color::Green => 'G',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrichmentStatus {
    Pending,
    ResolvedById,
    ResolvedByName,
    Unresolved,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OracleTextSource {
    Native,
    Translated,
    OriginalFallback,
}

/// A card in the imported collection. Built from one CSV row, then filled in
/// by the card database and translation services during enrichment.
#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub name: String,
    pub identifier: Option<String>,
    pub colors: BTreeSet<Color>,
    pub type_line: String,
    pub mana_cost: String,
    pub mana_value: f64,
    pub oracle_text: String,
    pub oracle_text_en: String,
    pub oracle_text_source: OracleTextSource,
    pub keywords: BTreeSet<String>,
    pub quantity: u32,
    pub set_code: String,
    pub set_name: String,
    pub collector_number: String,
    pub rarity: String,
    pub language: String,
    pub price_usd: f64,
    pub price_eur: f64,
    pub legalities: BTreeMap<String, String>,
    pub enrichment_status: EnrichmentStatus,
    pub error_detail: Option<String>,
    pub violates_identity: bool,
}

impl Card {
    pub fn new(name: String, quantity: u32) -> Self {
        Card {
            name,
            identifier: None,
            colors: BTreeSet::new(),
            type_line: String::new(),
            mana_cost: String::new(),
            mana_value: 0.0,
            oracle_text: String::new(),
            oracle_text_en: String::new(),
            oracle_text_source: OracleTextSource::OriginalFallback,
            keywords: BTreeSet::new(),
            quantity,
            set_code: String::new(),
            set_name: String::new(),
            collector_number: String::new(),
            rarity: String::new(),
            language: String::new(),
            price_usd: 0.0,
            price_eur: 0.0,
            legalities: BTreeMap::new(),
            enrichment_status: EnrichmentStatus::Pending,
            error_detail: None,
            violates_identity: false,
        }
    }

    pub fn is_legendary(&self) -> bool {
        self.type_line.contains("Legendary")
    }

    pub fn is_colorless(&self) -> bool {
        self.colors.is_empty()
    }

    /// Cards in an error or pending state never reach the synergy pass.
    pub fn is_scorable(&self) -> bool {
        matches!(
            self.enrichment_status,
            EnrichmentStatus::ResolvedById
                | EnrichmentStatus::ResolvedByName
                | EnrichmentStatus::Unresolved
        )
    }
}

/// An ordered collection of cards plus the designated commander, stored as an
/// index into the card arena so the commander is a reference, not a copy.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Deck {
    pub cards: Vec<Card>,
    pub commander: Option<usize>,
}

impl Deck {
    pub fn new(cards: Vec<Card>) -> Self {
        Deck { cards, commander: None }
    }

    pub fn commander(&self) -> Option<&Card> {
        self.commander.and_then(|i| self.cards.get(i))
    }

    pub fn commander_candidates(&self) -> Vec<(usize, &Card)> {
        self.cards.iter().enumerate().filter(|(_, c)| c.is_legendary()).collect()
    }

    /// Picks the named card as commander, or the first legendary card when no
    /// name is given. Returns false if no candidate exists.
    pub fn choose_commander(&mut self, name: Option<&str>) -> bool {
        let index = match name {
            Some(name) => self.cards.iter().position(|c| c.name == name),
            None => self.cards.iter().position(|c| c.is_legendary()),
        };
        self.commander = index;
        index.is_some()
    }
}

/// Evergreen and common keyword abilities recognized in oracle text.
pub const KEYWORDS: &[&str] = &[
    "Deathtouch",
    "Defender",
    "Double strike",
    "First strike",
    "Flash",
    "Flying",
    "Haste",
    "Hexproof",
    "Indestructible",
    "Lifelink",
    "Menace",
    "Reach",
    "Trample",
    "Vigilance",
    "Ward",
    "Cascade",
    "Convoke",
    "Cycling",
    "Equip",
    "Flashback",
    "Kicker",
    "Landfall",
    "Mill",
    "Proliferate",
    "Prowess",
    "Scry",
    "Surveil",
];

fn keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = KEYWORDS.join("|").replace(' ', r"\s");
        Regex::new(&format!(r"(?i)\b({})\b", alternation)).expect("keyword regex is valid")
    })
}

/// Derives a keyword set from the type line and oracle text. Subtypes after
/// the dash in the type line count as keywords so tribal overlap is visible
/// to the synergy pass.
pub fn extract_keywords(type_line: &str, oracle_text: &str) -> BTreeSet<String> {
    let mut keywords = BTreeSet::new();

    if let Some((_, subtypes)) = type_line.split_once('\u{2014}') {
        for token in subtypes.split_whitespace() {
            keywords.insert(token.to_string());
        }
    }

    for capture in keyword_regex().captures_iter(oracle_text) {
        let canonical = KEYWORDS
            .iter()
            .find(|k| k.eq_ignore_ascii_case(&capture[1].replace(['\n', '\t'], " ")));
        if let Some(keyword) = canonical {
            keywords.insert(keyword.to_string());
        }
    }

    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_letters_round_trip() {
        for letter in ['W', 'U', 'B', 'R', 'G'] {
            let color = Color::from_letter(letter).unwrap();
            assert_eq!(color.letter(), letter);
        }
        assert_eq!(Color::from_letter('X'), None);
    }

    #[test]
    fn keywords_from_oracle_text_and_type_line() {
        let keywords = extract_keywords(
            "Legendary Creature \u{2014} Goblin Wizard",
            "Flying, haste\nWhenever this creature attacks, scry 1.",
        );
        assert!(keywords.contains("Goblin"));
        assert!(keywords.contains("Wizard"));
        assert!(keywords.contains("Flying"));
        assert!(keywords.contains("Haste"));
        assert!(keywords.contains("Scry"));
        assert!(!keywords.contains("Trample"));
    }

    #[test]
    fn pending_and_error_cards_are_not_scorable() {
        let mut card = Card::new("Sol Ring".to_string(), 1);
        assert!(!card.is_scorable());
        card.enrichment_status = EnrichmentStatus::Error;
        assert!(!card.is_scorable());
        card.enrichment_status = EnrichmentStatus::Unresolved;
        assert!(card.is_scorable());
    }

    #[test]
    fn first_legendary_becomes_commander_by_default() {
        let mut ring = Card::new("Sol Ring".to_string(), 1);
        ring.type_line = "Artifact".to_string();
        let mut kenrith = Card::new("Kenrith, the Returned King".to_string(), 1);
        kenrith.type_line = "Legendary Creature \u{2014} Human Noble".to_string();

        let mut deck = Deck::new(vec![ring, kenrith]);
        assert!(deck.choose_commander(None));
        assert_eq!(deck.commander().unwrap().name, "Kenrith, the Returned King");

        assert!(deck.choose_commander(Some("Sol Ring")));
        assert_eq!(deck.commander, Some(0));
    }
}
