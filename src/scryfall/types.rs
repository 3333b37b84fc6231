use std::collections::{
    BTreeMap,
    BTreeSet,
};

use serde::Deserialize;

use crate::core::models::Color;

/// The subset of a Scryfall card object this crate consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct ScryfallCard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub color_identity: Vec<String>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub cmc: Option<f64>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
    #[serde(default)]
    pub printed_text: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub legalities: BTreeMap<String, String>,
    #[serde(default)]
    pub prints_search_uri: Option<String>,
}

/// One page of a prints search, used to look for a localized printing.
#[derive(Debug, Clone, Deserialize)]
pub struct PrintsPage {
    #[serde(default)]
    pub data: Vec<ScryfallCard>,
}

/// The typed record merged into a Card. Both lookup paths produce this, so
/// the merge logic exists exactly once.
#[derive(Debug, Clone, Default)]
pub struct CardRecord {
    pub identifier: String,
    pub colors: BTreeSet<Color>,
    pub type_line: String,
    pub mana_cost: String,
    pub mana_value: f64,
    pub oracle_text_en: String,
    pub localized_text: String,
    pub keywords: BTreeSet<String>,
    pub legalities: BTreeMap<String, String>,
}

impl From<ScryfallCard> for CardRecord {
    fn from(card: ScryfallCard) -> Self {
        let colors = card
            .color_identity
            .iter()
            .filter_map(|symbol| symbol.chars().next().and_then(Color::from_letter))
            .collect();

        CardRecord {
            identifier: card.id,
            colors,
            type_line: card.type_line.unwrap_or_default(),
            mana_cost: card.mana_cost.unwrap_or_default(),
            mana_value: card.cmc.unwrap_or_default(),
            oracle_text_en: card.oracle_text.unwrap_or_default(),
            localized_text: String::new(),
            keywords: card.keywords.into_iter().collect(),
            legalities: card.legalities,
        }
    }
}
