use std::collections::{
    BTreeMap,
    BTreeSet,
};

use rayon::iter::{
    IntoParallelIterator,
    ParallelIterator,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::core::models::{
    Card,
    Deck,
};

/// Relative weights of the score components. The final score is the weighted
/// average, so only the ratios matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynergyWeights {
    pub color_overlap: f32,
    pub keyword_overlap: f32,
    pub type_overlap: f32,
    pub mana_proximity: f32,
}

impl Default for SynergyWeights {
    fn default() -> Self {
        SynergyWeights {
            color_overlap: 0.35,
            keyword_overlap: 0.25,
            type_overlap: 0.20,
            mana_proximity: 0.20,
        }
    }
}

/// Symmetric pairwise scores keyed by lexicographically ordered name pairs.
/// Built once per enrichment pass and not patched afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SynergyMatrix {
    scores: BTreeMap<(String, String), f32>,
}

impl SynergyMatrix {
    /// Score for an unordered pair, None for self-pairs and unknown names.
    pub fn score(&self, a: &str, b: &str) -> Option<f32> {
        if a == b {
            return None;
        }
        let key = ordered_pair(a, b);
        self.scores.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), f32)> {
        self.scores.iter().map(|(pair, score)| (pair, *score))
    }

    /// The n highest-scoring pairs, ties broken by name order so the result
    /// is stable.
    pub fn top(&self, n: usize) -> Vec<(&(String, String), f32)> {
        let mut pairs: Vec<_> = self.iter().collect();
        pairs.sort_by(|(pair_a, score_a), (pair_b, score_b)| {
            score_b.total_cmp(score_a).then_with(|| pair_a.cmp(pair_b))
        });
        pairs.truncate(n);
        pairs
    }
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Computes the full pairwise matrix over scorable cards. Pure function of
/// cards and weights: no randomness, and the keyed map makes the result
/// independent of completion order.
pub fn compute(deck: &Deck, weights: &SynergyWeights) -> SynergyMatrix {
    let cards: Vec<&Card> = deck.cards.iter().filter(|c| c.is_scorable()).collect();

    let max_mana_value =
        cards.iter().map(|c| c.mana_value).fold(0.0_f64, f64::max);

    let mut indices = Vec::new();
    for i in 0..cards.len() {
        for j in (i + 1)..cards.len() {
            if cards[i].name != cards[j].name {
                indices.push((i, j));
            }
        }
    }

    let scores: BTreeMap<(String, String), f32> = indices
        .into_par_iter()
        .map(|(i, j)| {
            let key = ordered_pair(&cards[i].name, &cards[j].name);
            (key, pair_score(cards[i], cards[j], max_mana_value, weights))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect();

    SynergyMatrix { scores }
}

fn pair_score(a: &Card, b: &Card, max_mana_value: f64, weights: &SynergyWeights) -> f32 {
    let color = jaccard(&a.colors, &b.colors);
    let keyword = jaccard(&a.keywords, &b.keywords);
    let type_line = type_token_overlap(&a.type_line, &b.type_line);
    let mana = mana_proximity(a.mana_value, b.mana_value, max_mana_value);

    let weight_sum = weights.color_overlap
        + weights.keyword_overlap
        + weights.type_overlap
        + weights.mana_proximity;
    if weight_sum <= 0.0 {
        return 0.0;
    }

    let score = (color * weights.color_overlap
        + keyword * weights.keyword_overlap
        + type_line * weights.type_overlap
        + mana * weights.mana_proximity)
        / weight_sum;

    score.clamp(0.0, 1.0)
}

/// Jaccard overlap; two empty sets count as identical.
fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

fn type_tokens(type_line: &str) -> BTreeSet<String> {
    type_line
        .split_whitespace()
        .filter(|token| token.chars().any(|c| c.is_alphanumeric()))
        .map(|token| token.to_ascii_lowercase())
        .collect()
}

fn type_token_overlap(a: &str, b: &str) -> f32 {
    jaccard(&type_tokens(a), &type_tokens(b))
}

/// 1.0 at equal mana values, falling off linearly relative to the most
/// expensive card in the deck.
fn mana_proximity(a: f64, b: f64, max_mana_value: f64) -> f32 {
    if max_mana_value <= 0.0 {
        return 1.0;
    }
    let proximity = 1.0 - (a - b).abs() / max_mana_value;
    proximity.clamp(0.0, 1.0) as f32
}
