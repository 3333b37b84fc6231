use std::{
    path::Path,
    sync::atomic::{
        AtomicBool,
        AtomicU8,
        AtomicUsize,
        Ordering,
    },
};

use futures::{
    stream,
    StreamExt,
};
use serde::Serialize;

use super::{
    csv_loader::{
        self,
        SkippedRow,
    },
    models::{
        extract_keywords,
        Card,
        Deck,
        EnrichmentStatus,
    },
    DeckError,
};
use crate::{
    config::ImportConfig,
    scryfall::{
        enrich_card,
        CardLookup,
    },
    translation::{
        apply_translation,
        Translate,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Loading,
    Enriching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub percent: u8,
    pub phase: Phase,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardFailure {
    pub name: String,
    pub detail: String,
}

/// Terminal per-import summary handed to the presentation layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub resolved_by_id: usize,
    pub resolved_by_name: usize,
    pub unresolved: usize,
    pub errors: usize,
    pub error_details: Vec<CardFailure>,
    pub skipped_rows: Vec<SkippedRow>,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub deck: Deck,
    pub report: ImportReport,
}

/// Clamps emitted percentages to a monotonically non-decreasing sequence,
/// whatever order the enrichment tasks finish in.
struct ProgressSink<'a> {
    callback: &'a dyn Fn(ProgressEvent),
    last: AtomicU8,
}

impl ProgressSink<'_> {
    fn report(&self, phase: Phase, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            (self.callback)(ProgressEvent { percent, phase });
        }
    }
}

/// Runs the whole import: CSV loading (progress 0-50), then concurrent
/// enrichment (progress 50-100). One card's failure never aborts the batch;
/// only structural CSV problems do. The returned deck preserves input order
/// regardless of completion order.
pub async fn run_import<L, T, F>(
    path: &Path,
    lookup: &L,
    translator: &T,
    config: &ImportConfig,
    cancel: &AtomicBool,
    progress: F,
) -> Result<ImportOutcome, DeckError>
where
    L: CardLookup,
    T: Translate,
    F: Fn(ProgressEvent),
{
    let sink = ProgressSink { callback: &progress, last: AtomicU8::new(0) };

    let loaded = csv_loader::load_csv(path)?;
    println!("Parsed {} rows ({} skipped)", loaded.rows.len(), loaded.skipped.len());

    let total_rows = loaded.rows.len().max(1);
    let mut cards = Vec::with_capacity(loaded.rows.len());
    for (index, row) in loaded.rows.iter().enumerate() {
        cards.push(csv_loader::build_card(row));
        sink.report(Phase::Loading, ((index + 1) * 50 / total_rows) as u8);
    }
    sink.report(Phase::Loading, 50);

    // Arena dispatch: each task owns exactly one card and brings it back to
    // its original slot, so there is never a concurrent writer per card.
    let total_cards = cards.len().max(1);
    let completed = AtomicUsize::new(0);

    let enriched: Vec<(usize, Card)> = stream::iter(cards.into_iter().enumerate())
        .map(|(index, mut card)| {
            let sink = &sink;
            let completed = &completed;
            async move {
                if !cancel.load(Ordering::Relaxed) {
                    enrich_card(lookup, &mut card).await;
                    if card.oracle_text.is_empty() {
                        apply_translation(translator, &mut card, &config.target_locale).await;
                    }
                    if card.keywords.is_empty() {
                        card.keywords = extract_keywords(&card.type_line, &card.oracle_text_en);
                    }
                }
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                sink.report(Phase::Enriching, (50 + done * 50 / total_cards) as u8);
                (index, card)
            }
        })
        .buffer_unordered(config.enrichment_concurrency.max(1))
        .collect()
        .await;

    if cancel.load(Ordering::Relaxed) {
        return Err(DeckError::Cancelled);
    }

    let mut slots: Vec<Option<Card>> = Vec::new();
    slots.resize_with(enriched.len(), || None);
    for (index, card) in enriched {
        slots[index] = Some(card);
    }
    let cards: Vec<Card> = slots.into_iter().flatten().collect();

    let mut report = ImportReport { skipped_rows: loaded.skipped, ..Default::default() };
    for card in &cards {
        match card.enrichment_status {
            EnrichmentStatus::ResolvedById => report.resolved_by_id += 1,
            EnrichmentStatus::ResolvedByName => report.resolved_by_name += 1,
            EnrichmentStatus::Unresolved => report.unresolved += 1,
            EnrichmentStatus::Error => {
                report.errors += 1;
                report.error_details.push(CardFailure {
                    name: card.name.clone(),
                    detail: card.error_detail.clone().unwrap_or_default(),
                });
            }
            EnrichmentStatus::Pending => {}
        }
    }

    println!(
        "Enrichment complete: {} by id, {} by name, {} unresolved, {} errors",
        report.resolved_by_id, report.resolved_by_name, report.unresolved, report.errors
    );
    sink.report(Phase::Enriching, 100);

    Ok(ImportOutcome { deck: Deck::new(cards), report })
}
