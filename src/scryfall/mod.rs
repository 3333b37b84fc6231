use std::{
    future::Future,
    sync::Arc,
    time::Duration,
};

use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::{
    sync::Semaphore,
    time::sleep,
};

use crate::{
    config::ImportConfig,
    core::{
        models::{
            Card,
            EnrichmentStatus,
            OracleTextSource,
        },
        DeckError,
    },
};

pub mod types;

use types::{
    CardRecord,
    PrintsPage,
    ScryfallCard,
};

/// The two logical operations the pipeline consumes from the card database.
/// Not-found is an error variant distinct from transport failure, so callers
/// can treat missing cards as legitimate.
#[allow(async_fn_in_trait)]
pub trait CardLookup {
    async fn lookup_by_id(&self, identifier: &str) -> Result<CardRecord, DeckError>;
    async fn lookup_by_name(&self, name: &str) -> Result<CardRecord, DeckError>;
}

/// Client for a Scryfall-shaped card database. A shared semaphore bounds
/// in-flight requests across all enrichment tasks.
pub struct ScryfallClient {
    client: Client,
    base_url: String,
    limiter: Arc<Semaphore>,
    retry_attempts: u32,
    backoff_base: Duration,
    locale: String,
}

impl ScryfallClient {
    pub fn new(config: &ImportConfig) -> Result<Self, DeckError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("deckforge/0.1 (+reqwest)")
            .build()
            .map_err(|e| DeckError::Custom(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            limiter: Arc::new(Semaphore::new(config.max_inflight_requests.max(1))),
            retry_attempts: config.retry_attempts,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            locale: config.target_locale.clone(),
        })
    }

    /// One GET attempt. 404 maps to NotFound, everything else that fails maps
    /// to Transport so the retry policy can distinguish them.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DeckError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| DeckError::Custom("request limiter closed".to_string()))?;

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| DeckError::Transport(format!("GET {url}: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DeckError::NotFound(url.to_string()));
        }
        if !response.status().is_success() {
            return Err(DeckError::Transport(format!("HTTP {} from {url}", response.status())));
        }

        Ok(response.json().await?)
    }

    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DeckError> {
        with_retry(self.retry_attempts, self.backoff_base, || self.get_json(url, query)).await
    }

    /// Best-effort fetch of the printing in the target locale. Failures here
    /// only mean "no localized text", never a card error.
    async fn localized_text(&self, card: &ScryfallCard) -> Option<String> {
        if card.lang.as_deref() == Some(self.locale.as_str()) {
            if let Some(text) = card.printed_text.clone().filter(|t| !t.is_empty()) {
                return Some(text);
            }
        }

        let prints_uri = card.prints_search_uri.as_deref()?;
        let page: PrintsPage = self.get_json(prints_uri, &[]).await.ok()?;

        page.data
            .into_iter()
            .filter(|print| print.lang.as_deref() == Some(self.locale.as_str()))
            .find_map(|print| print.printed_text.or(print.oracle_text))
            .filter(|text| !text.is_empty())
    }

    async fn into_record(&self, card: ScryfallCard) -> CardRecord {
        let localized = self.localized_text(&card).await;
        let mut record = CardRecord::from(card);
        record.localized_text = localized.unwrap_or_default();
        record
    }
}

impl CardLookup for ScryfallClient {
    async fn lookup_by_id(&self, identifier: &str) -> Result<CardRecord, DeckError> {
        let url = format!("{}/cards/{}", self.base_url, identifier);
        let card: ScryfallCard = self.get_with_retry(&url, &[]).await?;
        Ok(self.into_record(card).await)
    }

    /// Exact match first, then the fuzzy closest-match endpoint.
    async fn lookup_by_name(&self, name: &str) -> Result<CardRecord, DeckError> {
        let url = format!("{}/cards/named", self.base_url);

        match self.get_with_retry::<ScryfallCard>(&url, &[("exact", name)]).await {
            Ok(card) => Ok(self.into_record(card).await),
            Err(DeckError::NotFound(_)) => {
                let card: ScryfallCard =
                    self.get_with_retry(&url, &[("fuzzy", name)]).await?;
                Ok(self.into_record(card).await)
            }
            Err(error) => Err(error),
        }
    }
}

/// Retries an operation on transport failure with exponential backoff. All
/// other outcomes, including NotFound, return immediately.
pub(crate) async fn with_retry<T, F, Fut>(
    attempts: u32,
    backoff_base: Duration,
    mut operation: F,
) -> Result<T, DeckError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DeckError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation().await {
            Err(error) if error.is_transport() && attempt < attempts => {
                sleep(backoff_base * 2u32.pow(attempt - 1)).await;
            }
            result => return result,
        }
    }
}

/// Resolves one card: identifier lookup when available, name lookup as the
/// fallback, both merging through the same routine. Mutates the card in
/// place; a lookup failure becomes card state, never a propagated error.
pub async fn enrich_card<L: CardLookup>(lookup: &L, card: &mut Card) {
    if let Some(identifier) = card.identifier.clone() {
        match lookup.lookup_by_id(&identifier).await {
            Ok(record) => {
                merge_record(card, &record);
                card.enrichment_status = EnrichmentStatus::ResolvedById;
                return;
            }
            Err(DeckError::NotFound(_)) => {
                // Stale or foreign identifier, fall through to name lookup.
            }
            Err(error) => {
                card.enrichment_status = EnrichmentStatus::Error;
                card.error_detail = Some(error.to_string());
                return;
            }
        }
    }

    match lookup.lookup_by_name(&card.name).await {
        Ok(record) => {
            merge_record(card, &record);
            card.enrichment_status = EnrichmentStatus::ResolvedByName;
        }
        Err(DeckError::NotFound(_)) => {
            card.enrichment_status = EnrichmentStatus::Unresolved;
        }
        Err(error) => {
            card.enrichment_status = EnrichmentStatus::Error;
            card.error_detail = Some(error.to_string());
        }
    }
}

/// Fills empty card fields from the response record. User-entered name and
/// quantity are never overwritten.
pub fn merge_record(card: &mut Card, record: &CardRecord) {
    if card.identifier.is_none() && !record.identifier.is_empty() {
        card.identifier = Some(record.identifier.clone());
    }
    if card.colors.is_empty() {
        card.colors = record.colors.clone();
    }
    if card.type_line.is_empty() {
        card.type_line = record.type_line.clone();
    }
    if card.mana_cost.is_empty() {
        card.mana_cost = record.mana_cost.clone();
    }
    if card.mana_value == 0.0 {
        card.mana_value = record.mana_value;
    }
    if card.oracle_text_en.is_empty() {
        card.oracle_text_en = record.oracle_text_en.clone();
    }
    if card.oracle_text.is_empty() && !record.localized_text.is_empty() {
        card.oracle_text = record.localized_text.clone();
        card.oracle_text_source = OracleTextSource::Native;
    }
    if card.keywords.is_empty() {
        card.keywords = record.keywords.clone();
    }
    if card.legalities.is_empty() {
        card.legalities = record.legalities.clone();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{
        AtomicU32,
        Ordering,
    };

    use super::*;

    struct StubLookup {
        known_id: &'static str,
        known_name: &'static str,
        transport_down: bool,
    }

    impl StubLookup {
        fn record(&self) -> CardRecord {
            CardRecord {
                identifier: self.known_id.to_string(),
                type_line: "Artifact".to_string(),
                mana_value: 1.0,
                oracle_text_en: "{T}: Add {C}{C}.".to_string(),
                ..CardRecord::default()
            }
        }
    }

    impl CardLookup for StubLookup {
        async fn lookup_by_id(&self, identifier: &str) -> Result<CardRecord, DeckError> {
            if self.transport_down {
                return Err(DeckError::Transport("connection timed out".to_string()));
            }
            if identifier == self.known_id {
                Ok(self.record())
            } else {
                Err(DeckError::NotFound(identifier.to_string()))
            }
        }

        async fn lookup_by_name(&self, name: &str) -> Result<CardRecord, DeckError> {
            if self.transport_down {
                return Err(DeckError::Transport("connection timed out".to_string()));
            }
            if name == self.known_name {
                Ok(self.record())
            } else {
                Err(DeckError::NotFound(name.to_string()))
            }
        }
    }

    fn stub() -> StubLookup {
        StubLookup { known_id: "id-1", known_name: "Sol Ring", transport_down: false }
    }

    #[tokio::test]
    async fn resolves_by_identifier_first() {
        let mut card = Card::new("Sol Ring".to_string(), 1);
        card.identifier = Some("id-1".to_string());

        enrich_card(&stub(), &mut card).await;

        assert_eq!(card.enrichment_status, EnrichmentStatus::ResolvedById);
        assert_eq!(card.type_line, "Artifact");
    }

    #[tokio::test]
    async fn stale_identifier_falls_back_to_name() {
        let mut card = Card::new("Sol Ring".to_string(), 1);
        card.identifier = Some("id-gone".to_string());

        enrich_card(&stub(), &mut card).await;

        assert_eq!(card.enrichment_status, EnrichmentStatus::ResolvedByName);
    }

    #[tokio::test]
    async fn unknown_name_is_unresolved_not_error() {
        let mut card = Card::new("My Homebrew Dragon".to_string(), 1);

        enrich_card(&stub(), &mut card).await;

        assert_eq!(card.enrichment_status, EnrichmentStatus::Unresolved);
        assert!(card.error_detail.is_none());
    }

    #[tokio::test]
    async fn transport_failure_becomes_card_error_with_detail() {
        let lookup = StubLookup { transport_down: true, ..stub() };
        let mut card = Card::new("Sol Ring".to_string(), 1);

        enrich_card(&lookup, &mut card).await;

        assert_eq!(card.enrichment_status, EnrichmentStatus::Error);
        let detail = card.error_detail.unwrap();
        assert!(detail.contains("Transport failure"), "detail was: {detail}");
    }

    #[tokio::test]
    async fn retry_stops_after_bounded_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), DeckError> = with_retry(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DeckError::Transport("timed out".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(DeckError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_recovers_and_does_not_retry_not_found() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, Duration::from_millis(1), || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(DeckError::Transport("flaky".to_string()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let calls = AtomicU32::new(0);
        let result: Result<(), DeckError> = with_retry(3, Duration::from_millis(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DeckError::NotFound("nope".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(DeckError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn merge_fills_empty_fields_only() {
        let mut card = Card::new("Sol Ring".to_string(), 3);
        card.type_line = "My Custom Type".to_string();

        let mut record = stub().record();
        record.localized_text = "Ajoutez {C}{C}.".to_string();
        merge_record(&mut card, &record);

        assert_eq!(card.name, "Sol Ring");
        assert_eq!(card.quantity, 3);
        assert_eq!(card.type_line, "My Custom Type");
        assert_eq!(card.identifier.as_deref(), Some("id-1"));
        assert_eq!(card.mana_value, 1.0);
        assert_eq!(card.oracle_text, "Ajoutez {C}{C}.");
        assert_eq!(card.oracle_text_source, OracleTextSource::Native);
    }

    #[test]
    fn merge_without_localized_text_leaves_oracle_text_for_translator() {
        let mut card = Card::new("Sol Ring".to_string(), 1);
        merge_record(&mut card, &stub().record());

        assert!(card.oracle_text.is_empty());
        assert_eq!(card.oracle_text_en, "{T}: Add {C}{C}.");
    }
}
