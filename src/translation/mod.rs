use std::time::Duration;

use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    config::ImportConfig,
    core::{
        models::{
            Card,
            OracleTextSource,
        },
        DeckError,
    },
};

/// The one logical operation consumed from the translation service.
#[allow(async_fn_in_trait)]
pub trait Translate {
    async fn translate(&self, text: &str, target_locale: &str) -> Result<String, DeckError>;
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Client for a LibreTranslate-shaped endpoint.
pub struct LibreTranslateClient {
    client: Client,
    endpoint: String,
}

impl LibreTranslateClient {
    pub fn new(config: &ImportConfig) -> Result<Self, DeckError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DeckError::Custom(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.translation_endpoint.trim_end_matches('/').to_string(),
        })
    }
}

impl Translate for LibreTranslateClient {
    async fn translate(&self, text: &str, target_locale: &str) -> Result<String, DeckError> {
        if text.is_empty() {
            return Err(DeckError::Translation("empty source text".to_string()));
        }

        let request =
            TranslateRequest { q: text, source: "en", target: target_locale, format: "text" };
        let url = format!("{}/translate", self.endpoint);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeckError::Translation(format!("POST {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(DeckError::Translation(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| DeckError::Translation(format!("bad response body: {e}")))?;

        Ok(body.translated_text)
    }
}

/// Fills in localized oracle text when the database response had none.
/// Failure is absorbed here: the card falls back to its original English
/// text (possibly empty) and the outcome is tagged so callers can tell.
pub async fn apply_translation<T: Translate>(service: &T, card: &mut Card, target_locale: &str) {
    if !card.oracle_text.is_empty() {
        return;
    }

    match service.translate(&card.oracle_text_en, target_locale).await {
        Ok(translated) if !translated.is_empty() => {
            card.oracle_text = translated;
            card.oracle_text_source = OracleTextSource::Translated;
        }
        Ok(_) => {
            card.oracle_text = card.oracle_text_en.clone();
            card.oracle_text_source = OracleTextSource::OriginalFallback;
        }
        Err(error) => {
            if !card.oracle_text_en.is_empty() {
                eprintln!("Translation fallback for '{}': {}", card.name, error);
            }
            card.oracle_text = card.oracle_text_en.clone();
            card.oracle_text_source = OracleTextSource::OriginalFallback;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubTranslator {
        fail: bool,
    }

    impl Translate for StubTranslator {
        async fn translate(&self, text: &str, _target_locale: &str) -> Result<String, DeckError> {
            if self.fail {
                Err(DeckError::Translation("service unavailable".to_string()))
            } else if text.is_empty() {
                Err(DeckError::Translation("empty source text".to_string()))
            } else {
                Ok(format!("[fr] {text}"))
            }
        }
    }

    #[tokio::test]
    async fn translates_missing_oracle_text() {
        let mut card = Card::new("Sol Ring".to_string(), 1);
        card.oracle_text_en = "Add two colorless mana.".to_string();

        apply_translation(&StubTranslator { fail: false }, &mut card, "fr").await;

        assert_eq!(card.oracle_text, "[fr] Add two colorless mana.");
        assert_eq!(card.oracle_text_source, OracleTextSource::Translated);
    }

    #[tokio::test]
    async fn failure_falls_back_to_original_text() {
        let mut card = Card::new("Sol Ring".to_string(), 1);
        card.oracle_text_en = "Add two colorless mana.".to_string();

        apply_translation(&StubTranslator { fail: true }, &mut card, "fr").await;

        assert_eq!(card.oracle_text, "Add two colorless mana.");
        assert_eq!(card.oracle_text_source, OracleTextSource::OriginalFallback);
    }

    #[tokio::test]
    async fn empty_source_text_is_a_tagged_fallback() {
        let mut card = Card::new("Blank Proxy".to_string(), 1);

        apply_translation(&StubTranslator { fail: false }, &mut card, "fr").await;

        assert!(card.oracle_text.is_empty());
        assert_eq!(card.oracle_text_source, OracleTextSource::OriginalFallback);
    }

    #[tokio::test]
    async fn native_text_is_left_alone() {
        let mut card = Card::new("Sol Ring".to_string(), 1);
        card.oracle_text = "Ajoutez {C}{C}.".to_string();
        card.oracle_text_source = OracleTextSource::Native;

        apply_translation(&StubTranslator { fail: true }, &mut card, "fr").await;

        assert_eq!(card.oracle_text, "Ajoutez {C}{C}.");
        assert_eq!(card.oracle_text_source, OracleTextSource::Native);
    }
}
