use std::{
    collections::HashMap,
    path::Path,
};

use serde::Serialize;

use super::{
    colors::parse_color_tokens,
    errors::DeckError,
    models::Card,
};

/// Known header spellings mapped to canonical field names. Lookup is
/// case-insensitive. Columns that match nothing here are ignored.
const HEADER_ALIASES: &[(&str, &str)] = &[
    ("card name", "name"),
    ("name", "name"),
    ("quantity", "quantity"),
    ("qty", "quantity"),
    ("count", "quantity"),
    ("scryfall id", "identifier"),
    ("id", "identifier"),
    ("mana cost", "mana_cost"),
    ("cost", "mana_cost"),
    ("color", "colors"),
    ("colors", "colors"),
    ("color identity", "colors"),
    ("type", "type_line"),
    ("type line", "type_line"),
    ("set code", "set_code"),
    ("set name", "set_name"),
    ("collector number", "collector_number"),
    ("rarity", "rarity"),
    ("language", "language"),
    ("price (usd)", "price_usd"),
    ("price (eur)", "price_eur"),
];

const REQUIRED_FIELDS: &[&str] = &["name", "quantity"];

/// Numeric fields besides quantity are coerced leniently: a bad price becomes
/// 0.0, only a bad quantity disqualifies the row.
const NUMERIC_FIELDS: &[&str] = &["quantity", "price_usd", "price_eur"];

/// One data row with its values keyed by canonical field name.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub line: usize,
    pub fields: HashMap<&'static str, String>,
}

impl RawRow {
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct LoadedRows {
    pub rows: Vec<RawRow>,
    pub skipped: Vec<SkippedRow>,
}

fn canonical_field(header: &str) -> Option<&'static str> {
    let needle = header.trim().to_ascii_lowercase();
    HEADER_ALIASES.iter().find(|(alias, _)| *alias == needle).map(|(_, field)| *field)
}

/// Reads and normalizes a deck list CSV. Structural problems (unreadable
/// file, missing required column, no data rows) are fatal; malformed rows are
/// diverted to the skip-report and the batch continues.
pub fn load_csv(path: &Path) -> Result<LoadedRows, DeckError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let columns: Vec<Option<&'static str>> =
        reader.headers()?.iter().map(canonical_field).collect();

    for required in REQUIRED_FIELDS {
        if !columns.iter().any(|c| c == &Some(*required)) {
            return Err(DeckError::MissingColumn((*required).to_string()));
        }
    }

    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let line = index + 2; // header occupies line 1
        let record = record?;

        if record.iter().all(|value| value.is_empty()) {
            continue;
        }

        let mut fields: HashMap<&'static str, String> = HashMap::new();
        for (column, value) in columns.iter().zip(record.iter()) {
            if let Some(field) = column {
                fields.insert(field, value.to_string());
            }
        }

        let row = RawRow { line, fields };
        match validate_row(&row) {
            Ok(()) => rows.push(row),
            Err(error) => skipped.push(SkippedRow { line, reason: error.to_string() }),
        }
    }

    if rows.is_empty() && skipped.is_empty() {
        return Err(DeckError::EmptyFile);
    }

    Ok(LoadedRows { rows, skipped })
}

fn validate_row(row: &RawRow) -> Result<(), DeckError> {
    if row.get("name").is_empty() {
        return Err(DeckError::Custom(format!("Row {}: card name is empty", row.line)));
    }
    if parse_quantity(row.get("quantity")).is_none() {
        return Err(DeckError::InvalidNumber {
            row: row.line,
            field: "quantity".to_string(),
            value: row.get("quantity").to_string(),
        });
    }
    Ok(())
}

/// Quantities are accepted as positive integers, also spelled "2.0" by some
/// collection exports.
fn parse_quantity(value: &str) -> Option<u32> {
    let parsed: f64 = value.trim().parse().ok()?;
    if parsed > 0.0 && parsed.fract() == 0.0 && parsed <= u32::MAX as f64 {
        Some(parsed as u32)
    } else {
        None
    }
}

fn parse_price(row: &RawRow, field: &'static str) -> f64 {
    let value = row.get(field);
    if value.is_empty() {
        return 0.0;
    }
    match value.parse() {
        Ok(price) => price,
        Err(_) => {
            let warning = DeckError::InvalidNumber {
                row: row.line,
                field: field.to_string(),
                value: value.to_string(),
            };
            eprintln!("{warning}, using 0.0");
            0.0
        }
    }
}

/// Builds the pending Card for one validated row.
pub fn build_card(row: &RawRow) -> Card {
    let quantity = parse_quantity(row.get("quantity")).unwrap_or(1);
    let mut card = Card::new(row.get("name").to_string(), quantity);

    let identifier = row.get("identifier");
    if !identifier.is_empty() {
        card.identifier = Some(identifier.to_string());
    }
    card.colors = parse_color_tokens(row.get("colors"));
    card.type_line = row.get("type_line").to_string();
    card.mana_cost = row.get("mana_cost").to_string();
    card.set_code = row.get("set_code").to_string();
    card.set_name = row.get("set_name").to_string();
    card.collector_number = row.get("collector_number").to_string();
    card.rarity = row.get("rarity").to_string();
    card.language = row.get("language").to_string();
    card.price_usd = parse_price(row, "price_usd");
    card.price_eur = parse_price(row, "price_eur");

    card
}
