pub mod colors;
pub mod csv_loader;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod tasks;

pub use errors::DeckError;
pub use models::{
    Card,
    Color,
    Deck,
    EnrichmentStatus,
    OracleTextSource,
};
