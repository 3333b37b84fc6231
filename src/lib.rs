pub mod config;
pub mod core;
pub mod persistence;
pub mod scryfall;
pub mod synergy;
pub mod translation;
