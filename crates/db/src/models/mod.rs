//! Row types for each table, with conversions into the domain types in
//! `embedkit-core`.

pub mod approval;
pub mod audit;
pub mod embed_key;
pub mod integration;
pub mod version;
