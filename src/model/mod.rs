//! Domain records: the campaign singleton and the dedication collection.
//!
//! This module handles:
//! - Record types and their JSON shape
//! - Decimal (de)serialization for campaign amounts
//! - Seed data written on first access

pub mod number;
pub mod seed;
pub mod types;

pub use seed::SeedData;
pub use types::{
    next_dedication_id, CampaignRecord, Dedication, DedicationStatus, DedicationUpdate,
    NewDedication, DEFAULT_PHASE,
};
