//! Campaign and dedication record types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use super::number;

/// Sale status of a dedication.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DedicationStatus {
    /// Open for a donor.
    Available,
    /// Claimed and paid.
    Sold,
    /// Claimed, payment outstanding.
    Pending,
}

/// The campaign funding-progress record. Exactly one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecord {
    /// Fundraising target.
    #[serde(with = "number")]
    #[schema(value_type = f64)]
    pub goal: Decimal,
    /// Amount collected so far. May exceed `goal`.
    #[serde(with = "number")]
    #[schema(value_type = f64)]
    pub raised: Decimal,
    /// ISO-8601 date of the last update, as supplied by the client.
    pub last_updated: String,
}

/// A named giving opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Dedication {
    /// System-assigned identifier, unique within the collection.
    pub id: u64,
    /// Display label.
    pub title: String,
    /// Free-form price text, e.g. `"$300,000"`.
    pub amount: String,
    /// Sale status.
    pub status: DedicationStatus,
    /// Campaign phase this dedication belongs to.
    #[serde(default = "default_phase")]
    pub phase: u32,
}

/// Fields of a dedication before an id has been allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDedication {
    /// Display label.
    pub title: String,
    /// Free-form price text.
    pub amount: String,
    /// Sale status.
    pub status: DedicationStatus,
    /// Campaign phase.
    pub phase: u32,
}

impl NewDedication {
    /// Attach an allocated id.
    pub fn with_id(self, id: u64) -> Dedication {
        Dedication {
            id,
            title: self.title,
            amount: self.amount,
            status: self.status,
            phase: self.phase,
        }
    }
}

/// Replacement fields for an existing dedication. `phase: None` keeps the
/// stored phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedicationUpdate {
    /// Display label.
    pub title: String,
    /// Free-form price text.
    pub amount: String,
    /// Sale status.
    pub status: DedicationStatus,
    /// Campaign phase, if supplied.
    pub phase: Option<u32>,
}

impl DedicationUpdate {
    /// Fields for a new entry, defaulting the phase.
    pub fn into_new(self) -> NewDedication {
        NewDedication {
            title: self.title,
            amount: self.amount,
            status: self.status,
            phase: self.phase.unwrap_or(DEFAULT_PHASE),
        }
    }

    /// Apply to `existing`, keeping its id and, when omitted, its phase.
    pub fn apply_to(self, existing: &Dedication) -> Dedication {
        Dedication {
            id: existing.id,
            title: self.title,
            amount: self.amount,
            status: self.status,
            phase: self.phase.unwrap_or(existing.phase),
        }
    }
}

/// Phase assigned when none is supplied.
pub const DEFAULT_PHASE: u32 = 1;

fn default_phase() -> u32 {
    DEFAULT_PHASE
}

/// Next id for a collection: one above the current maximum, or 1 when empty.
pub fn next_dedication_id(dedications: &[Dedication]) -> u64 {
    dedications.iter().map(|d| d.id).max().unwrap_or(0) + 1
}
