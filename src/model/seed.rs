//! Default records written on first access to an empty backend.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::AppError;

use super::types::{CampaignRecord, Dedication};

/// Canonical dedication list shipped with the crate.
const DEFAULT_DEDICATIONS_JSON: &str = include_str!("../../data/default-dedications.json");

/// Default fundraising goal.
pub const DEFAULT_GOAL: Decimal = dec!(1800000);

/// Default amount raised.
pub const DEFAULT_RAISED: Decimal = dec!(950000);

/// Seed values used when a backend holds no record yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedData {
    /// Goal for the seeded campaign record.
    pub goal: Decimal,
    /// Raised amount for the seeded campaign record.
    pub raised: Decimal,
    /// Initial dedication collection.
    pub dedications: Vec<Dedication>,
}

impl SeedData {
    /// Seed built from the shipped dedication list and default amounts.
    pub fn builtin() -> Result<Self, AppError> {
        let dedications = parse_dedications(DEFAULT_DEDICATIONS_JSON)?;
        Ok(Self {
            goal: DEFAULT_GOAL,
            raised: DEFAULT_RAISED,
            dedications,
        })
    }

    /// Seed whose dedication list is read from a JSON file.
    pub fn from_file(path: &Path, goal: Decimal, raised: Decimal) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Seed(format!("cannot read {}: {}", path.display(), e))
        })?;
        let dedications = parse_dedications(&text)?;
        Ok(Self {
            goal,
            raised,
            dedications,
        })
    }

    /// Campaign record stamped with today's date.
    pub fn campaign(&self) -> CampaignRecord {
        CampaignRecord {
            goal: self.goal,
            raised: self.raised,
            last_updated: today(),
        }
    }
}

fn parse_dedications(text: &str) -> Result<Vec<Dedication>, AppError> {
    let dedications: Vec<Dedication> =
        serde_json::from_str(text).map_err(|e| AppError::Seed(e.to_string()))?;

    let mut seen = HashSet::new();
    for d in &dedications {
        if d.id == 0 {
            return Err(AppError::Seed(format!("dedication '{}' has id 0", d.title)));
        }
        if !seen.insert(d.id) {
            return Err(AppError::Seed(format!("duplicate dedication id {}", d.id)));
        }
        if d.phase == 0 {
            return Err(AppError::Seed(format!("dedication {} has phase 0", d.id)));
        }
    }

    Ok(dedications)
}

/// Today's UTC date as `YYYY-MM-DD`.
pub fn today() -> String {
    let format = format_description!("[year]-[month]-[day]");
    OffsetDateTime::now_utc()
        .date()
        .format(&format)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().date().to_string())
}
