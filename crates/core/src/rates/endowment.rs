use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TableError;
use crate::domain::inputs::EndowmentTier;

const GRILLE: &str = "endowment.grille";
const PARTICIPATION: &str = "endowment.participation";

pub const MIN_DURATION: u8 = 1;
pub const MAX_DURATION: u8 = 47;

#[derive(Clone, Debug, Deserialize)]
pub struct GrilleRecord {
    pub tier: String,
    pub savings_contribution: Decimal,
    pub death_contribution: Decimal,
    pub total_contribution: Decimal,
    pub death_capital: Decimal,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ParticipationRecord {
    pub duration: u8,
    pub rate: Decimal,
}

/// Monthly contributions and death capital for one tabulated FER+ tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GrilleRow {
    pub savings_contribution: Decimal,
    pub death_contribution: Decimal,
    pub total_contribution: Decimal,
    pub death_capital: Decimal,
}

#[derive(Clone, Debug, Default)]
pub struct EndowmentTables {
    grille: BTreeMap<EndowmentTier, GrilleRow>,
    participation: BTreeMap<u8, Decimal>,
}

impl EndowmentTables {
    pub fn from_records(
        grille: Vec<GrilleRecord>,
        participation: Vec<ParticipationRecord>,
    ) -> Result<Self, TableError> {
        if grille.is_empty() {
            return Err(TableError::Empty { table: GRILLE });
        }
        if participation.is_empty() {
            return Err(TableError::Empty { table: PARTICIPATION });
        }

        let mut tables = Self::default();
        for record in grille {
            let tier = EndowmentTier::from_letter(&record.tier)
                .filter(|tier| !tier.is_free_entry())
                .ok_or_else(|| TableError::InvalidKey {
                    table: GRILLE,
                    key: record.tier.clone(),
                    reason: "tier must be one of A..G".to_owned(),
                })?;
            let row = GrilleRow {
                savings_contribution: record.savings_contribution,
                death_contribution: record.death_contribution,
                total_contribution: record.total_contribution,
                death_capital: record.death_capital,
            };
            if tables.grille.insert(tier, row).is_some() {
                return Err(TableError::DuplicateKey {
                    table: GRILLE,
                    key: tier.letter().to_owned(),
                });
            }
        }

        for record in participation {
            if !(MIN_DURATION..=MAX_DURATION).contains(&record.duration) {
                return Err(TableError::InvalidKey {
                    table: PARTICIPATION,
                    key: record.duration.to_string(),
                    reason: format!("duration must be in {MIN_DURATION}..={MAX_DURATION}"),
                });
            }
            if tables.participation.insert(record.duration, record.rate).is_some() {
                return Err(TableError::DuplicateKey {
                    table: PARTICIPATION,
                    key: record.duration.to_string(),
                });
            }
        }

        Ok(tables)
    }

    pub fn grille_row(&self, tier: EndowmentTier) -> Option<GrilleRow> {
        self.grille.get(&tier).copied()
    }

    pub fn participation_rate(&self, duration: u8) -> Option<Decimal> {
        self.participation.get(&duration).copied()
    }

    /// Tabulated tiers present in the grille, plus the free-entry tier.
    pub fn offers_tier(&self, tier: EndowmentTier) -> bool {
        tier.is_free_entry() || self.grille.contains_key(&tier)
    }

    pub fn offered_tiers(&self) -> Vec<EndowmentTier> {
        self.grille.keys().copied().chain(std::iter::once(EndowmentTier::H)).collect()
    }

    pub fn key_count(&self) -> usize {
        self.grille.len() + self.participation.len()
    }
}
