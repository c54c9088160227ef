use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Deserialize;

use super::{AgeRange, TableError};

const TABLE: &str = "education";

pub const MIN_ANNUITIES: u8 = 1;
pub const MAX_ANNUITIES: u8 = 7;
pub const MIN_DURATION: u8 = 5;
pub const MAX_DURATION: u8 = 20;

/// One `(age, annuities)` row of the Assur'Education table, as stored on disk.
#[derive(Clone, Debug, Deserialize)]
pub struct EducationRow {
    pub age: u32,
    pub annuities: u8,
    /// Contribution duration in years (as a string key) to rate.
    pub durations: BTreeMap<String, Decimal>,
}

#[derive(Clone, Debug, Default)]
pub struct EducationTable {
    rates: BTreeMap<(u32, u8), BTreeMap<u8, Decimal>>,
    durations: BTreeSet<u8>,
}

impl EducationTable {
    pub fn from_rows(rows: Vec<EducationRow>) -> Result<Self, TableError> {
        if rows.is_empty() {
            return Err(TableError::Empty { table: TABLE });
        }

        let mut table = Self::default();
        for row in rows {
            if !(MIN_ANNUITIES..=MAX_ANNUITIES).contains(&row.annuities) {
                return Err(TableError::InvalidKey {
                    table: TABLE,
                    key: format!("{}-{}", row.age, row.annuities),
                    reason: format!("annuities must be in {MIN_ANNUITIES}..={MAX_ANNUITIES}"),
                });
            }

            let mut columns = BTreeMap::new();
            for (raw, rate) in row.durations {
                let duration = parse_duration(&raw)?;
                columns.insert(duration, rate);
                table.durations.insert(duration);
            }

            let key = (row.age, row.annuities);
            if table.rates.insert(key, columns).is_some() {
                return Err(TableError::DuplicateKey {
                    table: TABLE,
                    key: format!("{}-{}", row.age, row.annuities),
                });
            }
        }

        Ok(table)
    }

    pub fn rate(&self, age: u32, annuities: u8, duration: u8) -> Option<Decimal> {
        self.rates.get(&(age, annuities)).and_then(|columns| columns.get(&duration)).copied()
    }

    pub fn has_key(&self, age: u32, annuities: u8) -> bool {
        self.rates.contains_key(&(age, annuities))
    }

    /// Whether any row carries a column for this duration.
    pub fn has_duration(&self, duration: u8) -> bool {
        self.durations.contains(&duration)
    }

    /// Annuity counts tabulated for an age, ascending.
    pub fn annuities_for_age(&self, age: u32) -> Vec<u8> {
        self.rates
            .range((age, MIN_ANNUITIES)..=(age, MAX_ANNUITIES))
            .map(|((_, annuities), _)| *annuities)
            .collect()
    }

    pub fn age_range(&self) -> Option<AgeRange> {
        AgeRange::from_ages(self.rates.keys().map(|(age, _)| *age))
    }

    pub fn key_count(&self) -> usize {
        self.rates.len()
    }
}

fn parse_duration(raw: &str) -> Result<u8, TableError> {
    let invalid =
        |reason: String| TableError::InvalidKey { table: TABLE, key: raw.to_owned(), reason };
    let duration = raw.trim().parse::<u8>().map_err(|error| invalid(error.to_string()))?;
    if !(MIN_DURATION..=MAX_DURATION).contains(&duration) {
        return Err(invalid(format!("duration must be in {MIN_DURATION}..={MAX_DURATION}")));
    }
    Ok(duration)
}
