use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Deserialize;

use super::{AgeRange, TableError};

const TABLE: &str = "borrower";

/// One age row of the borrower-insurance table. A duration left out of the row
/// means no coverage for that combination.
#[derive(Clone, Debug, Deserialize)]
pub struct BorrowerRow {
    pub age: u32,
    /// Loan duration in months (as a string key) to rate.
    pub durations: BTreeMap<String, Decimal>,
}

#[derive(Clone, Debug, Default)]
pub struct BorrowerTable {
    rates: BTreeMap<u32, BTreeMap<u32, Decimal>>,
    durations: BTreeSet<u32>,
}

impl BorrowerTable {
    pub fn from_rows(rows: Vec<BorrowerRow>) -> Result<Self, TableError> {
        if rows.is_empty() {
            return Err(TableError::Empty { table: TABLE });
        }

        let mut table = Self::default();
        for row in rows {
            let mut columns = BTreeMap::new();
            for (raw, rate) in row.durations {
                let months = raw
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|months| *months > 0)
                    .ok_or_else(|| TableError::InvalidKey {
                        table: TABLE,
                        key: raw.clone(),
                        reason: "duration must be a positive number of months".to_owned(),
                    })?;
                columns.insert(months, rate);
                table.durations.insert(months);
            }

            if table.rates.insert(row.age, columns).is_some() {
                return Err(TableError::DuplicateKey { table: TABLE, key: row.age.to_string() });
            }
        }

        Ok(table)
    }

    pub fn rate(&self, age: u32, months: u32) -> Option<Decimal> {
        self.rates.get(&age).and_then(|columns| columns.get(&months)).copied()
    }

    /// Whether the duration is a column of the table, i.e. offered for at least
    /// one age.
    pub fn has_duration(&self, months: u32) -> bool {
        self.durations.contains(&months)
    }

    pub fn durations(&self) -> impl Iterator<Item = u32> + '_ {
        self.durations.iter().copied()
    }

    pub fn age_range(&self) -> Option<AgeRange> {
        AgeRange::from_ages(self.rates.keys().copied())
    }

    pub fn key_count(&self) -> usize {
        self.rates.len()
    }
}
