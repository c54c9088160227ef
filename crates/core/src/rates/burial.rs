use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::{AgeRange, TableError};
use crate::domain::inputs::{CapitalTier, Periodicity};

const TABLE: &str = "burial";

/// One `(age, periodicity)` row of the IBEKELIA premium table.
#[derive(Clone, Debug, Deserialize)]
pub struct BurialRow {
    pub age: u32,
    /// `M`, `A` or `U`.
    pub periodicity: String,
    /// Guaranteed capital (as a string key) to premium.
    pub capitals: BTreeMap<String, Decimal>,
}

#[derive(Clone, Debug, Default)]
pub struct BurialTable {
    premiums: BTreeMap<(u32, Periodicity), BTreeMap<CapitalTier, Decimal>>,
}

impl BurialTable {
    pub fn from_rows(rows: Vec<BurialRow>) -> Result<Self, TableError> {
        if rows.is_empty() {
            return Err(TableError::Empty { table: TABLE });
        }

        let mut table = Self::default();
        for row in rows {
            let periodicity = Periodicity::from_code(&row.periodicity).ok_or_else(|| {
                TableError::InvalidKey {
                    table: TABLE,
                    key: format!("{}-{}", row.age, row.periodicity),
                    reason: "periodicity must be one of M, A, U".to_owned(),
                }
            })?;

            let mut columns = BTreeMap::new();
            for (raw, premium) in row.capitals {
                columns.insert(parse_capital(&raw)?, premium);
            }

            if table.premiums.insert((row.age, periodicity), columns).is_some() {
                return Err(TableError::DuplicateKey {
                    table: TABLE,
                    key: format!("{}-{}", row.age, periodicity.code()),
                });
            }
        }

        Ok(table)
    }

    pub fn premium(
        &self,
        age: u32,
        periodicity: Periodicity,
        tier: CapitalTier,
    ) -> Option<Decimal> {
        self.premiums.get(&(age, periodicity)).and_then(|columns| columns.get(&tier)).copied()
    }

    pub fn age_range(&self) -> Option<AgeRange> {
        AgeRange::from_ages(self.premiums.keys().map(|(age, _)| *age))
    }

    pub fn key_count(&self) -> usize {
        self.premiums.len()
    }
}

fn parse_capital(raw: &str) -> Result<CapitalTier, TableError> {
    let invalid = |reason: &str| TableError::InvalidKey {
        table: TABLE,
        key: raw.to_owned(),
        reason: reason.to_owned(),
    };
    let amount = raw.trim().parse::<u64>().map_err(|_| invalid("capital must be an integer"))?;
    CapitalTier::from_amount(amount)
        .ok_or_else(|| invalid("capital must be one of 1000000..5000000 by millions"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::{BurialRow, BurialTable};
    use crate::domain::inputs::{CapitalTier, Periodicity};
    use crate::rates::{fixtures, TableError};

    fn tier(choice: u8) -> CapitalTier {
        CapitalTier::new(choice).expect("valid tier")
    }

    #[test]
    fn premium_lookup_uses_age_periodicity_and_capital() {
        let table = fixtures::burial();
        assert_eq!(
            table.premium(40, Periodicity::Monthly, tier(3)),
            Some(Decimal::new(150_000, 2))
        );
        assert_eq!(table.premium(70, Periodicity::Single, tier(5)), None);
        assert_eq!(table.premium(19, Periodicity::Monthly, tier(1)), None);
    }

    #[test]
    fn unknown_periodicity_is_rejected() {
        let error = BurialTable::from_rows(vec![BurialRow {
            age: 40,
            periodicity: "W".to_owned(),
            capitals: BTreeMap::new(),
        }])
        .expect_err("unknown periodicity must fail");
        assert!(matches!(error, TableError::InvalidKey { .. }));
    }

    #[test]
    fn periodicity_codes_are_normalized_before_duplicate_check() {
        let error = BurialTable::from_rows(vec![
            BurialRow { age: 40, periodicity: "m".to_owned(), capitals: BTreeMap::new() },
            BurialRow { age: 40, periodicity: "M".to_owned(), capitals: BTreeMap::new() },
        ])
        .expect_err("same key twice must fail");
        assert!(matches!(error, TableError::DuplicateKey { .. }));
    }

    #[test]
    fn capital_columns_must_be_known_tiers() {
        let error = BurialTable::from_rows(vec![BurialRow {
            age: 40,
            periodicity: "A".to_owned(),
            capitals: BTreeMap::from([("1500000".to_owned(), Decimal::ONE)]),
        }])
        .expect_err("unknown capital must fail");
        assert!(matches!(error, TableError::InvalidKey { .. }));
    }
}
