//! Reads the rate tables from a directory of TOML files.
//!
//! ```text
//! <dir>/education.toml   [[rates]]  age, annuities, durations = { "5" = 0.051, ... }
//! <dir>/burial.toml      [[premiums]] age, periodicity, capitals = { "1000000" = 450.0, ... }
//! <dir>/endowment.toml   [[grille]] tier, ... and [[participation]] duration, rate
//! <dir>/borrower.toml    [[rates]]  age, durations = { "12" = 0.0012, ... }
//! ```
//!
//! Any missing or malformed table is fatal: quotes are never served from a
//! partial store.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::borrower::BorrowerRow;
use super::burial::BurialRow;
use super::education::EducationRow;
use super::endowment::{GrilleRecord, ParticipationRecord};
use super::{BorrowerTable, BurialTable, EducationTable, EndowmentTables, RateTables, TableError};

pub const EDUCATION_FILE: &str = "education.toml";
pub const BURIAL_FILE: &str = "burial.toml";
pub const ENDOWMENT_FILE: &str = "endowment.toml";
pub const BORROWER_FILE: &str = "borrower.toml";

#[derive(Debug, Deserialize)]
struct EducationFile {
    #[serde(default)]
    rates: Vec<EducationRow>,
}

#[derive(Debug, Deserialize)]
struct BurialFile {
    #[serde(default)]
    premiums: Vec<BurialRow>,
}

#[derive(Debug, Deserialize)]
struct EndowmentFile {
    #[serde(default)]
    grille: Vec<GrilleRecord>,
    #[serde(default)]
    participation: Vec<ParticipationRecord>,
}

#[derive(Debug, Deserialize)]
struct BorrowerFile {
    #[serde(default)]
    rates: Vec<BorrowerRow>,
}

impl RateTables {
    pub fn load_dir(dir: &Path) -> Result<Self, TableError> {
        let education: EducationFile = read_table(dir, "education", EDUCATION_FILE)?;
        let burial: BurialFile = read_table(dir, "burial", BURIAL_FILE)?;
        let endowment: EndowmentFile = read_table(dir, "endowment", ENDOWMENT_FILE)?;
        let borrower: BorrowerFile = read_table(dir, "borrower", BORROWER_FILE)?;

        Ok(Self::new(
            EducationTable::from_rows(education.rates)?,
            BurialTable::from_rows(burial.premiums)?,
            EndowmentTables::from_records(endowment.grille, endowment.participation)?,
            BorrowerTable::from_rows(borrower.rates)?,
        ))
    }
}

fn read_table<T>(dir: &Path, table: &'static str, file_name: &str) -> Result<T, TableError>
where
    T: DeserializeOwned,
{
    let path = dir.join(file_name);
    if !path.exists() {
        return Err(TableError::MissingTable { table, path });
    }

    let raw = fs::read_to_string(&path)
        .map_err(|source| TableError::ReadFile { path: path.clone(), source })?;
    toml::from_str::<T>(&raw).map_err(|source| TableError::ParseFile { path, source })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use crate::domain::inputs::{CapitalTier, EndowmentTier, Periodicity};
    use crate::domain::product::Product;
    use crate::rates::{AgeRange, RateTables, TableError};

    const EDUCATION: &str = r#"
[[rates]]
age = 40
annuities = 3
durations = { "10" = 0.02, "12" = "0.0175" }

[[rates]]
age = 42
annuities = 1
durations = { "5" = 0.05 }
"#;

    const BURIAL: &str = r#"
[[premiums]]
age = 40
periodicity = "m"
capitals = { "3000000" = 1500.0 }
"#;

    const ENDOWMENT: &str = r#"
[[grille]]
tier = "C"
savings_contribution = 30000
death_contribution = 6000
total_contribution = 36000
death_capital = 6000000

[[participation]]
duration = 15
rate = 12.5
"#;

    const BORROWER: &str = r#"
[[rates]]
age = 50
durations = { "12" = 0.001, "240" = 0.02 }
"#;

    fn write_tables(dir: &TempDir, skip: Option<&str>) -> io::Result<()> {
        for (name, body) in [
            ("education.toml", EDUCATION),
            ("burial.toml", BURIAL),
            ("endowment.toml", ENDOWMENT),
            ("borrower.toml", BORROWER),
        ] {
            if Some(name) != skip {
                fs::write(dir.path().join(name), body)?;
            }
        }
        Ok(())
    }

    #[test]
    fn loads_all_tables_from_directory() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        write_tables(&dir, None).map_err(|err| err.to_string())?;

        let tables = RateTables::load_dir(dir.path()).map_err(|err| err.to_string())?;

        assert_eq!(tables.education.rate(40, 3, 10), Some(Decimal::new(2, 2)));
        assert_eq!(tables.education.rate(40, 3, 12), Some(Decimal::new(175, 4)));
        assert_eq!(tables.age_range(Product::Education), Some(AgeRange { min: 40, max: 42 }));
        assert_eq!(
            tables.burial.premium(
                40,
                Periodicity::Monthly,
                CapitalTier::new(3).ok_or("tier 3 should exist")?
            ),
            Some(Decimal::new(1500, 0))
        );
        assert_eq!(
            tables.endowment.participation_rate(15),
            Some(Decimal::new(125, 1))
        );
        assert!(tables.endowment.grille_row(EndowmentTier::C).is_some());
        assert_eq!(tables.borrower.rate(50, 240), Some(Decimal::new(2, 2)));
        Ok(())
    }

    #[test]
    fn missing_table_is_fatal() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        write_tables(&dir, Some("borrower.toml")).map_err(|err| err.to_string())?;

        let error = RateTables::load_dir(dir.path()).expect_err("borrower table is required");
        assert!(matches!(error, TableError::MissingTable { table: "borrower", .. }));
        assert!(error.to_string().contains("borrower.toml"));
        Ok(())
    }

    #[test]
    fn malformed_table_reports_parse_error() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        write_tables(&dir, None).map_err(|err| err.to_string())?;
        fs::write(dir.path().join("burial.toml"), "[[premiums]]\nage = \"forty\"\n")
            .map_err(|err| err.to_string())?;

        let error = RateTables::load_dir(dir.path()).expect_err("malformed table must fail");
        assert!(matches!(error, TableError::ParseFile { .. }));
        Ok(())
    }

    #[test]
    fn empty_table_file_is_fatal() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        write_tables(&dir, None).map_err(|err| err.to_string())?;
        fs::write(dir.path().join("education.toml"), "").map_err(|err| err.to_string())?;

        let error = RateTables::load_dir(dir.path()).expect_err("empty table must fail");
        assert!(matches!(error, TableError::Empty { table: "education" }));
        Ok(())
    }
}
