//! Rate Table Store
//!
//! Immutable, queryable rate tables for the four quoted products. Tables are
//! built once at start-up (see [`loader`]) and shared read-only behind an `Arc`.
//!
//! Lookups never fail: a missing key is `None`, which stays distinguishable from
//! a rate that is present but zero.

pub mod borrower;
pub mod burial;
pub mod education;
pub mod endowment;
pub mod loader;

use serde::Serialize;
use thiserror::Error;

use crate::domain::product::Product;

pub use borrower::BorrowerTable;
pub use burial::BurialTable;
pub use education::EducationTable;
pub use endowment::{EndowmentTables, GrilleRow};

/// Inclusive age bounds derived from the ages present in a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn contains(&self, age: u32) -> bool {
        (self.min..=self.max).contains(&age)
    }

    pub(crate) fn from_ages(ages: impl IntoIterator<Item = u32>) -> Option<Self> {
        let mut ages = ages.into_iter();
        let first = ages.next()?;
        let (min, max) = ages.fold((first, first), |(min, max), age| (min.min(age), max.max(age)));
        Some(Self { min, max })
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("required rate table `{table}` was not found at `{path}`")]
    MissingTable { table: &'static str, path: std::path::PathBuf },
    #[error("could not read rate table `{path}`: {source}")]
    ReadFile { path: std::path::PathBuf, source: std::io::Error },
    #[error("could not parse rate table `{path}`: {source}")]
    ParseFile { path: std::path::PathBuf, source: toml::de::Error },
    #[error("rate table `{table}` has no rows")]
    Empty { table: &'static str },
    #[error("rate table `{table}` has a duplicate key `{key}`")]
    DuplicateKey { table: &'static str, key: String },
    #[error("rate table `{table}` has an invalid key `{key}`: {reason}")]
    InvalidKey { table: &'static str, key: String, reason: String },
}

#[derive(Clone, Debug)]
pub struct RateTables {
    pub education: EducationTable,
    pub burial: BurialTable,
    pub endowment: EndowmentTables,
    pub borrower: BorrowerTable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub product: Product,
    pub keys: usize,
    pub age_range: Option<AgeRange>,
}

impl RateTables {
    pub fn new(
        education: EducationTable,
        burial: BurialTable,
        endowment: EndowmentTables,
        borrower: BorrowerTable,
    ) -> Self {
        Self { education, burial, endowment, borrower }
    }

    /// Valid age window for a product, recomputed from the table contents.
    pub fn age_range(&self, product: Product) -> Option<AgeRange> {
        match product {
            Product::Education => self.education.age_range(),
            Product::BurialCapital => self.burial.age_range(),
            Product::Borrower => self.borrower.age_range(),
            Product::Endowment => None,
        }
    }

    pub fn summary(&self) -> Vec<TableSummary> {
        Product::ALL
            .iter()
            .map(|product| TableSummary {
                product: *product,
                keys: match product {
                    Product::Education => self.education.key_count(),
                    Product::BurialCapital => self.burial.key_count(),
                    Product::Endowment => self.endowment.key_count(),
                    Product::Borrower => self.borrower.key_count(),
                },
                age_range: self.age_range(*product),
            })
            .collect()
    }
}
