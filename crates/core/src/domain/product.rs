use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Education,
    BurialCapital,
    Endowment,
    Borrower,
}

impl Product {
    pub const ALL: [Product; 4] =
        [Product::Education, Product::BurialCapital, Product::Endowment, Product::Borrower];

    /// Stable identifier used in recap records, audit metadata and file names.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Education => "assur_education",
            Self::BurialCapital => "ibekelia",
            Self::Endowment => "fer_plus",
            Self::Borrower => "emprunteur",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Education => "Assur'Education",
            Self::BurialCapital => "IBEKELIA",
            Self::Endowment => "FER+",
            Self::Borrower => "Emprunteur",
        }
    }

    /// Whether the product's rate table is keyed by age.
    pub fn is_age_rated(&self) -> bool {
        !matches!(self, Self::Endowment)
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::Product;

    #[test]
    fn product_ids_are_unique() {
        let mut ids: Vec<_> = Product::ALL.iter().map(Product::id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), Product::ALL.len());
    }

    #[test]
    fn only_endowment_is_not_age_rated() {
        assert!(Product::Education.is_age_rated());
        assert!(Product::Borrower.is_age_rated());
        assert!(!Product::Endowment.is_age_rated());
    }
}
