//! Validated input values collected during a quote conversation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthInfo {
    pub birth_year: i32,
    pub age: u32,
}

/// Education quotes run in one of two modes: the user fixes the annuity and we
/// compute the contribution, or the other way around.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionMode {
    PrestationDefined,
    ContributionDefined,
}

impl ContributionMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PrestationDefined => "Prestation définie",
            Self::ContributionDefined => "Cotisation définie",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Periodicity {
    Monthly,
    Annual,
    Single,
}

impl Periodicity {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Monthly => "M",
            Self::Annual => "A",
            Self::Single => "U",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Monthly => "mensuelle",
            Self::Annual => "annuelle",
            Self::Single => "unique",
        }
    }

    pub fn from_code(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "M" | "MENSUELLE" => Some(Self::Monthly),
            "A" | "ANNUELLE" => Some(Self::Annual),
            "U" | "UNIQUE" => Some(Self::Single),
            _ => None,
        }
    }
}

/// Burial-capital tier 1..=5, each worth one million.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapitalTier(u8);

impl CapitalTier {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;
    const UNIT: u64 = 1_000_000;

    pub fn new(choice: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&choice).then_some(Self(choice))
    }

    pub fn from_amount(amount: u64) -> Option<Self> {
        if amount % Self::UNIT != 0 {
            return None;
        }
        u8::try_from(amount / Self::UNIT).ok().and_then(Self::new)
    }

    pub fn choice(&self) -> u8 {
        self.0
    }

    pub fn amount(&self) -> u64 {
        u64::from(self.0) * Self::UNIT
    }

    pub fn all() -> impl Iterator<Item = CapitalTier> {
        (Self::MIN..=Self::MAX).map(Self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EndowmentTier {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl EndowmentTier {
    pub fn from_letter(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            "E" => Some(Self::E),
            "F" => Some(Self::F),
            "G" => Some(Self::G),
            "H" => Some(Self::H),
            _ => None,
        }
    }

    pub fn letter(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
            Self::G => "G",
            Self::H => "H",
        }
    }

    /// Tier H has no grille row: the user types the monthly amount.
    pub fn is_free_entry(&self) -> bool {
        matches!(self, Self::H)
    }
}

/// A monetary amount typed by the user, already checked to be non-negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Option<Self> {
        (!value.is_sign_negative() || value.is_zero()).then_some(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Amount, CapitalTier, EndowmentTier, Periodicity};

    #[test]
    fn capital_tier_maps_choice_to_millions() {
        let tier = CapitalTier::new(3).expect("tier 3 exists");
        assert_eq!(tier.amount(), 3_000_000);
        assert_eq!(CapitalTier::from_amount(3_000_000), Some(tier));
        assert_eq!(CapitalTier::new(0), None);
        assert_eq!(CapitalTier::new(6), None);
        assert_eq!(CapitalTier::from_amount(2_500_000), None);
    }

    #[test]
    fn periodicity_codes_are_case_insensitive() {
        assert_eq!(Periodicity::from_code(" m "), Some(Periodicity::Monthly));
        assert_eq!(Periodicity::from_code("Annuelle"), Some(Periodicity::Annual));
        assert_eq!(Periodicity::from_code("u"), Some(Periodicity::Single));
        assert_eq!(Periodicity::from_code("x"), None);
    }

    #[test]
    fn only_tier_h_is_free_entry() {
        assert!(EndowmentTier::from_letter("h").is_some_and(|tier| tier.is_free_entry()));
        assert!(!EndowmentTier::C.is_free_entry());
        assert_eq!(EndowmentTier::from_letter("I"), None);
    }

    #[test]
    fn amount_rejects_negative_values() {
        assert!(Amount::new(Decimal::new(-1, 0)).is_none());
        assert!(Amount::new(Decimal::ZERO).is_some());
    }
}
