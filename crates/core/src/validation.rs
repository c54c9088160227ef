//! Per-step input validation.
//!
//! Every parser takes the raw user text, returns a typed value or a
//! [`ValidationError`] carrying the corrective message to send back. Parsers
//! never touch the session.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::inputs::{
    Amount, BirthInfo, CapitalTier, ContributionMode, EndowmentTier, Periodicity,
};
use crate::rates::education::{MAX_ANNUITIES, MIN_ANNUITIES};
use crate::rates::endowment::EndowmentTables;
use crate::rates::AgeRange;

pub const MIN_BIRTH_YEAR: i32 = 1900;
/// Tier H monthly amounts must be strictly above this.
pub const FREE_ENTRY_THRESHOLD: i64 = 120_000;
/// Largest amount or principal accepted from the user.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The text could not be parsed at all.
    Format,
    /// Parsed, but outside the allowed interval or set.
    Range,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn format(message: impl Into<String>) -> Self {
        Self { kind: ValidationErrorKind::Format, message: message.into() }
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self { kind: ValidationErrorKind::Range, message: message.into() }
    }
}

/// Age outside a table's derived window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgeOutOfRange {
    pub age: u32,
    pub range: AgeRange,
}

pub fn parse_contribution_mode(text: &str) -> Result<ContributionMode, ValidationError> {
    match text.trim() {
        "1" => Ok(ContributionMode::PrestationDefined),
        "2" => Ok(ContributionMode::ContributionDefined),
        _ => Err(ValidationError::range(
            "Choix invalide. Répondez 1 (Prestation) ou 2 (Cotisation).",
        )),
    }
}

pub fn parse_birth_year(text: &str, current_year: i32) -> Result<BirthInfo, ValidationError> {
    let invalid = || {
        ValidationError::format(
            "Année invalide. Entrez l'année de naissance au format AAAA (ex: 1985).",
        )
    };
    let birth_year = text.trim().parse::<i32>().map_err(|_| invalid())?;
    if !(MIN_BIRTH_YEAR..=current_year).contains(&birth_year) {
        return Err(ValidationError::range(format!(
            "Année invalide. Entrez une année entre {MIN_BIRTH_YEAR} et {current_year}."
        )));
    }
    let age = u32::try_from(current_year - birth_year).map_err(|_| invalid())?;
    Ok(BirthInfo { birth_year, age })
}

pub fn check_age(age: u32, range: AgeRange) -> Result<(), AgeOutOfRange> {
    if range.contains(age) {
        Ok(())
    } else {
        Err(AgeOutOfRange { age, range })
    }
}

/// Integer duration within a closed interval.
pub fn parse_duration(text: &str, min: u8, max: u8) -> Result<u8, ValidationError> {
    let value = text.trim().parse::<i64>().map_err(|_| {
        ValidationError::format(format!(
            "Durée invalide. Entrez un nombre entier entre {min} et {max}."
        ))
    })?;
    u8::try_from(value).ok().filter(|duration| (min..=max).contains(duration)).ok_or_else(|| {
        ValidationError::range(format!(
            "Durée hors intervalle. Entrez une durée entre {min} et {max}."
        ))
    })
}

/// Loan duration in months: any positive integer. Table membership is checked
/// by the borrower flow.
pub fn parse_loan_duration(text: &str) -> Result<u32, ValidationError> {
    let value = text.trim().parse::<i64>().map_err(|_| {
        ValidationError::format(
            "Durée invalide. Entrez un entier (durée en mois, ex: 12, 24, 360).",
        )
    })?;
    u32::try_from(value).ok().filter(|months| *months > 0).ok_or_else(|| {
        ValidationError::range(
            "Durée invalide. La durée du prêt doit être un nombre de mois positif.",
        )
    })
}

pub fn parse_annuity_count(text: &str) -> Result<u8, ValidationError> {
    let value = text.trim().parse::<i64>().map_err(|_| {
        ValidationError::format(format!(
            "Nombre de rentes invalide. Entrez un entier ({MIN_ANNUITIES} à {MAX_ANNUITIES})."
        ))
    })?;
    u8::try_from(value)
        .ok()
        .filter(|count| (MIN_ANNUITIES..=MAX_ANNUITIES).contains(count))
        .ok_or_else(|| {
            ValidationError::range(format!(
                "Nombre de rentes hors intervalle. Entrez entre {MIN_ANNUITIES} et {MAX_ANNUITIES}."
            ))
        })
}

pub fn parse_periodicity(text: &str) -> Result<Periodicity, ValidationError> {
    Periodicity::from_code(text)
        .ok_or_else(|| ValidationError::range("Périodicité invalide. Répondez M, A ou U."))
}

pub fn parse_capital_tier(text: &str) -> Result<CapitalTier, ValidationError> {
    text.trim()
        .parse::<u8>()
        .ok()
        .and_then(CapitalTier::new)
        .ok_or_else(|| ValidationError::range("Choix invalide. Répondez 1, 2, 3, 4 ou 5."))
}

pub fn parse_endowment_tier(
    text: &str,
    tables: &EndowmentTables,
) -> Result<EndowmentTier, ValidationError> {
    EndowmentTier::from_letter(text).filter(|tier| tables.offers_tier(*tier)).ok_or_else(|| {
        let letters =
            tables.offered_tiers().iter().map(EndowmentTier::letter).collect::<Vec<_>>().join(", ");
        ValidationError::range(format!("Choix invalide. Répondez par {letters}."))
    })
}

/// Non-negative amount, accepting `,` or `.` as decimal separator and spaces as
/// digit grouping.
pub fn parse_amount(text: &str) -> Result<Amount, ValidationError> {
    let normalized: String = text
        .trim()
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| if ch == ',' { '.' } else { ch })
        .collect();
    let value = Decimal::from_str(&normalized)
        .map_err(|_| ValidationError::format("Montant invalide. Entrez un nombre (ex : 12000)."))?;
    bounded_amount(value, "Montant invalide. Le montant doit être positif.")
}

/// Borrowed principal. Commas are digit grouping here (`5,000,000`), not a
/// decimal separator.
pub fn parse_principal(text: &str) -> Result<Amount, ValidationError> {
    let normalized: String =
        text.trim().chars().filter(|ch| !ch.is_whitespace() && *ch != ',').collect();
    let value = Decimal::from_str(&normalized).map_err(|_| {
        ValidationError::format("Capital invalide. Entrez un nombre (ex : 5000000).")
    })?;
    bounded_amount(value, "Capital invalide. Le capital doit être positif.")
}

fn bounded_amount(value: Decimal, negative_message: &str) -> Result<Amount, ValidationError> {
    let amount = Amount::new(value).ok_or_else(|| ValidationError::range(negative_message))?;
    if amount.value() > Decimal::from(MAX_AMOUNT) {
        return Err(ValidationError::range(format!(
            "Montant trop élevé. Entrez une valeur inférieure ou égale à {MAX_AMOUNT}."
        )));
    }
    Ok(amount)
}

/// Tier H monthly contribution, strictly above [`FREE_ENTRY_THRESHOLD`].
pub fn parse_free_entry_amount(text: &str) -> Result<Amount, ValidationError> {
    let amount = parse_amount(text).map_err(|error| match error.kind {
        ValidationErrorKind::Format => {
            ValidationError::format("Montant invalide. Entrez un nombre (ex : 125000).")
        }
        ValidationErrorKind::Range => error,
    })?;
    if amount.value() <= Decimal::from(FREE_ENTRY_THRESHOLD) {
        return Err(ValidationError::range(format!(
            "Pour H, la cotisation doit être strictement supérieure à \
             {FREE_ENTRY_THRESHOLD}. Réessayez."
        )));
    }
    Ok(amount)
}

pub fn is_affirmative(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "oui" | "o" | "yes" | "y")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::rates::fixtures;

    #[test]
    fn birth_year_computes_age_from_current_year() {
        let birth = parse_birth_year(" 1985 ", 2025).expect("valid year");
        assert_eq!(birth.birth_year, 1985);
        assert_eq!(birth.age, 40);
    }

    #[test]
    fn birth_year_rejects_garbage_and_out_of_range() {
        let format = parse_birth_year("abc", 2025).expect_err("not a number");
        assert_eq!(format.kind, ValidationErrorKind::Format);
        assert!(parse_birth_year("1899", 2025).is_err());
        assert!(parse_birth_year("2026", 2025).is_err());
        assert!(parse_birth_year("1900", 2025).is_ok());
        assert!(parse_birth_year("2025", 2025).is_ok());
    }

    #[test]
    fn age_check_is_boundary_inclusive_over_whole_domain() {
        let range = AgeRange { min: 18, max: 60 };
        for age in 0..=120 {
            let inside = (18..=60).contains(&age);
            assert_eq!(check_age(age, range).is_ok(), inside, "age {age}");
        }
    }

    #[test]
    fn duration_respects_closed_interval() {
        assert_eq!(parse_duration("5", 5, 20), Ok(5));
        assert_eq!(parse_duration("20", 5, 20), Ok(20));
        let kind = |text| parse_duration(text, 5, 20).map_err(|e| e.kind);
        assert_eq!(kind("4"), Err(ValidationErrorKind::Range));
        assert_eq!(kind("-3"), Err(ValidationErrorKind::Range));
        assert_eq!(kind("1.5"), Err(ValidationErrorKind::Format));
        assert!(parse_duration("21", 5, 20).unwrap_err().message.contains("entre 5 et 20"));
    }

    #[test]
    fn loan_duration_must_be_positive() {
        assert_eq!(parse_loan_duration("360"), Ok(360));
        assert!(parse_loan_duration("0").is_err());
        assert!(parse_loan_duration("douze").is_err());
    }

    #[test]
    fn annuity_count_in_one_to_seven() {
        assert_eq!(parse_annuity_count("1"), Ok(1));
        assert_eq!(parse_annuity_count("7"), Ok(7));
        assert!(parse_annuity_count("0").is_err());
        assert!(parse_annuity_count("8").is_err());
    }

    #[test]
    fn amount_accepts_comma_and_dot_separators() {
        assert_eq!(parse_amount("12000,50").map(|a| a.value()), Ok(Decimal::new(1_200_050, 2)));
        assert_eq!(parse_amount("12000.50").map(|a| a.value()), Ok(Decimal::new(1_200_050, 2)));
        assert_eq!(parse_amount("130 000").map(|a| a.value()), Ok(Decimal::from(130_000)));
        assert_eq!(parse_amount("0").map(|a| a.value()), Ok(Decimal::ZERO));
        assert_eq!(parse_amount("-5").map_err(|e| e.kind), Err(ValidationErrorKind::Range));
        assert_eq!(parse_amount("douze").map_err(|e| e.kind), Err(ValidationErrorKind::Format));
    }

    #[test]
    fn principal_treats_commas_as_grouping() {
        assert_eq!(parse_principal("5,000,000").map(|a| a.value()), Ok(Decimal::from(5_000_000)));
        assert_eq!(parse_principal("5 000 000").map(|a| a.value()), Ok(Decimal::from(5_000_000)));
        assert!(parse_principal("cinq").is_err());
    }

    #[test]
    fn amounts_above_the_ceiling_are_range_errors() {
        let huge = "10000000000000000000000000000";
        let error = parse_amount(huge).expect_err("too large");
        assert_eq!(error.kind, ValidationErrorKind::Range);
        assert!(error.message.contains("trop élevé"));
        assert_eq!(
            parse_free_entry_amount(huge).map_err(|e| e.kind),
            Err(ValidationErrorKind::Range)
        );
        assert_eq!(parse_principal(huge).map_err(|e| e.kind), Err(ValidationErrorKind::Range));
        assert_eq!(
            parse_amount("1000000000000000").map(|a| a.value()),
            Ok(Decimal::from(MAX_AMOUNT))
        );
    }

    #[test]
    fn free_entry_amount_must_exceed_threshold_strictly() {
        assert!(parse_free_entry_amount("120000").is_err());
        assert!(parse_free_entry_amount("120000,00").is_err());
        assert!(parse_free_entry_amount("120000.01").is_ok());
        assert_eq!(
            parse_free_entry_amount("130000").map(|a| a.value()),
            Ok(Decimal::from(130_000))
        );
    }

    #[test]
    fn endowment_tier_accepts_grille_tiers_and_h() {
        let tables = fixtures::endowment();
        assert_eq!(parse_endowment_tier("c", &tables), Ok(EndowmentTier::C));
        assert_eq!(parse_endowment_tier("H", &tables), Ok(EndowmentTier::H));
        let error = parse_endowment_tier("Z", &tables).expect_err("unknown tier");
        assert!(error.message.contains("A, B, C, D, E, F, G, H"));
    }

    #[test]
    fn periodicity_and_capital_tier_sets() {
        assert_eq!(parse_periodicity("m"), Ok(Periodicity::Monthly));
        assert!(parse_periodicity("w").is_err());
        assert_eq!(parse_capital_tier("3").map(|tier| tier.amount()), Ok(3_000_000));
        assert!(parse_capital_tier("6").is_err());
    }

    #[test]
    fn affirmatives_are_case_insensitive() {
        assert!(is_affirmative("Oui"));
        assert!(is_affirmative(" y "));
        assert!(!is_affirmative("non"));
        assert!(!is_affirmative(""));
    }
}
