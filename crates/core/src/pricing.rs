//! Computation Engine
//!
//! Per-product result formulas. Every function here is a pure function of the
//! validated inputs and a rate that was already looked up; table access and
//! conversation handling live in [`crate::flows`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::inputs::{
    Amount, BirthInfo, CapitalTier, ContributionMode, EndowmentTier, Periodicity,
};
use crate::domain::product::Product;
use crate::rates::GrilleRow;

/// Fixed monthly death contribution deducted from a tier H amount.
pub const FREE_ENTRY_DEATH_CONTRIBUTION: i64 = 20_000;
/// Death capital guaranteed under tier H.
pub const FREE_ENTRY_DEATH_CAPITAL: i64 = 20_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationQuote {
    pub mode: ContributionMode,
    pub birth: BirthInfo,
    pub duration: u8,
    pub annuities: u8,
    pub rate: Decimal,
    pub annual_annuity: Decimal,
    pub monthly_contribution: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurialQuote {
    pub birth: BirthInfo,
    pub periodicity: Periodicity,
    pub tier: CapitalTier,
    pub premium: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndowmentQuote {
    pub tier: EndowmentTier,
    pub duration: u8,
    pub participation_rate: Decimal,
    /// Only set for the free-entry tier.
    pub free_entry_amount: Option<Decimal>,
    pub savings_contribution: Decimal,
    pub death_contribution: Decimal,
    pub total_contribution: Decimal,
    pub acquired_capital: Decimal,
    /// Paid in addition to the accrued savings.
    pub death_capital: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerQuote {
    pub birth: BirthInfo,
    pub duration_months: u32,
    pub principal: Decimal,
    pub rate: Decimal,
    pub premium: Decimal,
}

/// A completed computation, tagged by product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "product", rename_all = "snake_case")]
pub enum Quotation {
    Education(EducationQuote),
    BurialCapital(BurialQuote),
    Endowment(EndowmentQuote),
    Borrower(BorrowerQuote),
}

impl Quotation {
    pub fn product(&self) -> Product {
        match self {
            Self::Education(_) => Product::Education,
            Self::BurialCapital(_) => Product::BurialCapital,
            Self::Endowment(_) => Product::Endowment,
            Self::Borrower(_) => Product::Borrower,
        }
    }
}

/// Why a formula could not produce a result.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("rate is zero")]
    ZeroRate,
    #[error("result exceeds the representable range")]
    Overflow,
}

/// Prestation-defined education: the user fixes the annual annuity.
pub fn education_monthly_contribution(
    rate: Decimal,
    annual_annuity: Decimal,
) -> Result<Decimal, PricingError> {
    rate.checked_mul(annual_annuity).ok_or(PricingError::Overflow)
}

/// Contribution-defined education: the user fixes the monthly contribution.
pub fn education_annual_annuity(
    rate: Decimal,
    monthly_contribution: Decimal,
) -> Result<Decimal, PricingError> {
    if rate.is_zero() {
        return Err(PricingError::ZeroRate);
    }
    monthly_contribution.checked_div(rate).ok_or(PricingError::Overflow)
}

/// Education quote for either mode. A zero rate is unusable in both modes.
pub fn price_education(
    mode: ContributionMode,
    birth: BirthInfo,
    duration: u8,
    annuities: u8,
    amount: Amount,
    rate: Decimal,
) -> Result<EducationQuote, PricingError> {
    if rate.is_zero() {
        return Err(PricingError::ZeroRate);
    }

    let (annual_annuity, monthly_contribution) = match mode {
        ContributionMode::PrestationDefined => {
            (amount.value(), education_monthly_contribution(rate, amount.value())?)
        }
        ContributionMode::ContributionDefined => {
            (education_annual_annuity(rate, amount.value())?, amount.value())
        }
    };

    Ok(EducationQuote {
        mode,
        birth,
        duration,
        annuities,
        rate,
        annual_annuity,
        monthly_contribution,
    })
}

pub fn price_burial(
    birth: BirthInfo,
    periodicity: Periodicity,
    tier: CapitalTier,
    premium: Decimal,
) -> BurialQuote {
    BurialQuote { birth, periodicity, tier, premium }
}

/// Tabulated FER+ tier (A..G).
pub fn price_endowment_tabulated(
    tier: EndowmentTier,
    duration: u8,
    participation_rate: Decimal,
    row: GrilleRow,
) -> Result<EndowmentQuote, PricingError> {
    let acquired_capital = participation_rate
        .checked_mul(row.savings_contribution)
        .ok_or(PricingError::Overflow)?;

    Ok(EndowmentQuote {
        tier,
        duration,
        participation_rate,
        free_entry_amount: None,
        savings_contribution: row.savings_contribution,
        death_contribution: row.death_contribution,
        total_contribution: row.total_contribution,
        acquired_capital,
        death_capital: row.death_capital,
    })
}

/// Free-entry FER+ tier H. The amount must already be above the threshold.
pub fn price_endowment_free_entry(
    duration: u8,
    participation_rate: Decimal,
    monthly_amount: Amount,
) -> Result<EndowmentQuote, PricingError> {
    let total = monthly_amount.value();
    let death_contribution = Decimal::from(FREE_ENTRY_DEATH_CONTRIBUTION);
    let savings_contribution =
        total.checked_sub(death_contribution).ok_or(PricingError::Overflow)?;
    let acquired_capital =
        participation_rate.checked_mul(savings_contribution).ok_or(PricingError::Overflow)?;

    Ok(EndowmentQuote {
        tier: EndowmentTier::H,
        duration,
        participation_rate,
        free_entry_amount: Some(total),
        savings_contribution,
        death_contribution,
        total_contribution: total,
        acquired_capital,
        death_capital: Decimal::from(FREE_ENTRY_DEATH_CAPITAL),
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BorrowerOutcome {
    Premium(BorrowerQuote),
    /// The computed premium is zero; the case must be handled by an advisor.
    ReferToAdvisor,
}

pub fn price_borrower(
    birth: BirthInfo,
    duration_months: u32,
    principal: Amount,
    rate: Decimal,
) -> Result<BorrowerOutcome, PricingError> {
    let premium = rate.checked_mul(principal.value()).ok_or(PricingError::Overflow)?;
    if premium.is_zero() {
        return Ok(BorrowerOutcome::ReferToAdvisor);
    }

    Ok(BorrowerOutcome::Premium(BorrowerQuote {
        birth,
        duration_months,
        principal: principal.value(),
        rate,
        premium,
    }))
}
