use crate::domain::product::Product;
use crate::flows::engine::{FlowContext, ProductFlow, StepOutcome, TerminationReason};
use crate::flows::messages;
use crate::flows::states::{EducationStep, SessionState, StepKind};
use crate::pricing::{price_education, PricingError, Quotation};
use crate::rates::education::{MAX_DURATION, MIN_DURATION};
use crate::validation::{
    check_age, parse_amount, parse_annuity_count, parse_birth_year, parse_contribution_mode,
    parse_duration,
};

/// Assur'Education: contribution type, birth year, duration, annuity count,
/// amount.
#[derive(Clone, Copy, Debug, Default)]
pub struct EducationFlow;

impl ProductFlow for EducationFlow {
    type Step = EducationStep;

    const PRODUCT: Product = Product::Education;

    fn steps() -> &'static [StepKind] {
        EducationStep::ORDER
    }

    fn start(_context: &FlowContext<'_>) -> (Self::Step, String) {
        (EducationStep::ContributionType, messages::EDUCATION_START.to_owned())
    }

    fn advance(
        step: &Self::Step,
        input: &str,
        context: &FlowContext<'_>,
    ) -> StepOutcome<Self::Step> {
        let table = &context.tables.education;
        match step {
            EducationStep::ContributionType => match parse_contribution_mode(input) {
                Ok(mode) => StepOutcome::advance(
                    EducationStep::BirthYear { mode },
                    messages::ASK_BIRTH_YEAR,
                ),
                Err(error) => StepOutcome::retry(error.message),
            },
            EducationStep::BirthYear { mode } => {
                let birth = match parse_birth_year(input, context.current_year) {
                    Ok(birth) => birth,
                    Err(error) => return StepOutcome::retry(error.message),
                };
                let Some(range) = table.age_range() else {
                    return StepOutcome::terminate(
                        TerminationReason::LookupMiss,
                        messages::no_tables_for(Self::PRODUCT),
                    );
                };
                match check_age(birth.age, range) {
                    Ok(()) => StepOutcome::advance(
                        EducationStep::Duration { mode: *mode, birth },
                        messages::ASK_EDUCATION_DURATION,
                    ),
                    Err(out) => StepOutcome::retry(messages::age_out_of_range(
                        Self::PRODUCT,
                        out.age,
                        out.range,
                    )),
                }
            }
            EducationStep::Duration { mode, birth } => {
                let duration = match parse_duration(input, MIN_DURATION, MAX_DURATION) {
                    Ok(duration) => duration,
                    Err(error) => return StepOutcome::retry(error.message),
                };
                if !table.has_duration(duration) {
                    return StepOutcome::retry(messages::education_duration_missing(duration));
                }
                StepOutcome::advance(
                    EducationStep::AnnuityCount { mode: *mode, birth: *birth, duration },
                    messages::ASK_ANNUITY_COUNT,
                )
            }
            EducationStep::AnnuityCount { mode, birth, duration } => {
                let annuities = match parse_annuity_count(input) {
                    Ok(annuities) => annuities,
                    Err(error) => return StepOutcome::retry(error.message),
                };
                if !table.has_key(birth.age, annuities) {
                    let available = table.annuities_for_age(birth.age);
                    return StepOutcome::retry(messages::annuity_count_missing(
                        birth.age, annuities, &available,
                    ));
                }
                StepOutcome::advance(
                    EducationStep::Amount {
                        mode: *mode,
                        birth: *birth,
                        duration: *duration,
                        annuities,
                    },
                    messages::ask_education_amount(*mode),
                )
            }
            EducationStep::Amount { mode, birth, duration, annuities } => {
                let amount = match parse_amount(input) {
                    Ok(amount) => amount,
                    Err(error) => return StepOutcome::retry(error.message),
                };
                let Some(rate) = table.rate(birth.age, *annuities, *duration) else {
                    return StepOutcome::terminate(
                        TerminationReason::LookupMiss,
                        messages::EDUCATION_NO_RATE,
                    );
                };
                match price_education(*mode, *birth, *duration, *annuities, amount, rate) {
                    Ok(quote) => StepOutcome::Quoted(Quotation::Education(quote)),
                    Err(PricingError::ZeroRate) => StepOutcome::terminate(
                        TerminationReason::LookupMiss,
                        messages::EDUCATION_NO_RATE,
                    ),
                    Err(PricingError::Overflow) => StepOutcome::retry(messages::AMOUNT_TOO_LARGE),
                }
            }
        }
    }

    fn into_state(step: Self::Step) -> SessionState {
        SessionState::Education(step)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::EducationFlow;
    use crate::domain::inputs::{BirthInfo, ContributionMode};
    use crate::flows::engine::{FlowContext, ProductFlow, StepOutcome, TerminationReason};
    use crate::flows::states::EducationStep;
    use crate::pricing::Quotation;
    use crate::rates::fixtures::sample_tables;

    fn amount_step(age: u32, duration: u8, annuities: u8) -> EducationStep {
        EducationStep::Amount {
            mode: ContributionMode::ContributionDefined,
            birth: BirthInfo { birth_year: 2025 - age as i32, age },
            duration,
            annuities,
        }
    }

    #[test]
    fn age_outside_table_retries_birth_year_naming_bounds() {
        let tables = sample_tables();
        let context = FlowContext { tables: &tables, current_year: 2025 };
        let step = EducationStep::BirthYear { mode: ContributionMode::PrestationDefined };

        match EducationFlow::advance(&step, "2010", &context) {
            StepOutcome::Retry { message } => {
                assert!(message.contains("âge calculé = 15"));
                assert!(message.contains("de 18 à 60"));
            }
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn missing_annuity_key_lists_available_counts() {
        let tables = sample_tables();
        let context = FlowContext { tables: &tables, current_year: 2025 };
        let step = EducationStep::AnnuityCount {
            mode: ContributionMode::PrestationDefined,
            birth: BirthInfo { birth_year: 1970, age: 55 },
            duration: 10,
        };

        match EducationFlow::advance(&step, "5", &context) {
            StepOutcome::Retry { message } => assert!(message.contains("[1, 2]")),
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn contribution_defined_divides_by_rate() {
        let tables = sample_tables();
        let context = FlowContext { tables: &tables, current_year: 2025 };

        match EducationFlow::advance(&amount_step(40, 10, 3), "2000", &context) {
            StepOutcome::Quoted(Quotation::Education(quote)) => {
                assert_eq!(quote.annual_annuity, Decimal::from(100_000));
            }
            other => panic!("expected quote, got {other:?}"),
        }
    }

    #[test]
    fn zero_rate_terminates_without_quote() {
        let tables = sample_tables();
        let context = FlowContext { tables: &tables, current_year: 2025 };

        assert!(matches!(
            EducationFlow::advance(&amount_step(41, 5, 1), "1000", &context),
            StepOutcome::Terminated { reason: TerminationReason::LookupMiss, .. }
        ));
    }

    #[test]
    fn oversized_amount_retries_instead_of_reporting_missing_rate() {
        let tables = sample_tables();
        let context = FlowContext { tables: &tables, current_year: 2025 };

        match EducationFlow::advance(
            &amount_step(40, 10, 3),
            "10000000000000000000000000000",
            &context,
        ) {
            StepOutcome::Retry { message } => assert!(message.contains("trop élevé")),
            other => panic!("expected retry, got {other:?}"),
        }
    }
}
