use crate::domain::product::Product;
use crate::flows::engine::{FlowContext, ProductFlow, StepOutcome, TerminationReason};
use crate::flows::messages;
use crate::flows::states::{BurialStep, SessionState, StepKind};
use crate::pricing::{price_burial, Quotation};
use crate::validation::{check_age, parse_birth_year, parse_capital_tier, parse_periodicity};

/// IBEKELIA burial capital: birth year, periodicity, capital tier.
#[derive(Clone, Copy, Debug, Default)]
pub struct BurialFlow;

impl ProductFlow for BurialFlow {
    type Step = BurialStep;

    const PRODUCT: Product = Product::BurialCapital;

    fn steps() -> &'static [StepKind] {
        BurialStep::ORDER
    }

    fn start(_context: &FlowContext<'_>) -> (Self::Step, String) {
        (BurialStep::BirthYear, messages::BURIAL_START.to_owned())
    }

    fn advance(
        step: &Self::Step,
        input: &str,
        context: &FlowContext<'_>,
    ) -> StepOutcome<Self::Step> {
        let table = &context.tables.burial;
        match step {
            BurialStep::BirthYear => {
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
                        BurialStep::Periodicity { birth },
                        messages::ASK_PERIODICITY,
                    ),
                    Err(out) => StepOutcome::retry(messages::age_out_of_range(
                        Self::PRODUCT,
                        out.age,
                        out.range,
                    )),
                }
            }
            BurialStep::Periodicity { birth } => match parse_periodicity(input) {
                Ok(periodicity) => StepOutcome::advance(
                    BurialStep::CapitalTier { birth: *birth, periodicity },
                    messages::ask_capital_tier(),
                ),
                Err(error) => StepOutcome::retry(error.message),
            },
            BurialStep::CapitalTier { birth, periodicity } => {
                let tier = match parse_capital_tier(input) {
                    Ok(tier) => tier,
                    Err(error) => return StepOutcome::retry(error.message),
                };
                match table.premium(birth.age, *periodicity, tier) {
                    Some(premium) => StepOutcome::Quoted(Quotation::BurialCapital(price_burial(
                        *birth,
                        *periodicity,
                        tier,
                        premium,
                    ))),
                    None => StepOutcome::terminate(
                        TerminationReason::LookupMiss,
                        messages::BURIAL_NO_PREMIUM,
                    ),
                }
            }
        }
    }

    fn into_state(step: Self::Step) -> SessionState {
        SessionState::BurialCapital(step)
    }
}

#[cfg(test)]
mod tests {
    use super::BurialFlow;
    use crate::domain::inputs::{BirthInfo, Periodicity};
    use crate::flows::engine::{FlowContext, ProductFlow, StepOutcome, TerminationReason};
    use crate::flows::states::BurialStep;
    use crate::rates::fixtures::sample_tables;

    #[test]
    fn missing_capital_column_is_a_lookup_miss() {
        let tables = sample_tables();
        let context = FlowContext { tables: &tables, current_year: 2025 };
        let step = BurialStep::CapitalTier {
            birth: BirthInfo { birth_year: 1955, age: 70 },
            periodicity: Periodicity::Single,
        };

        assert!(matches!(
            BurialFlow::advance(&step, "5", &context),
            StepOutcome::Terminated { reason: TerminationReason::LookupMiss, .. }
        ));
    }

    #[test]
    fn invalid_periodicity_retries() {
        let tables = sample_tables();
        let context = FlowContext { tables: &tables, current_year: 2025 };
        let step = BurialStep::Periodicity { birth: BirthInfo { birth_year: 1985, age: 40 } };

        match BurialFlow::advance(&step, "W", &context) {
            StepOutcome::Retry { message } => assert!(message.contains("M, A ou U")),
            other => panic!("expected retry, got {other:?}"),
        }
    }
}
