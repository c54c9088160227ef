use crate::domain::product::Product;
use crate::flows::engine::{FlowContext, ProductFlow, StepOutcome, TerminationReason};
use crate::flows::messages;
use crate::flows::states::{EndowmentStep, SessionState, StepKind};
use crate::pricing::{price_endowment_free_entry, price_endowment_tabulated, Quotation};
use crate::rates::endowment::{MAX_DURATION, MIN_DURATION};
use crate::validation::{parse_duration, parse_endowment_tier, parse_free_entry_amount};

/// FER+ endowment: tier, duration, then the monthly amount for tier H only.
#[derive(Clone, Copy, Debug, Default)]
pub struct EndowmentFlow;

impl ProductFlow for EndowmentFlow {
    type Step = EndowmentStep;

    const PRODUCT: Product = Product::Endowment;

    fn steps() -> &'static [StepKind] {
        EndowmentStep::ORDER
    }

    fn start(context: &FlowContext<'_>) -> (Self::Step, String) {
        (EndowmentStep::Tier, messages::endowment_start(&context.tables.endowment))
    }

    fn advance(
        step: &Self::Step,
        input: &str,
        context: &FlowContext<'_>,
    ) -> StepOutcome<Self::Step> {
        let tables = &context.tables.endowment;
        match step {
            EndowmentStep::Tier => match parse_endowment_tier(input, tables) {
                Ok(tier) => StepOutcome::advance(
                    EndowmentStep::Duration { tier },
                    messages::ASK_ENDOWMENT_DURATION,
                ),
                Err(error) => StepOutcome::retry(error.message),
            },
            EndowmentStep::Duration { tier } => {
                let duration = match parse_duration(input, MIN_DURATION, MAX_DURATION) {
                    Ok(duration) => duration,
                    Err(error) => return StepOutcome::retry(error.message),
                };
                let Some(participation_rate) = tables.participation_rate(duration) else {
                    return StepOutcome::retry(messages::participation_rate_missing(duration));
                };

                if tier.is_free_entry() {
                    return StepOutcome::advance(
                        EndowmentStep::FreeEntryAmount { duration, participation_rate },
                        messages::ask_free_entry_amount(),
                    );
                }
                let Some(row) = tables.grille_row(*tier) else {
                    return StepOutcome::terminate(
                        TerminationReason::LookupMiss,
                        messages::ENDOWMENT_NO_GRILLE,
                    );
                };
                match price_endowment_tabulated(*tier, duration, participation_rate, row) {
                    Ok(quote) => StepOutcome::Quoted(Quotation::Endowment(quote)),
                    Err(_) => StepOutcome::terminate(
                        TerminationReason::LookupMiss,
                        messages::ENDOWMENT_UNPRICEABLE,
                    ),
                }
            }
            EndowmentStep::FreeEntryAmount { duration, participation_rate } => {
                let amount = match parse_free_entry_amount(input) {
                    Ok(amount) => amount,
                    Err(error) => return StepOutcome::retry(error.message),
                };
                match price_endowment_free_entry(*duration, *participation_rate, amount) {
                    Ok(quote) => StepOutcome::Quoted(Quotation::Endowment(quote)),
                    Err(_) => StepOutcome::retry(messages::AMOUNT_TOO_LARGE),
                }
            }
        }
    }

    fn into_state(step: Self::Step) -> SessionState {
        SessionState::Endowment(step)
    }
}
