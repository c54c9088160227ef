use crate::domain::product::Product;
use crate::flows::engine::{FlowContext, ProductFlow, StepOutcome, TerminationReason};
use crate::flows::messages;
use crate::flows::states::{BorrowerStep, SessionState, StepKind};
use crate::pricing::{price_borrower, BorrowerOutcome, Quotation};
use crate::validation::{check_age, parse_birth_year, parse_loan_duration, parse_principal};

/// Borrower insurance: birth year, loan duration in months, principal.
///
/// Unlike the other age-rated products, an age outside the table or an
/// untabulated duration ends the conversation with an advisor referral.
#[derive(Clone, Copy, Debug, Default)]
pub struct BorrowerFlow;

impl ProductFlow for BorrowerFlow {
    type Step = BorrowerStep;

    const PRODUCT: Product = Product::Borrower;

    fn steps() -> &'static [StepKind] {
        BorrowerStep::ORDER
    }

    fn start(_context: &FlowContext<'_>) -> (Self::Step, String) {
        (BorrowerStep::BirthYear, messages::BORROWER_START.to_owned())
    }

    fn advance(
        step: &Self::Step,
        input: &str,
        context: &FlowContext<'_>,
    ) -> StepOutcome<Self::Step> {
        let table = &context.tables.borrower;
        match step {
            BorrowerStep::BirthYear => {
                let birth = match parse_birth_year(input, context.current_year) {
                    Ok(birth) => birth,
                    Err(error) => return StepOutcome::retry(error.message),
                };
                let in_range =
                    table.age_range().is_some_and(|range| check_age(birth.age, range).is_ok());
                if !in_range {
                    return StepOutcome::terminate(
                        TerminationReason::AdvisorReferral,
                        messages::borrower_age_out_of_range(birth.age),
                    );
                }
                StepOutcome::advance(BorrowerStep::Duration { birth }, messages::ASK_LOAN_DURATION)
            }
            BorrowerStep::Duration { birth } => {
                let duration_months = match parse_loan_duration(input) {
                    Ok(months) => months,
                    Err(error) => return StepOutcome::retry(error.message),
                };
                if !table.has_duration(duration_months) {
                    return StepOutcome::terminate(
                        TerminationReason::AdvisorReferral,
                        messages::borrower_duration_missing(duration_months),
                    );
                }
                StepOutcome::advance(
                    BorrowerStep::Principal { birth: *birth, duration_months },
                    messages::ASK_PRINCIPAL,
                )
            }
            BorrowerStep::Principal { birth, duration_months } => {
                let principal = match parse_principal(input) {
                    Ok(principal) => principal,
                    Err(error) => return StepOutcome::retry(error.message),
                };
                let Some(rate) = table.rate(birth.age, *duration_months) else {
                    return StepOutcome::terminate(
                        TerminationReason::AdvisorReferral,
                        messages::BORROWER_NO_RATE,
                    );
                };
                match price_borrower(*birth, *duration_months, principal, rate) {
                    Ok(BorrowerOutcome::Premium(quote)) => {
                        StepOutcome::Quoted(Quotation::Borrower(quote))
                    }
                    Ok(BorrowerOutcome::ReferToAdvisor) => StepOutcome::terminate(
                        TerminationReason::ZeroRateReferral,
                        messages::BORROWER_ZERO_PREMIUM,
                    ),
                    Err(_) => StepOutcome::retry(messages::AMOUNT_TOO_LARGE),
                }
            }
        }
    }

    fn into_state(step: Self::Step) -> SessionState {
        SessionState::Borrower(step)
    }
}
