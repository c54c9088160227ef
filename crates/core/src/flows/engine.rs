use std::sync::Arc;

use serde::Serialize;

use crate::audit::{AuditContext, AuditEvent, AuditRecord, AuditSink};
use crate::clock::Clock;
use crate::domain::product::Product;
use crate::flows::borrower::BorrowerFlow;
use crate::flows::burial::BurialFlow;
use crate::flows::commands::{normalize_command, ConversationCommand, MenuChoice};
use crate::flows::education::EducationFlow;
use crate::flows::endowment::EndowmentFlow;
use crate::flows::messages;
use crate::flows::states::{Session, SessionState, StepKind};
use crate::pricing::Quotation;
use crate::rates::RateTables;
use crate::recap::{build_recap, RecapRecord};
use crate::validation::is_affirmative;

/// Read-only inputs every step may consult.
#[derive(Clone, Copy, Debug)]
pub struct FlowContext<'a> {
    pub tables: &'a RateTables,
    pub current_year: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// No table entry (or an unusable zero rate) for otherwise valid inputs.
    LookupMiss,
    /// The case is outside what the tables cover and needs an advisor.
    AdvisorReferral,
    /// A borrower rate is tabulated but the premium comes out at zero.
    ZeroRateReferral,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LookupMiss => "lookup_miss",
            Self::AdvisorReferral => "advisor_referral",
            Self::ZeroRateReferral => "zero_rate_referral",
        }
    }
}

/// What one step decided about one line of input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome<S> {
    Advance { next: S, prompt: String },
    /// Stay on the same step; the session is left untouched.
    Retry { message: String },
    Quoted(Quotation),
    Terminated { reason: TerminationReason, message: String },
}

impl<S> StepOutcome<S> {
    pub fn advance(next: S, prompt: impl Into<String>) -> Self {
        Self::Advance { next, prompt: prompt.into() }
    }

    pub fn retry(message: impl Into<String>) -> Self {
        Self::Retry { message: message.into() }
    }

    pub fn terminate(reason: TerminationReason, message: impl Into<String>) -> Self {
        Self::Terminated { reason, message: message.into() }
    }
}

/// One product's step table. Steps are pure: they read the current step and
/// return the next one, so a rejected input can never leave a half-updated
/// session behind.
pub trait ProductFlow {
    type Step: Clone;

    const PRODUCT: Product;

    fn steps() -> &'static [StepKind];
    fn start(context: &FlowContext<'_>) -> (Self::Step, String);
    fn advance(step: &Self::Step, input: &str, context: &FlowContext<'_>)
        -> StepOutcome<Self::Step>;
    fn into_state(step: Self::Step) -> SessionState;
}

/// Ordered steps collected for a product.
pub fn step_order(product: Product) -> &'static [StepKind] {
    match product {
        Product::Education => EducationFlow::steps(),
        Product::BurialCapital => BurialFlow::steps(),
        Product::Endowment => EndowmentFlow::steps(),
        Product::Borrower => BorrowerFlow::steps(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnTransition {
    MenuShown,
    Cancelled,
    ProductStarted { product: Product },
    ProductUnavailable,
    Advanced,
    Retried,
    Quoted { product: Product },
    Terminated { reason: TerminationReason },
    ExportAccepted,
    ExportDeclined,
}

impl TurnTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MenuShown => "menu_shown",
            Self::Cancelled => "cancelled",
            Self::ProductStarted { .. } => "product_started",
            Self::ProductUnavailable => "product_unavailable",
            Self::Advanced => "advanced",
            Self::Retried => "retried",
            Self::Quoted { .. } => "quoted",
            Self::Terminated { .. } => "terminated",
            Self::ExportAccepted => "export_accepted",
            Self::ExportDeclined => "export_declined",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutput {
    pub messages: Vec<String>,
    /// Set only when the user accepted the export of a pending recap.
    pub export: Option<RecapRecord>,
    pub transition: TurnTransition,
}

impl TurnOutput {
    fn say(message: impl Into<String>, transition: TurnTransition) -> Self {
        Self { messages: vec![message.into()], export: None, transition }
    }
}

enum NextState {
    Keep,
    Replace(SessionState),
    Reset,
}

/// Drives every session through the product step tables. Holds only shared,
/// read-only state, so one engine serves all sessions.
#[derive(Clone)]
pub struct QuoteEngine {
    tables: Arc<RateTables>,
    clock: Arc<dyn Clock>,
}

impl QuoteEngine {
    pub fn new(tables: Arc<RateTables>, clock: Arc<dyn Clock>) -> Self {
        Self { tables, clock }
    }

    pub fn tables(&self) -> &RateTables {
        &self.tables
    }

    pub fn current_year(&self) -> i32 {
        self.clock.current_year()
    }

    pub fn handle_turn(&self, session: &mut Session, text: &str) -> TurnOutput {
        session.turns += 1;
        let (next, output) = self.plan(&session.state, text);
        match next {
            NextState::Keep => {}
            NextState::Replace(state) => session.state = state,
            NextState::Reset => session.reset(),
        }
        output
    }

    pub fn handle_turn_with_audit<S>(
        &self,
        session: &mut Session,
        text: &str,
        sink: &S,
        audit: &AuditContext,
    ) -> TurnOutput
    where
        S: AuditSink + ?Sized,
    {
        let from = session.state.kind();
        let output = self.handle_turn(session, text);
        sink.record(AuditRecord::new(
            audit,
            AuditEvent::TurnHandled {
                turn: session.turns,
                from,
                to: session.state.kind(),
                transition: output.transition,
            },
        ));

        match (&output.transition, &output.export) {
            (TurnTransition::Quoted { product }, _) => sink.record(AuditRecord::new(
                audit,
                AuditEvent::QuoteComputed { product: *product },
            )),
            (TurnTransition::ExportAccepted, Some(recap)) => sink.record(AuditRecord::new(
                audit,
                AuditEvent::ExportRequested { product: recap.product },
            )),
            _ => {}
        }

        output
    }

    fn plan(&self, state: &SessionState, text: &str) -> (NextState, TurnOutput) {
        match normalize_command(text) {
            Some(ConversationCommand::Menu) => {
                let output = TurnOutput::say(messages::WELCOME, TurnTransition::MenuShown);
                return (NextState::Reset, output);
            }
            Some(ConversationCommand::Cancel) => {
                let output = TurnOutput::say(messages::CANCELLED, TurnTransition::Cancelled);
                return (NextState::Reset, output);
            }
            None => {}
        }

        let context = FlowContext { tables: &self.tables, current_year: self.clock.current_year() };
        match state {
            SessionState::ProductSelection => select_product(text, &context),
            SessionState::Education(step) => drive::<EducationFlow>(step, text, &context),
            SessionState::BurialCapital(step) => drive::<BurialFlow>(step, text, &context),
            SessionState::Endowment(step) => drive::<EndowmentFlow>(step, text, &context),
            SessionState::Borrower(step) => drive::<BorrowerFlow>(step, text, &context),
            SessionState::ExportConfirmation(recap) => {
                if is_affirmative(text) {
                    let mut output =
                        TurnOutput::say(messages::EXPORT_ACCEPTED, TurnTransition::ExportAccepted);
                    output.export = Some(recap.clone());
                    (NextState::Reset, output)
                } else {
                    (
                        NextState::Reset,
                        TurnOutput::say(messages::EXPORT_DECLINED, TurnTransition::ExportDeclined),
                    )
                }
            }
        }
    }
}

fn select_product(text: &str, context: &FlowContext<'_>) -> (NextState, TurnOutput) {
    match MenuChoice::parse(text) {
        Some(MenuChoice::Quote(Product::Education)) => start::<EducationFlow>(context),
        Some(MenuChoice::Quote(Product::BurialCapital)) => start::<BurialFlow>(context),
        Some(MenuChoice::Quote(Product::Endowment)) => start::<EndowmentFlow>(context),
        Some(MenuChoice::Quote(Product::Borrower)) => start::<BorrowerFlow>(context),
        Some(MenuChoice::UnderConstruction) => (
            NextState::Reset,
            TurnOutput::say(messages::UNDER_CONSTRUCTION, TurnTransition::ProductUnavailable),
        ),
        Some(MenuChoice::MedicalSelection) => (
            NextState::Reset,
            TurnOutput::say(messages::MEDICAL_SELECTION, TurnTransition::ProductUnavailable),
        ),
        None => (NextState::Reset, TurnOutput::say(messages::WELCOME, TurnTransition::MenuShown)),
    }
}

fn start<F: ProductFlow>(context: &FlowContext<'_>) -> (NextState, TurnOutput) {
    let (step, prompt) = F::start(context);
    (
        NextState::Replace(F::into_state(step)),
        TurnOutput::say(prompt, TurnTransition::ProductStarted { product: F::PRODUCT }),
    )
}

fn drive<F: ProductFlow>(
    step: &F::Step,
    text: &str,
    context: &FlowContext<'_>,
) -> (NextState, TurnOutput) {
    match F::advance(step, text, context) {
        StepOutcome::Advance { next, prompt } => (
            NextState::Replace(F::into_state(next)),
            TurnOutput::say(prompt, TurnTransition::Advanced),
        ),
        StepOutcome::Retry { message } => {
            (NextState::Keep, TurnOutput::say(message, TurnTransition::Retried))
        }
        StepOutcome::Quoted(quotation) => {
            let recap = build_recap(&quotation);
            let output = TurnOutput {
                messages: vec![
                    messages::quotation_result(&quotation),
                    messages::ASK_EXPORT.to_owned(),
                ],
                export: None,
                transition: TurnTransition::Quoted { product: F::PRODUCT },
            };
            (NextState::Replace(SessionState::ExportConfirmation(recap)), output)
        }
        StepOutcome::Terminated { reason, message } => {
            (NextState::Reset, TurnOutput::say(message, TurnTransition::Terminated { reason }))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::audit::{AuditContext, AuditEvent, InMemoryAuditSink};
    use crate::clock::FixedYear;
    use crate::domain::product::Product;
    use crate::flows::engine::{step_order, QuoteEngine, TerminationReason, TurnTransition};
    use crate::flows::messages;
    use crate::flows::states::{EducationStep, Session, SessionState, StepKind};
    use crate::rates::fixtures::sample_tables;

    fn engine() -> QuoteEngine {
        QuoteEngine::new(Arc::new(sample_tables()), Arc::new(FixedYear(2025)))
    }

    fn run(engine: &QuoteEngine, session: &mut Session, inputs: &[&str]) -> Vec<TurnTransition> {
        inputs.iter().map(|input| engine.handle_turn(session, input).transition).collect()
    }

    #[test]
    fn scenario_education_prestation_defined() {
        let engine = engine();
        let mut session = Session::new("a");
        run(&engine, &mut session, &["/start", "1", "1", "1985", "10", "3"]);

        let output = engine.handle_turn(&mut session, "100000");
        assert_eq!(output.transition, TurnTransition::Quoted { product: Product::Education });
        assert!(output.messages[0].contains("cotisation mensuelle de 2,000.00"));
        assert_eq!(output.messages[1], messages::ASK_EXPORT);

        let recap = session.pending_recap().expect("recap pending").clone();
        assert_eq!(recap.result("Cotisation mensuelle"), Some("2000.00"));
        assert_eq!(recap.input("Âge"), Some("40"));

        let export = engine.handle_turn(&mut session, "oui");
        assert_eq!(export.transition, TurnTransition::ExportAccepted);
        assert_eq!(export.export, Some(recap));
        assert!(session.is_at_root());
    }

    #[test]
    fn scenario_burial_monthly_tier_three() {
        let engine = engine();
        let mut session = Session::new("b");
        run(&engine, &mut session, &["2", "1985", "M"]);

        let output = engine.handle_turn(&mut session, "3");
        assert_eq!(output.transition, TurnTransition::Quoted { product: Product::BurialCapital });
        let recap = session.pending_recap().expect("recap pending");
        assert_eq!(recap.result("Prime"), Some("1500.00"));
    }

    #[test]
    fn scenario_endowment_tabulated_tier() {
        let engine = engine();
        let mut session = Session::new("c");
        run(&engine, &mut session, &["3", "C"]);

        let output = engine.handle_turn(&mut session, "15");
        assert!(output.messages[0].contains("capital acquis de 375,000.00"));
        let recap = session.pending_recap().expect("recap pending");
        assert_eq!(recap.result("Capital acquis"), Some("375000.00"));
        assert_eq!(recap.input("Cotisation mensuelle saisie"), None);
    }

    #[test]
    fn scenario_endowment_free_entry() {
        let engine = engine();
        let mut session = Session::new("d");
        run(&engine, &mut session, &["3", "H", "20"]);

        let rejected = engine.handle_turn(&mut session, "120000");
        assert_eq!(rejected.transition, TurnTransition::Retried);
        assert!(matches!(session.state, SessionState::Endowment(_)));

        let output = engine.handle_turn(&mut session, "130000");
        assert!(output.messages[0].contains("capital acquis de 1,540,000.00"));
        let recap = session.pending_recap().expect("recap pending");
        assert_eq!(recap.result("Capital acquis"), Some("1540000.00"));
    }

    #[test]
    fn oversized_amounts_are_retried_in_every_amount_step() {
        let engine = engine();
        let huge = "10000000000000000000000000000";

        for (id, prefix) in [
            ("h1", &["3", "H", "20"][..]),
            ("h2", &["1", "2", "1985", "10", "3"][..]),
            ("h3", &["5", "1985", "240"][..]),
        ] {
            let mut session = Session::new(id);
            run(&engine, &mut session, prefix);
            let before = session.state.clone();

            let output = engine.handle_turn(&mut session, huge);
            assert_eq!(output.transition, TurnTransition::Retried, "session {id}");
            assert!(output.messages[0].contains("trop élevé"), "session {id}");
            assert_eq!(session.state, before, "session {id}");
        }
    }

    #[test]
    fn scenario_borrower_without_coverage_refers_to_advisor() {
        let engine = engine();
        let mut session = Session::new("e");
        run(&engine, &mut session, &["5", "1975", "360"]);

        let output = engine.handle_turn(&mut session, "5000000");
        assert_eq!(
            output.transition,
            TurnTransition::Terminated { reason: TerminationReason::AdvisorReferral }
        );
        assert!(output.export.is_none());
        assert!(session.is_at_root());
        assert!(session.pending_recap().is_none());
    }

    #[test]
    fn borrower_zero_rate_is_reported_separately() {
        let engine = engine();
        let mut session = Session::new("z");
        run(&engine, &mut session, &["5", "1965", "12"]);

        let output = engine.handle_turn(&mut session, "5000000");
        assert_eq!(
            output.transition,
            TurnTransition::Terminated { reason: TerminationReason::ZeroRateReferral }
        );
        assert_eq!(output.messages, vec![messages::BORROWER_ZERO_PREMIUM.to_owned()]);
    }

    #[test]
    fn invalid_input_keeps_collected_fields_and_step() {
        let engine = engine();
        let mut session = Session::new("f");
        run(&engine, &mut session, &["1", "2", "1985"]);
        let before = session.state.clone();
        assert!(matches!(before, SessionState::Education(EducationStep::Duration { .. })));

        for bad in ["abc", "4", "21", "-1", "7.5"] {
            let output = engine.handle_turn(&mut session, bad);
            assert_eq!(output.transition, TurnTransition::Retried, "input {bad}");
            assert_eq!(session.state, before, "input {bad}");
        }
    }

    #[test]
    fn menu_and_cancel_clear_the_session_from_any_state() {
        let engine = engine();

        let mut session = Session::new("g");
        run(&engine, &mut session, &["2", "1985"]);
        let menu = engine.handle_turn(&mut session, "/menu");
        assert_eq!(menu.messages, vec![messages::WELCOME.to_owned()]);
        assert!(session.is_at_root());

        run(&engine, &mut session, &["2", "1985", "M", "3"]);
        assert!(session.pending_recap().is_some());
        let cancel = engine.handle_turn(&mut session, "annuler");
        assert_eq!(cancel.transition, TurnTransition::Cancelled);
        assert_eq!(cancel.messages, vec![messages::CANCELLED.to_owned()]);
        assert!(session.is_at_root());
    }

    #[test]
    fn re_entering_root_is_idempotent() {
        let engine = engine();
        let mut session = Session::new("h");
        for _ in 0..3 {
            engine.handle_turn(&mut session, "/start");
            assert_eq!(session.state, SessionState::ProductSelection);
        }
    }

    #[test]
    fn declined_export_drops_recap_without_rendering() {
        let engine = engine();
        let mut session = Session::new("i");
        run(&engine, &mut session, &["2", "1985", "M", "3"]);

        let output = engine.handle_turn(&mut session, "non");
        assert_eq!(output.transition, TurnTransition::ExportDeclined);
        assert!(output.export.is_none());
        assert!(session.is_at_root());
    }

    #[test]
    fn stub_menu_entries_stay_at_root() {
        let engine = engine();
        let mut session = Session::new("j");
        let stubs = [("4", messages::UNDER_CONSTRUCTION), ("6", messages::MEDICAL_SELECTION)];
        for (choice, message) in stubs {
            let output = engine.handle_turn(&mut session, choice);
            assert_eq!(output.transition, TurnTransition::ProductUnavailable);
            assert_eq!(output.messages, vec![message.to_owned()]);
            assert!(session.is_at_root());
        }
    }

    #[test]
    fn unrecognized_root_input_shows_the_menu() {
        let engine = engine();
        let mut session = Session::new("k");
        let output = engine.handle_turn(&mut session, "bonjour");
        assert_eq!(output.transition, TurnTransition::MenuShown);
        assert!(session.is_at_root());
    }

    #[test]
    fn happy_paths_visit_steps_in_table_order() {
        let engine = engine();
        let paths: [(Product, &[&str]); 4] = [
            (Product::Education, &["1", "1", "1985", "10", "3"]),
            (Product::BurialCapital, &["2", "1985", "M"]),
            (Product::Endowment, &["3", "H", "20"]),
            (Product::Borrower, &["5", "1985", "240"]),
        ];

        for (product, inputs) in paths {
            let mut session = Session::new(product.id());
            let mut visited = Vec::new();
            for input in inputs {
                engine.handle_turn(&mut session, input);
                visited.push(session.state.kind());
            }
            assert_eq!(visited, step_order(product), "{product}");
        }
    }

    #[test]
    fn education_age_bounds_follow_the_table() {
        let engine = engine();
        for age in 10..=70u32 {
            let mut session = Session::new("age");
            run(&engine, &mut session, &["1", "1"]);
            let output = engine.handle_turn(&mut session, &(2025 - age as i32).to_string());
            let accepted = output.transition == TurnTransition::Advanced;
            assert_eq!(accepted, (18..=60).contains(&age), "age {age}");
        }
    }

    #[test]
    fn turn_with_audit_records_transition_and_quote() {
        let engine = engine();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new("chat-1", "req-1");
        let mut session = Session::new("chat-1");

        for input in ["2", "1985", "M", "x", "3"] {
            engine.handle_turn_with_audit(&mut session, input, &sink, &audit);
        }

        let records = sink.records();
        let turns: Vec<_> = records
            .iter()
            .filter_map(|record| match &record.event {
                AuditEvent::TurnHandled { from, transition, .. } => Some((*from, *transition)),
                _ => None,
            })
            .collect();
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[3], (StepKind::CapitalTier, TurnTransition::Retried));
        assert!(records
            .iter()
            .any(|record| record.event
                == AuditEvent::QuoteComputed { product: Product::BurialCapital }));
        assert!(records.iter().all(|record| record.correlation_id == "req-1"));
    }
}
