use serde::{Deserialize, Serialize};

use rust_decimal::Decimal;

use crate::domain::inputs::{BirthInfo, ContributionMode, EndowmentTier, Periodicity};
use crate::domain::product::Product;
use crate::recap::RecapRecord;

/// Where a session currently stands. Each product step carries exactly the
/// fields validated so far, so a step can never read a field it has not
/// collected.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    ProductSelection,
    Education(EducationStep),
    BurialCapital(BurialStep),
    Endowment(EndowmentStep),
    Borrower(BorrowerStep),
    ExportConfirmation(RecapRecord),
}

impl SessionState {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::ProductSelection => StepKind::ProductSelection,
            Self::Education(step) => step.kind(),
            Self::BurialCapital(step) => step.kind(),
            Self::Endowment(step) => step.kind(),
            Self::Borrower(step) => step.kind(),
            Self::ExportConfirmation(_) => StepKind::ExportConfirmation,
        }
    }

    pub fn product(&self) -> Option<Product> {
        match self {
            Self::ProductSelection => None,
            Self::Education(_) => Some(Product::Education),
            Self::BurialCapital(_) => Some(Product::BurialCapital),
            Self::Endowment(_) => Some(Product::Endowment),
            Self::Borrower(_) => Some(Product::Borrower),
            Self::ExportConfirmation(recap) => Some(recap.product),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    ProductSelection,
    ContributionType,
    BirthYear,
    Duration,
    AnnuityCount,
    Amount,
    Periodicity,
    CapitalTier,
    EndowmentTier,
    LoanDuration,
    Principal,
    ExportConfirmation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum EducationStep {
    ContributionType,
    BirthYear { mode: ContributionMode },
    Duration { mode: ContributionMode, birth: BirthInfo },
    AnnuityCount { mode: ContributionMode, birth: BirthInfo, duration: u8 },
    Amount { mode: ContributionMode, birth: BirthInfo, duration: u8, annuities: u8 },
}

impl EducationStep {
    pub const ORDER: &'static [StepKind] = &[
        StepKind::ContributionType,
        StepKind::BirthYear,
        StepKind::Duration,
        StepKind::AnnuityCount,
        StepKind::Amount,
    ];

    pub fn kind(&self) -> StepKind {
        match self {
            Self::ContributionType => StepKind::ContributionType,
            Self::BirthYear { .. } => StepKind::BirthYear,
            Self::Duration { .. } => StepKind::Duration,
            Self::AnnuityCount { .. } => StepKind::AnnuityCount,
            Self::Amount { .. } => StepKind::Amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum BurialStep {
    BirthYear,
    Periodicity { birth: BirthInfo },
    CapitalTier { birth: BirthInfo, periodicity: Periodicity },
}

impl BurialStep {
    pub const ORDER: &'static [StepKind] =
        &[StepKind::BirthYear, StepKind::Periodicity, StepKind::CapitalTier];

    pub fn kind(&self) -> StepKind {
        match self {
            Self::BirthYear => StepKind::BirthYear,
            Self::Periodicity { .. } => StepKind::Periodicity,
            Self::CapitalTier { .. } => StepKind::CapitalTier,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum EndowmentStep {
    Tier,
    Duration { tier: EndowmentTier },
    /// Only reached for tier H.
    FreeEntryAmount { duration: u8, participation_rate: Decimal },
}

impl EndowmentStep {
    pub const ORDER: &'static [StepKind] =
        &[StepKind::EndowmentTier, StepKind::Duration, StepKind::Amount];

    pub fn kind(&self) -> StepKind {
        match self {
            Self::Tier => StepKind::EndowmentTier,
            Self::Duration { .. } => StepKind::Duration,
            Self::FreeEntryAmount { .. } => StepKind::Amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum BorrowerStep {
    BirthYear,
    Duration { birth: BirthInfo },
    Principal { birth: BirthInfo, duration_months: u32 },
}

impl BorrowerStep {
    pub const ORDER: &'static [StepKind] =
        &[StepKind::BirthYear, StepKind::LoanDuration, StepKind::Principal];

    pub fn kind(&self) -> StepKind {
        match self {
            Self::BirthYear => StepKind::BirthYear,
            Self::Duration { .. } => StepKind::LoanDuration,
            Self::Principal { .. } => StepKind::Principal,
        }
    }
}

/// One active conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub state: SessionState,
    pub turns: u64,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), state: SessionState::ProductSelection, turns: 0 }
    }

    /// Drops every collected field and any pending recap.
    pub fn reset(&mut self) {
        self.state = SessionState::ProductSelection;
    }

    pub fn is_at_root(&self) -> bool {
        self.state == SessionState::ProductSelection
    }

    /// Puts a recap back in front of the user, e.g. after a failed render.
    /// Ignored unless the session is still at an empty root.
    pub fn rearm_export(&mut self, recap: RecapRecord) -> bool {
        if !self.is_at_root() {
            return false;
        }
        self.state = SessionState::ExportConfirmation(recap);
        true
    }

    pub fn pending_recap(&self) -> Option<&RecapRecord> {
        match &self.state {
            SessionState::ExportConfirmation(recap) => Some(recap),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BurialStep, EducationStep, Session, SessionState, StepKind};
    use crate::recap::RecapRecord;
    use crate::domain::inputs::{BirthInfo, ContributionMode};
    use crate::domain::product::Product;

    #[test]
    fn reset_returns_to_an_empty_root() {
        let mut session = Session::new("s-1");
        session.state = SessionState::Education(EducationStep::Duration {
            mode: ContributionMode::PrestationDefined,
            birth: BirthInfo { birth_year: 1985, age: 40 },
        });
        assert!(!session.is_at_root());

        session.reset();
        assert!(session.is_at_root());
        assert_eq!(session.state, SessionState::default());
        assert!(session.pending_recap().is_none());
    }

    #[test]
    fn state_reports_step_kind_and_product() {
        let state = SessionState::BurialCapital(BurialStep::Periodicity {
            birth: BirthInfo { birth_year: 1985, age: 40 },
        });
        assert_eq!(state.kind(), StepKind::Periodicity);
        assert_eq!(state.product(), Some(Product::BurialCapital));
        assert_eq!(SessionState::ProductSelection.product(), None);
    }

    #[test]
    fn export_is_rearmed_only_from_an_empty_root() {
        let recap = RecapRecord {
            product: Product::Endowment,
            product_name: "FER+".to_owned(),
            inputs: Vec::new(),
            results: Vec::new(),
        };
        let mut session = Session::new("s-2");
        assert!(session.rearm_export(recap.clone()));
        assert_eq!(session.pending_recap(), Some(&recap));

        assert!(!session.rearm_export(recap.clone()));
        session.state = SessionState::BurialCapital(BurialStep::BirthYear);
        assert!(!session.rearm_export(recap));
        assert!(session.pending_recap().is_none());
    }
}
