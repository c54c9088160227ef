pub mod audit;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod formatting;
pub mod pricing;
pub mod rates;
pub mod recap;
pub mod validation;

pub use audit::{AuditContext, AuditEvent, AuditRecord, AuditSink};
pub use clock::{Clock, FixedYear, SystemClock};
pub use domain::inputs::{
    Amount, BirthInfo, CapitalTier, ContributionMode, EndowmentTier, Periodicity,
};
pub use domain::product::Product;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{QuoteEngine, Session, SessionState, SessionStore, TurnOutput, TurnTransition};
pub use pricing::{PricingError, Quotation};
pub use rates::{AgeRange, RateTables, TableError, TableSummary};
pub use recap::{build_recap, RecapRecord, RecapRenderer, RenderError, RenderedDocument};
