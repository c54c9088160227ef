//! Recap Builder
//!
//! A [`RecapRecord`] is the product-tagged summary of one completed quote. It is
//! held by the session until the user answers the export question, then either
//! handed to a [`RecapRenderer`] or dropped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::inputs::ContributionMode;
use crate::domain::product::Product;
use crate::formatting::fixed;
use crate::pricing::{BorrowerQuote, BurialQuote, EducationQuote, EndowmentQuote, Quotation};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecapEntry {
    pub label: String,
    pub value: String,
}

impl RecapEntry {
    fn new(label: &str, value: impl Into<String>) -> Self {
        Self { label: label.to_owned(), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecapRecord {
    pub product: Product,
    pub product_name: String,
    pub inputs: Vec<RecapEntry>,
    pub results: Vec<RecapEntry>,
}

impl RecapRecord {
    pub fn input(&self, label: &str) -> Option<&str> {
        find(&self.inputs, label)
    }

    pub fn result(&self, label: &str) -> Option<&str> {
        find(&self.results, label)
    }
}

fn find<'a>(entries: &'a [RecapEntry], label: &str) -> Option<&'a str> {
    entries.iter().find(|entry| entry.label == label).map(|entry| entry.value.as_str())
}

pub fn build_recap(quotation: &Quotation) -> RecapRecord {
    let (inputs, results) = match quotation {
        Quotation::Education(quote) => education(quote),
        Quotation::BurialCapital(quote) => burial(quote),
        Quotation::Endowment(quote) => endowment(quote),
        Quotation::Borrower(quote) => borrower(quote),
    };
    let product = quotation.product();
    RecapRecord { product, product_name: product.display_name().to_owned(), inputs, results }
}

fn education(quote: &EducationQuote) -> (Vec<RecapEntry>, Vec<RecapEntry>) {
    let mut inputs = vec![
        RecapEntry::new("Type de cotation", quote.mode.label()),
        RecapEntry::new("Année de naissance", quote.birth.birth_year.to_string()),
        RecapEntry::new("Âge", quote.birth.age.to_string()),
        RecapEntry::new("Durée de cotisation (années)", quote.duration.to_string()),
        RecapEntry::new("Nombre de rentes", quote.annuities.to_string()),
    ];
    let results = match quote.mode {
        ContributionMode::PrestationDefined => {
            inputs.push(RecapEntry::new("Rente annuelle", fixed(quote.annual_annuity, 2)));
            vec![RecapEntry::new("Cotisation mensuelle", fixed(quote.monthly_contribution, 2))]
        }
        ContributionMode::ContributionDefined => {
            let contribution = fixed(quote.monthly_contribution, 2);
            inputs.push(RecapEntry::new("Cotisation mensuelle", contribution));
            vec![RecapEntry::new("Rente annuelle", fixed(quote.annual_annuity, 2))]
        }
    };
    (inputs, results)
}

fn burial(quote: &BurialQuote) -> (Vec<RecapEntry>, Vec<RecapEntry>) {
    let inputs = vec![
        RecapEntry::new("Année de naissance", quote.birth.birth_year.to_string()),
        RecapEntry::new("Âge", quote.birth.age.to_string()),
        RecapEntry::new("Périodicité", quote.periodicity.code()),
        RecapEntry::new("Capital garanti", quote.tier.amount().to_string()),
    ];
    let results = vec![RecapEntry::new("Prime", fixed(quote.premium, 2))];
    (inputs, results)
}

fn endowment(quote: &EndowmentQuote) -> (Vec<RecapEntry>, Vec<RecapEntry>) {
    let mut inputs = vec![
        RecapEntry::new("Choix", quote.tier.letter()),
        RecapEntry::new("Durée (années)", quote.duration.to_string()),
    ];
    if let Some(amount) = quote.free_entry_amount {
        inputs.push(RecapEntry::new("Cotisation mensuelle saisie", fixed(amount, 2)));
    }
    let results = vec![
        RecapEntry::new("Cotisation mensuelle totale", fixed(quote.total_contribution, 2)),
        RecapEntry::new("Prime épargne", fixed(quote.savings_contribution, 2)),
        RecapEntry::new("Prime décès", fixed(quote.death_contribution, 2)),
        RecapEntry::new("Capital acquis", fixed(quote.acquired_capital, 2)),
        RecapEntry::new(
            "Capital décès",
            format!("{} + épargne constituée", fixed(quote.death_capital, 0)),
        ),
    ];
    (inputs, results)
}

fn borrower(quote: &BorrowerQuote) -> (Vec<RecapEntry>, Vec<RecapEntry>) {
    let inputs = vec![
        RecapEntry::new("Année de naissance", quote.birth.birth_year.to_string()),
        RecapEntry::new("Âge", quote.birth.age.to_string()),
        RecapEntry::new("Durée du prêt (mois)", quote.duration_months.to_string()),
        RecapEntry::new("Capital emprunté", fixed(quote.principal, 2)),
    ];
    let results = vec![
        RecapEntry::new("Taux", quote.rate.normalize().to_string()),
        RecapEntry::new("Prime unique", fixed(quote.premium, 2)),
    ];
    (inputs, results)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedDocument {
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a recap into a downloadable artifact. The core never inspects the
/// bytes it gets back.
#[async_trait]
pub trait RecapRenderer: Send + Sync {
    async fn render(&self, recap: &RecapRecord) -> Result<RenderedDocument, RenderError>;
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::{build_recap, RecapRecord, RecapRenderer, RenderError, RenderedDocument};
    use crate::domain::inputs::{
        Amount, BirthInfo, CapitalTier, ContributionMode, EndowmentTier, Periodicity,
    };
    use crate::domain::product::Product;
    use crate::pricing::{
        price_burial, price_education, price_endowment_free_entry, price_endowment_tabulated,
        Quotation,
    };
    use crate::rates::fixtures;

    fn birth() -> BirthInfo {
        BirthInfo { birth_year: 1985, age: 40 }
    }

    #[test]
    fn burial_recap_reports_premium_with_two_decimals() {
        let quote = price_burial(
            birth(),
            Periodicity::Monthly,
            CapitalTier::new(3).expect("tier"),
            Decimal::new(150_000, 2),
        );
        let recap = build_recap(&Quotation::BurialCapital(quote));
        assert_eq!(recap.product, Product::BurialCapital);
        assert_eq!(recap.product_name, "IBEKELIA");
        assert_eq!(recap.result("Prime"), Some("1500.00"));
        assert_eq!(recap.input("Capital garanti"), Some("3000000"));
        assert_eq!(recap.input("Périodicité"), Some("M"));
    }

    #[test]
    fn education_recap_orders_inputs_by_mode() {
        let quote = price_education(
            ContributionMode::PrestationDefined,
            birth(),
            10,
            3,
            Amount::new(Decimal::from(100_000)).expect("amount"),
            Decimal::new(2, 2),
        )
        .expect("non-zero rate");
        let recap = build_recap(&Quotation::Education(quote));
        let labels: Vec<_> = recap.inputs.iter().map(|entry| entry.label.as_str()).collect();
        assert_eq!(
            labels,
            [
                "Type de cotation",
                "Année de naissance",
                "Âge",
                "Durée de cotisation (années)",
                "Nombre de rentes",
                "Rente annuelle"
            ]
        );
        assert_eq!(recap.result("Cotisation mensuelle"), Some("2000.00"));
    }

    #[test]
    fn tabulated_endowment_omits_free_entry_amount() {
        let row = fixtures::endowment().grille_row(EndowmentTier::C).expect("tier C");
        let quote = price_endowment_tabulated(EndowmentTier::C, 15, Decimal::new(125, 1), row)
            .expect("grille amounts fit");
        let recap = build_recap(&Quotation::Endowment(quote));
        assert_eq!(recap.input("Cotisation mensuelle saisie"), None);
        assert_eq!(recap.result("Capital acquis"), Some("375000.00"));
        assert_eq!(recap.result("Capital décès"), Some("6000000 + épargne constituée"));
    }

    #[test]
    fn free_entry_endowment_keeps_typed_amount() {
        let quote = price_endowment_free_entry(
            20,
            Decimal::from(14),
            Amount::new(Decimal::from(130_000)).expect("amount"),
        )
        .expect("amount fits");
        let recap = build_recap(&Quotation::Endowment(quote));
        assert_eq!(recap.input("Cotisation mensuelle saisie"), Some("130000.00"));
        assert_eq!(recap.result("Capital acquis"), Some("1540000.00"));
    }

    #[test]
    fn recap_json_keeps_entry_order() {
        let quote = price_burial(
            birth(),
            Periodicity::Annual,
            CapitalTier::new(1).expect("tier"),
            Decimal::new(42_050, 2),
        );
        let recap = build_recap(&Quotation::BurialCapital(quote));
        let json = serde_json::to_value(&recap).expect("recap serializes");

        assert_eq!(json["product"], "burial_capital");
        assert_eq!(json["product_name"], "IBEKELIA");
        let first = &json["inputs"][0];
        assert_eq!(first["label"], recap.inputs[0].label.as_str());
        assert_eq!(json["results"][0]["value"], "420.50");

        let back: RecapRecord = serde_json::from_value(json).expect("recap deserializes");
        assert_eq!(back, recap);
    }

    struct PlainTextRenderer;

    #[async_trait]
    impl RecapRenderer for PlainTextRenderer {
        async fn render(&self, recap: &RecapRecord) -> Result<RenderedDocument, RenderError> {
            let body = recap
                .results
                .iter()
                .map(|entry| format!("{}: {}", entry.label, entry.value))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(RenderedDocument {
                content_type: "text/plain".to_owned(),
                file_name: format!("{}.txt", recap.product.id()),
                bytes: body.into_bytes(),
            })
        }
    }

    #[tokio::test]
    async fn renderer_is_usable_as_trait_object() {
        let renderer: Box<dyn RecapRenderer> = Box::new(PlainTextRenderer);
        let quote = price_burial(
            birth(),
            Periodicity::Monthly,
            CapitalTier::new(3).expect("tier"),
            Decimal::new(150_000, 2),
        );
        let recap = build_recap(&Quotation::BurialCapital(quote));

        let document = renderer.render(&recap).await.expect("render succeeds");
        assert_eq!(document.file_name, "ibekelia.txt");
        assert_eq!(String::from_utf8(document.bytes).expect("utf-8"), "Prime: 1500.00");
    }
}
