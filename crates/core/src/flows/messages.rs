//! User-facing wording for prompts, results and terminations.

use crate::domain::inputs::{CapitalTier, ContributionMode};
use crate::domain::product::Product;
use crate::formatting::grouped;
use crate::pricing::{BorrowerQuote, BurialQuote, EducationQuote, EndowmentQuote, Quotation};
use crate::rates::{AgeRange, EndowmentTables};
use crate::validation::FREE_ENTRY_THRESHOLD;

pub const WELCOME: &str = "Bonjour !\n\n\
    Vous souhaitez faire une cotation de :\n\
    1- Assur'Education\n2- IBEKELIA\n3- FER+\n\
    4- Autre produit\n5- Emprunteur\n6- Sélection Médical\n\n\
    Répondez par 1, 2, 3, 4, 5 ou 6.";
pub const CANCELLED: &str = "Opération annulée. Tapez /start pour recommencer.";
pub const UNDER_CONSTRUCTION: &str = "Parcours en construction…";
pub const MEDICAL_SELECTION: &str =
    "Parcours SÉLECTION MÉDICAL :\nModule en cours de développement…";

pub const EDUCATION_START: &str = "Parcours Assur'Education :\n\
    1- Prestation définie ?\n\
    2- Cotisation définie ?\n\n\
    Répondez 1 ou 2.";
pub const BURIAL_START: &str = "Parcours IBEKELIA :\nEntrez votre année de naissance (AAAA) :";
pub const BORROWER_START: &str = "Parcours EMPRUNTEUR :\nEntrez votre année de naissance (AAAA) :";

pub const ASK_BIRTH_YEAR: &str = "Entrez votre année de naissance (AAAA) :";
pub const ASK_EDUCATION_DURATION: &str = "Entrez la durée de cotisation (5 à 20) :";
pub const ASK_ANNUITY_COUNT: &str = "Entrez le nombre de rentes (1 à 7) :";
pub const ASK_PERIODICITY: &str = "Entrez la périodicité de cotisation !\n\
    M - pour mensuelle\n\
    A - pour annuelle\n\
    U - pour unique";
pub const ASK_ENDOWMENT_DURATION: &str = "Entrez la durée de cotisation (en années, 1 à 47) :";
pub const ASK_LOAN_DURATION: &str = "Entrez la durée du prêt (en mois, ex: 12, 24, 360) :";
pub const ASK_PRINCIPAL: &str = "Entrez le capital emprunté (ex: 5000000) :";

pub const ASK_EXPORT: &str =
    "Souhaitez-vous exporter le récapitulatif de cette cotation ? (oui/non)";
pub const EXPORT_ACCEPTED: &str =
    "Votre récapitulatif est prêt. Tapez /start pour une nouvelle cotation.";
pub const EXPORT_DECLINED: &str =
    "Récapitulatif non exporté. Tapez /start pour une nouvelle cotation.";
pub const EXPORT_FAILED: &str = "L'export du récapitulatif a échoué. \
    Répondez oui pour réessayer ou non pour abandonner.";

pub const EDUCATION_NO_RATE: &str =
    "Désolé, aucun taux trouvé pour vos paramètres (ou taux nul). Recommencez avec /start.";
pub const BURIAL_NO_PREMIUM: &str =
    "Désolé, aucun tarif trouvé pour vos paramètres. Vérifiez la périodicité et l'âge.";
pub const ENDOWMENT_NO_GRILLE: &str =
    "Désolé, aucune grille trouvée pour ce choix. Recommencez avec /start.";
pub const BORROWER_NO_RATE: &str = "Désolé, aucun taux trouvé pour vos paramètres. \
    Veuillez contacter un conseiller pour la prise en charge de votre requête.";
pub const AMOUNT_TOO_LARGE: &str =
    "Le calcul dépasse les limites autorisées pour ce montant. Entrez un montant plus faible.";
pub const ENDOWMENT_UNPRICEABLE: &str =
    "Désolé, le calcul n'a pas pu aboutir pour ce choix. Recommencez avec /start.";
pub const BORROWER_ZERO_PREMIUM: &str =
    "Veuillez contacter un conseiller pour la prise en charge de votre requête.";

pub fn ask_capital_tier() -> String {
    let lines = CapitalTier::all()
        .map(|tier| format!("{}- {}", tier.choice(), grouped(tier.amount().into(), 0)));
    std::iter::once("Entrez le capital d'assistance obsèques souhaité !".to_owned())
        .chain(lines)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tier menu built from the grille actually loaded.
pub fn endowment_start(tables: &EndowmentTables) -> String {
    let mut out = String::from("Parcours FER+ :\n\nChoisissez votre capacité d'épargne :\n\n");
    for tier in tables.offered_tiers() {
        match tables.grille_row(tier) {
            Some(row) => out.push_str(&format!(
                "{} - {} (épargne) - {} (décès) - {} (total) - CapDéc {}\n",
                tier.letter(),
                grouped(row.savings_contribution, 0),
                grouped(row.death_contribution, 0),
                grouped(row.total_contribution, 0),
                grouped(row.death_capital, 0),
            )),
            None => out.push_str(&format!(
                "{} - Je peux cotiser plus de {} par mois (saisie libre)\n",
                tier.letter(),
                grouped(FREE_ENTRY_THRESHOLD.into(), 0),
            )),
        }
    }
    let letters = tables.offered_tiers().iter().map(|tier| tier.letter()).collect::<Vec<_>>();
    out.push_str(&format!("\nRépondez par {}.", letters.join(", ")));
    out
}

pub fn ask_free_entry_amount() -> String {
    format!(
        "Vous avez choisi H (cotisation libre > {FREE_ENTRY_THRESHOLD}). \
         Entrez votre cotisation mensuelle (doit être supérieure à {FREE_ENTRY_THRESHOLD}) :"
    )
}

pub fn ask_education_amount(mode: ContributionMode) -> &'static str {
    match mode {
        ContributionMode::PrestationDefined => "Entrez le montant de la rente annuelle :",
        ContributionMode::ContributionDefined => "Entrez la cotisation mensuelle :",
    }
}

pub fn age_out_of_range(product: Product, age: u32, range: AgeRange) -> String {
    format!(
        "Âge hors grille (âge calculé = {age}). Les âges disponibles pour {} vont de {} à {}.\n\
         Entrez une autre année de naissance ou /cancel.",
        product.display_name(),
        range.min,
        range.max
    )
}

pub fn borrower_age_out_of_range(age: u32) -> String {
    format!(
        "Âge hors grille pour Emprunteur (âge calculé = {age}).\n\
         Veuillez contacter un conseiller ou recommencer avec /start."
    )
}

pub fn borrower_duration_missing(months: u32) -> String {
    format!(
        "Aucun taux trouvé pour une durée de {months} mois. \
         Vérifiez la durée ou contactez un conseiller."
    )
}

pub fn education_duration_missing(duration: u8) -> String {
    format!(
        "Aucune colonne de durée {duration} trouvée dans la grille. Choisissez une autre durée."
    )
}

pub fn annuity_count_missing(age: u32, requested: u8, available: &[u8]) -> String {
    if available.is_empty() {
        return format!(
            "Aucun tarif trouvé pour l'âge {age}. Revenez au début avec /start ou /cancel."
        );
    }
    let counts = available.iter().map(u8::to_string).collect::<Vec<_>>().join(", ");
    format!(
        "Aucun tarif exact pour {age}-{requested}. \
         Les nombres de rentes disponibles pour l'âge {age} sont : [{counts}].\n\
         Entrez un autre nombre de rentes (ou /cancel)."
    )
}

pub fn participation_rate_missing(duration: u8) -> String {
    format!("Aucun taux trouvé pour la durée {duration}. Vérifiez la durée.")
}

pub fn no_tables_for(product: Product) -> String {
    format!("Aucun tarif disponible pour {}. Recommencez avec /start.", product.display_name())
}

pub fn quotation_result(quotation: &Quotation) -> String {
    match quotation {
        Quotation::Education(quote) => education_result(quote),
        Quotation::BurialCapital(quote) => burial_result(quote),
        Quotation::Endowment(quote) => endowment_result(quote),
        Quotation::Borrower(quote) => borrower_result(quote),
    }
}

fn education_result(quote: &EducationQuote) -> String {
    match quote.mode {
        ContributionMode::PrestationDefined => format!(
            "✅ Votre bénéficiaire pourra jouir d'une rente annuelle de : {}\n\
             pendant {} années contre une cotisation mensuelle de {}.",
            grouped(quote.annual_annuity, 2),
            quote.annuities,
            grouped(quote.monthly_contribution, 2),
        ),
        ContributionMode::ContributionDefined => format!(
            "✅ Avec une cotisation mensuelle de {},\n\
             votre bénéficiaire pourra bénéficier d'une rente annuelle de : {}\n\
             pendant {} années.",
            grouped(quote.monthly_contribution, 2),
            grouped(quote.annual_annuity, 2),
            quote.annuities,
        ),
    }
}

fn burial_result(quote: &BurialQuote) -> String {
    format!(
        "✅ Pour une cotisation {} de {},\n\
         vous garantissez à vos proches un capital de {}.\n\
         Vous les libérez ainsi des soucis financiers et organisationnels liés à vos obsèques, \
         en toute sérénité.",
        quote.periodicity.label(),
        grouped(quote.premium, 2),
        grouped(quote.tier.amount().into(), 0),
    )
}

fn endowment_result(quote: &EndowmentQuote) -> String {
    format!(
        "✅ Pour une cotisation mensuelle de {} dont {} de prime épargne \
         et {} de prime décès pendant {} ans, il est garanti :\n\n\
         - un capital acquis de {} en cas de vie au terme du contrat ;\n\
         - un capital décès de {} + la valeur de l'épargne constituée en cas de décès avant terme.",
        grouped(quote.total_contribution, 0),
        grouped(quote.savings_contribution, 0),
        grouped(quote.death_contribution, 0),
        quote.duration,
        grouped(quote.acquired_capital, 2),
        grouped(quote.death_capital, 0),
    )
}

fn borrower_result(quote: &BorrowerQuote) -> String {
    format!("✅ La prime unique est de : {} Fcfa.", grouped(quote.premium, 2))
}
