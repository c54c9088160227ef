//! Commands accepted in every conversation state, and the root menu.

use serde::{Deserialize, Serialize};

use crate::domain::product::Product;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationCommand {
    /// Clear the session and show the welcome banner.
    Menu,
    /// Clear the session without the banner.
    Cancel,
}

const MENU_ALIASES: [&str; 3] = ["start", "menu", "accueil"];
const CANCEL_ALIASES: [&str; 3] = ["cancel", "annuler", "stop"];

/// Trims, lower-cases and strips one leading `/`, then matches the alias sets.
pub fn normalize_command(text: &str) -> Option<ConversationCommand> {
    let lowered = text.trim().to_lowercase();
    let word = lowered.strip_prefix('/').unwrap_or(&lowered);

    if MENU_ALIASES.contains(&word) {
        Some(ConversationCommand::Menu)
    } else if CANCEL_ALIASES.contains(&word) {
        Some(ConversationCommand::Cancel)
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuChoice {
    Quote(Product),
    /// Entry 4, "Autre produit".
    UnderConstruction,
    /// Entry 6, stubbed.
    MedicalSelection,
}

impl MenuChoice {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "1" => Some(Self::Quote(Product::Education)),
            "2" => Some(Self::Quote(Product::BurialCapital)),
            "3" => Some(Self::Quote(Product::Endowment)),
            "4" => Some(Self::UnderConstruction),
            "5" => Some(Self::Quote(Product::Borrower)),
            "6" => Some(Self::MedicalSelection),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_command, ConversationCommand, MenuChoice};
    use crate::domain::product::Product;

    #[test]
    fn menu_aliases_normalize() {
        for text in ["/start", "start", "/menu", "MENU", " accueil "] {
            assert_eq!(normalize_command(text), Some(ConversationCommand::Menu), "{text}");
        }
    }

    #[test]
    fn cancel_aliases_normalize() {
        for text in ["/cancel", "Cancel", "annuler", "/STOP"] {
            assert_eq!(normalize_command(text), Some(ConversationCommand::Cancel), "{text}");
        }
    }

    #[test]
    fn ordinary_answers_are_not_commands() {
        for text in ["1985", "oui", "M", "", "//start", "restart"] {
            assert_eq!(normalize_command(text), None, "{text}");
        }
    }

    #[test]
    fn menu_entries_map_to_products_and_stubs() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::Quote(Product::Education)));
        assert_eq!(MenuChoice::parse(" 5 "), Some(MenuChoice::Quote(Product::Borrower)));
        assert_eq!(MenuChoice::parse("4"), Some(MenuChoice::UnderConstruction));
        assert_eq!(MenuChoice::parse("6"), Some(MenuChoice::MedicalSelection));
        assert_eq!(MenuChoice::parse("7"), None);
    }
}
