use cotation_core::flows::{step_order, StepKind};
use cotation_core::rates::TableSummary;
use cotation_core::Product;

use crate::commands::{load_runtime, CommandResult};

pub fn run() -> CommandResult {
    let (config, tables) = match load_runtime("tables") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let mut lines = vec![format!("rate tables loaded from `{}`:", config.tables.dir.display())];
    lines.extend(tables.summary().iter().map(render_summary));
    CommandResult::success("tables", lines.join("\n"))
}

fn render_summary(summary: &TableSummary) -> String {
    let ages = match summary.age_range {
        Some(range) => format!("ages {}..={}", range.min, range.max),
        None => "not age rated".to_string(),
    };
    format!(
        "- {} ({}): {} keys, {}, steps: {}",
        summary.product.display_name(),
        summary.product,
        summary.keys,
        ages,
        render_steps(summary.product)
    )
}

fn render_steps(product: Product) -> String {
    step_order(product).iter().map(step_name).collect::<Vec<_>>().join(" > ")
}

fn step_name(kind: &StepKind) -> String {
    serde_json::to_value(kind)
        .ok()
        .and_then(|value| value.as_str().map(str::to_owned))
        .unwrap_or_else(|| format!("{kind:?}"))
}

#[cfg(test)]
mod tests {
    use cotation_core::flows::StepKind;
    use cotation_core::Product;

    use super::{render_steps, step_name};

    #[test]
    fn steps_are_rendered_in_collection_order() {
        assert_eq!(step_name(&StepKind::BirthYear), "birth_year");
        assert_eq!(render_steps(Product::BurialCapital), "birth_year > periodicity > capital_tier");
        assert_eq!(render_steps(Product::Borrower), "birth_year > loan_duration > principal");
    }
}
