use clap::Subcommand;
use cipher_academy_core::{Config, SlotKind};

use super::{load_catalog, parse_kind, print_json, CmdResult};

#[derive(Subcommand)]
pub enum CatalogAction {
    /// List eras in order
    Eras,
    /// Show one slot
    Slot {
        week: u32,
        #[arg(value_parser = parse_kind)]
        kind: SlotKind,
        /// Include the expected answer
        #[arg(long)]
        reveal: bool,
    },
    /// Show a week's three slots without answers
    Week {
        week: u32,
    },
    /// Print the whole catalog as TOML
    Export,
}

pub fn run(action: CatalogAction) -> CmdResult {
    let config = Config::load()?;
    let catalog = load_catalog(&config)?;

    match action {
        CatalogAction::Eras => print_json(&catalog.list_eras())?,
        CatalogAction::Slot { week, kind, reveal } => {
            let mut slot = catalog.get_slot(week, kind)?.clone();
            if !reveal {
                slot.puzzle.expected_answer.clear();
            }
            print_json(&slot)?;
        }
        CatalogAction::Week { week } => {
            let era = catalog.era_for_week(week)?;
            let slots: Vec<_> = catalog
                .week(week)?
                .into_iter()
                .map(|slot| {
                    serde_json::json!({
                        "slot": slot.kind,
                        "day_of_week": slot.kind.day_name(),
                        "title": slot.puzzle.title,
                        "cipher_type": slot.puzzle.cipher_type,
                        "difficulty_level": slot.difficulty_level,
                        "reward_points": slot.reward_points,
                    })
                })
                .collect();
            print_json(&serde_json::json!({ "week": week, "era": era.title, "slots": slots }))?;
        }
        CatalogAction::Export => {
            println!("{}", toml::to_string_pretty(&catalog.to_definition())?);
        }
    }
    Ok(())
}
