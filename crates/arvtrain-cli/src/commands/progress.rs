//! The `arvtrain progress` and `arvtrain reset` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use arvtrain_core::curriculum::CurriculumId;
use arvtrain_core::progression::UnitState;

use super::{build_trainer, load_config, resolve_trainee};

pub async fn execute(config_path: Option<PathBuf>, trainee: Option<String>) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let trainee = resolve_trainee(&config, trainee)?;
    let trainer = build_trainer(&config)?;

    println!("Progress for {trainee}");
    for status in trainer.overview(&trainee).await {
        let mut heading = format!("\n{} [{}]", status.name, status.id);
        if status.certified {
            heading.push_str(" CERTIFIED");
        } else if !status.gate_open {
            if let Some(req) = &status.requires {
                heading.push_str(&format!(" (requires {req})"));
            }
        }
        println!("{heading}");

        let mut table = Table::new();
        table.set_header(vec!["#", "Unit", "State"]);
        for (i, (name, state)) in status.units.iter().enumerate() {
            let marker = match state {
                UnitState::Completed => "done",
                UnitState::Unlocked => "open",
                UnitState::Locked => "locked",
            };
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(name),
                Cell::new(marker),
            ]);
        }
        println!("{table}");
    }
    Ok(())
}

pub async fn reset(
    config_path: Option<PathBuf>,
    trainee: Option<String>,
    curriculum: String,
) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let trainee = resolve_trainee(&config, trainee)?;
    let trainer = build_trainer(&config)?;

    let id = CurriculumId::new(curriculum);
    trainer.reset(&trainee, &id).await?;
    println!("Reset {id} for {trainee}. Unit 1 is open again.");
    Ok(())
}
