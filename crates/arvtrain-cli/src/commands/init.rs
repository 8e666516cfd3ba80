//! The `arvtrain init` command.

use std::path::Path;

use anyhow::Result;

use arvtrain_core::parser::DEFAULT_CATALOG;

pub fn execute() -> Result<()> {
    if Path::new("arvtrain.toml").exists() {
        println!("arvtrain.toml already exists, skipping.");
    } else {
        std::fs::write("arvtrain.toml", SAMPLE_CONFIG)?;
        println!("Created arvtrain.toml");
    }

    std::fs::create_dir_all("curricula")?;
    let catalog_path = Path::new("curricula/default.toml");
    if catalog_path.exists() {
        println!("curricula/default.toml already exists, skipping.");
    } else {
        std::fs::write(catalog_path, DEFAULT_CATALOG)?;
        println!("Created curricula/default.toml");
    }

    println!("\nNext steps:");
    println!("  1. Point data_source in arvtrain.toml at your properties export");
    println!("  2. Run: arvtrain validate --curricula curricula");
    println!("  3. Run: arvtrain train --trainee you@example.com");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# arvtrain configuration

data_source = { type = "file", path = "properties.json" }
# data_source = { type = "http", url = "https://example.com/properties.json", timeout_secs = 30 }

progress_dir = "./arvtrain-progress"
history_path = "./arvtrain-progress/history.json"
curricula = "curricula"
# default_trainee = "you@example.com"

[sink]
type = "jsonl"
path = "./arvtrain-progress/results.jsonl"
# type = "webhook"
# url = "${ARVTRAIN_SINK_URL}"

[grading]
thresholds = [["A", 5.0], ["B", 10.0], ["C", 20.0], ["D", 35.0]]
arv_weight = 0.6
reno_weight = 0.4

[distractors]
offsets = [0.8, 0.9, 1.0, 1.1, 1.2]
rounding_unit = 5000
"#;
