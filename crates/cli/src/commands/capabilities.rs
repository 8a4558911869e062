//! `triagent capabilities` — List the registered capabilities.

use std::sync::Arc;

use triagent_capabilities::default_registry;
use triagent_retrieval::{KeywordRetriever, RefinementConfig};

pub async fn run(schemas: bool) -> anyhow::Result<()> {
    let registry = default_registry(
        Arc::new(KeywordRetriever::demo()),
        RefinementConfig::default(),
    );

    let mut specs = registry.specs();
    specs.sort_by(|a, b| a.name.cmp(&b.name));

    println!("🔧 Registered capabilities ({})", specs.len());
    println!();
    for spec in &specs {
        println!("  {}", spec.name);
        println!("      {}", spec.description);
        if schemas {
            let schema = serde_json::to_string_pretty(&spec.input_schema)?;
            for line in schema.lines() {
                println!("      {line}");
            }
        }
        println!();
    }

    Ok(())
}
