//! `triagent doctor` — Diagnose configuration and storage health.

use triagent_config::AppConfig;

use crate::wiring;

pub async fn run() -> anyhow::Result<()> {
    println!("🩺 triagent doctor");
    println!("==================\n");

    let mut issues = 0;
    let mut loaded = None;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  ✅ Config file valid");

                if config.has_api_key() {
                    println!("  ✅ API key configured");
                } else {
                    println!(
                        "  ⚠️  No API key — set TRIAGENT_API_KEY or add api_key to config.toml"
                    );
                    issues += 1;
                }

                loaded = Some(config);
            }
            Err(e) => {
                println!("  ❌ Config file invalid: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ❌ No config file — run `triagent onboard`");
        issues += 1;
    }

    if let Some(config) = &loaded {
        // actually opens the store, so a broken sqlite path surfaces here
        match wiring::build_checkpoints(config).await {
            Ok(store) => println!("  ✅ Checkpoint backend usable ({})", store.name()),
            Err(e) => {
                println!("  ❌ Checkpoint backend failed: {e}");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
