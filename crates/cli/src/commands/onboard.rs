//! `triagent onboard` — First-time setup.

use triagent_config::AppConfig;

pub async fn run() -> anyhow::Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let checkpoint_dir = AppConfig::checkpoint_dir();

    println!("🧭 triagent — First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("   Config directory exists: {}", config_dir.display());
    }

    if !checkpoint_dir.exists() {
        std::fs::create_dir_all(&checkpoint_dir)?;
        println!("✅ Created checkpoint directory: {}", checkpoint_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Edit {} and add your API key", config_path.display());
        println!("   2. Run: triagent run \"How do I rotate my API keys?\"");
        println!();
    }

    Ok(())
}
