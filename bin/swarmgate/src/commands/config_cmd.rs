use swarmgate_core::{InterceptorConfig, Paths};

/// Show the effective configuration as pretty-printed JSON.
pub async fn show() -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = InterceptorConfig::load_or_default(&paths)?;
    let config_path = paths.config_file();

    println!();
    println!("Current Configuration");
    println!(
        "  File: {} {}",
        config_path.display(),
        if config_path.exists() { "✓" } else { "✗ (not found, showing defaults)" }
    );
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Write the default configuration to ~/.swarmgate/config.json.
pub async fn init(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config_path = paths.config_file();

    if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
        println!("Use --force to overwrite.");
        return Ok(());
    }

    InterceptorConfig::default().save(&config_path)?;
    println!("✓ Wrote {}", config_path.display());
    println!();
    println!("Put bot definitions in {} or pass --bots.", paths.bots_file().display());
    Ok(())
}
