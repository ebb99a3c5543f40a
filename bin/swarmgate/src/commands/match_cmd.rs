use std::path::PathBuf;

use crate::runtime::build_interceptor;

pub async fn run(bots: Option<PathBuf>, topic: &str) -> anyhow::Result<()> {
    let interceptor = build_interceptor(bots)?;
    let candidates = interceptor.candidates_for(topic);

    if candidates.is_empty() {
        println!("No bots match '{}'.", topic);
        return Ok(());
    }

    println!("Bots matching '{}' ({}):", topic, candidates.len());
    println!();
    println!("  {:>5}  {:<24} {:<12} PATTERN", "SCORE", "BOT", "ROLE");
    for candidate in &candidates {
        println!(
            "  {:>5}  {:<24} {:<12} {}{}",
            candidate.score,
            candidate.bot.id,
            candidate.bot.role.as_str(),
            candidate.matched_pattern,
            if candidate.exact { " (exact)" } else { "" }
        );
    }
    Ok(())
}
