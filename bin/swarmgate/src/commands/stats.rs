use std::path::PathBuf;

use crate::runtime::build_interceptor;

pub async fn run(bots: Option<PathBuf>) -> anyhow::Result<()> {
    let interceptor = build_interceptor(bots)?;
    let stats = interceptor.get_stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
