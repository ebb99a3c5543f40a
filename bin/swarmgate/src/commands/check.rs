use std::path::{Path, PathBuf};
use swarmgate_core::{ServiceEvent, SwarmState};

use crate::runtime::{build_interceptor, read_document};

/// Run one event through the interceptor and print the result as JSON.
pub async fn run(bots: Option<PathBuf>, event: &Path, state: Option<PathBuf>) -> anyhow::Result<()> {
    let interceptor = build_interceptor(bots)?;
    let event: ServiceEvent = read_document(event)?;
    let state: SwarmState = match state {
        Some(path) => read_document(&path)?,
        None => SwarmState::default(),
    };

    let result = interceptor.check_interception(&event, &state).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
