//! One-shot scrape mode
//!
//! Resolves a batch of regions once, writes the result files and renders
//! the result set as JSON for stdout.

use std::sync::Arc;

use cep_browser::RegionResolver;
use cep_core::{FileSink, LocalityStore, Resolution};
use tracing::{info, warn};

use crate::error::{GatewayError, Result};

/// Where a one-shot run leaves its results besides stdout
#[derive(Default)]
pub struct Outputs {
    pub sink: Option<FileSink>,
    pub store: Option<LocalityStore>,
}

/// Scrape `codes` and return the pretty-printed result set
pub async fn run_scrape(
    resolver: &RegionResolver,
    outputs: Outputs,
    codes: &[String],
) -> Result<String> {
    info!("One-shot scrape of {:?}", codes);

    let resolution = resolver.resolve(codes).await?;
    report_failures(&resolution);

    let results = Arc::new(resolution.results);
    let batch = Arc::clone(&results);
    tokio::task::spawn_blocking(move || save(&outputs, &batch))
        .await
        .map_err(|e| GatewayError::Other(format!("Output task failed: {}", e)))??;

    Ok(serde_json::to_string_pretty(results.as_slice())?)
}

fn save(outputs: &Outputs, results: &[cep_core::RegionResult]) -> Result<()> {
    if let Some(ref sink) = outputs.sink {
        sink.write(results)?;
        info!(
            "Wrote {} and {}",
            sink.jsonl_path().display(),
            sink.json_path().display()
        );
    }

    if let Some(ref store) = outputs.store {
        for result in results {
            store.save(result)?;
        }
        info!("Stored {} region results", results.len());
    }

    Ok(())
}

fn report_failures(resolution: &Resolution) {
    for failure in &resolution.failures {
        warn!("{} was left out: {}", failure.region, failure.error);
    }
}
