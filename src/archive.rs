use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::board::normalize;
use crate::config::{ArchiveSpec, Config};
use crate::models::{ArchiveDataset, RawDataset, SourceMeta};

/// Loads every configured archived dataset once, before the server starts.
/// A failed load degrades to an empty board for that source; it never blocks
/// startup and never surfaces to the user as an error.
pub(crate) async fn load_archives(config: &Config) -> Vec<ArchiveDataset> {
    let client = reqwest::Client::new();
    let mut datasets = Vec::with_capacity(config.archives.len());

    for spec in &config.archives {
        let records = match load_raw(&client, &config.archive_base, spec).await {
            Ok(raw) => {
                let records = normalize(&raw.leaderboard.unwrap_or_default());
                info!(id = spec.id, records = records.len(), "archive loaded");
                records
            }
            Err(err) => {
                warn!(id = spec.id, ?err, "archive load failed; serving empty dataset");
                Vec::new()
            }
        };
        datasets.push(ArchiveDataset {
            meta: SourceMeta {
                id: spec.id.to_string(),
                label: spec.label.to_string(),
                period: Some(spec.period.clone()),
                show_times: spec.show_times,
            },
            records,
        });
    }

    datasets
}

async fn load_raw(client: &reqwest::Client, base: &str, spec: &ArchiveSpec) -> Result<RawDataset> {
    if base.starts_with("http://") || base.starts_with("https://") {
        let url = format!("{}/{}", base.trim_end_matches('/'), spec.file);
        let response = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("archive fetch failed: {}", url))?;
        if !response.status().is_success() {
            anyhow::bail!("archive fetch {} returned {}", url, response.status());
        }
        response
            .json::<RawDataset>()
            .await
            .with_context(|| format!("invalid archive JSON: {}", url))
    } else {
        let path = std::path::Path::new(base).join(spec.file);
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("archive read failed: {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("invalid archive JSON: {}", path.display()))
    }
}
