//! Best-effort side outputs: artifact JSON export and downstream telemetry
//! upsert.
//!
//! Failures here are logged and never propagated; the primary cache write
//! has already happened by the time these run.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use aurora_core::payload::{Hemisphere, HemispherePayload};

/// Artifact file name for one hemisphere payload.
pub fn artifact_name(hemisphere: Hemisphere) -> String {
    format!("aurora_{hemisphere}.json")
}

/// Durable JSON blob writer under a content directory.
pub struct ArtifactSink {
    dir: PathBuf,
}

impl ArtifactSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Write a JSON artifact; best effort.
    pub async fn write(&self, name: &str, body: &str) {
        if let Err(e) = self.try_write(name, body).await {
            warn!(name = %name, error = %e, "Artifact export failed");
        }
    }

    async fn try_write(&self, name: &str, body: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context("Failed to create artifact directory")?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write artifact {}", path.display()))?;
        debug!(path = %path.display(), "Wrote artifact");
        Ok(())
    }

    /// Read back a previously exported artifact, if one exists.
    pub async fn read(&self, name: &str) -> Option<String> {
        tokio::fs::read_to_string(self.dir.join(name)).await.ok()
    }
}

/// Upserts derived rows into an external analytical store over HTTP.
pub struct TelemetrySink {
    client: Client,
    url: String,
}

impl TelemetrySink {
    pub fn new(url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create telemetry HTTP client")?;
        Ok(Self { client, url })
    }

    /// Upsert the derived rows for one hemisphere payload; best effort.
    pub async fn upsert(&self, payload: &HemispherePayload) {
        let rows = json!({
            "hemisphere": payload.hemisphere,
            "observed_at": payload.observed_at,
            "kp": payload.kp,
            "kp_time": payload.kp_time,
            "viewline_p": payload.viewline_p,
            "point_count": payload.metrics.count,
            "min_lat": payload.metrics.min_lat,
            "median_lat": payload.metrics.median_lat,
            "mean_prob_line": payload.metrics.mean_prob_line,
            "points": payload.viewline,
        });

        match self.client.post(&self.url).json(&rows).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(hemisphere = %payload.hemisphere, "Telemetry upsert complete");
            }
            Ok(response) => {
                warn!(
                    hemisphere = %payload.hemisphere,
                    status = response.status().as_u16(),
                    "Telemetry upsert rejected"
                );
            }
            Err(e) => {
                warn!(hemisphere = %payload.hemisphere, error = %e, "Telemetry upsert failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_name() {
        assert_eq!(artifact_name(Hemisphere::North), "aurora_north.json");
        assert_eq!(artifact_name(Hemisphere::South), "aurora_south.json");
    }

    #[tokio::test]
    async fn test_artifact_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ArtifactSink::new(dir.path().to_path_buf());

        sink.write("aurora_north.json", r#"{"hemisphere":"north"}"#)
            .await;
        let body = sink.read("aurora_north.json").await.unwrap();
        assert!(body.contains("north"));
        assert!(sink.read("aurora_south.json").await.is_none());
    }
}
