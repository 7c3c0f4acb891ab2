// stress-harness/src/artifacts.rs
// Persistence and chart sink boundaries for counter artifacts

use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// Durable sink for JSON artifacts, keyed by a deterministic name
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn write_json(&self, name: &str, value: &serde_json::Value) -> Result<()>;
}

/// Writes `<output_dir>/<name>.json` via tokio::fs
pub struct FileArtifactSink {
    output_dir: PathBuf,
}

impl FileArtifactSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl ArtifactSink for FileArtifactSink {
    async fn write_json(&self, name: &str, value: &serde_json::Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| HarnessError::io(format!("create {}", self.output_dir.display()), e))?;
        let path = self.output_dir.join(format!("{name}.json"));
        let payload = serde_json::to_vec_pretty(value)
            .map_err(|e| HarnessError::serialization(name.to_string(), e))?;
        tokio::fs::write(&path, payload)
            .await
            .map_err(|e| HarnessError::io(format!("write {}", path.display()), e))?;
        debug!(path = %path.display(), "wrote artifact");
        Ok(())
    }
}

/// Target image encoding for chart requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Svg,
}

/// One labeled y-value sequence on a chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSeries {
    pub label: String,
    pub values: Vec<f64>,
}

/// A chart request: x axis, labeled series and rendering metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub started_at_ms: i64,
    pub x: Vec<i64>,
    pub series: Vec<LabeledSeries>,
    pub format: ImageFormat,
}

/// Renders a chart request to an image buffer; persistence is the sink's
/// own business
#[async_trait]
pub trait ChartSink: Send + Sync {
    async fn render(&self, spec: &ChartSpec) -> Result<Vec<u8>>;
}

/// Rendering is delegated to external tooling; this sink accepts requests
/// and returns an empty buffer
pub struct NullChartSink;

#[async_trait]
impl ChartSink for NullChartSink {
    async fn render(&self, spec: &ChartSpec) -> Result<Vec<u8>> {
        debug!(title = %spec.title, points = spec.x.len(), "chart rendering disabled, dropping request");
        Ok(Vec::new())
    }
}
