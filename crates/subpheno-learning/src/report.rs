//! JSON run report.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::types::ComparisonResult;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_FILE: &str = "comparison_report.json";

/// Everything written to `comparison_report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// RFC 3339 timestamp of report creation
    pub generated_at: String,
    pub version: String,
    pub config: PipelineConfig,
    pub result: ComparisonResult,
}

impl RunReport {
    pub fn new(config: &PipelineConfig, result: &ComparisonResult) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config: config.clone(),
            result: result.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes the run report into an output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }

    /// Serialize `report` and write it; returns the file path.
    pub fn write(&self, report: &RunReport) -> Result<PathBuf> {
        let path = self.path();
        write_json(&path, &report.to_json()?)?;
        info!(path = %path.display(), "Wrote comparison report");
        Ok(path)
    }
}

fn write_json(path: &Path, json: &str) -> Result<()> {
    std::fs::write(path, json)?;
    Ok(())
}
