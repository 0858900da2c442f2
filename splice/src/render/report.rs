use std::path::PathBuf;

use chrono::Utc;

use crate::cache::CachedResultSet;
use crate::error::Result;
use crate::models::query::display_value;

/// Serializes the full cached row set to a timestamped CSV file and returns
/// the bare filename.
#[derive(Clone)]
pub struct ReportExporter {
    reports_dir: PathBuf,
}

impl ReportExporter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    pub fn export(&self, data: &CachedResultSet) -> Result<String> {
        let filename = format!("report_{}.csv", Utc::now().format("%Y%m%d_%H%M%S_%3f"));

        std::fs::create_dir_all(&self.reports_dir)?;
        let mut writer = csv::Writer::from_path(self.reports_dir.join(&filename))?;

        writer.write_record(&data.columns)?;
        for row in &data.rows {
            let record: Vec<String> = data
                .columns
                .iter()
                .map(|column| display_value(row.get(column)))
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;

        tracing::info!(file = %filename, rows = data.rows.len(), "Report exported");
        Ok(filename)
    }
}
