use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpliceError};

/// Closed allow-list of chart types the renderer accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Scatter,
    Pca,
    Volcano,
    Heatmap,
    Bar,
    Enrichment,
    Dot,
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scatter => write!(f, "scatter"),
            Self::Pca => write!(f, "pca"),
            Self::Volcano => write!(f, "volcano"),
            Self::Heatmap => write!(f, "heatmap"),
            Self::Bar => write!(f, "bar"),
            Self::Enrichment => write!(f, "enrichment"),
            Self::Dot => write!(f, "dot"),
        }
    }
}

impl std::str::FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scatter" => Ok(Self::Scatter),
            "pca" => Ok(Self::Pca),
            "volcano" => Ok(Self::Volcano),
            "heatmap" | "matrix" => Ok(Self::Heatmap),
            "bar" => Ok(Self::Bar),
            "enrichment" => Ok(Self::Enrichment),
            "dot" => Ok(Self::Dot),
            _ => Err(format!("Unknown chart type: {s}")),
        }
    }
}

impl ChartKind {
    pub fn all() -> &'static [ChartKind] {
        &[
            Self::Scatter,
            Self::Pca,
            Self::Volcano,
            Self::Heatmap,
            Self::Bar,
            Self::Enrichment,
            Self::Dot,
        ]
    }

    pub fn allowed_list() -> String {
        Self::all()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// x/y point chart with optional color and size encodings. Used for both
/// plain scatter plots and PCA projections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScatterSpec {
    pub x_column: String,
    pub y_column: String,
    pub color_column: Option<String>,
    pub size_column: Option<String>,
    pub title: Option<String>,
}

/// Volcano plot. The y column is a significance measure; points below 0.05
/// are labeled "Significant" and that derived label is the color encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolcanoSpec {
    pub x_column: String,
    pub y_column: String,
    pub title: Option<String>,
}

/// Matrix heatmap. The first cached column is the row-label axis; every
/// remaining column is coerced to numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatmapSpec {
    pub title: Option<String>,
}

/// Categorical x against numeric y, shared by bar, enrichment and dot charts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub x_column: String,
    pub y_column: String,
    pub color_column: Option<String>,
    pub size_column: Option<String>,
    pub title: Option<String>,
}

/// A validated chart request, one variant per chart family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartSpec {
    Scatter(ScatterSpec),
    Pca(ScatterSpec),
    Volcano(VolcanoSpec),
    Heatmap(HeatmapSpec),
    Bar(CategorySpec),
    Enrichment(CategorySpec),
    Dot(CategorySpec),
}

impl ChartSpec {
    /// Parse the wire form `"<chart_type>|key1=val1|key2=val2"`.
    ///
    /// The chart-type tag is validated against the allow-list before anything
    /// else; per-family required parameters are validated here so the renderer
    /// only ever sees well-formed specs.
    pub fn parse(request: &str) -> Result<Self> {
        let mut parts = request.split('|');
        let tag = parts.next().unwrap_or_default().trim();
        if tag.is_empty() {
            return Err(SpliceError::UnknownChartType(String::new()));
        }

        let kind: ChartKind = tag
            .parse()
            .map_err(|_| SpliceError::UnknownChartType(tag.to_string()))?;

        let mut params: HashMap<String, String> = HashMap::new();
        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((key, value)) = part.split_once('=') else {
                return Err(SpliceError::Validation(format!(
                    "Chart parameter '{part}' is not in key=value form"
                )));
            };
            let value = value.trim();
            // Reasoning models fill unused optional slots with "None".
            if value.is_empty() || value.eq_ignore_ascii_case("none") {
                continue;
            }
            params.insert(key.trim().to_lowercase(), value.to_string());
        }

        let take = |params: &mut HashMap<String, String>, names: &[&str]| -> Option<String> {
            names.iter().find_map(|name| params.remove(*name))
        };

        let x = take(&mut params, &["x_column", "x"]);
        let y = take(&mut params, &["y_column", "y"]);
        let color = take(&mut params, &["color_column", "color"]);
        let size = take(&mut params, &["size_column", "size"]);
        let title = take(&mut params, &["title"]);

        let require_xy = |x: Option<String>, y: Option<String>| -> Result<(String, String)> {
            match (x, y) {
                (Some(x), Some(y)) => Ok((x, y)),
                _ => Err(SpliceError::Validation(format!(
                    "Chart type '{kind}' requires x_column and y_column parameters"
                ))),
            }
        };

        let spec = match kind {
            ChartKind::Scatter | ChartKind::Pca => {
                let (x_column, y_column) = require_xy(x, y)?;
                let spec = ScatterSpec {
                    x_column,
                    y_column,
                    color_column: color,
                    size_column: size,
                    title,
                };
                if kind == ChartKind::Scatter {
                    Self::Scatter(spec)
                } else {
                    Self::Pca(spec)
                }
            }
            ChartKind::Volcano => {
                let (x_column, y_column) = require_xy(x, y)?;
                Self::Volcano(VolcanoSpec {
                    x_column,
                    y_column,
                    title,
                })
            }
            ChartKind::Heatmap => Self::Heatmap(HeatmapSpec { title }),
            ChartKind::Bar | ChartKind::Enrichment | ChartKind::Dot => {
                let (x_column, y_column) = require_xy(x, y)?;
                let spec = CategorySpec {
                    x_column,
                    y_column,
                    color_column: color,
                    size_column: size,
                    title,
                };
                match kind {
                    ChartKind::Bar => Self::Bar(spec),
                    ChartKind::Enrichment => Self::Enrichment(spec),
                    _ => Self::Dot(spec),
                }
            }
        };

        Ok(spec)
    }

    pub fn kind(&self) -> ChartKind {
        match self {
            Self::Scatter(_) => ChartKind::Scatter,
            Self::Pca(_) => ChartKind::Pca,
            Self::Volcano(_) => ChartKind::Volcano,
            Self::Heatmap(_) => ChartKind::Heatmap,
            Self::Bar(_) => ChartKind::Bar,
            Self::Enrichment(_) => ChartKind::Enrichment,
            Self::Dot(_) => ChartKind::Dot,
        }
    }

    /// Columns that must exist in the cached result set for this spec.
    pub fn required_columns(&self) -> Vec<&str> {
        match self {
            Self::Scatter(spec) | Self::Pca(spec) => {
                let mut columns = vec![spec.x_column.as_str(), spec.y_column.as_str()];
                if let Some(color) = &spec.color_column {
                    columns.push(color.as_str());
                }
                if let Some(size) = &spec.size_column {
                    columns.push(size.as_str());
                }
                columns
            }
            Self::Volcano(spec) => vec![spec.x_column.as_str(), spec.y_column.as_str()],
            Self::Heatmap(_) => Vec::new(),
            Self::Bar(spec) | Self::Enrichment(spec) | Self::Dot(spec) => {
                let mut columns = vec![spec.x_column.as_str(), spec.y_column.as_str()];
                if let Some(color) = &spec.color_column {
                    columns.push(color.as_str());
                }
                if let Some(size) = &spec.size_column {
                    columns.push(size.as_str());
                }
                columns
            }
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Scatter(spec) | Self::Pca(spec) => spec.title.as_deref(),
            Self::Volcano(spec) => spec.title.as_deref(),
            Self::Heatmap(spec) => spec.title.as_deref(),
            Self::Bar(spec) | Self::Enrichment(spec) | Self::Dot(spec) => spec.title.as_deref(),
        }
    }
}
