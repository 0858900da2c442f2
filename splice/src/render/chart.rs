use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use serde_json::{json, Value};

use crate::cache::CachedResultSet;
use crate::error::{Result, SpliceError};
use crate::models::{CategorySpec, ChartSpec, ScatterSpec, VolcanoSpec};
use crate::render::document;

/// Threshold on the raw significance column below which a point is labeled
/// significant in volcano plots. A convention of the analysis, not a
/// parameter.
const SIGNIFICANCE_THRESHOLD: f64 = 0.05;
const SIGNIFICANT_LABEL: &str = "Significant";
const NOT_SIGNIFICANT_LABEL: &str = "Not significant";

const SIGNIFICANT_COLOR: &str = "#d62728";
const NOT_SIGNIFICANT_COLOR: &str = "#7f7f7f";
const CONTINUOUS_COLOR_SCALE: &str = "Viridis";

/// Maps validated chart specs onto plotly-style figures over the cached
/// result set and persists them as self-contained HTML documents.
#[derive(Clone)]
pub struct ChartRenderer {
    plots_dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(plots_dir: impl Into<PathBuf>) -> Self {
        Self {
            plots_dir: plots_dir.into(),
        }
    }

    /// Render `spec` over `data` and return the bare filename of the persisted
    /// document.
    pub fn render(&self, spec: &ChartSpec, data: &CachedResultSet) -> Result<String> {
        let figure = build_figure(spec, data)?;

        let filename = format!(
            "{}_{}.html",
            spec.kind(),
            Utc::now().format("%Y%m%d_%H%M%S_%3f")
        );
        let title = spec
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} chart", spec.kind()));

        std::fs::create_dir_all(&self.plots_dir)?;
        document::write_figure_document(&title, &figure, &self.plots_dir.join(&filename))?;

        tracing::info!(chart = %spec.kind(), file = %filename, rows = data.rows.len(), "Chart rendered");
        Ok(filename)
    }
}

/// Build the plotly figure JSON for a spec. Split out from file persistence
/// so the construction rules are testable on their own.
pub fn build_figure(spec: &ChartSpec, data: &CachedResultSet) -> Result<Value> {
    ensure_columns(data, &spec.required_columns())?;

    match spec {
        ChartSpec::Scatter(s) | ChartSpec::Pca(s) => build_scatter(s, data),
        ChartSpec::Volcano(s) => build_volcano(s, data),
        ChartSpec::Heatmap(s) => build_heatmap(s.title.as_deref(), data),
        ChartSpec::Bar(s) => build_category(s, data, "bar", false),
        ChartSpec::Dot(s) => build_category(s, data, "scatter", false),
        ChartSpec::Enrichment(s) => build_category(s, data, "bar", true),
    }
}

fn ensure_columns(data: &CachedResultSet, required: &[&str]) -> Result<()> {
    for column in required {
        if !data.columns.iter().any(|c| c == column) {
            return Err(SpliceError::MissingColumn(format!(
                "'{column}' is not present in the cached result. Available columns: {}",
                data.columns.join(", ")
            )));
        }
    }
    Ok(())
}

fn build_scatter(spec: &ScatterSpec, data: &CachedResultSet) -> Result<Value> {
    let x = numeric_column(data, &spec.x_column);
    let y = numeric_column(data, &spec.y_column);
    let hover = hover_text(data, &[spec.x_column.as_str(), spec.y_column.as_str()]);

    let mut marker = json!({ "size": 8 });
    if let Some(size_column) = &spec.size_column {
        marker["size"] = Value::Array(numeric_column(data, size_column));
    }
    if let Some(color_column) = &spec.color_column {
        marker["color"] = Value::Array(raw_column(data, color_column));
    }

    let trace = json!({
        "type": "scatter",
        "mode": "markers",
        "x": x,
        "y": y,
        "text": hover,
        "hoverinfo": "x+y+text",
        "marker": marker,
    });

    Ok(figure(
        vec![trace],
        spec.title.as_deref(),
        &spec.x_column,
        &spec.y_column,
    ))
}

fn build_volcano(spec: &VolcanoSpec, data: &CachedResultSet) -> Result<Value> {
    let hover = hover_text(data, &[spec.x_column.as_str(), spec.y_column.as_str()]);

    let mut groups: HashMap<&str, (Vec<Value>, Vec<Value>, Vec<Value>)> = HashMap::new();
    for (idx, row) in data.rows.iter().enumerate() {
        let x = numeric(row.get(&spec.x_column));
        let raw_y = numeric(row.get(&spec.y_column));

        let label = match raw_y {
            Some(value) if value < SIGNIFICANCE_THRESHOLD => SIGNIFICANT_LABEL,
            _ => NOT_SIGNIFICANT_LABEL,
        };

        // Conventional volcano y axis: -log10 of the significance measure.
        let y = raw_y
            .filter(|value| *value > 0.0)
            .map(|value| -value.log10());

        let entry = groups.entry(label).or_default();
        entry.0.push(json_number(x));
        entry.1.push(json_number(y));
        entry.2.push(Value::String(hover[idx].clone()));
    }

    let mut traces = Vec::new();
    for (label, color) in [
        (SIGNIFICANT_LABEL, SIGNIFICANT_COLOR),
        (NOT_SIGNIFICANT_LABEL, NOT_SIGNIFICANT_COLOR),
    ] {
        if let Some((x, y, text)) = groups.remove(label) {
            traces.push(json!({
                "type": "scatter",
                "mode": "markers",
                "name": label,
                "x": x,
                "y": y,
                "text": text,
                "hoverinfo": "x+y+text",
                "marker": { "size": 8, "color": color },
            }));
        }
    }

    let y_title = format!("-log10({})", spec.y_column);
    Ok(figure(
        traces,
        spec.title.as_deref(),
        &spec.x_column,
        &y_title,
    ))
}

fn build_heatmap(title: Option<&str>, data: &CachedResultSet) -> Result<Value> {
    let Some(label_column) = data.columns.first() else {
        return Err(SpliceError::MissingColumn(
            "the cached result has no columns to use as the row-label axis".to_string(),
        ));
    };

    let value_columns: Vec<&String> = data.columns.iter().skip(1).collect();
    if value_columns.is_empty() {
        return Err(SpliceError::MissingColumn(
            "a heatmap needs at least two cached columns (row labels plus values)".to_string(),
        ));
    }

    let labels: Vec<String> = data
        .rows
        .iter()
        .map(|row| display_text(row.get(label_column)))
        .collect();

    let z: Vec<Vec<Value>> = data
        .rows
        .iter()
        .map(|row| {
            value_columns
                .iter()
                .map(|column| json_number(numeric(row.get(column.as_str()))))
                .collect()
        })
        .collect();

    let trace = json!({
        "type": "heatmap",
        "z": z,
        "x": value_columns,
        "y": labels,
        "colorscale": CONTINUOUS_COLOR_SCALE,
    });

    let mut layout = json!({});
    if let Some(title) = title {
        layout["title"] = json!({ "text": title });
    }

    Ok(json!({ "data": [trace], "layout": layout }))
}

fn build_category(
    spec: &CategorySpec,
    data: &CachedResultSet,
    trace_type: &str,
    order_by_total: bool,
) -> Result<Value> {
    let mut categories: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();

    for row in &data.rows {
        let category = display_text(row.get(&spec.x_column));
        if !totals.contains_key(&category) {
            categories.push(category.clone());
        }
        *totals.entry(category).or_insert(0.0) += numeric(row.get(&spec.y_column)).unwrap_or(0.0);
    }

    if order_by_total {
        categories.sort_by(|a, b| {
            let ta = totals.get(a).copied().unwrap_or(0.0);
            let tb = totals.get(b).copied().unwrap_or(0.0);
            tb.partial_cmp(&ta).unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    let values: Vec<f64> = categories
        .iter()
        .map(|c| totals.get(c).copied().unwrap_or(0.0))
        .collect();

    let marker = if order_by_total {
        // Enrichment charts use a fixed continuous color scale over the values.
        json!({ "color": values, "colorscale": CONTINUOUS_COLOR_SCALE })
    } else if let Some(color_column) = &spec.color_column {
        json!({ "color": raw_column(data, color_column) })
    } else {
        json!({})
    };

    let mut trace = json!({
        "type": trace_type,
        "x": categories,
        "y": values,
        "marker": marker,
    });
    if trace_type == "scatter" {
        trace["mode"] = Value::String("markers".to_string());
        if let Some(size_column) = &spec.size_column {
            trace["marker"]["size"] = Value::Array(numeric_column(data, size_column));
        }
    }

    Ok(figure(
        vec![trace],
        spec.title.as_deref(),
        &spec.x_column,
        &spec.y_column,
    ))
}

fn figure(traces: Vec<Value>, title: Option<&str>, x_title: &str, y_title: &str) -> Value {
    let mut layout = json!({
        "xaxis": { "title": { "text": x_title } },
        "yaxis": { "title": { "text": y_title } },
    });
    if let Some(title) = title {
        layout["title"] = json!({ "text": title });
    }

    json!({ "data": traces, "layout": layout })
}

/// Numeric view of a cell: JSON numbers pass through, numeric strings are
/// parsed, everything else is treated as missing.
fn numeric(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_number(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn numeric_column(data: &CachedResultSet, column: &str) -> Vec<Value> {
    data.rows
        .iter()
        .map(|row| json_number(numeric(row.get(column))))
        .collect()
}

fn raw_column(data: &CachedResultSet, column: &str) -> Vec<Value> {
    data.rows
        .iter()
        .map(|row| row.get(column).cloned().unwrap_or(Value::Null))
        .collect()
}

fn display_text(value: Option<&Value>) -> String {
    crate::models::query::display_value(value)
}

/// Hover context: every column not already encoded on an axis.
fn hover_text(data: &CachedResultSet, encoded: &[&str]) -> Vec<String> {
    let extra: Vec<&String> = data
        .columns
        .iter()
        .filter(|c| !encoded.contains(&c.as_str()))
        .collect();

    data.rows
        .iter()
        .map(|row| {
            extra
                .iter()
                .map(|column| format!("{column}: {}", display_text(row.get(column.as_str()))))
                .collect::<Vec<_>>()
                .join("<br>")
        })
        .collect()
}
