use std::path::Path;

use serde_json::Value;

use crate::error::Result;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.32.0.min.js";

/// Persist a figure as a self-contained renderable HTML document.
pub fn write_figure_document(title: &str, figure: &Value, path: &Path) -> Result<()> {
    // Guard against `</script>` sequences inside embedded JSON strings.
    let figure_json = serde_json::to_string(figure)?.replace("</", "<\\/");

    let document = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_CDN}"></script>
<style>body {{ margin: 0; font-family: sans-serif; }} #chart {{ width: 100vw; height: 100vh; }}</style>
</head>
<body>
<div id="chart"></div>
<script>
const figure = {figure_json};
Plotly.newPlot("chart", figure.data, figure.layout, {{ responsive: true }});
</script>
</body>
</html>
"#,
        title = escape_html(title),
    );

    std::fs::write(path, document)?;
    Ok(())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
