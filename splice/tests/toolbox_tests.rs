use std::sync::Arc;

use splice::agent::{AgentAction, Toolbox};
use splice::config::DatabaseConfig;
use splice::db::{Database, Introspector, QueryGateway};
use splice::render::{ChartRenderer, ReportExporter};
use splice::session::SessionContext;

struct Fixture {
    toolbox: Arc<Toolbox>,
    session: SessionContext,
    plots_dir: tempfile::TempDir,
    reports_dir: tempfile::TempDir,
}

async fn fixture_with_freshness(cache_freshness_secs: i64) -> Fixture {
    let config = DatabaseConfig {
        url: ":memory:".to_string(),
        busy_timeout_ms: 5000,
    };
    let db = Database::new(&config).await.expect("database should open");

    let conn = db.connection().await.expect("connection should open");
    conn.execute_batch(
        r#"
        CREATE TABLE deseq2_results (
            gene_name TEXT,
            log2FoldChange REAL,
            padj REAL
        );
        INSERT INTO deseq2_results VALUES ('TP53', 2.4, 0.001);
        INSERT INTO deseq2_results VALUES ('MYC', -1.8, 0.01);
        INSERT INTO deseq2_results VALUES ('EGFR', 1.2, 0.049);
        INSERT INTO deseq2_results VALUES ('GAPDH', 0.1, 0.9);
        INSERT INTO deseq2_results VALUES ('ACTB', -0.2, 0.5);
        "#,
    )
    .await
    .expect("seed should succeed");

    let plots_dir = tempfile::tempdir().unwrap();
    let reports_dir = tempfile::tempdir().unwrap();

    let toolbox = Arc::new(Toolbox::new(
        QueryGateway::new(db.clone()),
        Introspector::new(db),
        ChartRenderer::new(plots_dir.path()),
        ReportExporter::new(reports_dir.path()),
        15,
        cache_freshness_secs,
    ));

    Fixture {
        toolbox,
        session: SessionContext::new("test-session", 16000),
        plots_dir,
        reports_dir,
    }
}

async fn fixture() -> Fixture {
    fixture_with_freshness(120).await
}

fn query_action(sql: &str) -> AgentAction {
    AgentAction::Query {
        sql: sql.to_string(),
    }
}

fn plot_action(request: &str) -> AgentAction {
    AgentAction::RenderChart {
        request: request.to_string(),
    }
}

#[tokio::test]
async fn test_successful_query_stores_cache_and_previews() {
    let fx = fixture().await;

    let outcome = fx
        .toolbox
        .dispatch(
            &fx.session,
            &query_action("SELECT gene_name, log2FoldChange, padj FROM deseq2_results LIMIT 5"),
        )
        .await;

    assert!(!outcome.is_error);
    assert!(outcome.observation.contains("Query returned 5 rows"));
    assert!(outcome.observation.contains("TP53"));
    assert!(outcome.observation.contains("stored"));

    let cached = fx.session.cached_result().expect("cache should be written");
    assert_eq!(cached.rows.len(), 5);
    assert_eq!(
        cached.query,
        "SELECT gene_name, log2FoldChange, padj FROM deseq2_results LIMIT 5"
    );
}

#[tokio::test]
async fn test_empty_query_does_not_touch_cache() {
    let fx = fixture().await;

    let outcome = fx
        .toolbox
        .dispatch(
            &fx.session,
            &query_action("SELECT * FROM deseq2_results WHERE gene_name = 'NOPE'"),
        )
        .await;

    assert!(!outcome.is_error);
    assert!(outcome.observation.contains("no results"));
    assert!(fx.session.cached_result().is_none());
}

#[tokio::test]
async fn test_missing_table_error_recommends_schema_tool() {
    let fx = fixture().await;

    let outcome = fx
        .toolbox
        .dispatch(&fx.session, &query_action("SELECT * FROM nonexistent"))
        .await;

    assert!(outcome.is_error);
    assert!(outcome.observation.contains("Query failed"));
    assert!(outcome.observation.contains("RECOMMENDATION"));
    assert!(outcome.observation.contains("schema tool"));
    assert!(outcome.observation.contains("deseq2_results"));
}

#[tokio::test]
async fn test_missing_column_error_lists_table_columns() {
    let fx = fixture().await;

    let outcome = fx
        .toolbox
        .dispatch(
            &fx.session,
            &query_action("SELECT pvalue FROM deseq2_results"),
        )
        .await;

    assert!(outcome.is_error);
    assert!(outcome
        .observation
        .contains("Available columns in table 'deseq2_results'"));
    assert!(outcome.observation.contains("padj"));
}

#[tokio::test]
async fn test_rejected_statement_observation() {
    let fx = fixture().await;

    let outcome = fx
        .toolbox
        .dispatch(&fx.session, &query_action("DROP TABLE deseq2_results"))
        .await;

    assert!(outcome.is_error);
    assert!(outcome.observation.contains("Statement rejected"));
}

#[tokio::test]
async fn test_plot_without_data_reports_no_data() {
    let fx = fixture().await;

    let outcome = fx
        .toolbox
        .dispatch(
            &fx.session,
            &plot_action("volcano|x_column=log2FoldChange|y_column=padj"),
        )
        .await;

    assert!(outcome.is_error);
    assert!(outcome.observation.contains("No data available"));
    assert!(outcome.plot_filename.is_none());
}

#[tokio::test]
async fn test_unknown_chart_type_fails_before_cache_check() {
    let fx = fixture().await;

    // No query has run, so a cache-first check would report NoData; the
    // allow-list check must win.
    let outcome = fx
        .toolbox
        .dispatch(&fx.session, &plot_action("piechart|x_column=a|y_column=b"))
        .await;

    assert!(outcome.is_error);
    assert!(outcome.observation.contains("Unknown chart type"));
    assert!(!outcome.observation.contains("No data available"));
}

#[tokio::test]
async fn test_volcano_scenario_within_freshness_window() {
    let fx = fixture().await;

    let query = fx
        .toolbox
        .dispatch(
            &fx.session,
            &query_action("SELECT gene_name, log2FoldChange, padj FROM deseq2_results LIMIT 5"),
        )
        .await;
    assert!(!query.is_error);

    let plot = fx
        .toolbox
        .dispatch(
            &fx.session,
            &plot_action("volcano|x_column=log2FoldChange|y_column=padj"),
        )
        .await;

    assert!(!plot.is_error, "{}", plot.observation);
    let filename = plot.plot_filename.expect("plot should produce a handle");
    let content = std::fs::read_to_string(fx.plots_dir.path().join(&filename)).unwrap();
    assert!(content.contains("Significant"));
}

#[tokio::test]
async fn test_stale_cache_rejects_plot_and_report() {
    // A zero-width freshness window cannot be satisfied by data written in a
    // prior tool call once any time has passed; drive it negative so the
    // staleness branch is deterministic.
    let fx = fixture_with_freshness(-1).await;

    let query = fx
        .toolbox
        .dispatch(
            &fx.session,
            &query_action("SELECT gene_name, padj FROM deseq2_results"),
        )
        .await;
    assert!(!query.is_error);

    let plot = fx
        .toolbox
        .dispatch(
            &fx.session,
            &plot_action("volcano|x_column=log2FoldChange|y_column=padj"),
        )
        .await;
    assert!(plot.is_error);
    assert!(plot.observation.contains("stale"));
    assert!(plot.plot_filename.is_none());
    assert_eq!(std::fs::read_dir(fx.plots_dir.path()).unwrap().count(), 0);

    let report = fx
        .toolbox
        .dispatch(&fx.session, &AgentAction::ExportReport)
        .await;
    assert!(report.is_error);
    assert!(report.observation.contains("stale"));
    assert_eq!(std::fs::read_dir(fx.reports_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_report_round_trip_matches_cached_rows() {
    let fx = fixture().await;

    fx.toolbox
        .dispatch(
            &fx.session,
            &query_action("SELECT gene_name, log2FoldChange, padj FROM deseq2_results"),
        )
        .await;

    let outcome = fx
        .toolbox
        .dispatch(&fx.session, &AgentAction::ExportReport)
        .await;
    assert!(!outcome.is_error, "{}", outcome.observation);
    let filename = outcome
        .report_filename
        .expect("report should produce a handle");

    let mut reader = csv::Reader::from_path(fx.reports_dir.path().join(&filename)).unwrap();
    let headers: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    assert_eq!(headers, vec!["gene_name", "log2FoldChange", "padj"]);

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    let cached = fx.session.cached_result().unwrap();
    assert_eq!(rows.len(), cached.rows.len());
}

#[tokio::test]
async fn test_schema_tool_uses_session_snapshot() {
    let fx = fixture().await;

    assert!(fx.session.schema_snapshot().is_none());
    let outcome = fx
        .toolbox
        .dispatch(&fx.session, &AgentAction::DescribeSchema)
        .await;
    assert!(outcome.observation.contains("deseq2_results"));
    assert!(fx.session.schema_snapshot().is_some());

    fx.session.reset();
    assert!(fx.session.schema_snapshot().is_none());
}

#[tokio::test]
async fn test_sample_values_observation() {
    let fx = fixture().await;

    let outcome = fx
        .toolbox
        .dispatch(&fx.session, &AgentAction::SampleValues)
        .await;
    assert!(!outcome.is_error);
    assert!(outcome.observation.contains("deseq2_results.gene_name:"));
    assert!(outcome.observation.contains("TP53"));
}
