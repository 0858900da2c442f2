use serde_json::json;

use splice::config::DatabaseConfig;
use splice::db::{Database, QueryGateway};
use splice::error::SpliceError;

async fn seeded_gateway() -> QueryGateway {
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
        INSERT INTO deseq2_results VALUES ('MYC', -1.1, 0.04);
        INSERT INTO deseq2_results VALUES ('GAPDH', 0.1, 0.9);
        "#,
    )
    .await
    .expect("seed should succeed");

    QueryGateway::new(db)
}

#[tokio::test]
async fn test_select_returns_ordered_columns_and_rows() {
    let gateway = seeded_gateway().await;

    let result = gateway
        .execute("SELECT gene_name, log2FoldChange, padj FROM deseq2_results ORDER BY gene_name")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["gene_name", "log2FoldChange", "padj"]);
    assert_eq!(result.row_count, 3);
    assert_eq!(result.rows[0]["gene_name"], json!("GAPDH"));
    assert_eq!(result.rows[2]["padj"], json!(0.001));
}

#[tokio::test]
async fn test_empty_result_is_not_an_error() {
    let gateway = seeded_gateway().await;

    let result = gateway
        .execute("SELECT * FROM deseq2_results WHERE gene_name = 'NOPE'")
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.columns.len(), 3);
}

#[tokio::test]
async fn test_mutating_statements_rejected_before_store() {
    let gateway = seeded_gateway().await;

    for sql in [
        "DROP TABLE deseq2_results",
        "delete from deseq2_results",
        "INSERT INTO deseq2_results VALUES ('X', 0, 1)",
        "UPDATE deseq2_results SET padj = 0",
        "SELECT 1; DROP TABLE deseq2_results",
    ] {
        let err = gateway.execute(sql).await.unwrap_err();
        assert!(
            matches!(err, SpliceError::RejectedStatement(_)),
            "{sql} should be rejected, got {err:?}"
        );
    }

    // The table survives every rejected attempt.
    let result = gateway
        .execute("SELECT COUNT(*) AS n FROM deseq2_results")
        .await
        .unwrap();
    assert_eq!(result.rows[0]["n"], json!(3));
}

#[tokio::test]
async fn test_identifiers_embedding_keywords_are_allowed() {
    let config = DatabaseConfig {
        url: ":memory:".to_string(),
        busy_timeout_ms: 5000,
    };
    let db = Database::new(&config).await.unwrap();
    let conn = db.connection().await.unwrap();
    conn.execute_batch("CREATE TABLE events (created_at TEXT, last_update TEXT)")
        .await
        .unwrap();

    let gateway = QueryGateway::new(db);
    let result = gateway
        .execute("SELECT created_at, last_update FROM events")
        .await
        .unwrap();
    assert_eq!(result.columns, vec!["created_at", "last_update"]);
}

#[tokio::test]
async fn test_missing_table_surfaces_store_message_verbatim() {
    let gateway = seeded_gateway().await;

    let err = gateway
        .execute("SELECT * FROM does_not_exist")
        .await
        .unwrap_err();

    match err {
        SpliceError::Execution(message) => {
            assert!(
                message.to_lowercase().contains("no such table"),
                "store message should be surfaced: {message}"
            );
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_pragma_is_allowed() {
    let gateway = seeded_gateway().await;

    let result = gateway
        .execute("PRAGMA table_info('deseq2_results')")
        .await
        .unwrap();
    assert_eq!(result.row_count, 3);
}
