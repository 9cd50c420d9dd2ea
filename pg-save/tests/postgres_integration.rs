//! Tests d'intégration PostgreSQL/PostGIS
//!
//! Ces tests nécessitent une base PostgreSQL avec PostGIS.
//! Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE
//!
//! Exécution:
//! ```bash
//! docker run -d --name postgis-test -e POSTGRES_PASSWORD=test -p 5432:5432 postgis/postgis
//! PGPASSWORD=test cargo test -p pg-save --test postgres_integration -- --ignored
//! ```
//!
//! Chaque test travaille dans son propre schéma.

use anyhow::Result;
use deadpool_postgres::Pool;
use geotab::{export_to_file, Cell, ColumnType, Crs, ExportOptions};
use pg_save::{
    create_pool, describe_table, fetch_table, list_tables, run_query, DatabaseConfig, QueryError, Session,
};
use serde_json::Value;

fn create_test_pool() -> Result<Pool> {
    create_pool(&DatabaseConfig::from_env())
}

/// Recrée `schema` avec une table de villes (points en 4326) et une vue matérialisée
async fn setup_test_schema(pool: &Pool, schema: &str) -> Result<()> {
    let client = pool.get().await?;
    client
        .batch_execute(&format!(
            r#"
            CREATE EXTENSION IF NOT EXISTS postgis;
            DROP SCHEMA IF EXISTS {schema} CASCADE;
            CREATE SCHEMA {schema};

            CREATE TABLE {schema}.cities (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                population NUMERIC,
                founded DATE,
                geom geometry(Point, 4326)
            );

            INSERT INTO {schema}.cities VALUES
                (1, 'Grenoble', 158240, '1242-01-01', ST_SetSRID(ST_MakePoint(5.72, 45.19), 4326)),
                (2, 'Lons-le-Saunier', NULL, NULL, NULL),
                (3, 'Chambéry', 59856.5, NULL, ST_SetSRID(ST_MakePoint(5.92, 45.56), 4326));

            CREATE MATERIALIZED VIEW {schema}.big_cities AS
                SELECT id, name FROM {schema}.cities WHERE population > 100000;
            "#
        ))
        .await?;
    Ok(())
}

/// Test de connexion basique
#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_session_detects_postgis() {
    let pool = create_test_pool().expect("Failed to create pool");
    let mut session = Session::open(&pool).await.expect("Failed to open session");

    let output = run_query(&mut session, "SELECT 1 AS test", false)
        .await
        .expect("Query failed");
    assert_eq!(output.data.rows()[0][0], Cell::Int(1));
    assert!(session.spatial_types().is_some());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_fetch_table_converts_geometry() {
    let pool = create_test_pool().expect("Failed to create pool");
    setup_test_schema(&pool, "pg_save_fetch").await.expect("Failed to setup schema");
    let mut session = Session::open(&pool).await.expect("Failed to open session");

    let table = "pg_save_fetch.cities".parse().unwrap();
    let output = fetch_table(&mut session, &table, false).await.expect("Select failed");

    let data = &output.data;
    assert_eq!(data.row_count(), 3);
    let geom = data.position("geom").unwrap();
    assert_eq!(data.columns()[geom].kind, ColumnType::Json);
    assert_eq!(data.columns()[data.position("founded").unwrap()].kind, ColumnType::Temporal);

    match &data.rows()[0][geom] {
        Cell::Json(value) => assert_eq!(value["type"], "Point"),
        other => panic!("unexpected geometry cell: {other:?}"),
    }
    assert_eq!(data.rows()[1][geom], Cell::Null);
    assert_eq!(output.crs.unwrap()["geom"], Crs::Epsg(4326));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_fetch_table_with_centroids() {
    let pool = create_test_pool().expect("Failed to create pool");
    setup_test_schema(&pool, "pg_save_centroids").await.expect("Failed to setup schema");
    let mut session = Session::open(&pool).await.expect("Failed to open session");

    let table = "pg_save_centroids.cities".parse().unwrap();
    let output = fetch_table(&mut session, &table, true).await.expect("Select failed");
    let geom = output.data.position("geom").unwrap();

    match &output.data.rows()[2][geom] {
        Cell::Json(value) => assert_eq!(value["coordinates"][0], 5.92),
        other => panic!("unexpected geometry cell: {other:?}"),
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_fetch_missing_table() {
    let pool = create_test_pool().expect("Failed to create pool");
    let mut session = Session::open(&pool).await.expect("Failed to open session");

    let table = "public.does_not_exist_anywhere".parse().unwrap();
    let err = fetch_table(&mut session, &table, false).await.unwrap_err();
    assert!(matches!(err, QueryError::TableNotFound(_)), "{err:?}");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_run_query_recasts_spatial_columns() {
    let pool = create_test_pool().expect("Failed to create pool");
    setup_test_schema(&pool, "pg_save_query").await.expect("Failed to setup schema");
    let mut session = Session::open(&pool).await.expect("Failed to open session");

    let output = run_query(
        &mut session,
        "SELECT id, geom FROM pg_save_query.cities ORDER BY id;",
        false,
    )
    .await
    .expect("Query failed");

    let rows = output.data.rows();
    assert_eq!(rows.len(), 3);
    assert!(matches!(&rows[0][1], Cell::Json(v) if v["type"] == "Point"));
    assert_eq!(rows[1][1], Cell::Null);
    assert!(matches!(&rows[2][1], Cell::Json(v) if v["coordinates"][1] == 45.56));
    assert_eq!(output.crs.unwrap()["geom"], Crs::Epsg(4326));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_run_query_as_is_keeps_ewkb() {
    let pool = create_test_pool().expect("Failed to create pool");
    setup_test_schema(&pool, "pg_save_raw").await.expect("Failed to setup schema");
    let mut session = Session::open(&pool).await.expect("Failed to open session");

    let output = run_query(&mut session, "SELECT geom FROM pg_save_raw.cities WHERE id = 1", true)
        .await
        .expect("Query failed");

    assert_eq!(output.data.columns()[0].kind, ColumnType::Geometry);
    assert!(matches!(&output.data.rows()[0][0], Cell::Text(hex) if hex.starts_with("0101000020E6100000")));
    assert!(output.crs.is_none());

    // L'EWKB brut est converti par l'export GeoJSON
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.geojson");
    let options = ExportOptions::new().geometry_column("geom");
    export_to_file(&output.data, &path, &options).expect("Export failed");

    let content: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["features"][0]["geometry"]["type"], "Point");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_run_query_errors() {
    let pool = create_test_pool().expect("Failed to create pool");
    let mut session = Session::open(&pool).await.expect("Failed to open session");

    let err = run_query(&mut session, "SELECT 1; DROP TABLE users", false).await.unwrap_err();
    assert!(matches!(err, QueryError::UnsafeQuery(ref p) if p == "drop "));

    let err = run_query(&mut session, "SELEC 1", false).await.unwrap_err();
    assert!(matches!(err, QueryError::Syntax(_)), "{err:?}");

    let err = run_query(&mut session, "SELECT nope FROM pg_class", false).await.unwrap_err();
    assert!(matches!(err, QueryError::ColumnNotFound(_)), "{err:?}");

    let err = run_query(&mut session, "SELECT no_such_fn(1)", false).await.unwrap_err();
    assert!(matches!(err, QueryError::UndefinedFunction(_)), "{err:?}");

    // La session reste utilisable après une erreur
    let output = run_query(&mut session, "SELECT 2.0::float8 AS x", false).await.unwrap();
    assert_eq!(output.data.rows()[0][0], Cell::Float(2.0));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_read_only_transaction_blocks_writes() {
    let pool = create_test_pool().expect("Failed to create pool");
    setup_test_schema(&pool, "pg_save_ro").await.expect("Failed to setup schema");
    let mut session = Session::open(&pool).await.expect("Failed to open session");

    // Passe le filtre textuel, refusé par le serveur
    let err = run_query(&mut session, "TRUNCATE pg_save_ro.cities", false).await.unwrap_err();
    assert!(matches!(err, QueryError::Database(_)), "{err:?}");

    let output = run_query(&mut session, "SELECT count(*) FROM pg_save_ro.cities", false)
        .await
        .unwrap();
    assert_eq!(output.data.rows()[0][0], Cell::Int(3));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_describe_table_and_matview_fallback() {
    let pool = create_test_pool().expect("Failed to create pool");
    setup_test_schema(&pool, "pg_save_describe").await.expect("Failed to setup schema");
    let mut session = Session::open(&pool).await.expect("Failed to open session");

    let table = "pg_save_describe.cities".parse().unwrap();
    let descriptor = describe_table(&mut session, &table).await.expect("Describe failed");
    let names: Vec<&str> = descriptor.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "name", "population", "founded", "geom"]);
    assert!(!descriptor.columns[0].nullable);
    assert_eq!(descriptor.columns[4].data_type, "geometry(Point,4326)");

    let matview = "pg_save_describe.big_cities".parse().unwrap();
    let descriptor = describe_table(&mut session, &matview).await.expect("Describe failed");
    assert_eq!(descriptor.columns.len(), 2);

    let missing = "pg_save_describe.nope".parse().unwrap();
    let err = describe_table(&mut session, &missing).await.unwrap_err();
    assert!(matches!(err, QueryError::TableNotFound(_)));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_list_tables_by_schema() {
    let pool = create_test_pool().expect("Failed to create pool");
    setup_test_schema(&pool, "pg_save_list").await.expect("Failed to setup schema");
    let mut session = Session::open(&pool).await.expect("Failed to open session");

    let tables = list_tables(&mut session, Some("pg_save_list")).await.expect("List failed");
    assert_eq!(tables.column_names().collect::<Vec<_>>(), ["schema", "table"]);
    assert_eq!(tables.row_count(), 1);
    assert_eq!(tables.rows()[0][1], Cell::Text("cities".into()));
}
