//! # pg-save
//!
//! Extraction de données PostgreSQL/PostGIS vers CSV, XLSX, JSON et GeoJSON.
//!
//! ## Features
//!
//! - Lecture de tables entières, géométries converties en GeoJSON (ou centroïdes)
//! - Requêtes SELECT libres, filtrées puis exécutées en lecture seule
//! - Description du catalogue (tables, colonnes)
//! - CLI et mode interactif sur une seule connexion
//!
//! ## Usage CLI
//!
//! ```bash
//! pg-save -d cadastre list-tables public
//! pg-save select-table cadastre.parcelles -c -o parcelles.geojson
//! pg-save query "SELECT id, geom FROM communes" -g geom -o communes.geojson
//! pg-save query requete.sql -o - --format json
//! pg-save interactive
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod describe;
pub mod display;
pub mod query;
pub mod repl;

pub use config::{DatabaseConfig, SslMode};
pub use db::{create_pool, Session};
pub use describe::{describe_table, list_tables, TableDescriptor};
pub use query::{check_query, fetch_table, run_query, QueryError, QueryOutput, TableRef};
