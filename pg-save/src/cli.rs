//! Définition et implémentation des commandes CLI
//!
//! - `list-tables`, `describe-table`: catalogue
//! - `select-table`: table entière
//! - `query`: requête libre (texte ou fichier)
//! - `interactive`: boucle de commandes sur une seule connexion

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use geotab::{export_to_file, export_to_writer, normalize, ExportError, ExportFormat, ExportOptions, ResultSet};
use tracing::{info, warn};

use crate::config::{DatabaseConfig, SslMode};
use crate::db::{create_pool, test_connection, Session};
use crate::describe::{describe_table, list_tables};
use crate::display;
use crate::query::{fetch_table, run_query, QueryOutput, TableRef};
use crate::repl::{self, ReplState};

/// Options de connexion communes à toutes les commandes
#[derive(Args, Debug, Clone, Default)]
pub struct DbArgs {
    /// PostgreSQL host (défaut : env DB_HOST / PGHOST / localhost)
    #[arg(short = 'H', long = "db-host", env = "DB_HOST", global = true)]
    pub host: Option<String>,

    /// PostgreSQL port (défaut : env DB_PORT / PGPORT / 5432)
    #[arg(short = 'p', long = "db-port", env = "DB_PORT", global = true)]
    pub port: Option<u16>,

    /// Database name (défaut : env DB_NAME / PGDATABASE / postgres)
    #[arg(short = 'd', long = "db-name", env = "DB_NAME", global = true)]
    pub dbname: Option<String>,

    /// PostgreSQL user (défaut : env DB_USER / PGUSER / postgres)
    #[arg(short = 'u', long = "db-user", env = "DB_USER", global = true)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env DB_PASS / PGPASSWORD)
    #[arg(short = 'w', long = "db-pass", env = "DB_PASS", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long, env = "PGSSLMODE", global = true)]
    pub ssl: Option<SslMode>,
}

impl DbArgs {
    /// Configuration finale: environnement puis options de ligne de commande
    pub fn to_config(&self) -> DatabaseConfig {
        let mut config = DatabaseConfig::from_env();
        config.apply_overrides(
            self.host.clone(),
            self.port,
            self.dbname.clone(),
            self.user.clone(),
            self.password.clone(),
            self.ssl,
        );
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tables of all schemas, or of the given schema
    ListTables {
        /// Schema name
        schema: Option<String>,
    },

    /// Describe the columns of a table, view or materialized view
    DescribeTable {
        /// Table name ([schema.]table)
        table: String,
    },

    /// Select all columns and rows of a table
    SelectTable {
        /// Table name ([schema.]table)
        table: String,

        /// Column used as geometry for GeoJSON output
        #[arg(short = 'g', long)]
        geometry_column: Option<String>,

        /// Apply ST_Centroid() to spatial columns
        #[arg(short = 'c', long)]
        use_centroids: bool,

        /// Output file (.csv, .xlsx, .json, .geojson), or "-" for stdout
        #[arg(short = 'o', long)]
        output: Option<String>,

        /// Format used when writing to stdout
        #[arg(long, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },

    /// Execute a SELECT query, given as text or as a file name
    Query {
        /// SELECT query, or path to a file holding it
        query: String,

        /// Column used as geometry for GeoJSON output
        #[arg(short = 'g', long)]
        geometry_column: Option<String>,

        /// Do not convert spatial columns with ST_AsGeoJSON()
        #[arg(short = 'r', long)]
        execute_as_is: bool,

        /// Output file (.csv, .xlsx, .json, .geojson), or "-" for stdout
        #[arg(short = 'o', long)]
        output: Option<String>,

        /// Format used when writing to stdout
        #[arg(long, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },

    /// Interactive mode on a single connection
    Interactive {
        /// Column used as geometry for GeoJSON output
        #[arg(short = 'g', long)]
        geometry_column: Option<String>,

        /// Apply ST_Centroid() when selecting tables
        #[arg(short = 'c', long)]
        use_centroids: bool,

        /// Do not convert spatial columns with ST_AsGeoJSON()
        #[arg(short = 'r', long)]
        execute_as_is: bool,
    },
}

/// Destination d'un export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    File(PathBuf),
    Stdout,
}

impl OutputTarget {
    pub fn parse(target: &str) -> Self {
        match target.trim() {
            "-" => OutputTarget::Stdout,
            path => OutputTarget::File(PathBuf::from(path)),
        }
    }
}

/// Ouvre la connexion et exécute la commande
pub async fn run(command: Commands, db: &DbArgs) -> Result<()> {
    let config = db.to_config();
    info!(url = %config.display_url(), "Connecting");

    let pool = create_pool(&config)?;
    test_connection(&pool)
        .await
        .with_context(|| format!("Cannot connect to {}", config.display_url()))?;
    let mut session = Session::open(&pool).await?;

    match command {
        Commands::ListTables { schema } => {
            let tables = list_tables(&mut session, schema.as_deref()).await?;
            print_result(&tables, false);
        }
        Commands::DescribeTable { table } => {
            let table: TableRef = table.parse()?;
            let descriptor = describe_table(&mut session, &table).await?;
            print_result(&descriptor.to_result_set(), false);
        }
        Commands::SelectTable {
            table,
            geometry_column,
            use_centroids,
            output,
            format,
        } => {
            let table: TableRef = table.parse()?;
            let result = fetch_table(&mut session, &table, use_centroids).await?;
            show_and_save(&result, output.as_deref(), geometry_column.as_deref(), format)?;
        }
        Commands::Query {
            query,
            geometry_column,
            execute_as_is,
            output,
            format,
        } => {
            if geometry_column.is_some() && output.is_none() {
                warn!("Geometry column is set, but saving to file is not configured");
            }
            let query = read_query_argument(&query)?;
            let result = run_query(&mut session, &query, execute_as_is).await?;
            show_and_save(&result, output.as_deref(), geometry_column.as_deref(), format)?;
        }
        Commands::Interactive {
            geometry_column,
            use_centroids,
            execute_as_is,
        } => {
            let state = ReplState::new(geometry_column, use_centroids, execute_as_is);
            repl::run(&mut session, state).await?;
        }
    }

    Ok(())
}

/// Lit la requête depuis un fichier si l'argument en désigne un
pub fn read_query_argument(argument: &str) -> Result<String> {
    let path = Path::new(argument.trim());
    if !path.is_file() {
        return Ok(argument.to_string());
    }

    info!(path = %path.display(), "Query is treated as filename, reading query from file");
    let bytes = std::fs::read(path).with_context(|| format!("Error on file read: {}", path.display()))?;
    String::from_utf8(bytes)
        .with_context(|| format!("Cannot read file in UTF-8 encoding: {}", path.display()))
}

/// Affiche un aperçu normalisé du résultat
pub fn print_result(data: &ResultSet, limit_rows: bool) {
    let (width, _) = display::terminal_size();
    let limit = limit_rows.then(display::preview_rows);
    print!("{}", display::render(&normalize(data.clone()), limit, width));
}

/// Affiche le résultat puis l'exporte si une destination est donnée
///
/// Rien n'est affiché quand l'export se fait sur la sortie standard.
pub fn show_and_save(
    output: &QueryOutput,
    target: Option<&str>,
    geometry_column: Option<&str>,
    format: ExportFormat,
) -> Result<()> {
    let target = target.map(OutputTarget::parse);
    if target != Some(OutputTarget::Stdout) {
        print_result(&output.data, true);
    }

    match target {
        Some(target) => save_output(output, &target, geometry_column, format),
        None => Ok(()),
    }
}

/// Exporte le résultat
///
/// Une colonne géométrique absente n'est pas fatale: rien n'est écrit.
pub fn save_output(
    output: &QueryOutput,
    target: &OutputTarget,
    geometry_column: Option<&str>,
    format: ExportFormat,
) -> Result<()> {
    if output.data.is_empty() {
        warn!("Select results are empty");
    }

    let mut options = ExportOptions::new().crs_map(output.crs.clone());
    if let Some(column) = geometry_column {
        options = options.geometry_column(column);
    }

    let report = match target {
        OutputTarget::File(path) => export_to_file(&output.data, path, &options),
        OutputTarget::Stdout => export_to_writer(&output.data, format, std::io::stdout().lock(), &options),
    };

    match report {
        Ok(report) => {
            for dropped in &report.dropped {
                warn!(column = %dropped.name, kind = %dropped.kind, "Column not exported");
            }
            if let Some(path) = &report.path {
                println!("Saved {} rows to {}", report.rows, path.display());
            }
            Ok(())
        }
        Err(ExportError::GeometryColumnMissing(column)) => {
            eprintln!("Geometry column \"{}\" is not present in the result, nothing saved", column);
            Ok(())
        }
        Err(e) => Err(e).context("Failed to export results"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotab::{Cell, Column, ColumnType};

    #[test]
    fn test_output_target_parse() {
        assert_eq!(OutputTarget::parse("-"), OutputTarget::Stdout);
        assert_eq!(OutputTarget::parse(" out.csv "), OutputTarget::File("out.csv".into()));
    }

    #[test]
    fn test_read_query_argument_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.sql");
        std::fs::write(&path, "SELECT 'é' AS x").unwrap();

        assert_eq!(read_query_argument(path.to_str().unwrap()).unwrap(), "SELECT 'é' AS x");
        assert_eq!(read_query_argument("SELECT 1").unwrap(), "SELECT 1");
    }

    #[test]
    fn test_read_query_argument_rejects_non_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.sql");
        std::fs::write(&path, [b'S', 0xE9, 0xFF]).unwrap();

        let err = read_query_argument(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("Cannot read file in UTF-8 encoding"));
    }

    #[test]
    fn test_save_output_missing_geometry_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        let output = QueryOutput::new(
            ResultSet::with_rows(vec![Column::new("id", ColumnType::Integer)], vec![vec![Cell::Int(1)]]),
            Default::default(),
        );

        save_output(&output, &OutputTarget::File(path.clone()), Some("geom"), ExportFormat::Csv).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_save_output_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let output = QueryOutput::new(
            ResultSet::with_rows(vec![Column::new("n", ColumnType::Real)], vec![vec![Cell::Float(2.0)]]),
            Default::default(),
        );

        save_output(&output, &OutputTarget::File(path.clone()), None, ExportFormat::Csv).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "n\n2\n");
    }
}
