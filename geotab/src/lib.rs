//! # geotab
//!
//! Résultats tabulaires (avec colonnes géométriques) et leur export vers des
//! formats portables.
//!
//! ## Features
//!
//! - Types de colonnes fermés, décidés une fois à l'ingestion (`ColumnType`)
//! - Normalisation commune: noms dupliqués, flottants entiers, NaN
//! - Export CSV, XLSX, JSON et GeoJSON (CRS nommé, EWKB converti via `geozero`)
//! - Déduction du format depuis l'extension, repli sur CSV
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geotab::{export_to_file, Cell, Column, ColumnType, ExportOptions, ResultSet};
//! use std::path::Path;
//!
//! let data = ResultSet::with_rows(
//!     vec![Column::new("id", ColumnType::Integer), Column::new("geom", ColumnType::Json)],
//!     vec![vec![Cell::Int(1), Cell::Json(point)]],
//! );
//! let options = ExportOptions::new().geometry_column("geom");
//! let report = export_to_file(&data, Path::new("out.geojson"), &options)?;
//! println!("{} features", report.rows);
//! ```

pub mod error;
pub mod export;
pub mod format;
pub mod normalize;
pub mod types;

pub use error::ExportError;
pub use export::{
    export_to_file, export_to_writer, DroppedColumn, ExportOptions, ExportReport,
    DEFAULT_GEOMETRY_COLUMN,
};
pub use format::{resolve_output_path, ExportFormat};
pub use normalize::normalize;
pub use types::{Cell, Column, ColumnType, Crs, CrsMap, ResultSet, RowIndex};
