//! Export d'un résultat tabulaire vers fichier ou flux (CSV, XLSX, JSON, GeoJSON)
//!
//! Le contenu est toujours produit entièrement en mémoire avant d'ouvrir la
//! destination: un export interrompu ne laisse pas de fichier partiel.

pub mod csv;
pub mod geojson;
pub mod json;
pub mod xlsx;

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::ExportError;
use crate::format::{resolve_output_path, ExportFormat};
use crate::normalize::normalize;
use crate::types::{ColumnType, Crs, CrsMap, ResultSet};

/// Nom de la colonne géométrique utilisée si aucune n'est précisée
pub const DEFAULT_GEOMETRY_COLUMN: &str = "geometry";

/// Options d'export
///
/// Seul le GeoJSON les lit (colonne géométrique, CRS); les autres formats les ignorent.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Colonne portant la géométrie des features
    pub geometry_column: Option<String>,
    /// CRS par colonne, issu du planificateur de requêtes
    pub crs_map: Option<CrsMap>,
    /// CRS utilisé si la colonne géométrique n'est pas dans `crs_map`
    pub default_crs: Option<Crs>,
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geometry_column(mut self, column: impl Into<String>) -> Self {
        self.geometry_column = Some(column.into());
        self
    }

    pub fn crs_map(mut self, crs_map: Option<CrsMap>) -> Self {
        self.crs_map = crs_map;
        self
    }

    pub fn default_crs(mut self, crs: Crs) -> Self {
        self.default_crs = Some(crs);
        self
    }
}

/// Colonne retirée car non représentable dans le format cible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedColumn {
    pub name: String,
    pub kind: ColumnType,
}

/// Rapport d'un export réussi
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    /// Format effectivement écrit
    pub format: ExportFormat,
    /// Fichier écrit (absent pour un export vers un flux)
    pub path: Option<PathBuf>,
    /// Nombre de lignes (ou de features) écrites
    pub rows: usize,
    /// Colonnes retirées, avec leur type
    pub dropped: Vec<DroppedColumn>,
}

/// Exporte vers un fichier, le format étant déduit de l'extension
///
/// Une extension absente ou inconnue donne un CSV (`.csv` est ajouté au nom).
pub fn export_to_file(
    result: &ResultSet,
    path: &Path,
    options: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    let (path, format) = resolve_output_path(path);
    info!(path = %path.display(), format = %format, "Saving file");

    let name = path.to_string_lossy().into_owned();
    let mut buffer = Vec::new();
    let mut report = render(result, format, &mut buffer, options, Some(&name))?;

    std::fs::write(&path, &buffer)?;
    debug!(path = %path.display(), bytes = buffer.len(), "Saved");

    report.path = Some(path);
    Ok(report)
}

/// Exporte vers un flux (buffer mémoire, stdout...)
///
/// Le format est donné explicitement: aucune extension n'est déduite ni ajoutée.
/// Le JSON est compact (pas d'indentation, contrairement à [`export_to_file`]) et
/// le GeoJSON n'a pas de membre `name`. Rien n'est écrit dans `writer` si le rendu
/// échoue, par exemple sur une colonne géométrique absente.
pub fn export_to_writer<W: Write>(
    result: &ResultSet,
    format: ExportFormat,
    mut writer: W,
    options: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    info!(format = %format, "Saving to buffer");

    let mut buffer = Vec::new();
    let report = render(result, format, &mut buffer, options, None)?;

    writer.write_all(&buffer)?;
    writer.flush()?;
    Ok(report)
}

fn render(
    result: &ResultSet,
    format: ExportFormat,
    out: &mut Vec<u8>,
    options: &ExportOptions,
    name: Option<&str>,
) -> Result<ExportReport, ExportError> {
    let (rows, dropped) = match format {
        ExportFormat::Csv => {
            let data = normalize(result.clone());
            csv::write_csv(&data, &mut *out)?;
            (data.row_count(), Vec::new())
        }
        ExportFormat::Xlsx => {
            let data = normalize(result.clone());
            xlsx::write_xlsx(&data, &mut *out)?;
            (data.row_count(), Vec::new())
        }
        ExportFormat::Json => {
            let (data, dropped) = retain_json_columns(normalize(result.clone()));
            // Fichier indenté, flux compact
            json::write_json(&data, &mut *out, name.is_some())?;
            (data.row_count(), dropped)
        }
        ExportFormat::GeoJson => {
            let geometry_column = match &options.geometry_column {
                Some(column) => column.clone(),
                None => {
                    warn!(
                        "Geometry column is not set, but is required. Falling back to \"{}\"",
                        DEFAULT_GEOMETRY_COLUMN
                    );
                    DEFAULT_GEOMETRY_COLUMN.to_string()
                }
            };
            let crs = resolve_crs(options, &geometry_column);
            let dropped =
                geojson::write_geojson(result, &mut *out, &geometry_column, &crs, name)?;
            (result.row_count(), dropped)
        }
    };

    Ok(ExportReport {
        format,
        path: None,
        rows,
        dropped,
    })
}

/// CRS de la colonne géométrique: carte du planificateur, puis défaut appelant, puis EPSG:4326
fn resolve_crs(options: &ExportOptions, geometry_column: &str) -> Crs {
    if let Some(map) = &options.crs_map {
        if let Some(crs) = map.get(geometry_column) {
            return crs.clone();
        }
        let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
        keys.sort_unstable();
        warn!(
            geometry_column,
            known = %keys.join(", "),
            "CRS map does not contain the geometry column"
        );
    }

    match &options.default_crs {
        Some(crs) => crs.clone(),
        None => {
            let crs = Crs::default();
            warn!(crs = %crs, "No CRS is given, using default");
            crs
        }
    }
}

/// Retire les colonnes dont le type n'a pas de représentation JSON
pub(crate) fn retain_json_columns(mut data: ResultSet) -> (ResultSet, Vec<DroppedColumn>) {
    let mut dropped = Vec::new();
    let mut idx = 0;
    while idx < data.column_count() {
        let column = &data.columns()[idx];
        if column.kind.is_json_representable() {
            idx += 1;
            continue;
        }
        warn!(column = %column.name, kind = %column.kind, "Dropping non-serializable column");
        let (column, _) = data.take_column(idx);
        dropped.push(DroppedColumn {
            name: column.name,
            kind: column.kind,
        });
    }
    (data, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, Column};

    #[test]
    fn test_retain_json_columns() {
        let rs = ResultSet::with_rows(
            vec![
                Column::new("id", ColumnType::Integer),
                Column::new("created", ColumnType::Temporal),
                Column::new("raw", ColumnType::Geometry),
                Column::new("props", ColumnType::Json),
            ],
            vec![vec![
                Cell::Int(1),
                "2024-01-01".into(),
                "0101000000".into(),
                Cell::Json(serde_json::json!({})),
            ]],
        );
        let (data, dropped) = retain_json_columns(rs);
        assert_eq!(data.column_names().collect::<Vec<_>>(), vec!["id", "props"]);
        assert_eq!(
            dropped,
            vec![
                DroppedColumn {
                    name: "created".into(),
                    kind: ColumnType::Temporal
                },
                DroppedColumn {
                    name: "raw".into(),
                    kind: ColumnType::Geometry
                },
            ]
        );
        assert_eq!(data.rows()[0].len(), 2);
    }

    #[test]
    fn test_resolve_crs_order() {
        let mut map = CrsMap::new();
        map.insert("geom".into(), Crs::Epsg(2154));

        let options = ExportOptions::new().crs_map(Some(map));
        assert_eq!(resolve_crs(&options, "geom"), Crs::Epsg(2154));
        assert_eq!(resolve_crs(&options, "other"), Crs::Epsg(4326));

        let options = options.default_crs(Crs::Epsg(3857));
        assert_eq!(resolve_crs(&options, "other"), Crs::Epsg(3857));
    }

    #[test]
    fn test_geometry_missing_writes_nothing_to_writer() {
        let rs = ResultSet::with_rows(
            vec![Column::new("id", ColumnType::Integer)],
            vec![vec![Cell::Int(1)]],
        );
        let mut out = Vec::new();
        let options = ExportOptions::new().geometry_column("geom");
        let err = export_to_writer(&rs, ExportFormat::GeoJson, &mut out, &options).unwrap_err();
        assert!(matches!(err, ExportError::GeometryColumnMissing(ref c) if c == "geom"));
        assert!(out.is_empty());
    }
}
