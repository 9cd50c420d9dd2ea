//! Types d'erreurs pour le crate geotab

use thiserror::Error;

/// Erreurs pouvant interrompre un export
///
/// Une colonne non représentable dans le format cible n'est pas une erreur:
/// elle est retirée et signalée dans le rapport d'export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Destination impossible à ouvrir ou à écrire
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// La colonne géométrique demandée est absente du résultat
    #[error("Geometry column \"{0}\" is not present in the result")]
    GeometryColumnMissing(String),

    /// Erreur d'écriture CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Erreur d'écriture XLSX
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Erreur de sérialisation JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
