//! Formats d'export et déduction depuis l'extension du fichier

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Format de sortie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
    Json,
    GeoJson,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Csv,
        ExportFormat::Xlsx,
        ExportFormat::Json,
        ExportFormat::GeoJson,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Json => "json",
            ExportFormat::GeoJson => "geojson",
        }
    }

    /// Format correspondant à une extension (insensible à la casse)
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim()).ok_or_else(|| {
            format!(
                "Unsupported format: {}. Use: csv, xlsx, json, geojson",
                s
            )
        })
    }
}

/// Déduit le format depuis l'extension du chemin
///
/// Sans extension, ou avec une extension inconnue, le fichier est écrit en CSV
/// et `.csv` est ajouté au nom. Ne renvoie jamais d'erreur.
pub fn resolve_output_path(path: &Path) -> (PathBuf, ExportFormat) {
    let ext = path.extension().and_then(|e| e.to_str());

    match ext {
        None => {
            warn!(path = %path.display(), "File does not have extension, using csv");
            (with_csv_suffix(path), ExportFormat::Csv)
        }
        Some(ext) => match ExportFormat::from_extension(ext) {
            Some(format) => (path.to_path_buf(), format),
            None => {
                warn!(
                    path = %path.display(),
                    extension = ext,
                    "File has wrong extension, switching to csv"
                );
                (with_csv_suffix(path), ExportFormat::Csv)
            }
        },
    }
}

fn with_csv_suffix(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".csv");
    PathBuf::from(name)
}
