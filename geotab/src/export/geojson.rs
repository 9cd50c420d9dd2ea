//! Export GeoJSON (FeatureCollection avec CRS nommé)

use std::io::Write;

use geozero::wkb::Ewkb;
use geozero::ToJson;
use serde_json::Value;
use tracing::{error, warn};

use super::{retain_json_columns, DroppedColumn};
use crate::error::ExportError;
use crate::normalize::normalize;
use crate::types::{Cell, Crs, ResultSet, RowObject};

/// Écrit une FeatureCollection
///
/// La colonne `geometry_column` devient la géométrie de chaque feature, les autres
/// colonnes (normalisées, limitées aux types JSON) ses propriétés.
/// `name` est le nom du fichier de destination, absent pour un flux.
///
/// # Errors
///
/// `GeometryColumnMissing` si la colonne géométrique est absente: rien n'est écrit.
pub fn write_geojson<W: Write>(
    result: &ResultSet,
    mut writer: W,
    geometry_column: &str,
    crs: &Crs,
    name: Option<&str>,
) -> Result<Vec<DroppedColumn>, ExportError> {
    let Some(geometry_idx) = result.position(geometry_column) else {
        error!(geometry_column, "Geometry column is not present, aborting");
        return Err(ExportError::GeometryColumnMissing(geometry_column.to_string()));
    };

    let mut properties = result.clone();
    let (_, geometries) = properties.take_column(geometry_idx);
    let (properties, dropped) = retain_json_columns(normalize(properties));

    // En-tête FeatureCollection avec CRS
    write!(writer, r#"{{"type":"FeatureCollection","#)?;
    if let Some(name) = name {
        write!(writer, r#""name":"#)?;
        serde_json::to_writer(&mut writer, name)?;
        write!(writer, ",")?;
    }
    write!(writer, r#""crs":{{"type":"name","properties":{{"name":"#)?;
    serde_json::to_writer(&mut writer, &crs.urn())?;
    write!(writer, r#"}}}},"features":["#)?;

    // Une feature par ligne
    for (i, (cells, geometry)) in properties.rows().iter().zip(&geometries).enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write!(writer, r#"{{"type":"Feature","properties":"#)?;
        serde_json::to_writer(
            &mut writer,
            &RowObject {
                columns: properties.columns(),
                cells,
            },
        )?;
        write!(writer, r#","geometry":"#)?;
        serde_json::to_writer(&mut writer, &geometry_value(geometry, geometry_column))?;
        write!(writer, "}}")?;
    }

    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(dropped)
}

/// Géométrie GeoJSON d'une cellule
///
/// Accepte un objet JSON, du texte JSON ou de l'EWKB hexadécimal (géométrie brute
/// PostGIS). Une valeur non reconnue est gardée telle quelle.
fn geometry_value(cell: &Cell, column: &str) -> Value {
    let value = match cell {
        Cell::Null => return Value::Null,
        Cell::Json(value) => Some(value.clone()),
        Cell::Text(text) => text_geometry(text),
        _ => None,
    };

    match value.map(::geojson::Geometry::from_json_value) {
        Some(Ok(geometry)) => serde_json::to_value(&geometry).unwrap_or(Value::Null),
        Some(Err(e)) => {
            warn!(column, error = %e, "Value is not a GeoJSON geometry, keeping it as is");
            raw_value(cell)
        }
        None => {
            warn!(column, "Cannot read geometry value, keeping it as is");
            raw_value(cell)
        }
    }
}

fn text_geometry(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.starts_with('{') {
        return serde_json::from_str(text).ok();
    }
    let bytes = hex::decode(text).ok()?;
    let json = Ewkb(bytes).to_json().ok()?;
    serde_json::from_str(&json).ok()
}

fn raw_value(cell: &Cell) -> Value {
    serde_json::to_value(cell).unwrap_or(Value::Null)
}
