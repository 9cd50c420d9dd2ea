//! Exécution d'une requête SELECT libre

use geotab::{Cell, ColumnType, Crs, CrsMap, ResultSet};
use tracing::{debug, error, info, trace};

use super::decode::query_result;
use super::safety::check_query;
use super::{QueryError, QueryOutput};
use crate::db::Session;

const SRID_SQL: &str = "SELECT ST_SRID($1::text::geometry)";

const GEOJSON_SQL: &str = "SELECT ST_AsGeoJSON(tmp.geom::geometry)::text \
     FROM unnest($1::text[]) WITH ORDINALITY AS tmp(geom, n) \
     ORDER BY tmp.n";

/// Exécute une requête utilisateur en lecture seule
///
/// La requête passe d'abord le filtre de phrases interdites. Sauf si
/// `execute_as_is`, chaque colonne spatiale d'un résultat non vide est
/// convertie en GeoJSON (une requête par colonne) et son SRID relevé sur la
/// première valeur non nulle.
pub async fn run_query(
    session: &mut Session,
    query: &str,
    execute_as_is: bool,
) -> Result<QueryOutput, QueryError> {
    let query = check_query(query).inspect_err(|e| error!(query, error = %e, "Query rejected"))?;
    trace!(query, execute_as_is, "Executing query");

    let (tx, spatial) = session.begin().await?;
    let mut data = query_result(&tx, query, spatial)
        .await
        .inspect_err(|e| error!(query, error = %e, "Error on user SELECT query"))?;

    let mut crs = CrsMap::new();
    if !execute_as_is && !data.is_empty() {
        let spatial_columns: Vec<usize> = data
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind.is_spatial())
            .map(|(i, _)| i)
            .collect();

        for idx in spatial_columns {
            let name = data.columns()[idx].name.clone();
            let (srid, values) = {
                let raw = raw_values(&data, idx);
                let srid = match raw.iter().flatten().next() {
                    Some(first) => Some(tx.query_one(SRID_SQL, &[first]).await?.get::<_, i32>(0)),
                    None => None,
                };
                let rows = tx.query(GEOJSON_SQL, &[&raw]).await?;
                let values: Vec<Cell> = rows
                    .iter()
                    .map(|row| parse_geojson(row.get::<_, Option<&str>>(0)))
                    .collect();
                (srid, values)
            };

            match srid {
                Some(srid) if srid != 0 => {
                    crs.insert(name.clone(), Crs::Epsg(srid));
                }
                _ => debug!(column = %name, "No SRID recorded"),
            }
            debug!(column = %name, rows = values.len(), "Spatial column converted to GeoJSON");
            data.replace_column(idx, ColumnType::Json, values);
        }
    }
    tx.commit().await?;

    info!(rows = data.row_count(), columns = data.column_count(), "Query executed");
    Ok(QueryOutput::new(data, crs))
}

/// Valeurs texte (EWKB hexadécimal) d'une colonne spatiale
fn raw_values(data: &ResultSet, idx: usize) -> Vec<Option<&str>> {
    data.column_values(idx)
        .map(|cell| match cell {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        })
        .collect()
}

fn parse_geojson(text: Option<&str>) -> Cell {
    match text {
        Some(text) => serde_json::from_str(text)
            .map(Cell::Json)
            .unwrap_or_else(|_| Cell::Text(text.to_string())),
        None => Cell::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotab::Column;
    use serde_json::json;

    #[test]
    fn test_raw_values_keeps_nulls_in_place() {
        let data = ResultSet::with_rows(
            vec![Column::new("geom", ColumnType::Geometry)],
            vec![vec!["01ab".into()], vec![Cell::Null], vec!["02cd".into()]],
        );
        assert_eq!(raw_values(&data, 0), vec![Some("01ab"), None, Some("02cd")]);
    }

    #[test]
    fn test_parse_geojson() {
        assert_eq!(
            parse_geojson(Some(r#"{"type":"Point","coordinates":[1,2]}"#)),
            Cell::Json(json!({"type": "Point", "coordinates": [1, 2]}))
        );
        assert_eq!(parse_geojson(None), Cell::Null);
    }
}
