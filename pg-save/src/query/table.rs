//! Lecture d'une table entière avec projection des colonnes spatiales

use geotab::{Crs, CrsMap};
use tracing::{debug, info};

use super::decode::{column_type, query_result};
use super::table_ref::{quote_ident, TableRef};
use super::{QueryError, QueryOutput};
use crate::db::Session;

/// Traitement appliqué à une colonne dans la liste SELECT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnProjection {
    Plain,
    GeoJson,
    Centroid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn {
    pub name: String,
    pub projection: ColumnProjection,
}

impl ProjectedColumn {
    /// Expression SQL, aliasée sous le nom d'origine
    pub fn expression(&self) -> String {
        let ident = quote_ident(&self.name);
        match self.projection {
            ColumnProjection::Plain => ident,
            ColumnProjection::GeoJson => format!("ST_AsGeoJSON({ident})::jsonb AS {ident}"),
            ColumnProjection::Centroid => format!("ST_AsGeoJSON(ST_Centroid({ident}))::jsonb AS {ident}"),
        }
    }
}

/// Construit `SELECT ... FROM table`
pub fn select_sql(table: &TableRef, columns: &[ProjectedColumn]) -> String {
    let list: Vec<String> = columns.iter().map(ProjectedColumn::expression).collect();
    format!("SELECT {} FROM {}", list.join(", "), table.sql())
}

/// Lit toutes les lignes de `table`
///
/// Les colonnes geometry/geography sont converties en GeoJSON côté serveur
/// (ou en centroïde si `use_centroids`), et leur SRID est relevé sur la
/// première valeur non nulle.
pub async fn fetch_table(
    session: &mut Session,
    table: &TableRef,
    use_centroids: bool,
) -> Result<QueryOutput, QueryError> {
    info!(table = %table, use_centroids, "Selecting table");

    let (tx, spatial) = session.begin().await?;

    let statement = tx.prepare(&format!("SELECT * FROM {}", table.sql())).await?;
    let columns: Vec<ProjectedColumn> = statement
        .columns()
        .iter()
        .map(|c| {
            let projection = match (column_type(c.type_(), spatial).is_spatial(), use_centroids) {
                (false, _) => ColumnProjection::Plain,
                (true, false) => ColumnProjection::GeoJson,
                (true, true) => ColumnProjection::Centroid,
            };
            ProjectedColumn {
                name: c.name().to_string(),
                projection,
            }
        })
        .collect();

    let mut crs = CrsMap::new();
    for column in columns.iter().filter(|c| c.projection != ColumnProjection::Plain) {
        let ident = quote_ident(&column.name);
        let sql = format!(
            "SELECT ST_SRID({ident}::geometry) FROM {} WHERE {ident} IS NOT NULL LIMIT 1",
            table.sql()
        );
        let srid: Option<i32> = tx.query_opt(&sql, &[]).await?.and_then(|row| row.get(0));
        match srid {
            Some(srid) if srid != 0 => {
                debug!(column = %column.name, srid, "Spatial column SRID");
                crs.insert(column.name.clone(), Crs::Epsg(srid));
            }
            _ => debug!(column = %column.name, "No SRID recorded"),
        }
    }

    let data = query_result(&tx, &select_sql(table, &columns), spatial).await?;
    tx.commit().await?;

    info!(table = %table, rows = data.row_count(), "Table selected");
    Ok(QueryOutput::new(data, crs))
}
