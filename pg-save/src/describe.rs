//! Description du catalogue: liste des tables et colonnes d'une table

use geotab::{Cell, Column, ColumnType, ResultSet};
use tracing::{debug, info};

use crate::db::Session;
use crate::query::{QueryError, TableRef};

const LIST_TABLES_SQL: &str = "SELECT table_schema::text AS schema, table_name::text AS table \
     FROM information_schema.tables \
     WHERE table_name::text NOT LIKE 'pg\\_%' \
       AND table_schema::text NOT IN ('pg_catalog', 'information_schema', 'topology') \
       AND ($1::text IS NULL OR table_schema::text = $1) \
     ORDER BY table_schema, table_name";

const DESCRIBE_SQL: &str = "SELECT types.column, types.datatype, c.is_nullable::text = 'YES', \
            c.column_default::text \
     FROM (SELECT a.attnum, a.attname::text AS column, \
                  pg_catalog.format_type(a.atttypid, a.atttypmod) AS datatype \
           FROM pg_catalog.pg_attribute a \
           WHERE a.attnum > 0 \
             AND NOT a.attisdropped \
             AND a.attrelid = ( \
                 SELECT c.oid FROM pg_catalog.pg_class c \
                 LEFT JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
                 WHERE n.nspname::text = $1 AND c.relname::text = $2)) AS types \
     JOIN information_schema.columns c \
       ON types.column = c.column_name::text \
      AND c.table_schema::text = $1 \
      AND c.table_name::text = $2 \
     ORDER BY types.attnum";

/// Repli pour les vues matérialisées, absentes de information_schema
const DESCRIBE_FALLBACK_SQL: &str = "SELECT a.attname::text, \
            pg_catalog.format_type(a.atttypid, a.atttypmod), \
            NOT a.attnotnull, \
            pg_catalog.pg_get_expr(d.adbin, d.adrelid) \
     FROM pg_catalog.pg_attribute a \
     JOIN pg_catalog.pg_class t ON a.attrelid = t.oid \
     JOIN pg_catalog.pg_namespace s ON t.relnamespace = s.oid \
     LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum \
     WHERE a.attnum > 0 \
       AND NOT a.attisdropped \
       AND t.relname::text = $2 \
       AND s.nspname::text = $1 \
     ORDER BY a.attnum";

/// Colonne d'une table telle que décrite par le catalogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnMetadata>,
}

impl TableDescriptor {
    /// Tableau `column`, `datatype`, `is_nullable`, `default` pour l'affichage
    pub fn to_result_set(&self) -> ResultSet {
        let columns = vec![
            Column::new("column", ColumnType::Text),
            Column::new("datatype", ColumnType::Text),
            Column::new("is_nullable", ColumnType::Boolean),
            Column::new("default", ColumnType::Text),
        ];
        let rows = self
            .columns
            .iter()
            .map(|c| {
                vec![
                    Cell::from(c.name.as_str()),
                    Cell::from(c.data_type.as_str()),
                    Cell::Bool(c.nullable),
                    Cell::from(c.default.clone()),
                ]
            })
            .collect();
        ResultSet::with_rows(columns, rows)
    }
}

/// Liste les tables utilisateur, éventuellement d'un seul schéma
pub async fn list_tables(session: &mut Session, schema: Option<&str>) -> Result<ResultSet, QueryError> {
    let (tx, _) = session.begin().await?;
    let rows = tx.query(LIST_TABLES_SQL, &[&schema]).await?;
    tx.commit().await?;

    let data: Vec<Vec<Cell>> = rows
        .iter()
        .map(|row| vec![Cell::Text(row.get(0)), Cell::Text(row.get(1))])
        .collect();
    info!(schema = ?schema, tables = data.len(), "Tables listed");

    Ok(ResultSet::with_rows(
        vec![
            Column::new("schema", ColumnType::Text),
            Column::new("table", ColumnType::Text),
        ],
        data,
    ))
}

/// Décrit les colonnes d'une table, vue ou vue matérialisée
pub async fn describe_table(session: &mut Session, table: &TableRef) -> Result<TableDescriptor, QueryError> {
    let schema = table.schema_or_default();
    let (tx, _) = session.begin().await?;

    let mut rows = tx.query(DESCRIBE_SQL, &[&schema, &table.name]).await?;
    if rows.is_empty() {
        debug!(table = %table, "Not in information_schema, trying pg_attribute");
        rows = tx.query(DESCRIBE_FALLBACK_SQL, &[&schema, &table.name]).await?;
    }
    tx.commit().await?;

    if rows.is_empty() {
        return Err(QueryError::TableNotFound(format!("{}.{}", schema, table.name)));
    }

    let columns = rows
        .iter()
        .map(|row| ColumnMetadata {
            name: row.get(0),
            data_type: row.get(1),
            nullable: row.get::<_, Option<bool>>(2).unwrap_or(true),
            default: row.get(3),
        })
        .collect();

    Ok(TableDescriptor {
        schema: schema.to_string(),
        name: table.name.clone(),
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_to_result_set() {
        let descriptor = TableDescriptor {
            schema: "public".into(),
            name: "cities".into(),
            columns: vec![
                ColumnMetadata {
                    name: "id".into(),
                    data_type: "integer".into(),
                    nullable: false,
                    default: Some("nextval('cities_id_seq'::regclass)".into()),
                },
                ColumnMetadata {
                    name: "geom".into(),
                    data_type: "geometry(Point,4326)".into(),
                    nullable: true,
                    default: None,
                },
            ],
        };

        let rs = descriptor.to_result_set();
        assert_eq!(
            rs.column_names().collect::<Vec<_>>(),
            ["column", "datatype", "is_nullable", "default"]
        );
        assert_eq!(rs.row_count(), 2);
        assert_eq!(rs.rows()[0][2], Cell::Bool(false));
        assert_eq!(rs.rows()[1][3], Cell::Null);
    }
}
