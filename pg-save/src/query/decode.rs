//! Décodage des lignes: types depuis la requête préparée, valeurs en texte

use geotab::{Cell, Column, ColumnType, ResultSet};
use tokio_postgres::types::{Kind, Type};
use tokio_postgres::SimpleQueryMessage;
use tracing::trace;

use super::QueryError;
use crate::db::SpatialTypes;

/// Classe un type PostgreSQL
///
/// Les types hors catalogue (enum, tableaux, inet, citext...) arrivent en texte
/// et restent exportables; un domaine prend la classe de son type de base.
pub fn column_type(ty: &Type, spatial: &SpatialTypes) -> ColumnType {
    if spatial.is_geometry(ty) {
        return ColumnType::Geometry;
    }
    if spatial.is_geography(ty) {
        return ColumnType::Geography;
    }

    match *ty {
        Type::BOOL => ColumnType::Boolean,
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => ColumnType::Integer,
        Type::FLOAT4 | Type::FLOAT8 | Type::NUMERIC => ColumnType::Real,
        Type::JSON | Type::JSONB => ColumnType::Json,
        Type::DATE
        | Type::TIME
        | Type::TIMETZ
        | Type::TIMESTAMP
        | Type::TIMESTAMPTZ
        | Type::INTERVAL => ColumnType::Temporal,
        Type::BYTEA => ColumnType::Binary,
        Type::TEXT
        | Type::VARCHAR
        | Type::BPCHAR
        | Type::NAME
        | Type::CHAR
        | Type::UUID
        | Type::UNKNOWN => ColumnType::Text,
        _ => match ty.kind() {
            Kind::Domain(base) => column_type(base, spatial),
            Kind::Pseudo => ColumnType::Unknown,
            _ => ColumnType::Text,
        },
    }
}

/// Convertit une valeur du protocole texte
///
/// Une valeur illisible pour son type est gardée en texte.
pub fn parse_cell(kind: ColumnType, raw: Option<&str>) -> Cell {
    let Some(raw) = raw else {
        return Cell::Null;
    };

    match kind {
        ColumnType::Boolean => match raw {
            "t" => Cell::Bool(true),
            "f" => Cell::Bool(false),
            _ => Cell::Text(raw.to_string()),
        },
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(Cell::Int)
            .unwrap_or_else(|_| Cell::Text(raw.to_string())),
        ColumnType::Real => raw
            .parse::<f64>()
            .map(Cell::Float)
            .unwrap_or_else(|_| Cell::Text(raw.to_string())),
        ColumnType::Json => serde_json::from_str(raw)
            .map(Cell::Json)
            .unwrap_or_else(|_| Cell::Text(raw.to_string())),
        _ => Cell::Text(raw.to_string()),
    }
}

/// Exécute `sql` dans la transaction et construit le résultat
pub async fn query_result(
    tx: &tokio_postgres::Transaction<'_>,
    sql: &str,
    spatial: &SpatialTypes,
) -> Result<ResultSet, QueryError> {
    let statement = tx.prepare(sql).await?;
    let columns: Vec<Column> = statement
        .columns()
        .iter()
        .map(|c| Column::new(c.name(), column_type(c.type_(), spatial)))
        .collect();
    let kinds: Vec<ColumnType> = columns.iter().map(|c| c.kind).collect();

    let mut result = ResultSet::new(columns);
    for message in tx.simple_query(sql).await? {
        if let SimpleQueryMessage::Row(row) = message {
            let cells = (0..row.len())
                .map(|i| parse_cell(kinds.get(i).copied().unwrap_or(ColumnType::Unknown), row.get(i)))
                .collect();
            result.push_row(cells);
        }
    }

    trace!(rows = result.row_count(), columns = result.column_count(), "Query decoded");
    Ok(result)
}
