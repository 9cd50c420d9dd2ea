//! Normalisation commune à tous les formats d'export
//!
//! - l'index de lignes non trivial redevient une colonne de tête
//! - les noms de colonnes dupliqués sont suffixés (`id`, `id_0`, `id_1`...)
//! - les flottants entiers deviennent des entiers
//! - NaN devient null
//!
//! L'opération est idempotente.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::types::{Cell, Column, ColumnType, ResultSet};

/// Nom de la colonne créée depuis un index anonyme
pub const DEFAULT_INDEX_NAME: &str = "index";

/// Normalise un résultat avant export
pub fn normalize(mut result: ResultSet) -> ResultSet {
    fold_index(&mut result);
    dedup_column_names(&mut result);

    for cell in result.cells_mut() {
        coerce_float(cell);
    }

    result
}

/// Réintègre un index non trivial comme première colonne
fn fold_index(result: &mut ResultSet) {
    let Some(index) = result.take_index() else {
        return;
    };
    if index.is_trivial() {
        return;
    }

    let name = index
        .name
        .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string());
    debug!(column = %name, "Folding row index back into a column");

    let kind = infer_kind(&index.values);
    result.insert_column(0, Column::new(name, kind), index.values);
}

/// Renomme les occurrences dupliquées d'un même nom de colonne
///
/// La première occurrence garde son nom, les suivantes reçoivent `<nom>_<k>`
/// avec `k` croissant à partir de 0, en sautant les noms déjà pris.
fn dedup_column_names(result: &mut ResultSet) {
    let names: Vec<String> = result.column_names().map(str::to_string).collect();
    let renamed = unique_names(&names);

    for (idx, (old, new)) in names.iter().zip(renamed).enumerate() {
        if *old != new {
            warn!(column = %old, renamed = %new, "Duplicate column name, renaming");
            result.rename_column(idx, new);
        }
    }
}

pub(crate) fn unique_names(names: &[String]) -> Vec<String> {
    let mut used: HashSet<String> = names.iter().cloned().collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut counters: HashMap<&str, usize> = HashMap::new();

    names
        .iter()
        .map(|name| {
            if seen.insert(name.as_str()) {
                return name.clone();
            }
            let counter = counters.entry(name.as_str()).or_insert(0);
            loop {
                let candidate = format!("{}_{}", name, counter);
                *counter += 1;
                if used.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

fn coerce_float(cell: &mut Cell) {
    if let Cell::Float(f) = *cell {
        if f.is_nan() {
            *cell = Cell::Null;
        } else if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(&f) {
            *cell = Cell::Int(f as i64);
        }
    }
}

/// Type d'une colonne reconstruite depuis ses valeurs
fn infer_kind(values: &[Cell]) -> ColumnType {
    let mut kind: Option<ColumnType> = None;
    for value in values {
        let current = match value {
            Cell::Null => continue,
            Cell::Bool(_) => ColumnType::Boolean,
            Cell::Int(_) => ColumnType::Integer,
            Cell::Float(_) => ColumnType::Real,
            Cell::Text(_) => ColumnType::Text,
            Cell::Json(_) => ColumnType::Json,
        };
        kind = match kind {
            None => Some(current),
            Some(k) if k == current => Some(k),
            Some(ColumnType::Integer) if current == ColumnType::Real => Some(ColumnType::Real),
            Some(ColumnType::Real) if current == ColumnType::Integer => Some(ColumnType::Real),
            Some(_) => return ColumnType::Unknown,
        };
    }
    kind.unwrap_or(ColumnType::Unknown)
}
