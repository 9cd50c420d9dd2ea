//! Types de données pour le crate geotab

use std::collections::HashMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Type sémantique d'une colonne, décidé une seule fois à l'ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Boolean,
    /// Valeurs JSON (json/jsonb, géométries converties en GeoJSON)
    Json,
    /// Géométrie brute (EWKB hexadécimal)
    Geometry,
    /// Géographie brute (EWKB hexadécimal)
    Geography,
    /// Dates, heures, intervalles (conservés en texte)
    Temporal,
    /// bytea
    Binary,
    Unknown,
}

impl ColumnType {
    /// Indique si la colonne peut être écrite telle quelle en JSON
    ///
    /// `Unknown` (types mêlés, colonne toute nulle) ne contient que des scalaires.
    pub fn is_json_representable(self) -> bool {
        matches!(
            self,
            ColumnType::Text
                | ColumnType::Integer
                | ColumnType::Real
                | ColumnType::Boolean
                | ColumnType::Json
                | ColumnType::Unknown
        )
    }

    pub fn is_spatial(self) -> bool {
        matches!(self, ColumnType::Geometry | ColumnType::Geography)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Boolean => "boolean",
            ColumnType::Json => "json",
            ColumnType::Geometry => "geometry",
            ColumnType::Geography => "geography",
            ColumnType::Temporal => "temporal",
            ColumnType::Binary => "binary",
            ColumnType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Une valeur de cellule
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Représentation texte utilisée par les formats plats (CSV, aperçu)
    pub fn to_plain_string(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Bool(b) => b.to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Json(v) => v.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::Int(i)
    }
}

impl From<f64> for Cell {
    fn from(f: f64) -> Self {
        Cell::Float(f)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Null, Into::into)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Int(i) => serializer.serialize_i64(*i),
            Cell::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Cell::Float(_) => serializer.serialize_none(),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Json(v) => v.serialize(serializer),
        }
    }
}

/// Description d'une colonne du résultat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Index de lignes laissé par une opération amont (nom + une valeur par ligne)
#[derive(Debug, Clone, PartialEq)]
pub struct RowIndex {
    pub name: Option<String>,
    pub values: Vec<Cell>,
}

impl RowIndex {
    /// Vrai si l'index est exactement 0..N-1
    pub fn is_trivial(&self) -> bool {
        self.values
            .iter()
            .enumerate()
            .all(|(i, v)| matches!(v, Cell::Int(n) if *n == i as i64))
    }
}

/// Résultat tabulaire: colonnes ordonnées et lignes ordonnées
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
    index: Option<RowIndex>,
}

impl ResultSet {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            index: None,
        }
    }

    /// Construit un résultat depuis des lignes déjà alignées sur les colonnes
    ///
    /// Les lignes trop courtes sont complétées par `Null`, les cellules en trop ignorées.
    pub fn with_rows(columns: Vec<Column>, rows: Vec<Vec<Cell>>) -> Self {
        let mut result = Self::new(columns);
        for row in rows {
            result.push_row(row);
        }
        result
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn index(&self) -> Option<&RowIndex> {
        self.index.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position de la première colonne portant ce nom
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Valeurs d'une colonne, dans l'ordre des lignes
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// Remplace toutes les valeurs d'une colonne et son type
    ///
    /// `values` doit contenir une valeur par ligne.
    pub fn replace_column(&mut self, idx: usize, kind: ColumnType, values: Vec<Cell>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.columns[idx].kind = kind;
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
    }

    /// Retire une colonne et renvoie sa description et ses valeurs
    pub fn take_column(&mut self, idx: usize) -> (Column, Vec<Cell>) {
        let column = self.columns.remove(idx);
        let values = self.rows.iter_mut().map(|row| row.remove(idx)).collect();
        (column, values)
    }

    pub fn insert_column(&mut self, idx: usize, column: Column, values: Vec<Cell>) {
        self.columns.insert(idx, column);
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.insert(idx, values.next().unwrap_or(Cell::Null));
        }
    }

    pub(crate) fn rename_column(&mut self, idx: usize, name: String) {
        self.columns[idx].name = name;
    }

    pub(crate) fn take_index(&mut self) -> Option<RowIndex> {
        self.index.take()
    }

    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.rows.iter_mut().flat_map(|row| row.iter_mut())
    }

    /// Déplace une colonne vers l'index de lignes
    ///
    /// Retourne `false` si la colonne n'existe pas.
    pub fn set_index(&mut self, name: &str) -> bool {
        let Some(idx) = self.position(name) else {
            return false;
        };
        let (column, values) = self.take_column(idx);
        self.index = Some(RowIndex {
            name: Some(column.name),
            values,
        });
        true
    }

    /// Conserve les lignes satisfaisant le prédicat
    ///
    /// La position d'origine des lignes est gardée dans l'index, comme le ferait
    /// un filtre sur un DataFrame.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        let previous = self.index.take();
        let mut kept_index = Vec::new();
        let mut kept_rows = Vec::new();

        for (i, row) in std::mem::take(&mut self.rows).into_iter().enumerate() {
            if keep(&row) {
                let label = match &previous {
                    Some(index) => index.values[i].clone(),
                    None => Cell::Int(i as i64),
                };
                kept_index.push(label);
                kept_rows.push(row);
            }
        }

        self.rows = kept_rows;
        self.index = Some(RowIndex {
            name: previous.and_then(|index| index.name),
            values: kept_index,
        });
    }
}

/// Système de coordonnées d'une colonne géométrique
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Crs {
    /// Code EPSG (SRID PostGIS)
    Epsg(i32),
    /// Nom complet du CRS, écrit tel quel
    Name(String),
}

impl Crs {
    /// Nom utilisé dans le membre `crs` d'un GeoJSON
    pub fn urn(&self) -> String {
        match self {
            Crs::Epsg(code) => format!("urn:ogc:def:crs:EPSG::{}", code),
            Crs::Name(name) => name.clone(),
        }
    }
}

impl Default for Crs {
    fn default() -> Self {
        Crs::Epsg(4326)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Name(name) => f.write_str(name),
        }
    }
}

impl std::str::FromStr for Crs {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        Ok(match code.parse::<i32>() {
            Ok(code) => Crs::Epsg(code),
            Err(_) => Crs::Name(trimmed.to_string()),
        })
    }
}

/// Correspondance colonne -> CRS produite par le planificateur de requêtes
pub type CrsMap = HashMap<String, Crs>;

/// Vue d'une ligne sérialisée en objet JSON, dans l'ordre des colonnes
pub(crate) struct RowObject<'a> {
    pub columns: &'a [Column],
    pub cells: &'a [Cell],
}

impl Serialize for RowObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(&column.name, cell)?;
        }
        map.end()
    }
}
