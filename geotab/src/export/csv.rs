//! Export CSV

use std::io::Write;

use crate::error::ExportError;
use crate::types::ResultSet;

/// Écrit l'en-tête puis les lignes, séparées par des virgules, sans index
///
/// Les valeurs nulles donnent un champ vide, les valeurs JSON leur texte compact.
pub fn write_csv<W: Write>(data: &ResultSet, writer: W) -> Result<(), ExportError> {
    let mut csv = ::csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);

    csv.write_record(data.column_names())?;
    for row in data.rows() {
        csv.write_record(row.iter().map(|cell| cell.to_plain_string()))?;
    }
    csv.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::types::{Cell, Column, ColumnType};

    #[test]
    fn test_write_csv_integer_floats() {
        let rs = ResultSet::with_rows(
            vec![
                Column::new("id", ColumnType::Real),
                Column::new("label", ColumnType::Text),
            ],
            vec![
                vec![Cell::Float(1.0), "a, b".into()],
                vec![Cell::Float(2.0), Cell::Null],
                vec![Cell::Null, "c".into()],
            ],
        );

        let mut out = Vec::new();
        write_csv(&normalize(rs), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "id,label\n1,\"a, b\"\n2,\n,c\n");
        assert!(!text.contains(".0"));
    }

    #[test]
    fn test_write_csv_json_cell() {
        let rs = ResultSet::with_rows(
            vec![Column::new("geom", ColumnType::Json)],
            vec![vec![Cell::Json(serde_json::json!({"type": "Point", "coordinates": [1, 2]}))]],
        );

        let mut out = Vec::new();
        write_csv(&rs, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("geom\n"));
        assert!(text.contains("\"\"coordinates\"\":[1,2]"));
    }
}
