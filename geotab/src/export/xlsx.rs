//! Export XLSX (une seule feuille)

use std::borrow::Cow;
use std::io::Write;

use rust_xlsxwriter::{Format, Workbook};
use tracing::warn;

use crate::error::ExportError;
use crate::types::{Cell, ResultSet};

/// Nombre maximal de caractères dans une cellule Excel
pub const MAX_CELL_CHARS: usize = 32_767;

/// Écrit l'en-tête en gras puis les lignes, sans index
///
/// Un texte trop long est tronqué et un flottant non fini est écrit en texte,
/// avec un avertissement nommant la colonne.
pub fn write_xlsx<W: Write>(data: &ResultSet, mut writer: W) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1")?;

    let columns = data.columns();
    for (col, column) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, column.name.as_str(), &header)?;
    }

    for (row_idx, row) in data.rows().iter().enumerate() {
        let r = row_idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let c = col as u16;
            let name = columns.get(col).map(|column| column.name.as_str()).unwrap_or_default();
            match cell {
                Cell::Null => {}
                Cell::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
                Cell::Int(i) => {
                    sheet.write_number(r, c, *i as f64)?;
                }
                Cell::Float(f) if f.is_finite() => {
                    sheet.write_number(r, c, *f)?;
                }
                Cell::Float(f) => {
                    warn!(column = name, row = row_idx, value = %f, "Non-finite number written as text");
                    sheet.write_string(r, c, f.to_string().as_str())?;
                }
                Cell::Text(s) => {
                    sheet.write_string(r, c, fit_cell_text(s, name, row_idx).as_ref())?;
                }
                Cell::Json(v) => {
                    let text = v.to_string();
                    sheet.write_string(r, c, fit_cell_text(&text, name, row_idx).as_ref())?;
                }
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    writer.write_all(&bytes)?;

    Ok(())
}

/// Tronque un texte à la limite Excel, sur une frontière de caractère
fn fit_cell_text<'a>(text: &'a str, column: &str, row: usize) -> Cow<'a, str> {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        None => Cow::Borrowed(text),
        Some((end, _)) => {
            warn!(
                column,
                row,
                chars = text.chars().count(),
                limit = MAX_CELL_CHARS,
                "Cell exceeds XLSX limit, truncated"
            );
            Cow::Borrowed(&text[..end])
        }
    }
}
