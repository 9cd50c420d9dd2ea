//! Aperçu texte d'un résultat dans le terminal

use std::fmt::Write;

use geotab::{Cell, ResultSet};

const NULL_MARKER: &str = "\\NULL";
const MIN_COLUMN_WIDTH: usize = 6;

/// Taille du terminal (`COLUMNS` x `LINES`), 80x40 par défaut
pub fn terminal_size() -> (usize, usize) {
    let read = |key: &str, default: usize| {
        std::env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v: &usize| *v > 0)
            .unwrap_or(default)
    };
    (read("COLUMNS", 80), read("LINES", 40))
}

/// Nombre de lignes affichables avant de tronquer le milieu
pub fn preview_rows() -> usize {
    terminal_size().1.saturating_sub(6).max(4)
}

/// Met en forme `data` en colonnes alignées
///
/// Avec `max_rows`, seules les premières et dernières lignes sont affichées.
/// Chaque cellule est coupée à `width / nombre de colonnes` caractères.
pub fn render(data: &ResultSet, max_rows: Option<usize>, width: usize) -> String {
    let column_count = data.column_count().max(1);
    let cell_width = (width / column_count).max(MIN_COLUMN_WIDTH);

    let rows = data.rows();
    let (head, tail) = match max_rows {
        Some(max) if rows.len() > max => {
            let head = max.div_ceil(2);
            (head, max - head)
        }
        _ => (rows.len(), 0),
    };

    let mut table: Vec<Vec<String>> = Vec::with_capacity(head + tail + 2);
    table.push(data.column_names().map(|n| truncate(n, cell_width)).collect());
    for row in &rows[..head] {
        table.push(row.iter().map(|c| truncate(&cell_text(c), cell_width)).collect());
    }
    let elided = head + tail < rows.len();
    if elided {
        table.push(vec!["...".to_string(); data.column_count()]);
    }
    for row in &rows[rows.len() - tail..] {
        table.push(row.iter().map(|c| truncate(&cell_text(c), cell_width)).collect());
    }

    let widths: Vec<usize> = (0..data.column_count())
        .map(|i| table.iter().map(|r| r[i].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for line in &table {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }
    let _ = writeln!(out, "\n[{} rows x {} columns]", data.row_count(), data.column_count());
    out
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Null => NULL_MARKER.to_string(),
        other => other.to_plain_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    let text = text.replace(['\n', '\r'], " ");
    if text.chars().count() <= max {
        return text;
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
