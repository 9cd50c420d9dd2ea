//! Export JSON: tableau d'objets, un objet par ligne

use std::io::Write;

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::error::ExportError;
use crate::types::{ResultSet, RowObject};

/// Sérialise un résultat en tableau d'objets (clés dans l'ordre des colonnes)
pub(crate) struct Records<'a>(pub &'a ResultSet);

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let columns = self.0.columns();
        let mut seq = serializer.serialize_seq(Some(self.0.row_count()))?;
        for cells in self.0.rows() {
            seq.serialize_element(&RowObject { columns, cells })?;
        }
        seq.end()
    }
}

/// Écrit le tableau d'objets, indenté sur 4 espaces si `pretty`
///
/// Les colonnes doivent déjà être limitées aux types représentables en JSON.
pub fn write_json<W: Write>(data: &ResultSet, writer: W, pretty: bool) -> Result<(), ExportError> {
    if pretty {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        Records(data).serialize(&mut serializer)?;
    } else {
        serde_json::to_writer(writer, &Records(data))?;
    }
    Ok(())
}
