//! Planificateur de requêtes
//!
//! Deux points d'entrée, chacun dans une transaction en lecture seule:
//! - [`fetch_table`]: table entière, géométries converties côté serveur
//! - [`run_query`]: requête libre filtrée par [`check_query`]

pub mod decode;
pub mod error;
pub mod safety;
pub mod select;
pub mod table;
pub mod table_ref;

use geotab::{CrsMap, ResultSet};

pub use error::QueryError;
pub use safety::check_query;
pub use select::run_query;
pub use table::fetch_table;
pub use table_ref::TableRef;

/// Résultat d'un appel au planificateur
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub data: ResultSet,
    /// SRID par colonne spatiale, absent si aucune n'a été relevée
    pub crs: Option<CrsMap>,
}

impl QueryOutput {
    pub fn new(data: ResultSet, crs: CrsMap) -> Self {
        Self {
            data,
            crs: (!crs.is_empty()).then_some(crs),
        }
    }
}
