//! Session: une connexion du pool et le cache des types spatiaux

use std::collections::HashSet;

use deadpool_postgres::{Object, Pool, Transaction};
use tokio_postgres::types::Type;
use tracing::debug;

use crate::query::QueryError;

/// OIDs des types `geometry` et `geography` de la base courante
///
/// Les deux ensembles sont vides si PostGIS n'est pas installé.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpatialTypes {
    geometry: HashSet<u32>,
    geography: HashSet<u32>,
}

impl SpatialTypes {
    pub fn new(geometry: impl IntoIterator<Item = u32>, geography: impl IntoIterator<Item = u32>) -> Self {
        Self {
            geometry: geometry.into_iter().collect(),
            geography: geography.into_iter().collect(),
        }
    }

    /// Lit les OIDs dans `pg_type`
    pub async fn load(client: &tokio_postgres::Client) -> Result<Self, QueryError> {
        let rows = client
            .query(
                "SELECT oid, typname::text FROM pg_type WHERE typname::text = ANY($1)",
                &[&vec!["geometry", "geography"]],
            )
            .await?;

        let mut types = Self::default();
        for row in rows {
            let oid: u32 = row.get(0);
            let name: String = row.get(1);
            match name.as_str() {
                "geometry" => types.geometry.insert(oid),
                _ => types.geography.insert(oid),
            };
        }

        debug!(geometry = ?types.geometry, geography = ?types.geography, "Loaded spatial type OIDs");
        Ok(types)
    }

    pub fn is_geometry(&self, ty: &Type) -> bool {
        self.geometry.contains(&ty.oid())
    }

    pub fn is_geography(&self, ty: &Type) -> bool {
        self.geography.contains(&ty.oid())
    }

    pub fn has_postgis(&self) -> bool {
        !self.geometry.is_empty()
    }
}

/// Connexion ouverte pour une commande ou une session interactive
///
/// Rendue au pool au drop.
pub struct Session {
    client: Object,
    spatial_types: Option<SpatialTypes>,
}

impl Session {
    pub async fn open(pool: &Pool) -> Result<Self, QueryError> {
        let client = pool.get().await?;
        Ok(Self {
            client,
            spatial_types: None,
        })
    }

    /// Démarre une transaction en lecture seule
    ///
    /// Les OIDs spatiaux sont chargés au premier appel puis réutilisés.
    /// La transaction est annulée au drop si elle n'est pas validée.
    pub async fn begin(&mut self) -> Result<(Transaction<'_>, &SpatialTypes), QueryError> {
        let types = match self.spatial_types.take() {
            Some(types) => types,
            None => SpatialTypes::load(&self.client).await?,
        };
        let types = self.spatial_types.insert(types);

        let tx = self.client.build_transaction().read_only(true).start().await?;
        Ok((tx, &*types))
    }

    pub fn spatial_types(&self) -> Option<&SpatialTypes> {
        self.spatial_types.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_types_lookup() {
        let types = SpatialTypes::new([Type::TEXT.oid()], [Type::INT4.oid()]);
        assert!(types.is_geometry(&Type::TEXT));
        assert!(!types.is_geometry(&Type::INT4));
        assert!(types.is_geography(&Type::INT4));
        assert!(types.has_postgis());
        assert!(!SpatialTypes::default().has_postgis());
    }
}
