//! Pool de connexions PostgreSQL

use std::time::Duration;

use anyhow::{Context, Result};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime, Timeouts};
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::debug;

use crate::config::{DatabaseConfig, SslMode};

/// Une seule connexion: les requêtes sont exécutées l'une après l'autre
const POOL_SIZE: usize = 1;

fn make_tls_connector() -> MakeRustlsConnect {
    let root_store = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    MakeRustlsConnect::new(config)
}

/// Crée le pool de connexions
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.dbname = Some(config.dbname.clone());
    cfg.user = Some(config.user.clone());
    cfg.password = config.password.clone();
    cfg.application_name = Some(env!("CARGO_PKG_NAME").to_string());

    cfg.pool = Some(PoolConfig {
        max_size: POOL_SIZE,
        timeouts: Timeouts {
            wait: Some(Duration::from_secs(30)),
            create: Some(Duration::from_secs(10)),
            recycle: Some(Duration::from_secs(30)),
        },
        ..Default::default()
    });

    debug!(url = %config.display_url(), ssl = ?config.ssl_mode, "Creating connection pool");

    match config.ssl_mode {
        SslMode::Disable => cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .context("Failed to create database pool"),
        SslMode::Prefer | SslMode::Require => cfg
            .create_pool(Some(Runtime::Tokio1), make_tls_connector())
            .context("Failed to create database pool with TLS"),
    }
}

/// Teste la connexion à la base
pub async fn test_connection(pool: &Pool) -> Result<()> {
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;
    client
        .execute("SELECT 1", &[])
        .await
        .context("Connection test failed")?;
    Ok(())
}
