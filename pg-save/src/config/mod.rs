//! Configuration de la connexion et chargement du fichier d'environnement

use std::path::{Path, PathBuf};

/// Mode SSL pour la connexion PostgreSQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    /// Pas de SSL (défaut)
    #[default]
    Disable,
    /// SSL préféré mais non requis
    Prefer,
    /// SSL requis
    Require,
}

impl std::str::FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" | "off" | "false" | "no" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" | "on" | "true" | "yes" => Ok(SslMode::Require),
            _ => Err(format!("Invalid SSL mode: {}. Use: disable, prefer, require", s)),
        }
    }
}

/// Configuration de la base de données
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub ssl_mode: SslMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: "postgres".into(),
            user: "postgres".into(),
            password: None,
            ssl_mode: SslMode::Disable,
        }
    }
}

impl DatabaseConfig {
    /// Charge la configuration depuis les variables d'environnement
    ///
    /// `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASS` sont prioritaires,
    /// puis les variables libpq (`PGHOST`, `PGPORT`...).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |primary: &str, fallback: &str| lookup(primary).or_else(|| lookup(fallback));
        let defaults = Self::default();

        Self {
            host: var("DB_HOST", "PGHOST").unwrap_or(defaults.host),
            port: var("DB_PORT", "PGPORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            dbname: var("DB_NAME", "PGDATABASE").unwrap_or(defaults.dbname),
            user: var("DB_USER", "PGUSER").unwrap_or(defaults.user),
            password: var("DB_PASS", "PGPASSWORD"),
            ssl_mode: lookup("PGSSLMODE")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }

    /// Applique les options de ligne de commande par-dessus l'environnement
    pub fn apply_overrides(
        &mut self,
        host: Option<String>,
        port: Option<u16>,
        dbname: Option<String>,
        user: Option<String>,
        password: Option<String>,
        ssl: Option<SslMode>,
    ) {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(dbname) = dbname {
            self.dbname = dbname;
        }
        if let Some(user) = user {
            self.user = user;
        }
        if password.is_some() {
            self.password = password;
        }
        if let Some(ssl) = ssl {
            self.ssl_mode = ssl;
        }
    }

    /// Chaîne de connexion affichable (sans mot de passe)
    pub fn display_url(&self) -> String {
        format!(
            "postgresql://{}@{}:{}/{}",
            self.user, self.host, self.port, self.dbname
        )
    }
}

/// Charge le fichier d'environnement avant tout
///
/// `ENVFILE` désigne le fichier à lire, sinon `.env` dans le répertoire courant,
/// sinon `.env` à côté du binaire. Les variables déjà définies ne sont pas écrasées.
/// Appelé avant l'initialisation des logs: renvoie le fichier lu.
pub fn load_env() -> Option<PathBuf> {
    let candidates = env_file_candidates();
    for path in candidates {
        if !path.is_file() {
            continue;
        }
        if dotenvy::from_path(&path).is_ok() {
            return Some(path);
        }
    }
    None
}

fn env_file_candidates() -> Vec<PathBuf> {
    if let Ok(envfile) = std::env::var("ENVFILE") {
        return vec![PathBuf::from(envfile)];
    }

    let mut candidates = vec![Path::new(".env").to_path_buf()];
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join(".env"));
        }
    }
    candidates
}
