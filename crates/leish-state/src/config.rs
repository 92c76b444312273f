//! Store configuration

use std::path::PathBuf;

/// Default namespace for every backend
pub const DEFAULT_NAMESPACE: &str = "leishmaniapp";

/// Default database for every backend
pub const DEFAULT_DATABASE: &str = "main";

/// Default on-disk location when nothing else is configured
pub const DEFAULT_LOCAL_PATH: &str = ".leishmaniapp/db";

/// Which SurrealDB backend a [`crate::SurrealSamplesRepository`] opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Volatile `mem://` store
    Memory,

    /// Embedded `surrealkv://` store at `path`
    Local { path: PathBuf },

    /// Remote server (e.g. `wss://...`)
    Remote {
        endpoint: String,
        username: String,
        password: String,
        namespace: String,
        database: String,
        /// Sign in as root (true) or as a database user (false)
        is_root: bool,
    },
}

impl StoreConfig {
    /// Local store at `path`.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        StoreConfig::Local { path: path.into() }
    }

    /// Remote store with a database user and default namespace/database.
    pub fn remote(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        StoreConfig::Remote {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            is_root: false,
        }
    }

    /// Set custom namespace (remote only)
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        if let StoreConfig::Remote { namespace, .. } = &mut self {
            *namespace = ns.into();
        }
        self
    }

    /// Set custom database (remote only)
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        if let StoreConfig::Remote { database, .. } = &mut self {
            *database = db.into();
        }
        self
    }

    /// Set whether this is a root user (remote only)
    pub fn with_root(mut self, root: bool) -> Self {
        if let StoreConfig::Remote { is_root, .. } = &mut self {
            *is_root = root;
        }
        self
    }

    /// Create from environment variables
    ///
    /// A remote store is used when all of these are set:
    /// - LEISH_DB_ENDPOINT
    /// - LEISH_DB_USERNAME
    /// - LEISH_DB_PASSWORD
    /// - LEISH_DB_NAMESPACE (optional, default: "leishmaniapp")
    /// - LEISH_DB_DATABASE (optional, default: "main")
    /// - LEISH_DB_ROOT (optional, default: "false")
    ///
    /// Otherwise a local store at LEISH_DB_PATH (default `.leishmaniapp/db`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let remote = (|| {
            let endpoint = var("LEISH_DB_ENDPOINT")?;
            let username = var("LEISH_DB_USERNAME")?;
            let password = var("LEISH_DB_PASSWORD")?;
            Some(StoreConfig::Remote {
                endpoint,
                username,
                password,
                namespace: var("LEISH_DB_NAMESPACE")
                    .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
                database: var("LEISH_DB_DATABASE")
                    .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
                is_root: var("LEISH_DB_ROOT")
                    .map(|v| v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false),
            })
        })();

        remote.unwrap_or_else(|| {
            StoreConfig::local(var("LEISH_DB_PATH").unwrap_or_else(|| DEFAULT_LOCAL_PATH.to_string()))
        })
    }

    /// Connection URL understood by `surrealdb::engine::any::connect`.
    pub fn url(&self) -> String {
        match self {
            StoreConfig::Memory => "mem://".to_string(),
            StoreConfig::Local { path } => format!("surrealkv://{}", path.display()),
            StoreConfig::Remote { endpoint, .. } => endpoint.clone(),
        }
    }

    /// `(namespace, database)` to select after connecting.
    pub fn scope(&self) -> (&str, &str) {
        match self {
            StoreConfig::Remote {
                namespace,
                database,
                ..
            } => (namespace, database),
            _ => (DEFAULT_NAMESPACE, DEFAULT_DATABASE),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::local(DEFAULT_LOCAL_PATH)
    }
}
