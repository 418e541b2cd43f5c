//! Decoy path registry.
//!
//! Requests to paths that only scanners probe are answered with a
//! plausible 200 so the prober cannot tell it was detected, while the
//! identity is blocked outright.

use std::collections::HashMap;

use tracing::info;

/// What a decoy path pretends to be; shapes the fake response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoyKind {
    /// Environment files like `/.env`.
    EnvFile,
    /// Backup archives and database dumps.
    Archive,
    /// CMS admin consoles.
    CmsAdmin,
    /// Version-control metadata.
    VcsMetadata,
    /// Credential and key files.
    CredentialFile,
}

/// Success-shaped response served for a decoy hit.
///
/// Always status 200 so detection is never revealed.
#[derive(Debug, Clone)]
pub struct DecoyResponse {
    /// Always 200.
    pub status: u16,
    /// Content type for the fake body.
    pub content_type: &'static str,
    /// The fake body itself.
    pub body: String,
}

/// Lookup table of decoy paths.
#[derive(Debug, Clone)]
pub struct HoneypotRegistry {
    paths: HashMap<String, DecoyKind>,
}

impl Default for HoneypotRegistry {
    fn default() -> Self {
        Self::with_default_paths()
    }
}

impl HoneypotRegistry {
    /// Registry preloaded with commonly-probed sensitive paths.
    #[must_use]
    pub fn with_default_paths() -> Self {
        let mut registry = Self {
            paths: HashMap::new(),
        };
        for (path, kind) in [
            ("/.env", DecoyKind::EnvFile),
            ("/.env.local", DecoyKind::EnvFile),
            ("/.env.production", DecoyKind::EnvFile),
            ("/config.env", DecoyKind::EnvFile),
            ("/backup.zip", DecoyKind::Archive),
            ("/backup.sql", DecoyKind::Archive),
            ("/db.sql", DecoyKind::Archive),
            ("/dump.sql", DecoyKind::Archive),
            ("/site.tar.gz", DecoyKind::Archive),
            ("/wp-admin", DecoyKind::CmsAdmin),
            ("/wp-login.php", DecoyKind::CmsAdmin),
            ("/phpmyadmin", DecoyKind::CmsAdmin),
            ("/administrator", DecoyKind::CmsAdmin),
            ("/.git/config", DecoyKind::VcsMetadata),
            ("/.git/HEAD", DecoyKind::VcsMetadata),
            ("/.svn/entries", DecoyKind::VcsMetadata),
            ("/.aws/credentials", DecoyKind::CredentialFile),
            ("/id_rsa", DecoyKind::CredentialFile),
            ("/.ssh/id_rsa", DecoyKind::CredentialFile),
            ("/credentials.json", DecoyKind::CredentialFile),
        ] {
            registry.register(path, kind);
        }
        registry
    }

    /// Empty registry for custom path sets.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            paths: HashMap::new(),
        }
    }

    /// Register a decoy path.
    pub fn register(&mut self, path: impl Into<String>, kind: DecoyKind) {
        self.paths.insert(path.into(), kind);
    }

    /// Look up a request path; exact match only.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<DecoyKind> {
        self.paths.get(path).copied()
    }

    /// Number of registered decoys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no decoys are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Build the fake response for a hit and log the probe.
    #[must_use]
    pub fn respond(&self, path: &str, kind: DecoyKind) -> DecoyResponse {
        info!(path, kind = ?kind, "honeypot path probed");
        match kind {
            DecoyKind::EnvFile => DecoyResponse {
                status: 200,
                content_type: "text/plain",
                body: fake_env_body(),
            },
            DecoyKind::Archive | DecoyKind::CredentialFile => DecoyResponse {
                status: 200,
                content_type: "application/octet-stream",
                body: String::new(),
            },
            DecoyKind::CmsAdmin => DecoyResponse {
                status: 200,
                content_type: "text/html",
                body: fake_cms_body(),
            },
            DecoyKind::VcsMetadata => DecoyResponse {
                status: 200,
                content_type: "text/plain",
                body: fake_git_config_body(),
            },
        }
    }
}

fn fake_env_body() -> String {
    [
        "APP_ENV=production",
        "APP_DEBUG=false",
        "DB_HOST=127.0.0.1",
        "DB_PORT=5432",
        "DB_USER=app",
        "DB_PASSWORD=",
        "CACHE_DRIVER=redis",
    ]
    .join("\n")
}

fn fake_cms_body() -> String {
    "<!DOCTYPE html>\n<html><head><title>Log In</title></head>\
     <body><form method=\"post\"><input name=\"log\" type=\"text\">\
     <input name=\"pwd\" type=\"password\"><button>Log In</button>\
     </form></body></html>"
        .to_string()
}

fn fake_git_config_body() -> String {
    "[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n\tbare = false\n"
        .to_string()
}
