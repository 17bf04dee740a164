//! Versioned schema migrations for on-disk data.
//!
//! Each schema target (state JSON, config TOML) gets its own [`Registry`]
//! holding an ordered list of `(version, transform)` pairs. Transforms are
//! pure `bytes in, bytes out` functions so they unit-test without I/O.

use tracing::info;

use crate::error::{Error, Result};

/// The transform half of a migration: raw file bytes in, upgraded bytes out.
pub type Transform = Box<dyn Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync>;

/// A schema migration that upgrades on-disk data to [`Migration::version`].
pub struct Migration {
    /// Schema version this migration produces.
    pub version: u32,
    /// Short human-readable label for log output.
    pub description: &'static str,
    /// Transforms data from the prior version to `version`.
    pub upgrade: Transform,
}

impl Migration {
    pub fn new(
        version: u32,
        description: &'static str,
        upgrade: impl Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            version,
            description,
            upgrade: Box::new(upgrade),
        }
    }
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("description", &self.description)
            .finish()
    }
}

/// Holds the current version and migrations for a single schema target.
///
/// Each target gets its own instance so that version numbers and migration
/// lists are fully independent. The list is sorted once at registration
/// time and applied strictly in ascending version order.
#[derive(Debug, Default)]
pub struct Registry {
    /// Latest schema version this registry targets.
    pub current_version: u32,
    migrations: Vec<Migration>,
}

impl Registry {
    pub fn new(current_version: u32) -> Self {
        Self {
            current_version,
            migrations: Vec::new(),
        }
    }

    /// Registers a migration, keeping the list sorted by version.
    ///
    /// Panics if a migration with the same version is already registered;
    /// duplicate versions are a programming error that must not reach a
    /// running daemon.
    pub fn register(&mut self, m: Migration) {
        if self.migrations.iter().any(|e| e.version == m.version) {
            panic!(
                "migrate: duplicate migration version {} ({:?})",
                m.version, m.description
            );
        }
        self.migrations.push(m);
        self.migrations.sort_by_key(|m| m.version);
    }

    /// Reports whether data at `file_version` would have migrations applied.
    pub fn needs_migration(&self, file_version: u32) -> bool {
        if file_version != self.current_version {
            return true;
        }
        self.migrations.iter().any(|m| file_version < m.version)
    }

    /// Applies registered migrations sequentially where `from_version < m.version`.
    ///
    /// Returns the transformed bytes and the final version reached.
    pub fn run(&self, data: &[u8], from_version: u32) -> Result<(Vec<u8>, u32)> {
        let mut data = data.to_vec();
        let mut version = from_version;
        for m in &self.migrations {
            if version < m.version {
                info!(version = m.version, description = m.description, "applying migration");
                data = (m.upgrade)(&data).map_err(|e| {
                    Error::migration(format!("migration to v{} failed: {e}", m.version))
                })?;
                version = m.version;
            }
        }
        Ok((data, version))
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn append_marker(marker: &'static str) -> impl Fn(&[u8]) -> Result<Vec<u8>> {
        move |data: &[u8]| {
            let mut out = data.to_vec();
            out.extend_from_slice(marker.as_bytes());
            Ok(out)
        }
    }

    #[test]
    fn test_run_applies_in_ascending_order() {
        let mut r = Registry::new(3);
        // Registered out of order on purpose.
        r.register(Migration::new(3, "third", append_marker(":v3")));
        r.register(Migration::new(2, "second", append_marker(":v2")));

        let (out, version) = r.run(b"base", 1).unwrap();
        assert_eq!(out, b"base:v2:v3");
        assert_eq!(version, 3);
    }

    #[test]
    fn test_run_skips_already_applied() {
        let mut r = Registry::new(3);
        r.register(Migration::new(2, "second", append_marker(":v2")));
        r.register(Migration::new(3, "third", append_marker(":v3")));

        let (out, version) = r.run(b"base", 2).unwrap();
        assert_eq!(out, b"base:v3");
        assert_eq!(version, 3);
    }

    #[test]
    fn test_run_propagates_failure() {
        let mut r = Registry::new(2);
        r.register(Migration::new(2, "broken", |_| {
            Err(Error::migration("boom"))
        }));

        let err = r.run(b"base", 1).unwrap_err();
        assert!(err.to_string().contains("migration to v2 failed"));
    }

    #[test]
    fn test_needs_migration() {
        let mut r = Registry::new(2);
        assert!(r.needs_migration(1), "behind current");
        assert!(!r.needs_migration(2), "at current, no migrations");
        assert!(r.needs_migration(3), "ahead of current");

        r.register(Migration::new(2, "noop", |d| Ok(d.to_vec())));
        assert!(r.needs_migration(1));
    }

    #[test]
    #[should_panic(expected = "duplicate migration version")]
    fn test_register_rejects_duplicate_version() {
        let mut r = Registry::new(2);
        r.register(Migration::new(2, "first", |d| Ok(d.to_vec())));
        r.register(Migration::new(2, "second", |d| Ok(d.to_vec())));
    }

    #[test]
    fn test_empty_registry_is_identity() {
        let r = Registry::new(1);
        let (out, version) = r.run(b"unchanged", 1).unwrap();
        assert_eq!(out, b"unchanged");
        assert_eq!(version, 1);
    }
}
