//! Versioned migration runner on top of `sqlx::migrate`.
//!
//! `up`, `down-to` and `reset` delegate straight to [`Migrator`]; the
//! step-wise commands (`up-by-one`, `up-to`, `redo`) apply individual
//! migrations through the [`Migrate`] connection API under the same
//! advisory lock the migrator uses.

pub mod files;

use std::path::Path;

use anyhow::{bail, Context};
use sqlx::migrate::{Migrate, MigrateError, Migration, Migrator};
use sqlx::postgres::PgConnection;
use sqlx::PgPool;
use time::OffsetDateTime;

/// Applied/pending state of one migration version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i64,
    pub description: String,
    pub applied_at: Option<OffsetDateTime>,
}

/// Versions from `local` not yet in `applied`, ascending, optionally capped at `up_to`.
pub fn pending_versions(local: &[i64], applied: &[i64], up_to: Option<i64>) -> Vec<i64> {
    let mut pending: Vec<i64> = local
        .iter()
        .copied()
        .filter(|version| !applied.contains(version))
        .filter(|version| up_to.map_or(true, |cap| *version <= cap))
        .collect();
    pending.sort_unstable();
    pending.dedup();
    pending
}

/// Target version for rolling back the latest applied migration, or `None` if nothing is applied.
pub fn previous_version(applied: &[i64]) -> Option<i64> {
    let mut applied = applied.to_vec();
    applied.sort_unstable();
    applied.pop()?;
    Some(applied.pop().unwrap_or(0))
}

/// Combine the apply and unlock outcomes; an apply error wins over an unlock error.
fn settle(applied: anyhow::Result<()>, unlocked: Result<(), MigrateError>) -> anyhow::Result<()> {
    match (applied, unlocked) {
        (Err(err), Err(unlock_err)) => {
            tracing::warn!(
                target: "bookshelf-db",
                error = %unlock_err,
                "failed to release migration lock"
            );
            Err(err)
        }
        (Err(err), Ok(())) => Err(err),
        (Ok(()), unlocked) => unlocked.context("failed to release migration lock"),
    }
}

pub struct MigrationRunner {
    migrator: Migrator,
    pool: PgPool,
}

impl MigrationRunner {
    /// Resolve migrations from `dir` against `pool`.
    pub async fn open(dir: &Path, pool: PgPool) -> anyhow::Result<Self> {
        let migrator = Migrator::new(dir.to_path_buf())
            .await
            .with_context(|| format!("failed to load migrations from {}", dir.display()))?;

        tracing::debug!(
            target: "bookshelf-db",
            dir = %dir.display(),
            count = migrator.iter().count(),
            "migrations resolved"
        );

        Ok(Self { migrator, pool })
    }

    fn up_migrations(&self) -> impl Iterator<Item = &Migration> {
        self.migrator
            .iter()
            .filter(|migration| !migration.migration_type.is_down_migration())
    }

    fn local_versions(&self) -> Vec<i64> {
        self.up_migrations().map(|migration| migration.version).collect()
    }

    fn find_up(&self, version: i64) -> anyhow::Result<&Migration> {
        self.up_migrations()
            .find(|migration| migration.version == version)
            .with_context(|| format!("migration {} not found", version))
    }

    async fn applied_versions(&self) -> anyhow::Result<Vec<i64>> {
        let mut conn = self.pool.acquire().await?;
        conn.ensure_migrations_table().await?;
        let mut versions: Vec<i64> = conn
            .list_applied_migrations()
            .await?
            .into_iter()
            .map(|applied| applied.version)
            .collect();
        versions.sort_unstable();
        Ok(versions)
    }

    /// Apply every pending migration.
    pub async fn up(&self) -> anyhow::Result<Vec<i64>> {
        let pending = pending_versions(&self.local_versions(), &self.applied_versions().await?, None);
        self.migrator.run(&self.pool).await?;
        Ok(pending)
    }

    /// Apply only the next pending migration.
    pub async fn up_by_one(&self) -> anyhow::Result<Option<i64>> {
        let pending = pending_versions(&self.local_versions(), &self.applied_versions().await?, None);
        let Some(&next) = pending.first() else {
            return Ok(None);
        };
        self.apply(&[next]).await?;
        Ok(Some(next))
    }

    /// Apply pending migrations up to and including `version`.
    pub async fn up_to(&self, version: i64) -> anyhow::Result<Vec<i64>> {
        if !self.local_versions().contains(&version) {
            bail!("migration {} not found", version);
        }
        let pending = pending_versions(
            &self.local_versions(),
            &self.applied_versions().await?,
            Some(version),
        );
        self.apply(&pending).await?;
        Ok(pending)
    }

    /// Roll back the latest applied migration.
    pub async fn down(&self) -> anyhow::Result<Option<i64>> {
        let applied = self.applied_versions().await?;
        let Some(target) = previous_version(&applied) else {
            return Ok(None);
        };
        let latest = applied.last().copied();
        self.migrator.undo(&self.pool, target).await?;
        Ok(latest)
    }

    /// Roll back every applied migration above `version`.
    pub async fn down_to(&self, version: i64) -> anyhow::Result<Vec<i64>> {
        let reverted: Vec<i64> = self
            .applied_versions()
            .await?
            .into_iter()
            .rev()
            .filter(|applied| *applied > version)
            .collect();
        self.migrator.undo(&self.pool, version).await?;
        Ok(reverted)
    }

    /// Roll back and re-apply the latest migration.
    pub async fn redo(&self) -> anyhow::Result<i64> {
        let applied = self.applied_versions().await?;
        let (Some(target), Some(&latest)) = (previous_version(&applied), applied.last()) else {
            bail!("no migrations have been applied");
        };
        self.migrator.undo(&self.pool, target).await?;
        self.apply(&[latest]).await?;
        Ok(latest)
    }

    /// Roll back all applied migrations.
    pub async fn reset(&self) -> anyhow::Result<Vec<i64>> {
        self.down_to(0).await
    }

    /// Every local migration with the time it was applied, if it was.
    pub async fn status(&self) -> anyhow::Result<Vec<MigrationStatus>> {
        let mut conn = self.pool.acquire().await?;
        conn.ensure_migrations_table().await?;

        let installed: Vec<(i64, OffsetDateTime)> = sqlx::query_as(
            "SELECT version, installed_on FROM _sqlx_migrations WHERE success ORDER BY version",
        )
        .fetch_all(&mut *conn)
        .await
        .context("failed to read migration history")?;

        Ok(self
            .up_migrations()
            .map(|migration| MigrationStatus {
                version: migration.version,
                description: migration.description.to_string(),
                applied_at: installed
                    .iter()
                    .find(|(version, _)| *version == migration.version)
                    .map(|(_, at)| *at),
            })
            .collect())
    }

    /// Highest applied version, or 0 when the database is empty.
    pub async fn version(&self) -> anyhow::Result<i64> {
        Ok(self.applied_versions().await?.last().copied().unwrap_or(0))
    }

    async fn apply(&self, versions: &[i64]) -> anyhow::Result<()> {
        if versions.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.acquire().await?;
        conn.ensure_migrations_table().await?;
        conn.lock().await?;
        let applied = self.apply_locked(&mut *conn, versions).await;
        let unlocked = conn.unlock().await;
        settle(applied, unlocked)
    }

    async fn apply_locked(&self, conn: &mut PgConnection, versions: &[i64]) -> anyhow::Result<()> {
        if let Some(dirty) = conn.dirty_version().await? {
            bail!("migration {} is partially applied; resolve it by hand", dirty);
        }

        for applied in conn.list_applied_migrations().await? {
            if let Ok(local) = self.find_up(applied.version) {
                if local.checksum != applied.checksum {
                    bail!(
                        "migration {} was previously applied but has been modified",
                        applied.version
                    );
                }
            }
        }

        for &version in versions {
            let migration = self.find_up(version)?;
            let elapsed = conn.apply(migration).await?;
            tracing::info!(
                target: "bookshelf-db",
                version,
                description = %migration.description,
                elapsed_ms = elapsed.as_millis() as u64,
                "migration applied"
            );
        }

        Ok(())
    }
}
