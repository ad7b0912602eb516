//! File-level migration management: naming, creation, and renumbering.
//!
//! Migrations are reversible pairs named `{version}_{description}.up.sql` and
//! `{version}_{description}.down.sql`. New files get a UTC timestamp version;
//! `fix` rewrites timestamp versions into sequential ones.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use time::OffsetDateTime;

/// Versions at or above this value are timestamps (`YYYYMMDDhhmmss`).
const TIMESTAMP_VERSION_FLOOR: i64 = 10_000_000_000_000;
const SEQUENTIAL_WIDTH: usize = 5;

const UP_TEMPLATE: &str = "-- Add up migration script here\n";
const DOWN_TEMPLATE: &str = "-- Add down migration script here\n";

/// One migration file parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub version: i64,
    pub description: String,
    pub direction: Direction,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn suffix(self) -> &'static str {
        match self {
            Direction::Up => "up.sql",
            Direction::Down => "down.sql",
        }
    }
}

impl MigrationFile {
    /// Parse `{version}_{description}.{up|down}.sql`; anything else is `None`.
    pub fn parse(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let (stem, direction) = if let Some(stem) = name.strip_suffix(".up.sql") {
            (stem, Direction::Up)
        } else if let Some(stem) = name.strip_suffix(".down.sql") {
            (stem, Direction::Down)
        } else {
            return None;
        };

        let (version, description) = stem.split_once('_')?;
        if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            version: version.parse().ok()?,
            description: description.to_string(),
            direction,
            path: path.to_path_buf(),
        })
    }

    pub fn is_timestamped(&self) -> bool {
        self.version >= TIMESTAMP_VERSION_FLOOR
    }
}

/// List every recognised migration file in `dir`, ordered by version then direction.
pub fn scan(dir: &Path) -> anyhow::Result<Vec<MigrationFile>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read migrations directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(file) = MigrationFile::parse(&entry.path()) {
            files.push(file);
        }
    }

    files.sort_by(|a, b| {
        a.version
            .cmp(&b.version)
            .then_with(|| (a.direction == Direction::Down).cmp(&(b.direction == Direction::Down)))
    });
    Ok(files)
}

/// Turn free text into a migration description: lowercase words joined by `_`.
pub fn normalize_name(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

fn timestamp_version(now: OffsetDateTime) -> i64 {
    let stamp = format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    );
    // Always 14 ASCII digits for years 1000..=9999.
    stamp.parse().unwrap_or_default()
}

fn file_name(version: &str, description: &str, direction: Direction) -> String {
    format!("{}_{}.{}", version, description, direction.suffix())
}

/// Write an empty up/down pair versioned with the current UTC time.
///
/// `kind` mirrors the `create NAME [sql]` argument; only `sql` is supported.
pub fn create(dir: &Path, name: &str, kind: Option<&str>) -> anyhow::Result<Vec<PathBuf>> {
    create_at(dir, name, kind, OffsetDateTime::now_utc())
}

fn create_at(
    dir: &Path,
    name: &str,
    kind: Option<&str>,
    now: OffsetDateTime,
) -> anyhow::Result<Vec<PathBuf>> {
    if let Some(kind) = kind {
        if kind != "sql" {
            bail!("unsupported migration type '{}'; only 'sql' is available", kind);
        }
    }

    let description = normalize_name(name);
    if description.is_empty() {
        bail!("migration name must contain at least one letter or digit");
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create migrations directory {}", dir.display()))?;

    let version = timestamp_version(now).to_string();
    let mut created = Vec::with_capacity(2);
    for (direction, template) in [(Direction::Up, UP_TEMPLATE), (Direction::Down, DOWN_TEMPLATE)] {
        let path = dir.join(file_name(&version, &description, direction));
        if path.exists() {
            bail!("migration file {} already exists", path.display());
        }
        fs::write(&path, template)
            .with_context(|| format!("failed to write {}", path.display()))?;
        created.push(path);
    }

    Ok(created)
}

/// A single rename performed by [`fix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Renumber timestamp-versioned migrations to follow the highest sequential version.
///
/// Up and down files sharing a version move together. Already sequential
/// migrations are left untouched.
pub fn fix(dir: &Path) -> anyhow::Result<Vec<Rename>> {
    let files = scan(dir)?;

    let mut next = files
        .iter()
        .filter(|file| !file.is_timestamped())
        .map(|file| file.version)
        .max()
        .unwrap_or(0)
        + 1;

    let mut by_version: BTreeMap<i64, Vec<&MigrationFile>> = BTreeMap::new();
    for file in files.iter().filter(|file| file.is_timestamped()) {
        by_version.entry(file.version).or_default().push(file);
    }

    let mut renames = Vec::new();
    for group in by_version.values() {
        let version = format!("{:0width$}", next, width = SEQUENTIAL_WIDTH);
        for file in group {
            let to = dir.join(file_name(&version, &file.description, file.direction));
            if to.exists() {
                bail!("cannot rename {}: {} already exists", file.path.display(), to.display());
            }
            renames.push(Rename {
                from: file.path.clone(),
                to,
            });
        }
        next += 1;
    }

    for rename in &renames {
        fs::rename(&rename.from, &rename.to).with_context(|| {
            format!(
                "failed to rename {} to {}",
                rename.from.display(),
                rename.to.display()
            )
        })?;
    }

    Ok(renames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "SELECT 1;\n").unwrap();
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn parses_reversible_file_names() {
        let file = MigrationFile::parse(Path::new("migrations/20240101000000_create_books.up.sql"))
            .unwrap();
        assert_eq!(file.version, 20240101000000);
        assert_eq!(file.description, "create_books");
        assert_eq!(file.direction, Direction::Up);
        assert!(file.is_timestamped());

        let file = MigrationFile::parse(Path::new("00003_add_index.down.sql")).unwrap();
        assert_eq!(file.version, 3);
        assert_eq!(file.direction, Direction::Down);
        assert!(!file.is_timestamped());
    }

    #[test]
    fn ignores_unrelated_files() {
        assert!(MigrationFile::parse(Path::new("README.md")).is_none());
        assert!(MigrationFile::parse(Path::new("create_books.up.sql")).is_none());
        assert!(MigrationFile::parse(Path::new("v1_create_books.up.sql")).is_none());
        assert!(MigrationFile::parse(Path::new("1_create_books.sql")).is_none());
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_name("Add Books Index"), "add_books_index");
        assert_eq!(normalize_name("  drop--author!! "), "drop_author");
        assert_eq!(normalize_name("???"), "");
    }

    #[test]
    fn create_writes_timestamped_pair() {
        let dir = tempfile::tempdir().unwrap();
        let created = create_at(
            dir.path(),
            "Add ISBN",
            Some("sql"),
            datetime!(2024-03-05 07:08:09 UTC),
        )
        .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(
            names(dir.path()),
            vec![
                "20240305070809_add_isbn.down.sql",
                "20240305070809_add_isbn.up.sql",
            ]
        );
        let up = fs::read_to_string(&created[0]).unwrap();
        assert!(up.starts_with("-- Add up migration script"));
    }

    #[test]
    fn create_rejects_non_sql_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let err = create(dir.path(), "seed", Some("go")).unwrap_err();
        assert!(err.to_string().contains("unsupported migration type 'go'"));
        assert!(names(dir.path()).is_empty());
    }

    #[test]
    fn create_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let now = datetime!(2024-03-05 07:08:09 UTC);
        create_at(dir.path(), "twice", None, now).unwrap();
        assert!(create_at(dir.path(), "twice", None, now).is_err());
    }

    #[test]
    fn fix_renumbers_timestamped_migrations_after_sequential_ones() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "00001_create_books.up.sql");
        touch(dir.path(), "00001_create_books.down.sql");
        touch(dir.path(), "20240305070809_add_isbn.up.sql");
        touch(dir.path(), "20240305070809_add_isbn.down.sql");
        touch(dir.path(), "20240101000000_add_index.up.sql");

        let renames = fix(dir.path()).unwrap();

        assert_eq!(renames.len(), 3);
        assert_eq!(
            names(dir.path()),
            vec![
                "00001_create_books.down.sql",
                "00001_create_books.up.sql",
                "00002_add_index.up.sql",
                "00003_add_isbn.down.sql",
                "00003_add_isbn.up.sql",
            ]
        );
    }

    #[test]
    fn fix_is_a_no_op_when_already_sequential() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "00001_create_books.up.sql");
        assert!(fix(dir.path()).unwrap().is_empty());
    }
}
