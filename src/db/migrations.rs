use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use rusqlite::Connection;

const MIGRATIONS_DIR: &str = "migrations";

/// Apply every `migrations/*.sql` file in filename order, once each.
/// Applied files are recorded by name in `_migrations`. The schema and the
/// seeded slot catalog both live in these files, so a missing directory is
/// fatal.
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    let dir = Path::new(MIGRATIONS_DIR);
    if !dir.is_dir() {
        bail!("migrations directory not found at {MIGRATIONS_DIR}/");
    }

    let mut names: Vec<String> = fs::read_dir(dir)
        .context("failed to read migrations directory")?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".sql"))
        .collect();
    names.sort();

    for name in names {
        if is_applied(conn, &name)? {
            continue;
        }

        let sql = fs::read_to_string(dir.join(&name))
            .with_context(|| format!("failed to read migration file: {name}"))?;
        conn.execute_batch(&sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;
        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [&name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!(migration = %name, "applied migration");
    }

    Ok(())
}

fn is_applied(conn: &Connection, name: &str) -> anyhow::Result<bool> {
    let applied: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .context("failed to check migration status")?;
    Ok(applied)
}
