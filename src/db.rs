use sqlx::SqlitePool;
use anyhow::Result;

/// Run database migrations / 运行数据库迁移
///
/// Content tables back the SQLite content store; `job_runs` backs the once-only job ledger.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            text TEXT NOT NULL,
            slug TEXT NOT NULL,
            category_id TEXT,
            created TEXT NOT NULL,
            modified TEXT,
            FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            subtitle TEXT,
            text TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            created TEXT NOT NULL,
            modified TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            nid INTEGER NOT NULL UNIQUE,
            title TEXT NOT NULL,
            text TEXT NOT NULL,
            hidden INTEGER NOT NULL DEFAULT 0,
            password TEXT,
            public_at TEXT,
            created TEXT NOT NULL,
            modified TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 定时任务执行标记（按任务名 + 周期）
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_runs (
            job TEXT NOT NULL,
            cycle TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            PRIMARY KEY (job, cycle)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_notes_created ON notes(created)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed");

    Ok(())
}
