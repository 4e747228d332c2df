use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                name        TEXT NOT NULL,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS habits (
                id                      TEXT PRIMARY KEY,
                user_id                 TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name                    TEXT NOT NULL,
                description             TEXT,
                color                   TEXT NOT NULL DEFAULT 'purple',
                frequency               TEXT NOT NULL,
                active_days             TEXT,
                start_date              TEXT,
                end_date                TEXT,
                notifications_enabled   INTEGER NOT NULL DEFAULT 1,
                created_at              TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_habits_user
                ON habits(user_id, created_at);

            CREATE TABLE IF NOT EXISTS reminders (
                habit_id    TEXT PRIMARY KEY REFERENCES habits(id) ON DELETE CASCADE,
                at_time     TEXT NOT NULL,
                timezone    TEXT
            );

            CREATE TABLE IF NOT EXISTS habit_logs (
                id          TEXT PRIMARY KEY,
                habit_id    TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
                date        TEXT NOT NULL,
                done        INTEGER NOT NULL DEFAULT 1,
                UNIQUE(habit_id, date)
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                habit_id        TEXT,
                kind            TEXT NOT NULL,
                payload         TEXT NOT NULL,
                reminder_day    TEXT,
                read            INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notifications_reminder
                ON notifications(user_id, habit_id, reminder_day);

            CREATE INDEX IF NOT EXISTS idx_notifications_user
                ON notifications(user_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (categories)");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS categories (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                color       TEXT NOT NULL DEFAULT 'purple',
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, name)
            );

            ALTER TABLE habits
                ADD COLUMN category_id TEXT REFERENCES categories(id) ON DELETE SET NULL;

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
