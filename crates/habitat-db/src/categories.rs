use anyhow::Result;
use rusqlite::{Connection, Row};

use habitat_types::models::Category;

use crate::Database;
use crate::models::{CategoryRow, format_timestamp};
use crate::queries::OptionalExt;

impl Database {
    pub fn create_category(&self, category: &Category) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO categories (id, user_id, name, color, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    &category.id,
                    &category.user_id,
                    &category.name,
                    &category.color,
                    format_timestamp(category.created_at),
                ),
            )?;
            Ok(())
        })
    }

    /// A user's categories, ordered by name.
    pub fn list_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, color, created_at FROM categories
                 WHERE user_id = ?1 ORDER BY name",
            )?;
            let rows = stmt
                .query_map([user_id], category_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(CategoryRow::into_category).collect()
        })
    }

    pub fn get_category(&self, user_id: &str, id: &str) -> Result<Option<Category>> {
        self.with_conn(|conn| query_category(conn, user_id, id))
    }

    /// Renames and recolors a category. Habits filed under it take the new
    /// color too. Returns false if the user has no such category.
    pub fn update_category(&self, user_id: &str, id: &str, name: &str, color: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE categories SET name = ?3, color = ?4 WHERE id = ?1 AND user_id = ?2",
                (id, user_id, name, color),
            )?;
            if changed == 0 {
                return Ok(false);
            }
            tx.execute(
                "UPDATE habits SET color = ?2 WHERE category_id = ?1",
                (id, color),
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Deletes a category. Its habits are kept and detached.
    pub fn delete_category(&self, user_id: &str, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if query_category(&tx, user_id, id)?.is_none() {
                return Ok(false);
            }
            tx.execute("UPDATE habits SET category_id = NULL WHERE category_id = ?1", [id])?;
            tx.execute("DELETE FROM categories WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(true)
        })
    }
}

fn query_category(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Category>> {
    let row = conn
        .query_row(
            "SELECT id, user_id, name, color, created_at FROM categories WHERE id = ?1 AND user_id = ?2",
            (id, user_id),
            category_row,
        )
        .optional()?;
    row.map(CategoryRow::into_category).transpose()
}

fn category_row(row: &Row<'_>) -> rusqlite::Result<CategoryRow> {
    Ok(CategoryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        created_at: row.get(4)?,
    })
}
