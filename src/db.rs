use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use uuid::Uuid;

use crate::models::{
    AuthUser, Category, NewCategory, NewTransaction, Profile, Transaction, TransactionEdit, TxKind,
};

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn init_db(path: &Path) -> std::result::Result<DbPool, crate::error::AppError> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::new(manager)?;
    {
        let conn = pool.get()?;
        run_migrations(&conn)?;
    }
    Ok(pool)
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            token TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            nama TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL CHECK(type IN ('Pengeluaran', 'Pemasukan')),
            user_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            category TEXT NOT NULL,
            amount INTEGER NOT NULL,
            description TEXT,
            user_id TEXT NOT NULL,
            type TEXT NOT NULL CHECK(type IN ('Pengeluaran', 'Pemasukan')),
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS transactions_user_idx ON transactions(user_id);
        CREATE INDEX IF NOT EXISTS categories_user_idx ON categories(user_id);
        ",
    )?;
    ensure_column(conn, "transactions", "bukti_url", "TEXT")?;
    Ok(())
}

fn ensure_column(conn: &Connection, table: &str, column: &str, column_type: &str) -> Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for row in rows {
        if row? == column {
            return Ok(());
        }
    }
    conn.execute(
        &format!("ALTER TABLE {table} ADD COLUMN {column} {column_type}"),
        [],
    )?;
    Ok(())
}

impl ToSql for TxKind {
    fn to_sql(&self) -> Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TxKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        TxKind::parse(text).ok_or(FromSqlError::InvalidType)
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// auth
// ---------------------------------------------------------------------------

pub fn insert_user(conn: &Connection, email: &str, password_hash: &str, created_at: &str) -> Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, email, password_hash, created_at],
    )?;
    Ok(id)
}

pub fn email_taken(conn: &Connection, email: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        params![email],
        |row| row.get::<_, i64>(0),
    )
    .map(|value| value == 1)
}

pub fn user_credentials(conn: &Connection, email: &str) -> Result<Option<(AuthUser, String)>> {
    conn.query_row(
        "
        SELECT id, email, password_hash
        FROM users
        WHERE email = ?1
        ",
        params![email],
        |row| {
            Ok((
                AuthUser {
                    id: row.get(0)?,
                    email: row.get(1)?,
                },
                row.get(2)?,
            ))
        },
    )
    .optional()
}

pub fn create_session(conn: &Connection, user_id: &str, token: &str, created_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (user_id, token, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, token, created_at],
    )?;
    Ok(())
}

pub fn user_by_session(conn: &Connection, token: &str) -> Result<Option<AuthUser>> {
    conn.query_row(
        "
        SELECT u.id, u.email
        FROM sessions s
        JOIN users u ON s.user_id = u.id
        WHERE s.token = ?1
        ",
        params![token],
        |row| {
            Ok(AuthUser {
                id: row.get(0)?,
                email: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn delete_session(conn: &Connection, token: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

pub fn prune_sessions(conn: &Connection, user_id: &str, keep: i64) -> Result<()> {
    conn.execute(
        "
        DELETE FROM sessions
        WHERE user_id = ?1
          AND id NOT IN (
            SELECT id
            FROM sessions
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
          )
        ",
        params![user_id, keep],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// profiles
// ---------------------------------------------------------------------------

pub fn insert_profile(conn: &Connection, profile: &Profile) -> Result<()> {
    conn.execute(
        "INSERT INTO profiles (id, nama) VALUES (?1, ?2)",
        params![profile.id, profile.name],
    )?;
    Ok(())
}

pub fn profile_by_id(conn: &Connection, id: &str) -> Result<Option<Profile>> {
    conn.query_row(
        "SELECT id, nama FROM profiles WHERE id = ?1",
        params![id],
        |row| {
            Ok(Profile {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}

// ---------------------------------------------------------------------------
// categories
// ---------------------------------------------------------------------------

pub fn list_categories(conn: &Connection, user_id: &str) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, name, type, user_id
        FROM categories
        WHERE user_id = ?1
        ORDER BY type, name
        ",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            user_id: row.get(3)?,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn insert_category(conn: &Connection, category: &NewCategory) -> Result<Category> {
    let id = new_id();
    conn.execute(
        "INSERT INTO categories (id, name, type, user_id) VALUES (?1, ?2, ?3, ?4)",
        params![id, category.name, category.kind, category.user_id],
    )?;
    Ok(Category {
        id,
        name: category.name.clone(),
        kind: category.kind,
        user_id: category.user_id.clone(),
    })
}

pub fn rename_category(conn: &Connection, id: &str, user_id: &str, name: &str) -> Result<usize> {
    conn.execute(
        "UPDATE categories SET name = ?1 WHERE id = ?2 AND user_id = ?3",
        params![name, id, user_id],
    )
}

pub fn delete_category(conn: &Connection, id: &str, user_id: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )
}

// ---------------------------------------------------------------------------
// transactions
// ---------------------------------------------------------------------------

fn transaction_from_row(row: &Row<'_>) -> Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        category: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        user_id: row.get(5)?,
        kind: row.get(6)?,
        receipt_url: row.get(7)?,
    })
}

pub fn list_transactions(conn: &Connection, user_id: &str) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "
        SELECT id, date, category, amount, description, user_id, type, bukti_url
        FROM transactions
        WHERE user_id = ?1
        ORDER BY date DESC, created_at DESC
        ",
    )?;
    let rows = stmt.query_map(params![user_id], transaction_from_row)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn insert_transaction(conn: &Connection, tx: &NewTransaction, created_at: &str) -> Result<Transaction> {
    let id = new_id();
    conn.execute(
        "
        INSERT INTO transactions (id, date, category, amount, description, user_id, type, bukti_url, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ",
        params![
            id,
            tx.date,
            tx.category,
            tx.amount,
            tx.description,
            tx.user_id,
            tx.kind,
            tx.receipt_url,
            created_at
        ],
    )?;
    conn.query_row(
        "
        SELECT id, date, category, amount, description, user_id, type, bukti_url
        FROM transactions
        WHERE id = ?1
        ",
        params![id],
        transaction_from_row,
    )
}

pub fn update_transaction(
    conn: &Connection,
    id: &str,
    user_id: &str,
    edit: &TransactionEdit,
) -> Result<usize> {
    conn.execute(
        "
        UPDATE transactions
        SET date = ?1, category = ?2, amount = ?3, description = ?4
        WHERE id = ?5 AND user_id = ?6
        ",
        params![edit.date, edit.category, edit.amount, edit.description, id, user_id],
    )
}

pub fn delete_transaction(conn: &Connection, id: &str, user_id: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )
}

#[cfg(test)]
#[path = "db_test.rs"]
mod tests;
