//! # Database
//!
//! SQLite storage for users, emojis, their node assignments and usage events.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Emoji catalogue and usage events, `EmojiStore` trait for the bot core
//! - 1.0.0: Initial sqlite storage

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use sqlite::{Connection, State};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One emoji as stored, with the nodes it is enabled on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiRecord {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub description: String,
    pub nodes: BTreeSet<String>,
}

/// Storage operations the bot core depends on
#[async_trait]
pub trait EmojiStore: Send + Sync {
    /// All emojis enabled on a node
    async fn fetch_enabled_emojis(&self, node: &str) -> Result<Vec<EmojiRecord>>;

    /// Resolve a display name to a user id
    async fn find_user_id(&self, username: &str) -> Result<Option<i64>>;

    /// Record that a user invoked an emoji on a node
    async fn append_usage(&self, user_id: i64, emoji_id: i64, node: &str) -> Result<()>;
}

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS emojis (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        url TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    );
    CREATE TABLE IF NOT EXISTS emoji_nodes (
        emoji_id INTEGER NOT NULL REFERENCES emojis(id) ON DELETE CASCADE,
        node TEXT NOT NULL,
        PRIMARY KEY (emoji_id, node)
    );
    CREATE TABLE IF NOT EXISTS emoji_usage (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        emoji_id INTEGER NOT NULL REFERENCES emojis(id) ON DELETE CASCADE,
        node TEXT NOT NULL,
        used_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_emoji_nodes_node ON emoji_nodes(node);
";

/// Shared sqlite handle
#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database and apply the schema
    pub async fn new(path: &str) -> Result<Self> {
        let connection = Connection::open(path)
            .with_context(|| format!("Failed to open database {path}"))?;
        connection.execute(SCHEMA).context("Failed to apply schema")?;
        info!("Database ready at {path}");
        Ok(Database {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Register a user, returning its id (existing users keep theirs)
    pub async fn add_user(&self, username: &str) -> Result<i64> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare("INSERT OR IGNORE INTO users (username) VALUES (?)")?;
        stmt.bind((1, username))?;
        stmt.next()?;
        drop(stmt);

        Self::user_id(&conn, username)?
            .ok_or_else(|| anyhow!("User {username} missing after insert"))
    }

    /// Create an emoji and its node assignments in one transaction
    pub async fn create_emoji(
        &self,
        name: &str,
        url: &str,
        description: &str,
        nodes: &[String],
    ) -> Result<i64> {
        let conn = self.connection.lock().await;
        let id = Self::in_transaction(&conn, |conn| {
            Self::insert_emoji(conn, name, url, description, nodes)
        })?;
        debug!("Created emoji {name} (id {id}) on {} node(s)", nodes.len());
        Ok(id)
    }

    /// Run `body` inside `BEGIN IMMEDIATE`/`COMMIT`
    ///
    /// Any failure, including a failed commit, rolls back so the connection
    /// never keeps a transaction open. The first error is the one returned.
    fn in_transaction<T>(
        conn: &Connection,
        body: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        conn.execute("BEGIN IMMEDIATE")?;

        let result = body(conn).and_then(|value| {
            conn.execute("COMMIT").context("Failed to commit transaction")?;
            Ok(value)
        });

        if result.is_err() {
            if let Err(e) = conn.execute("ROLLBACK") {
                warn!("Rollback failed: {e}");
            }
        }
        result
    }

    fn insert_emoji(
        conn: &Connection,
        name: &str,
        url: &str,
        description: &str,
        nodes: &[String],
    ) -> Result<i64> {
        let mut stmt =
            conn.prepare("INSERT INTO emojis (name, url, description) VALUES (?, ?, ?)")?;
        stmt.bind((1, name))?;
        stmt.bind((2, url))?;
        stmt.bind((3, description))?;
        stmt.next()
            .with_context(|| format!("Failed to insert emoji {name}"))?;
        drop(stmt);

        let mut stmt = conn.prepare("SELECT last_insert_rowid()")?;
        stmt.next()?;
        let id = stmt.read::<i64, _>(0)?;
        drop(stmt);

        for node in nodes {
            let mut stmt =
                conn.prepare("INSERT OR IGNORE INTO emoji_nodes (emoji_id, node) VALUES (?, ?)")?;
            stmt.bind((1, id))?;
            stmt.bind((2, node.as_str()))?;
            stmt.next()?;
        }
        Ok(id)
    }

    /// Delete an emoji by name, returning whether it existed
    pub async fn delete_emoji(&self, name: &str) -> Result<bool> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare("DELETE FROM emojis WHERE name = ?")?;
        stmt.bind((1, name))?;
        stmt.next()?;
        drop(stmt);
        Ok(conn.change_count() > 0)
    }

    /// Number of usage events recorded for an emoji
    pub async fn usage_count(&self, emoji_id: i64) -> Result<i64> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare("SELECT COUNT(*) FROM emoji_usage WHERE emoji_id = ?")?;
        stmt.bind((1, emoji_id))?;
        stmt.next()?;
        Ok(stmt.read::<i64, _>(0)?)
    }

    fn user_id(conn: &Connection, username: &str) -> Result<Option<i64>> {
        let mut stmt = conn.prepare("SELECT id FROM users WHERE username = ?")?;
        stmt.bind((1, username))?;
        if let State::Row = stmt.next()? {
            Ok(Some(stmt.read::<i64, _>(0)?))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl EmojiStore for Database {
    async fn fetch_enabled_emojis(&self, node: &str) -> Result<Vec<EmojiRecord>> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "SELECT e.id, e.name, e.url, e.description
             FROM emojis e
             JOIN emoji_nodes n ON n.emoji_id = e.id
             WHERE n.node = ?
             ORDER BY e.name",
        )?;
        stmt.bind((1, node))?;

        let mut records = Vec::new();
        while let State::Row = stmt.next()? {
            records.push(EmojiRecord {
                id: stmt.read::<i64, _>(0)?,
                name: stmt.read::<String, _>(1)?,
                url: stmt.read::<String, _>(2)?,
                description: stmt.read::<String, _>(3)?,
                nodes: BTreeSet::new(),
            });
        }
        drop(stmt);

        for record in &mut records {
            let mut stmt = conn.prepare("SELECT node FROM emoji_nodes WHERE emoji_id = ?")?;
            stmt.bind((1, record.id))?;
            while let State::Row = stmt.next()? {
                record.nodes.insert(stmt.read::<String, _>(0)?);
            }
        }

        Ok(records)
    }

    async fn find_user_id(&self, username: &str) -> Result<Option<i64>> {
        let conn = self.connection.lock().await;
        Self::user_id(&conn, username)
    }

    async fn append_usage(&self, user_id: i64, emoji_id: i64, node: &str) -> Result<()> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(
            "INSERT INTO emoji_usage (user_id, emoji_id, node, used_at) VALUES (?, ?, ?, ?)",
        )?;
        stmt.bind((1, user_id))?;
        stmt.bind((2, emoji_id))?;
        stmt.bind((3, node))?;
        stmt.bind((4, Utc::now().to_rfc3339().as_str()))?;
        stmt.next()?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_create_and_fetch_by_node() {
        let (_dir, db) = test_db().await;
        db.create_emoji(
            "wave",
            "https://cdn.example.com/wave.png",
            "waving hand",
            &["vm1".to_string(), "vm2".to_string()],
        )
        .await
        .unwrap();
        db.create_emoji("cat", "https://cdn.example.com/cat.png", "", &["vm2".to_string()])
            .await
            .unwrap();

        let vm1 = db.fetch_enabled_emojis("vm1").await.unwrap();
        assert_eq!(vm1.len(), 1);
        assert_eq!(vm1[0].name, "wave");
        assert!(vm1[0].nodes.contains("vm2"));

        let vm2 = db.fetch_enabled_emojis("vm2").await.unwrap();
        let names: Vec<_> = vm2.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["cat", "wave"]);

        assert!(db.fetch_enabled_emojis("vm3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_emoji_rolls_back() {
        let (_dir, db) = test_db().await;
        db.create_emoji("wave", "u", "", &["vm1".to_string()])
            .await
            .unwrap();
        assert!(db
            .create_emoji("wave", "u2", "", &["vm2".to_string()])
            .await
            .is_err());

        // No stray assignment from the failed insert
        assert!(db.fetch_enabled_emojis("vm2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_no_open_transaction() {
        let (_dir, db) = test_db().await;
        {
            let conn = db.connection.lock().await;
            conn.execute(
                "CREATE TABLE parent (id INTEGER PRIMARY KEY);
                 CREATE TABLE child (
                     parent_id INTEGER REFERENCES parent(id) DEFERRABLE INITIALLY DEFERRED
                 );",
            )
            .unwrap();

            // The deferred foreign key is only checked at COMMIT
            let err = Database::in_transaction(&conn, |c| {
                c.execute("INSERT INTO child (parent_id) VALUES (42)")?;
                Ok(())
            })
            .unwrap_err();
            assert!(format!("{err:#}").contains("commit"));

            let mut stmt = conn.prepare("SELECT COUNT(*) FROM child").unwrap();
            stmt.next().unwrap();
            assert_eq!(stmt.read::<i64, _>(0).unwrap(), 0);
        }

        // A leaked transaction would make this BEGIN fail
        db.create_emoji("wave", "u", "", &["vm1".to_string()])
            .await
            .unwrap();
        assert_eq!(db.fetch_enabled_emojis("vm1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_after_failed_create() {
        let (_dir, db) = test_db().await;
        db.create_emoji("wave", "u", "", &[]).await.unwrap();
        assert!(db.create_emoji("wave", "u", "", &[]).await.is_err());
        db.create_emoji("cat", "u", "", &["vm1".to_string()])
            .await
            .unwrap();
        assert_eq!(db.fetch_enabled_emojis("vm1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_emoji() {
        let (_dir, db) = test_db().await;
        db.create_emoji("wave", "u", "", &["vm1".to_string()])
            .await
            .unwrap();
        assert!(db.delete_emoji("wave").await.unwrap());
        assert!(!db.delete_emoji("wave").await.unwrap());
        assert!(db.fetch_enabled_emojis("vm1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_users_and_usage() {
        let (_dir, db) = test_db().await;
        let emoji_id = db
            .create_emoji("wave", "u", "", &["vm1".to_string()])
            .await
            .unwrap();
        let user_id = db.add_user("alice").await.unwrap();
        assert_eq!(db.add_user("alice").await.unwrap(), user_id);

        assert_eq!(db.find_user_id("alice").await.unwrap(), Some(user_id));
        assert_eq!(db.find_user_id("bob").await.unwrap(), None);

        db.append_usage(user_id, emoji_id, "vm1").await.unwrap();
        assert_eq!(db.usage_count(emoji_id).await.unwrap(), 1);
    }
}
