use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct AccountData {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        // One save slot per account, stored as the JSON the client sent
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS game_saves (
                account_id INTEGER PRIMARY KEY,
                game_state TEXT NOT NULL,
                saved_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(account_id) REFERENCES accounts(id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Create a new account with a hashed password
    pub async fn create_account(&self, username: &str, password: &str) -> Result<i64, String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| format!("Failed to hash password: {}", e))?
            .to_string();

        let result = sqlx::query("INSERT INTO accounts (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(&password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint failed") {
                    "Username already exists".to_string()
                } else {
                    format!("Database error: {}", e)
                }
            })?;

        tracing::info!("Created account: {} (id: {})", username, result.last_insert_rowid());
        Ok(result.last_insert_rowid())
    }

    pub async fn get_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountData>, sqlx::Error> {
        let row = sqlx::query("SELECT id, username, password_hash FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| AccountData {
            id: r.get("id"),
            username: r.get("username"),
            password_hash: r.get("password_hash"),
        }))
    }

    /// Verify password and return the account if valid
    pub async fn verify_password(&self, username: &str, password: &str) -> Option<AccountData> {
        let account = self.get_account_by_username(username).await.ok()??;
        let parsed_hash = PasswordHash::new(&account.password_hash).ok()?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .ok()
            .map(|_| account)
    }

    /// Store the account's save, replacing any previous one
    pub async fn save_game(&self, account_id: i64, game_state_json: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO game_saves (account_id, game_state, saved_at)
               VALUES (?, ?, CURRENT_TIMESTAMP)
               ON CONFLICT(account_id) DO UPDATE SET
                   game_state = excluded.game_state,
                   saved_at = CURRENT_TIMESTAMP"#,
        )
        .bind(account_id)
        .bind(game_state_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn load_game(&self, account_id: i64) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT game_state FROM game_saves WHERE account_id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("game_state")))
    }
}
