use crate::models::{Album, NewAlbum, NewSong, NewUser, Song, User, UserAccount, UserChanges};
use async_trait::async_trait;
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc};

pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, so handlers interact with
/// the data layer without knowing the concrete implementation (SQLite, mock, ...).
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>>;
    // Credential-bearing lookups, used by login and token authentication.
    async fn get_account(&self, id: i64) -> RepoResult<Option<UserAccount>>;
    async fn find_account_by_username(&self, username: &str) -> RepoResult<Option<UserAccount>>;
    // Uniqueness checks. `exclude` skips the account being updated.
    async fn username_taken(&self, username: &str, exclude: Option<i64>) -> RepoResult<bool>;
    async fn email_taken(&self, email: &str, exclude: Option<i64>) -> RepoResult<bool>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> RepoResult<Option<User>>;
    // Cascades to the user's albums and their songs.
    async fn delete_user(&self, id: i64) -> RepoResult<bool>;

    // --- Albums ---
    async fn count_albums(&self) -> RepoResult<i64>;
    // Ordered by id ascending.
    async fn list_albums(&self, limit: i64, offset: i64) -> RepoResult<Vec<Album>>;
    async fn get_album(&self, id: i64) -> RepoResult<Option<Album>>;
    async fn create_album(&self, album: NewAlbum, user_id: i64) -> RepoResult<Album>;

    // --- Songs ---
    async fn count_songs(&self, album_id: i64) -> RepoResult<i64>;
    // Ordered by id ascending.
    async fn list_songs(&self, album_id: i64, limit: i64, offset: i64) -> RepoResult<Vec<Song>>;
    async fn create_song(&self, album_id: i64, song: NewSong) -> RepoResult<Song>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Flat row of an album joined with its owner.
#[derive(FromRow)]
struct AlbumRow {
    id: i64,
    name: String,
    year: i32,
    user_id: i64,
    username: String,
    email: String,
    full_name: Option<String>,
    artistic_name: String,
}

impl From<AlbumRow> for Album {
    fn from(row: AlbumRow) -> Self {
        Album {
            id: row.id,
            name: row.name,
            year: row.year,
            user: User {
                id: row.user_id,
                username: row.username,
                email: row.email,
                full_name: row.full_name,
                artistic_name: row.artistic_name,
            },
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, full_name, artistic_name";

const ACCOUNT_COLUMNS: &str = "id, username, email, full_name, artistic_name, password, is_active";

const ALBUM_SELECT: &str = r#"
    SELECT a.id, a.name, a.year,
           u.id AS user_id, u.username, u.email, u.full_name, u.artistic_name
    FROM albums a
    JOIN users u ON u.id = a.user_id
"#;

/// SqliteRepository
///
/// The concrete implementation of the `Repository` trait, backed by SQLite.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a new repository instance using an initialized connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// connect
    ///
    /// Opens (creating if missing) the database at `db_url` with foreign keys enforced, and
    /// applies the embedded migrations. An in-memory database lives only as long as its single
    /// connection, so the pool is pinned to one connection that is never recycled.
    pub async fn connect(db_url: &str) -> RepoResult<Self> {
        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if db_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("database ready at {db_url}");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    /// create_user
    ///
    /// Inserts an account. Uniqueness has already been checked by the caller; the UNIQUE
    /// constraints on `username` and `email` remain the final guard.
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, full_name, artistic_name, password)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.username)
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.artistic_name)
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_account(&self, id: i64) -> RepoResult<Option<UserAccount>> {
        sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_account_by_username(&self, username: &str) -> RepoResult<Option<UserAccount>> {
        sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn username_taken(&self, username: &str, exclude: Option<i64>) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? AND (? IS NULL OR id <> ?))",
        )
        .bind(username)
        .bind(exclude)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
    }

    async fn email_taken(&self, email: &str, exclude: Option<i64>) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? AND (? IS NULL OR id <> ?))",
        )
        .bind(email)
        .bind(exclude)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
    }

    /// update_user
    ///
    /// Uses `COALESCE` for the optional columns, only overwriting a column when the matching
    /// field in `changes` is `Some`. `full_name` is nullable, so it is driven by an explicit flag.
    async fn update_user(&self, id: i64, changes: UserChanges) -> RepoResult<Option<User>> {
        let set_full_name = changes.full_name.is_some();

        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET username = COALESCE(?2, username),
                 email = COALESCE(?3, email),
                 full_name = CASE WHEN ?4 THEN ?5 ELSE full_name END,
                 artistic_name = COALESCE(?6, artistic_name),
                 password = COALESCE(?7, password)
             WHERE id = ?1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(set_full_name)
        .bind(changes.full_name.flatten())
        .bind(changes.artistic_name)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_albums(&self) -> RepoResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM albums")
            .fetch_one(&self.pool)
            .await
    }

    async fn list_albums(&self, limit: i64, offset: i64) -> RepoResult<Vec<Album>> {
        let rows = sqlx::query_as::<_, AlbumRow>(&format!(
            "{ALBUM_SELECT} ORDER BY a.id ASC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Album::from).collect())
    }

    async fn get_album(&self, id: i64) -> RepoResult<Option<Album>> {
        let row = sqlx::query_as::<_, AlbumRow>(&format!("{ALBUM_SELECT} WHERE a.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Album::from))
    }

    /// create_album
    ///
    /// Inserts the album and reads it back joined with its owner, so the response carries the
    /// nested user without a second round trip from the handler.
    async fn create_album(&self, album: NewAlbum, user_id: i64) -> RepoResult<Album> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO albums (name, year, user_id) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(album.name)
        .bind(album.year)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, AlbumRow>(&format!("{ALBUM_SELECT} WHERE a.id = ?"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn count_songs(&self, album_id: i64) -> RepoResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM songs WHERE album_id = ?")
            .bind(album_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn list_songs(&self, album_id: i64, limit: i64, offset: i64) -> RepoResult<Vec<Song>> {
        sqlx::query_as::<_, Song>(
            "SELECT id, title, duration, album_id FROM songs
             WHERE album_id = ?
             ORDER BY id ASC
             LIMIT ? OFFSET ?",
        )
        .bind(album_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_song(&self, album_id: i64, song: NewSong) -> RepoResult<Song> {
        sqlx::query_as::<_, Song>(
            "INSERT INTO songs (title, duration, album_id) VALUES (?, ?, ?)
             RETURNING id, title, duration, album_id",
        )
        .bind(song.title)
        .bind(song.duration)
        .bind(album_id)
        .fetch_one(&self.pool)
        .await
    }
}
