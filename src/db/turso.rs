use crate::types::{
    Actor, Address, AddressRequest, AppError, Classroom, Institution, InstitutionRequest, Result,
    Role, UserId, UserProfile,
};
use chrono::Utc;
use libsql::{Builder, Connection, Database, Row, Value};
use std::future::Future;
use tokio::sync::Mutex;

/// Username of the seeded passwordless identity.
pub const GUEST_USERNAME: &str = "guest";

/// Stored in place of a hash for rows that must never pass a password check.
const UNUSABLE_HASH: &str = "!";

const USER_COLUMNS: &str =
    "id, name, username, password_hash, role, institution_id, accepted_terms, profile_image";

const CLASSROOM_SELECT: &str = "SELECT c.id, c.name, c.institution_id, c.creator_id, \
     GROUP_CONCAT(cu.user_id) \
     FROM classrooms c LEFT JOIN classroom_users cu ON cu.classroom_id = c.id";

/// libsql-backed persistence for users, addresses, institutions and classrooms.
///
/// All statements run on one long-lived connection so that `:memory:`
/// databases keep their contents for the client's lifetime. Multi-statement
/// writes run in a transaction, serialized by `tx_lock`.
pub struct TursoClient {
    _db: Database,
    conn: Connection,
    tx_lock: Mutex<()>,
}

/// Fields for a new user row.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub institution_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub institution_id: Option<i64>,
    pub accepted_terms: bool,
    pub profile_image: Option<String>,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            institution_id: self.institution_id,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            username: self.username.clone(),
            role: self.role,
            institution_id: self.institution_id,
            accepted_terms: self.accepted_terms,
            profile_image: self.profile_image.clone(),
        }
    }
}

fn row_err(e: libsql::Error) -> AppError {
    AppError::Database(e.to_string())
}

/// Maps a failed insert/update, surfacing constraint violations to the caller.
fn write_err(context: &str, e: libsql::Error) -> AppError {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint failed") {
        AppError::Conflict(format!("{}: a matching record already exists", context))
    } else if msg.contains("FOREIGN KEY constraint failed") {
        AppError::NotFound(format!("{}: a referenced record does not exist", context))
    } else {
        AppError::Database(format!("{}: {}", context, msg))
    }
}

/// Maps a failed delete; a foreign-key failure means the row is still referenced.
fn delete_err(context: &str, e: libsql::Error) -> AppError {
    let msg = e.to_string();
    if msg.contains("FOREIGN KEY constraint failed") {
        AppError::Conflict(format!("{}: the record is still referenced", context))
    } else {
        AppError::Database(format!("{}: {}", context, msg))
    }
}

fn id_list(ids: &[i64]) -> (String, Vec<Value>) {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let values = ids.iter().map(|id| Value::Integer(*id)).collect();
    (placeholders, values)
}

fn user_from_row(row: &Row) -> Result<User> {
    let role: String = row.get(4).map_err(row_err)?;
    Ok(User {
        id: row.get(0).map_err(row_err)?,
        name: row.get(1).map_err(row_err)?,
        username: row.get(2).map_err(row_err)?,
        password_hash: row.get(3).map_err(row_err)?,
        role: role
            .parse()
            .map_err(|_| AppError::Database(format!("Unknown role stored: {}", role)))?,
        institution_id: row.get(5).map_err(row_err)?,
        accepted_terms: row.get::<i64>(6).map_err(row_err)? != 0,
        profile_image: row.get(7).map_err(row_err)?,
    })
}

fn address_from_row(row: &Row) -> Result<Address> {
    Ok(Address {
        id: row.get(0).map_err(row_err)?,
        city: row.get(1).map_err(row_err)?,
        state: row.get(2).map_err(row_err)?,
        country: row.get(3).map_err(row_err)?,
    })
}

fn institution_from_row(row: &Row) -> Result<Institution> {
    Ok(Institution {
        id: row.get(0).map_err(row_err)?,
        name: row.get(1).map_err(row_err)?,
        address_id: row.get(2).map_err(row_err)?,
    })
}

fn classroom_from_row(row: &Row) -> Result<Classroom> {
    let members: Option<String> = row.get(4).map_err(row_err)?;
    let mut user_ids = members
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| AppError::Database(format!("Bad member id: {}", s)))
        })
        .collect::<Result<Vec<UserId>>>()?;
    user_ids.sort_unstable();

    Ok(Classroom {
        id: row.get(0).map_err(row_err)?,
        name: row.get(1).map_err(row_err)?,
        institution_id: row.get(2).map_err(row_err)?,
        creator_id: row.get(3).map_err(row_err)?,
        user_ids,
    })
}

impl TursoClient {
    /// Opens an ephemeral in-memory database.
    pub async fn new_memory() -> Result<Self> {
        Self::new_local(":memory:").await
    }

    /// Opens (or creates) a local SQLite database file.
    pub async fn new_local(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AppError::Database(format!("Failed to create database directory: {}", e))
                    })?;
                }
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        Self::from_database(db).await
    }

    /// Connects to a remote Turso database.
    #[cfg(feature = "turso")]
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Turso: {}", e)))?;

        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self {
            _db: db,
            conn,
            tx_lock: Mutex::new(()),
        };
        client.initialize_schema().await?;

        Ok(client)
    }

    pub fn connection(&self) -> Result<Connection> {
        Ok(self.conn.clone())
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| AppError::Database(format!("Failed to enable foreign keys: {}", e)))?;

        // Addresses table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS addresses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                country TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(city, state, country)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create addresses table: {}", e)))?;

        // Institutions table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS institutions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                address_id INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (address_id) REFERENCES addresses(id)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create institutions table: {}", e)))?;

        // Users table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                institution_id INTEGER,
                accepted_terms INTEGER NOT NULL DEFAULT 0,
                profile_image TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (institution_id) REFERENCES institutions(id)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create users table: {}", e)))?;

        // Classrooms table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS classrooms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                institution_id INTEGER NOT NULL,
                creator_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (institution_id) REFERENCES institutions(id),
                FOREIGN KEY (creator_id) REFERENCES users(id)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create classrooms table: {}", e)))?;

        // Classroom membership table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS classroom_users (
                classroom_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                PRIMARY KEY (classroom_id, user_id),
                FOREIGN KEY (classroom_id) REFERENCES classrooms(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to create classroom_users table: {}", e))
        })?;

        // The guest row backs passwordless sign-in.
        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT OR IGNORE INTO users
             (name, username, password_hash, role, accepted_terms, created_at, updated_at)
             VALUES ('Guest', ?, ?, ?, 0, ?, ?)",
            (GUEST_USERNAME, UNUSABLE_HASH, Role::Guest.as_str(), now, now),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to seed guest user: {}", e)))?;

        Ok(())
    }

    /// Runs `body` inside a transaction, rolling back on error.
    async fn in_transaction<T, F, Fut>(&self, body: F) -> Result<T>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _guard = self.tx_lock.lock().await;
        let conn = self.connection()?;

        conn.execute("BEGIN", ())
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        match body(conn.clone()).await {
            Ok(value) => {
                conn.execute("COMMIT", ()).await.map_err(|e| {
                    AppError::Database(format!("Failed to commit transaction: {}", e))
                })?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = conn.execute("ROLLBACK", ()).await {
                    tracing::error!(error = %rollback, "transaction rollback failed");
                }
                Err(e)
            }
        }
    }

    // User operations

    /// Creates a user and enrolls them in `classroom_ids`, atomically.
    pub async fn create_user(&self, user: NewUser<'_>, classroom_ids: &[i64]) -> Result<User> {
        self.in_transaction(|conn| async move {
            let now = Utc::now().timestamp();

            let mut rows = conn
                .query(
                    &format!(
                        "INSERT INTO users
                         (name, username, password_hash, role, institution_id, accepted_terms,
                          created_at, updated_at)
                         VALUES (?, ?, ?, ?, ?, 0, ?, ?)
                         RETURNING {}",
                        USER_COLUMNS
                    ),
                    (
                        user.name,
                        user.username,
                        user.password_hash,
                        user.role.as_str(),
                        user.institution_id,
                        now,
                        now,
                    ),
                )
                .await
                .map_err(|e| write_err("Failed to create user", e))?;

            let created = match rows
                .next()
                .await
                .map_err(|e| write_err("Failed to create user", e))?
            {
                Some(row) => user_from_row(&row)?,
                None => return Err(AppError::Database("Insert returned no row".to_string())),
            };
            drop(rows);

            let mut distinct = classroom_ids.to_vec();
            distinct.sort_unstable();
            distinct.dedup();

            if !distinct.is_empty() {
                let (placeholders, ids) = id_list(&distinct);
                let enrolled = conn
                    .execute(
                        &format!(
                            "INSERT INTO classroom_users (classroom_id, user_id)
                             SELECT id, {} FROM classrooms WHERE id IN ({})",
                            created.id, placeholders
                        ),
                        ids,
                    )
                    .await
                    .map_err(|e| write_err("Failed to enroll user", e))?;

                if enrolled as usize != distinct.len() {
                    return Err(AppError::NotFound(
                        "One or more classrooms do not exist".to_string(),
                    ));
                }
            }

            Ok(created)
        })
        .await
    }

    async fn query_user(&self, filter: &str, param: Value) -> Result<Option<User>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                &format!("SELECT {} FROM users WHERE {} ORDER BY id LIMIT 1", USER_COLUMNS, filter),
                [param],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query user: {}", e)))?;

        match rows.next().await.map_err(row_err)? {
            Some(row) => Ok(Some(user_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.query_user("id = ?", Value::Integer(id)).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.query_user("username = ?", Value::Text(username.to_string()))
            .await
    }

    /// First user holding `role`; used to resolve the guest identity.
    pub async fn get_user_by_role(&self, role: Role) -> Result<Option<User>> {
        self.query_user("role = ?", Value::Text(role.as_str().to_string()))
            .await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS), ())
            .await
            .map_err(|e| AppError::Database(format!("Failed to query users: {}", e)))?;

        let mut users = Vec::new();
        while let Some(row) = rows.next().await.map_err(row_err)? {
            users.push(user_from_row(&row)?);
        }

        Ok(users)
    }

    /// Updates the self-service profile fields; `None` keeps the current value.
    pub async fn update_user_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        profile_image: Option<&str>,
    ) -> Result<Option<User>> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let mut rows = conn
            .query(
                &format!(
                    "UPDATE users
                     SET name = COALESCE(?, name),
                         profile_image = COALESCE(?, profile_image),
                         updated_at = ?
                     WHERE id = ?
                     RETURNING {}",
                    USER_COLUMNS
                ),
                (name, profile_image, now, id),
            )
            .await
            .map_err(|e| write_err("Failed to update user", e))?;

        match rows.next().await.map_err(row_err)? {
            Some(row) => Ok(Some(user_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Marks the terms of use as accepted. Returns false if the user is gone.
    pub async fn accept_terms(&self, id: UserId) -> Result<bool> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let updated = conn
            .execute(
                "UPDATE users SET accepted_terms = 1, updated_at = ? WHERE id = ?",
                (now, id),
            )
            .await
            .map_err(|e| write_err("Failed to accept terms", e))?;

        Ok(updated > 0)
    }

    pub async fn delete_user(&self, id: UserId) -> Result<bool> {
        let conn = self.connection()?;

        let deleted = conn
            .execute("DELETE FROM users WHERE id = ?", [id])
            .await
            .map_err(|e| delete_err("Failed to delete user", e))?;

        Ok(deleted > 0)
    }

    // Address operations

    pub async fn create_address(&self, address: &AddressRequest) -> Result<Address> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let mut rows = conn
            .query(
                "INSERT INTO addresses (city, state, country, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?)
                 RETURNING id, city, state, country",
                (
                    address.city.as_str(),
                    address.state.as_str(),
                    address.country.as_str(),
                    now,
                    now,
                ),
            )
            .await
            .map_err(|e| write_err("Failed to create address", e))?;

        match rows
            .next()
            .await
            .map_err(|e| write_err("Failed to create address", e))?
        {
            Some(row) => address_from_row(&row),
            None => Err(AppError::Database("Insert returned no row".to_string())),
        }
    }

    pub async fn update_address(
        &self,
        id: i64,
        address: &AddressRequest,
    ) -> Result<Option<Address>> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let mut rows = conn
            .query(
                "UPDATE addresses SET city = ?, state = ?, country = ?, updated_at = ?
                 WHERE id = ?
                 RETURNING id, city, state, country",
                (
                    address.city.as_str(),
                    address.state.as_str(),
                    address.country.as_str(),
                    now,
                    id,
                ),
            )
            .await
            .map_err(|e| write_err("Failed to update address", e))?;

        match rows
            .next()
            .await
            .map_err(|e| write_err("Failed to update address", e))?
        {
            Some(row) => Ok(Some(address_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_address(&self, id: i64) -> Result<Option<Address>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, city, state, country FROM addresses WHERE id = ?",
                [id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query address: {}", e)))?;

        match rows.next().await.map_err(row_err)? {
            Some(row) => Ok(Some(address_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Lists addresses, optionally restricted to one state.
    pub async fn list_addresses(&self, state: Option<&str>) -> Result<Vec<Address>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, city, state, country FROM addresses
                 WHERE ?1 IS NULL OR state = ?1
                 ORDER BY country, state, city",
                [state],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query addresses: {}", e)))?;

        let mut addresses = Vec::new();
        while let Some(row) = rows.next().await.map_err(row_err)? {
            addresses.push(address_from_row(&row)?);
        }

        Ok(addresses)
    }

    /// Compound-key lookup on (city, state, country).
    pub async fn find_address_id(&self, address: &AddressRequest) -> Result<Option<i64>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id FROM addresses WHERE city = ? AND state = ? AND country = ?",
                (
                    address.city.as_str(),
                    address.state.as_str(),
                    address.country.as_str(),
                ),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query address: {}", e)))?;

        match rows.next().await.map_err(row_err)? {
            Some(row) => Ok(Some(row.get(0).map_err(row_err)?)),
            None => Ok(None),
        }
    }

    pub async fn delete_address(&self, id: i64) -> Result<bool> {
        let conn = self.connection()?;

        let deleted = conn
            .execute("DELETE FROM addresses WHERE id = ?", [id])
            .await
            .map_err(|e| delete_err("Failed to delete address", e))?;

        Ok(deleted > 0)
    }

    // Institution operations

    pub async fn create_institution(&self, institution: &InstitutionRequest) -> Result<Institution> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let mut rows = conn
            .query(
                "INSERT INTO institutions (name, address_id, created_at, updated_at)
                 VALUES (?, ?, ?, ?)
                 RETURNING id, name, address_id",
                (institution.name.as_str(), institution.address_id, now, now),
            )
            .await
            .map_err(|e| write_err("Failed to create institution", e))?;

        match rows
            .next()
            .await
            .map_err(|e| write_err("Failed to create institution", e))?
        {
            Some(row) => institution_from_row(&row),
            None => Err(AppError::Database("Insert returned no row".to_string())),
        }
    }

    pub async fn update_institution(
        &self,
        id: i64,
        institution: &InstitutionRequest,
    ) -> Result<Option<Institution>> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp();

        let mut rows = conn
            .query(
                "UPDATE institutions SET name = ?, address_id = ?, updated_at = ?
                 WHERE id = ?
                 RETURNING id, name, address_id",
                (institution.name.as_str(), institution.address_id, now, id),
            )
            .await
            .map_err(|e| write_err("Failed to update institution", e))?;

        match rows
            .next()
            .await
            .map_err(|e| write_err("Failed to update institution", e))?
        {
            Some(row) => Ok(Some(institution_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_institution(&self, id: i64) -> Result<Option<Institution>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, name, address_id FROM institutions WHERE id = ?",
                [id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query institution: {}", e)))?;

        match rows.next().await.map_err(row_err)? {
            Some(row) => Ok(Some(institution_from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_institutions(&self) -> Result<Vec<Institution>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, name, address_id FROM institutions ORDER BY name",
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query institutions: {}", e)))?;

        let mut institutions = Vec::new();
        while let Some(row) = rows.next().await.map_err(row_err)? {
            institutions.push(institution_from_row(&row)?);
        }

        Ok(institutions)
    }

    pub async fn delete_institution(&self, id: i64) -> Result<bool> {
        let conn = self.connection()?;

        let deleted = conn
            .execute("DELETE FROM institutions WHERE id = ?", [id])
            .await
            .map_err(|e| delete_err("Failed to delete institution", e))?;

        Ok(deleted > 0)
    }

    // Classroom operations

    async fn replace_members(conn: &Connection, classroom_id: i64, user_ids: &[UserId]) -> Result<()> {
        conn.execute(
            "DELETE FROM classroom_users WHERE classroom_id = ?",
            [classroom_id],
        )
        .await
        .map_err(|e| write_err("Failed to update classroom members", e))?;

        if user_ids.is_empty() {
            return Ok(());
        }

        let (placeholders, ids) = id_list(user_ids);
        let enrolled = conn
            .execute(
                &format!(
                    "INSERT OR IGNORE INTO classroom_users (classroom_id, user_id)
                     SELECT {}, id FROM users WHERE id IN ({})",
                    classroom_id, placeholders
                ),
                ids,
            )
            .await
            .map_err(|e| write_err("Failed to update classroom members", e))?;

        let mut distinct = user_ids.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if enrolled as usize != distinct.len() {
            return Err(AppError::NotFound(
                "One or more users do not exist".to_string(),
            ));
        }

        Ok(())
    }

    async fn query_classrooms(
        conn: &Connection,
        filter: &str,
        params: Vec<Value>,
    ) -> Result<Vec<Classroom>> {
        let mut rows = conn
            .query(
                &format!("{} {} GROUP BY c.id ORDER BY c.id", CLASSROOM_SELECT, filter),
                params,
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query classrooms: {}", e)))?;

        let mut classrooms = Vec::new();
        while let Some(row) = rows.next().await.map_err(row_err)? {
            classrooms.push(classroom_from_row(&row)?);
        }

        Ok(classrooms)
    }

    /// Creates a classroom owned by `creator_id` with the given members, atomically.
    pub async fn create_classroom(
        &self,
        name: &str,
        institution_id: i64,
        creator_id: UserId,
        user_ids: &[UserId],
    ) -> Result<Classroom> {
        self.in_transaction(|conn| async move {
            let now = Utc::now().timestamp();

            let mut rows = conn
                .query(
                    "INSERT INTO classrooms (name, institution_id, creator_id, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?)
                     RETURNING id",
                    (name, institution_id, creator_id, now, now),
                )
                .await
                .map_err(|e| write_err("Failed to create classroom", e))?;

            let id: i64 = match rows
                .next()
                .await
                .map_err(|e| write_err("Failed to create classroom", e))?
            {
                Some(row) => row.get(0).map_err(row_err)?,
                None => return Err(AppError::Database("Insert returned no row".to_string())),
            };
            drop(rows);

            Self::replace_members(&conn, id, user_ids).await?;

            Self::query_classrooms(&conn, "WHERE c.id = ?", vec![Value::Integer(id)])
                .await?
                .pop()
                .ok_or_else(|| AppError::Database("Created classroom vanished".to_string()))
        })
        .await
    }

    /// Replaces a classroom's fields and members. Returns None if it does not exist.
    pub async fn update_classroom(
        &self,
        id: i64,
        name: &str,
        institution_id: i64,
        user_ids: &[UserId],
    ) -> Result<Option<Classroom>> {
        self.in_transaction(|conn| async move {
            let now = Utc::now().timestamp();

            let updated = conn
                .execute(
                    "UPDATE classrooms SET name = ?, institution_id = ?, updated_at = ?
                     WHERE id = ?",
                    (name, institution_id, now, id),
                )
                .await
                .map_err(|e| write_err("Failed to update classroom", e))?;

            if updated == 0 {
                return Ok(None);
            }

            Self::replace_members(&conn, id, user_ids).await?;

            Ok(Self::query_classrooms(&conn, "WHERE c.id = ?", vec![Value::Integer(id)])
                .await?
                .pop())
        })
        .await
    }

    pub async fn get_classroom(&self, id: i64) -> Result<Option<Classroom>> {
        let conn = self.connection()?;
        Ok(
            Self::query_classrooms(&conn, "WHERE c.id = ?", vec![Value::Integer(id)])
                .await?
                .pop(),
        )
    }

    /// Lists classrooms, optionally restricted to one institution.
    pub async fn list_classrooms(&self, institution_id: Option<i64>) -> Result<Vec<Classroom>> {
        let conn = self.connection()?;
        match institution_id {
            Some(institution_id) => {
                Self::query_classrooms(
                    &conn,
                    "WHERE c.institution_id = ?",
                    vec![Value::Integer(institution_id)],
                )
                .await
            }
            None => Self::query_classrooms(&conn, "", Vec::new()).await,
        }
    }

    pub async fn delete_classroom(&self, id: i64) -> Result<bool> {
        let conn = self.connection()?;

        let deleted = conn
            .execute("DELETE FROM classrooms WHERE id = ?", [id])
            .await
            .map_err(|e| delete_err("Failed to delete classroom", e))?;

        Ok(deleted > 0)
    }
}
