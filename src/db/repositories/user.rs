use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter,
    QuerySelect, RelationTrait, Set, SqlErr,
};
use tokio::task;
use tracing::{debug, error};

use crate::crypto;
use crate::db::{StoreError, status};
use crate::entities::{privileges, users, users_privileges};

/// User data safe to hand out of the store. Never carries the hash or salt.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub status: String,
    pub created_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            status: model.status,
            created_at: model.created_at,
        }
    }
}

/// A named capability a user may hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Privilege {
    pub id: String,
    pub name: String,
}

impl From<privileges::Model> for Privilege {
    fn from(model: privileges::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// A user together with its decoded credential material, for verification
/// only. Stays inside the auth path and is never serialized.
#[derive(Debug, Clone)]
pub struct UserSecret {
    pub user: User,
    pub salt: Vec<u8>,
    pub hash: Vec<u8>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a user and grant it the "user" privilege.
    ///
    /// Password derivation runs on a blocking task; duplicate usernames
    /// surface as [`StoreError::Conflict`] from the unique constraint.
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        iterations: u32,
    ) -> Result<User, StoreError> {
        let password = password.to_string();
        let secret = task::spawn_blocking(move || crypto::derive_secret(&password, iterations))
            .await
            .map_err(|e| StoreError::Internal(format!("hashing task panicked: {e}")))?;

        let model = users::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            username: Set(username.to_string()),
            pw_hash: Set(BASE64.encode(&secret.hash)),
            pw_salt: Set(BASE64.encode(&secret.salt)),
            status: Set(status::AVAILABLE.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        let inserted = model.insert(&self.conn).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                StoreError::Conflict(format!("username {username} already taken"))
            } else {
                StoreError::Db(e)
            }
        })?;

        debug!("User {} created ({})", inserted.username, inserted.id);

        let user = User::from(inserted);
        self.grant(&user.id, "user").await?;

        Ok(user)
    }

    /// Fetch a user by id, enforcing the self-or-admin rule.
    pub async fn get_checked(
        &self,
        id: &str,
        caller_id: &str,
        caller_is_admin: bool,
    ) -> Result<User, StoreError> {
        if id != caller_id && !caller_is_admin {
            error!("User {caller_id} attempted to read user {id}");
            return Err(StoreError::Forbidden(
                "cannot read another user's account".to_string(),
            ));
        }

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        let user = users::Entity::find_by_id(id)
            .filter(users::Column::Status.eq(status::AVAILABLE))
            .one(&self.conn)
            .await?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .filter(users::Column::Status.eq(status::AVAILABLE))
            .one(&self.conn)
            .await?;

        Ok(user.map(User::from))
    }

    /// Fetch a live user with decoded credential material, for login.
    pub async fn get_secret_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserSecret>, StoreError> {
        let Some(model) = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .filter(users::Column::Status.eq(status::AVAILABLE))
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let salt = BASE64.decode(&model.pw_salt).map_err(|e| {
            StoreError::Integrity(format!("corrupt salt for user {}: {e}", model.id))
        })?;
        let hash = BASE64.decode(&model.pw_hash).map_err(|e| {
            StoreError::Integrity(format!("corrupt hash for user {}: {e}", model.id))
        })?;

        Ok(Some(UserSecret {
            user: User::from(model),
            salt,
            hash,
        }))
    }

    /// List all live users. Privileged callers only; the check happens at
    /// the route layer.
    pub async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = users::Entity::find()
            .filter(users::Column::Status.eq(status::AVAILABLE))
            .all(&self.conn)
            .await?;

        Ok(users.into_iter().map(User::from).collect())
    }

    /// Soft-delete a user. Exactly one row must transition state.
    pub async fn soft_delete(&self, id: &str) -> Result<(), StoreError> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::Status, Expr::value(status::DELETED))
            .filter(users::Column::Id.eq(id))
            .filter(users::Column::Status.eq(status::AVAILABLE))
            .exec(&self.conn)
            .await?;

        match result.rows_affected {
            0 => Err(StoreError::NotFound(format!("user {id}"))),
            1 => {
                debug!("User {id} marked as deleted");
                Ok(())
            }
            n => {
                error!("Delete of user {id} affected {n} rows");
                Err(StoreError::Integrity(format!(
                    "delete of user {id} affected {n} rows"
                )))
            }
        }
    }

    /// The unordered set of privileges granted to a user.
    pub async fn privileges_for(&self, user_id: &str) -> Result<Vec<Privilege>, StoreError> {
        let rows = privileges::Entity::find()
            .join(
                JoinType::InnerJoin,
                privileges::Relation::UsersPrivileges.def(),
            )
            .filter(users_privileges::Column::UserId.eq(user_id))
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Privilege::from).collect())
    }

    /// Grant a named privilege to a user.
    pub async fn grant(&self, user_id: &str, privilege_name: &str) -> Result<(), StoreError> {
        let privilege = privileges::Entity::find()
            .filter(privileges::Column::Name.eq(privilege_name))
            .one(&self.conn)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("privilege {privilege_name}")))?;

        users_privileges::Entity::insert(users_privileges::ActiveModel {
            user_id: Set(user_id.to_string()),
            privilege_id: Set(privilege.id),
        })
        .exec_without_returning(&self.conn)
        .await?;

        Ok(())
    }
}
