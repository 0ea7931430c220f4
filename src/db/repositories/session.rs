use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::debug;

use crate::db::{StoreError, status};
use crate::entities::{sessions, users};

use super::user::User;

pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Record a new session binding a bearer token to a user.
    pub async fn create(&self, user_id: &str, token: &str) -> Result<(), StoreError> {
        sessions::Entity::insert(sessions::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            status: Set(status::AVAILABLE.to_string()),
            token: Set(token.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        })
        .exec_without_returning(&self.conn)
        .await?;

        debug!("Session created for user {user_id}");
        Ok(())
    }

    /// Resolve a bearer token to its live user.
    ///
    /// Only a live session joined to a live user matches; revoked sessions
    /// and soft-deleted users never resolve.
    pub async fn resolve(&self, token: &str) -> Result<Option<User>, StoreError> {
        let row = sessions::Entity::find()
            .filter(sessions::Column::Token.eq(token))
            .filter(sessions::Column::Status.eq(status::AVAILABLE))
            .find_also_related(users::Entity)
            .filter(users::Column::Status.eq(status::AVAILABLE))
            .one(&self.conn)
            .await?;

        Ok(row.and_then(|(_, user)| user).map(User::from))
    }

    /// Revoke the session holding this token. Returns whether a live
    /// session was found; revoking an unknown token is not an error.
    pub async fn revoke(&self, token: &str) -> Result<bool, StoreError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::Status, Expr::value(status::REVOKED))
            .filter(sessions::Column::Token.eq(token))
            .filter(sessions::Column::Status.eq(status::AVAILABLE))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
