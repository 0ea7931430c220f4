use std::path::Path;
use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use thiserror::Error;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::question::Question;
pub use repositories::user::{Privilege, User, UserSecret};

/// Row lifecycle markers. Nothing is ever hard-deleted.
pub mod status {
    pub const AVAILABLE: &str = "AVAILABLE";
    pub const DELETED: &str = "DELETED";
    pub const REVOKED: &str = "REVOKED";
}

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    /// A write affected an unexpected number of rows, or stored data
    /// failed to decode. Always logged, never swallowed.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),

    #[error("{0}")]
    Internal(String),
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> anyhow::Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // An in-memory database exists per connection, so the pool must
        // not grow past one.
        let (max_connections, min_connections) = if db_url.contains(":memory:") {
            (1, 1)
        } else {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & schema applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn session_repo(&self) -> repositories::session::SessionRepository {
        repositories::session::SessionRepository::new(self.conn.clone())
    }

    fn question_repo(&self) -> repositories::question::QuestionRepository {
        repositories::question::QuestionRepository::new(self.conn.clone())
    }

    // Identity store

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        iterations: u32,
    ) -> Result<User, StoreError> {
        self.user_repo().create(username, password, iterations).await
    }

    /// Fetch by id with the self-or-admin rule enforced here, not at
    /// individual call sites.
    pub async fn get_user(
        &self,
        id: &str,
        caller_id: &str,
        caller_is_admin: bool,
    ) -> Result<User, StoreError> {
        self.user_repo()
            .get_checked(id, caller_id, caller_is_admin)
            .await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_secret(&self, username: &str) -> Result<Option<UserSecret>, StoreError> {
        self.user_repo().get_secret_by_username(username).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.user_repo().list().await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        self.user_repo().soft_delete(id).await
    }

    pub async fn privileges_for(&self, user_id: &str) -> Result<Vec<Privilege>, StoreError> {
        self.user_repo().privileges_for(user_id).await
    }

    pub async fn grant_privilege(
        &self,
        user_id: &str,
        privilege_name: &str,
    ) -> Result<(), StoreError> {
        self.user_repo().grant(user_id, privilege_name).await
    }

    // Sessions

    pub async fn create_session(&self, user_id: &str, token: &str) -> Result<(), StoreError> {
        self.session_repo().create(user_id, token).await
    }

    pub async fn resolve_session(&self, token: &str) -> Result<Option<User>, StoreError> {
        self.session_repo().resolve(token).await
    }

    pub async fn revoke_session(&self, token: &str) -> Result<bool, StoreError> {
        self.session_repo().revoke(token).await
    }

    // Questions

    pub async fn add_question(&self, question: &str, answer: &str) -> Result<Question, StoreError> {
        self.question_repo().create(question, answer).await
    }

    pub async fn list_questions(&self) -> Result<Vec<Question>, StoreError> {
        self.question_repo().list().await
    }

    pub async fn list_questions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Question>, StoreError> {
        self.question_repo().list_for_user(user_id).await
    }

    pub async fn get_question(&self, id: &str) -> Result<Option<Question>, StoreError> {
        self.question_repo().get(id).await
    }

    pub async fn update_question(
        &self,
        id: &str,
        question: &str,
        answer: &str,
    ) -> Result<Question, StoreError> {
        self.question_repo().update(id, question, answer).await
    }

    pub async fn delete_question(&self, id: &str) -> Result<(), StoreError> {
        self.question_repo().soft_delete(id).await
    }

    pub async fn record_outcome(
        &self,
        user_id: &str,
        question_id: &str,
        correct: bool,
    ) -> Result<(), StoreError> {
        self.question_repo()
            .record_outcome(user_id, question_id, correct)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;

    async fn memory_store() -> Store {
        Store::new("sqlite::memory:")
            .await
            .expect("in-memory store")
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let store = memory_store().await;

        store
            .create_user("alice", "pw", crypto::DEFAULT_ITERATIONS)
            .await
            .unwrap();

        let err = store
            .create_user("alice", "other", crypto::DEFAULT_ITERATIONS)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn registration_grants_the_user_privilege() {
        let store = memory_store().await;

        let user = store
            .create_user("bob", "pw", crypto::DEFAULT_ITERATIONS)
            .await
            .unwrap();

        let privileges = store.privileges_for(&user.id).await.unwrap();
        let names: Vec<&str> = privileges.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["user"]);
    }

    #[tokio::test]
    async fn seeded_admin_holds_both_privileges() {
        let store = memory_store().await;

        let admin = store
            .get_user_by_username("admin")
            .await
            .unwrap()
            .expect("seeded admin");

        let mut names: Vec<String> = store
            .privileges_for(&admin.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["admin", "user"]);
    }

    #[tokio::test]
    async fn self_or_admin_rule_is_enforced() {
        let store = memory_store().await;

        let alice = store
            .create_user("alice", "pw", crypto::DEFAULT_ITERATIONS)
            .await
            .unwrap();
        let bob = store
            .create_user("bob", "pw", crypto::DEFAULT_ITERATIONS)
            .await
            .unwrap();

        // Reading yourself works.
        let fetched = store.get_user(&alice.id, &alice.id, false).await.unwrap();
        assert_eq!(fetched.username, "alice");

        // Reading someone else without admin does not.
        let err = store.get_user(&bob.id, &alice.id, false).await.unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));

        // Admin may read anyone.
        let fetched = store.get_user(&bob.id, &alice.id, true).await.unwrap();
        assert_eq!(fetched.username, "bob");
    }

    #[tokio::test]
    async fn soft_delete_is_single_shot() {
        let store = memory_store().await;

        let question = store.add_question("2+2?", "4").await.unwrap();

        store.delete_question(&question.id).await.unwrap();

        // Second delete finds no live row.
        let err = store.delete_question(&question.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        // Deleted rows vanish from all read paths.
        assert!(store.get_question(&question.id).await.unwrap().is_none());
        assert!(store.list_questions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn outcome_counts_accumulate() {
        let store = memory_store().await;

        let user = store
            .create_user("carol", "pw", crypto::DEFAULT_ITERATIONS)
            .await
            .unwrap();
        let question = store.add_question("capital of France?", "Paris").await.unwrap();

        for _ in 0..3 {
            store
                .record_outcome(&user.id, &question.id, true)
                .await
                .unwrap();
        }
        store
            .record_outcome(&user.id, &question.id, false)
            .await
            .unwrap();

        let annotated = store.list_questions_for_user(&user.id).await.unwrap();
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated[0].nb_correct, Some(3));
        assert_eq!(annotated[0].nb_wrong, Some(1));
    }

    #[tokio::test]
    async fn sessions_resolve_until_revoked() {
        let store = memory_store().await;

        let user = store
            .create_user("dave", "pw", crypto::DEFAULT_ITERATIONS)
            .await
            .unwrap();
        let token = crypto::generate_token();

        store.create_session(&user.id, &token).await.unwrap();

        let resolved = store.resolve_session(&token).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        assert!(store.revoke_session(&token).await.unwrap());
        assert!(store.resolve_session(&token).await.unwrap().is_none());

        // Revoking again is a no-op, not an error.
        assert!(!store.revoke_session(&token).await.unwrap());
    }

    #[tokio::test]
    async fn deleted_user_no_longer_resolves() {
        let store = memory_store().await;

        let user = store
            .create_user("erin", "pw", crypto::DEFAULT_ITERATIONS)
            .await
            .unwrap();
        let token = crypto::generate_token();
        store.create_session(&user.id, &token).await.unwrap();

        store.delete_user(&user.id).await.unwrap();
        assert!(store.resolve_session(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn updating_an_unknown_question_is_a_client_error() {
        let store = memory_store().await;

        let err = store
            .update_question("no-such-id", "q", "a")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
