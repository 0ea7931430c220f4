use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{debug, error};

use crate::db::{StoreError, status};
use crate::entities::{questions, users_questions};

/// A question, optionally annotated with the calling user's answer counts.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub nb_correct: Option<i64>,
    pub nb_wrong: Option<i64>,
    pub created_at: String,
}

impl From<questions::Model> for Question {
    fn from(model: questions::Model) -> Self {
        Self {
            id: model.id,
            question: model.question,
            answer: model.answer,
            nb_correct: None,
            nb_wrong: None,
            created_at: model.created_at,
        }
    }
}

pub struct QuestionRepository {
    conn: DatabaseConnection,
}

impl QuestionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, question: &str, answer: &str) -> Result<Question, StoreError> {
        let model = questions::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            status: Set(status::AVAILABLE.to_string()),
            question: Set(question.to_string()),
            answer: Set(answer.to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        let inserted = model.insert(&self.conn).await?;
        debug!("Question {} created", inserted.id);

        Ok(Question::from(inserted))
    }

    pub async fn list(&self) -> Result<Vec<Question>, StoreError> {
        let rows = questions::Entity::find()
            .filter(questions::Column::Status.eq(status::AVAILABLE))
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Question::from).collect())
    }

    /// Questions this user has answered, annotated with their counts.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Question>, StoreError> {
        let rows = users_questions::Entity::find()
            .filter(users_questions::Column::UserId.eq(user_id))
            .find_also_related(questions::Entity)
            .filter(questions::Column::Status.eq(status::AVAILABLE))
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(stat, question)| {
                question.map(|q| {
                    let mut q = Question::from(q);
                    q.nb_correct = Some(stat.nb_correct);
                    q.nb_wrong = Some(stat.nb_wrong);
                    q
                })
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Question>, StoreError> {
        let row = questions::Entity::find_by_id(id)
            .filter(questions::Column::Status.eq(status::AVAILABLE))
            .one(&self.conn)
            .await?;

        Ok(row.map(Question::from))
    }

    /// Update the text fields in place. An unknown id is a client error.
    pub async fn update(
        &self,
        id: &str,
        question: &str,
        answer: &str,
    ) -> Result<Question, StoreError> {
        let result = questions::Entity::update_many()
            .col_expr(questions::Column::Question, Expr::value(question))
            .col_expr(questions::Column::Answer, Expr::value(answer))
            .filter(questions::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::Validation(format!("unknown question id {id}")));
        }

        let row = questions::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("question {id}")))?;

        Ok(Question::from(row))
    }

    /// Soft-delete a question. Exactly one row must transition state.
    pub async fn soft_delete(&self, id: &str) -> Result<(), StoreError> {
        let result = questions::Entity::update_many()
            .col_expr(questions::Column::Status, Expr::value(status::DELETED))
            .filter(questions::Column::Id.eq(id))
            .filter(questions::Column::Status.eq(status::AVAILABLE))
            .exec(&self.conn)
            .await?;

        match result.rows_affected {
            0 => Err(StoreError::NotFound(format!("question {id}"))),
            1 => {
                debug!("Question {id} marked as deleted");
                Ok(())
            }
            n => {
                error!("Delete of question {id} affected {n} rows");
                Err(StoreError::Integrity(format!(
                    "delete of question {id} affected {n} rows"
                )))
            }
        }
    }

    /// Record one answer outcome for a (user, question) pair.
    ///
    /// A single upsert: the insert races with nobody because the conflict
    /// branch increments atomically inside the storage engine.
    pub async fn record_outcome(
        &self,
        user_id: &str,
        question_id: &str,
        correct: bool,
    ) -> Result<(), StoreError> {
        let bumped = if correct {
            users_questions::Column::NbCorrect
        } else {
            users_questions::Column::NbWrong
        };

        users_questions::Entity::insert(users_questions::ActiveModel {
            user_id: Set(user_id.to_string()),
            question_id: Set(question_id.to_string()),
            nb_correct: Set(i64::from(correct)),
            nb_wrong: Set(i64::from(!correct)),
        })
        .on_conflict(
            OnConflict::columns([
                users_questions::Column::UserId,
                users_questions::Column::QuestionId,
            ])
            .value(bumped, Expr::col(bumped).add(1))
            .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;

        Ok(())
    }
}
