use serde::{Deserialize, Serialize};

use crate::db::{Question, User};
use crate::services::AuthenticatedUser;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Presentation projection of a user. Hash and salt never appear here.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            token: None,
        }
    }
}

impl From<&AuthenticatedUser> for UserDto {
    fn from(identity: &AuthenticatedUser) -> Self {
        Self {
            id: identity.id.clone(),
            username: identity.username.clone(),
            token: identity.token.clone(),
        }
    }
}

/// Presentation projection of a question. Counts appear only on the
/// per-user listing.
#[derive(Debug, Serialize)]
pub struct QuestionDto {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nb_correct: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nb_wrong: Option<i64>,
}

impl From<Question> for QuestionDto {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            question: question.question,
            answer: question.answer,
            nb_correct: question.nb_correct,
            nb_wrong: question.nb_wrong,
        }
    }
}
