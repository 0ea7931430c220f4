use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "questions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// AVAILABLE or DELETED. Rows are never hard-deleted.
    pub status: String,

    pub question: String,

    pub answer: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users_questions::Entity")]
    UsersQuestions,
}

impl Related<super::users_questions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsersQuestions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
