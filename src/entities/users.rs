use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Opaque UUID, assigned at registration.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    /// PBKDF2-HMAC-SHA256 derivation of the password, base64.
    pub pw_hash: String,

    /// Random per-user salt, base64.
    pub pw_salt: String,

    /// AVAILABLE or DELETED. Rows are never hard-deleted.
    pub status: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sessions::Entity")]
    Sessions,

    #[sea_orm(has_many = "super::users_privileges::Entity")]
    UsersPrivileges,

    #[sea_orm(has_many = "super::users_questions::Entity")]
    UsersQuestions,
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::privileges::Entity> for Entity {
    fn to() -> RelationDef {
        super::users_privileges::Relation::Privileges.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::users_privileges::Relation::Users.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
