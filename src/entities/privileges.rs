use sea_orm::entity::prelude::*;

/// Immutable reference data ("admin", "user"), seeded by migration.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "privileges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users_privileges::Entity")]
    UsersPrivileges,
}

impl Related<super::users_privileges::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsersPrivileges.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        super::users_privileges::Relation::Users.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::users_privileges::Relation::Privileges.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
