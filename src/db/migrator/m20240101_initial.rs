use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

use crate::crypto;
use crate::db::status;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Default admin credentials seeded on first start. Meant to be replaced
/// by operators before exposing the service.
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Privileges)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(UsersPrivileges)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Sessions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Questions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(UsersQuestions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        seed_privileges_and_admin(manager).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsersQuestions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Questions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UsersPrivileges).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Privileges).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}

/// Seed the "admin" and "user" privileges plus a default admin account
/// holding both.
async fn seed_privileges_and_admin(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;

    let admin_privilege_id = uuid::Uuid::new_v4().to_string();
    let user_privilege_id = uuid::Uuid::new_v4().to_string();

    for (id, name) in [
        (&admin_privilege_id, "admin"),
        (&user_privilege_id, "user"),
    ] {
        let insert = Query::insert()
            .into_table(Privileges)
            .columns([
                crate::entities::privileges::Column::Id,
                crate::entities::privileges::Column::Name,
            ])
            .values_panic([id.as_str().into(), name.into()])
            .to_owned();
        manager.exec_stmt(insert).await?;
    }

    let admin_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let secret = crypto::derive_secret(DEFAULT_ADMIN_PASSWORD, crypto::DEFAULT_ITERATIONS);

    let insert = Query::insert()
        .into_table(Users)
        .columns([
            crate::entities::users::Column::Id,
            crate::entities::users::Column::Username,
            crate::entities::users::Column::PwHash,
            crate::entities::users::Column::PwSalt,
            crate::entities::users::Column::Status,
            crate::entities::users::Column::CreatedAt,
        ])
        .values_panic([
            admin_id.as_str().into(),
            DEFAULT_ADMIN_USERNAME.into(),
            BASE64.encode(&secret.hash).into(),
            BASE64.encode(&secret.salt).into(),
            status::AVAILABLE.into(),
            now.into(),
        ])
        .to_owned();
    manager.exec_stmt(insert).await?;

    for privilege_id in [&admin_privilege_id, &user_privilege_id] {
        let insert = Query::insert()
            .into_table(UsersPrivileges)
            .columns([
                crate::entities::users_privileges::Column::UserId,
                crate::entities::users_privileges::Column::PrivilegeId,
            ])
            .values_panic([admin_id.as_str().into(), privilege_id.as_str().into()])
            .to_owned();
        manager.exec_stmt(insert).await?;
    }

    Ok(())
}
