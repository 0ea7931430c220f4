pub use super::privileges::Entity as Privileges;
pub use super::questions::Entity as Questions;
pub use super::sessions::Entity as Sessions;
pub use super::users::Entity as Users;
pub use super::users_privileges::Entity as UsersPrivileges;
pub use super::users_questions::Entity as UsersQuestions;
