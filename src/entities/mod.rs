pub mod prelude;

pub mod privileges;
pub mod questions;
pub mod sessions;
pub mod users;
pub mod users_privileges;
pub mod users_questions;
