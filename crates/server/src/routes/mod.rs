pub mod auth;
pub mod groups;
pub mod health;
pub mod projects;
pub mod roles;
pub mod task_statuses;
pub mod tasks;
pub mod users;
