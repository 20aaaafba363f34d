pub mod api_key;
pub mod group;
pub mod group_member;
pub mod project;
pub mod project_member;
pub mod role;
pub mod task;
pub mod task_status;
pub mod token_blocklist;
pub mod user;
