mod model_loaders;

pub use model_loaders::{load_group_middleware, load_project_middleware, load_task_middleware};
