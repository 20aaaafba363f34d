use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{task, task_status, user},
    models::{
        ids,
        task_status::{SystemStatusIds, TaskStatus},
    },
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("task not found")]
    NotFound,
    #[error("project not found")]
    ProjectNotFound,
    #[error("assignee not found")]
    AssigneeNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status_id: i64,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskWithStatus {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub status_name: String,
    pub status_key: String,
    pub status_color: String,
    pub assigned_to_name: Option<String>,
}

impl std::ops::Deref for TaskWithStatus {
    type Target = Task;
    fn deref(&self) -> &Self::Target {
        &self.task
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status_id: Option<i64>,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

pub struct UpdateTask {
    pub title: String,
    pub description: Option<String>,
    pub status_id: i64,
    pub assigned_to: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let project_id = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let assigned_to = match model.assigned_to {
            Some(id) => ids::user_uuid_by_id(db, id).await?,
            None => None,
        };

        Ok(Self {
            id: model.uuid,
            project_id,
            title: model.title,
            description: model.description,
            status_id: model.status_id,
            assigned_to,
            due_date: model.due_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    async fn with_status<C: ConnectionTrait>(
        db: &C,
        model: task::Model,
    ) -> Result<TaskWithStatus, DbErr> {
        let status = task_status::Entity::find_by_id(model.status_id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Status not found".to_string()))?;
        let assigned_to_name = match model.assigned_to {
            Some(id) => user::Entity::find_by_id(id).one(db).await?.map(|u| u.name),
            None => None,
        };
        let task = Self::from_model(db, model).await?;
        Ok(TaskWithStatus {
            task,
            status_name: status.name,
            status_key: status.key,
            status_color: status.color,
            assigned_to_name,
        })
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTask,
        task_id: Uuid,
        project_id: Uuid,
    ) -> Result<TaskWithStatus, TaskError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(TaskError::ProjectNotFound)?;
        let assigned_to = match data.assigned_to {
            Some(id) => Some(
                ids::user_id_by_uuid(db, id)
                    .await?
                    .ok_or(TaskError::AssigneeNotFound)?,
            ),
            None => None,
        };
        let status_id = match data.status_id {
            Some(id) => id,
            None => TaskStatus::id_for_key(db, crate::types::SystemStatusKey::Pending).await?,
        };

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            project_id: Set(project_row_id),
            assigned_to: Set(assigned_to),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            status_id: Set(status_id),
            due_date: Set(data.due_date),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::with_status(db, model).await?)
    }

    /// Lists a project's tasks as of `now`. Any task past its due date that is
    /// neither completed nor already overdue is reported as overdue, and the
    /// flip is persisted in the background without blocking the read.
    pub async fn find_by_project(
        db: &DatabaseConnection,
        project_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<TaskWithStatus>, DbErr> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let system = SystemStatusIds::load(db).await?;

        let models = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(models.len());
        for mut model in models {
            Self::sweep_overdue(db, &mut model, &system, now);
            tasks.push(Self::with_status(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn find_by_uuid(
        db: &DatabaseConnection,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskWithStatus>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;
        let Some(mut model) = record else {
            return Ok(None);
        };
        let system = SystemStatusIds::load(db).await?;
        Self::sweep_overdue(db, &mut model, &system, now);
        Ok(Some(Self::with_status(db, model).await?))
    }

    /// Flips the in-memory model to overdue when its due date has passed and
    /// schedules the write. Completed and already overdue tasks never flip.
    fn sweep_overdue(
        db: &DatabaseConnection,
        model: &mut task::Model,
        system: &SystemStatusIds,
        now: DateTime<Utc>,
    ) {
        let past_due = model.due_date.is_some_and(|due| due < now);
        if !past_due || model.status_id == system.completed || model.status_id == system.overdue {
            return;
        }

        model.status_id = system.overdue;
        let conn = db.clone();
        let task_uuid = model.uuid;
        let overdue_id = system.overdue;
        tokio::spawn(async move {
            if let Err(err) = Task::persist_status(&conn, task_uuid, overdue_id).await {
                tracing::warn!("Failed to persist overdue flip for task {task_uuid}: {err}");
            }
        });
    }

    pub async fn persist_status<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        status_id: i64,
    ) -> Result<(), DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let mut active: task::ActiveModel = record.into();
        active.status_id = Set(status_id);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        Ok(())
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateTask,
    ) -> Result<TaskWithStatus, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;

        let assigned_to = match data.assigned_to {
            Some(id) => Some(
                ids::user_id_by_uuid(db, id)
                    .await?
                    .ok_or(TaskError::AssigneeNotFound)?,
            ),
            None => None,
        };

        let mut active: task::ActiveModel = record.into();
        active.title = Set(data.title.clone());
        active.description = Set(data.description.clone());
        active.status_id = Set(data.status_id);
        active.assigned_to = Set(assigned_to);
        active.due_date = Set(data.due_date);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;
        Ok(Self::with_status(db, updated).await?)
    }

    pub async fn assign<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        assignee: Option<Uuid>,
    ) -> Result<TaskWithStatus, TaskError> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::NotFound)?;

        let assigned_to = match assignee {
            Some(id) => Some(
                ids::user_id_by_uuid(db, id)
                    .await?
                    .ok_or(TaskError::AssigneeNotFound)?,
            ),
            None => None,
        };

        let mut active: task::ActiveModel = record.into();
        active.assigned_to = Set(assigned_to);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;
        Ok(Self::with_status(db, updated).await?)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = task::Entity::delete_many()
            .filter(task::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::{
        project::{CreateProject, Project},
        task_status::{CreateTaskStatus, TaskStatus, TaskStatusError},
        user::{CreateUser, User},
    };

    // A single pooled connection keeps the background status writer on the
    // same in-memory database as the assertions.
    async fn setup_db() -> DatabaseConnection {
        let mut options = sea_orm::ConnectOptions::new("sqlite::memory:");
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_project(db: &DatabaseConnection) -> Project {
        let owner = User::create(
            db,
            &CreateUser {
                name: "Owner".to_string(),
                email: "owner@example.com".to_string(),
                password_hash: "hash".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        Project::create(
            db,
            &CreateProject {
                name: "Backend".to_string(),
                description: None,
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap()
    }

    fn create_data(title: &str, due_date: Option<DateTime<Utc>>) -> CreateTask {
        CreateTask {
            title: title.to_string(),
            description: None,
            status_id: None,
            assigned_to: None,
            due_date,
        }
    }

    #[tokio::test]
    async fn new_tasks_default_to_pending() {
        let db = setup_db().await;
        let project = seed_project(&db).await;

        let task = Task::create(&db, &create_data("Write docs", None), Uuid::new_v4(), project.id)
            .await
            .unwrap();
        assert_eq!(task.status_key, "pending");
    }

    #[tokio::test]
    async fn past_due_task_reads_as_overdue_and_persists() {
        let db = setup_db().await;
        let project = seed_project(&db).await;
        let yesterday = Utc::now() - Duration::days(1);

        let task = Task::create(
            &db,
            &create_data("Late task", Some(yesterday)),
            Uuid::new_v4(),
            project.id,
        )
        .await
        .unwrap();
        assert_eq!(task.status_key, "pending");

        let read = Task::find_by_uuid(&db, task.id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.status_key, "overdue");

        // The flip lands in the database shortly after the read returns.
        let system = SystemStatusIds::load(&db).await.unwrap();
        let mut persisted = false;
        for _ in 0..50 {
            let row = task::Entity::find()
                .filter(task::Column::Uuid.eq(task.id))
                .one(&db)
                .await
                .unwrap()
                .unwrap();
            if row.status_id == system.overdue {
                persisted = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(persisted);
    }

    #[tokio::test]
    async fn completed_tasks_never_flip_to_overdue() {
        let db = setup_db().await;
        let project = seed_project(&db).await;
        let system = SystemStatusIds::load(&db).await.unwrap();
        let yesterday = Utc::now() - Duration::days(1);

        let task = Task::create(
            &db,
            &CreateTask {
                title: "Done early".to_string(),
                description: None,
                status_id: Some(system.completed),
                assigned_to: None,
                due_date: Some(yesterday),
            },
            Uuid::new_v4(),
            project.id,
        )
        .await
        .unwrap();

        let read = Task::find_by_uuid(&db, task.id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.status_key, "completed");
    }

    #[tokio::test]
    async fn overdue_flip_is_monotonic() {
        let db = setup_db().await;
        let project = seed_project(&db).await;
        let system = SystemStatusIds::load(&db).await.unwrap();
        let yesterday = Utc::now() - Duration::days(1);

        let task = Task::create(
            &db,
            &CreateTask {
                title: "Already overdue".to_string(),
                description: None,
                status_id: Some(system.overdue),
                assigned_to: None,
                due_date: Some(yesterday),
            },
            Uuid::new_v4(),
            project.id,
        )
        .await
        .unwrap();

        // Reading again does not schedule another write or change the status.
        let read = Task::find_by_uuid(&db, task.id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.status_key, "overdue");
    }

    #[tokio::test]
    async fn status_in_use_blocks_deletion() {
        let db = setup_db().await;
        let project = seed_project(&db).await;
        let custom = TaskStatus::create(
            &db,
            &CreateTaskStatus {
                name: "In Review".to_string(),
                color: None,
            },
        )
        .await
        .unwrap();

        Task::create(
            &db,
            &CreateTask {
                title: "Reviewed task".to_string(),
                description: None,
                status_id: Some(custom.id),
                assigned_to: None,
                due_date: None,
            },
            Uuid::new_v4(),
            project.id,
        )
        .await
        .unwrap();

        let err = TaskStatus::delete(&db, custom.id).await.unwrap_err();
        assert!(matches!(err, TaskStatusError::InUse(1)));
    }

    #[tokio::test]
    async fn assign_and_unassign() {
        let db = setup_db().await;
        let project = seed_project(&db).await;
        let assignee = User::create(
            &db,
            &CreateUser {
                name: "Assignee".to_string(),
                email: "assignee@example.com".to_string(),
                password_hash: "hash".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let task = Task::create(&db, &create_data("Work item", None), Uuid::new_v4(), project.id)
            .await
            .unwrap();

        let assigned = Task::assign(&db, task.id, Some(assignee.id)).await.unwrap();
        assert_eq!(assigned.assigned_to, Some(assignee.id));
        assert_eq!(assigned.assigned_to_name.as_deref(), Some("Assignee"));

        let cleared = Task::assign(&db, task.id, None).await.unwrap();
        assert_eq!(cleared.assigned_to, None);

        let err = Task::assign(&db, task.id, Some(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, TaskError::AssigneeNotFound));
    }
}
