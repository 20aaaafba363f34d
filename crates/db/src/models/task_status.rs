use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, sea_query::ExprTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::{
    entities::{task, task_status},
    types::SystemStatusKey,
};

#[derive(Debug, Error)]
pub enum TaskStatusError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("status not found")]
    NotFound,
    #[error("a status with that name or key already exists")]
    Duplicate,
    #[error("system statuses cannot be modified or deleted")]
    SystemProtected,
    #[error("status is in use by {0} task(s)")]
    InUse(u64),
    #[error("no fields to update")]
    NoFieldsToUpdate,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskStatus {
    pub id: i64,
    pub name: String,
    pub key: String,
    pub color: String,
    pub is_system: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTaskStatus {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateTaskStatus {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// A client-supplied status reference: either a numeric id or free text
/// holding a numeric string, a key, or a display name.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(untagged)]
pub enum StatusInput {
    Id(i64),
    Text(String),
}

/// Row ids of the seeded statuses the lifecycle engine needs at runtime.
#[derive(Debug, Clone, Copy)]
pub struct SystemStatusIds {
    pub pending: i64,
    pub completed: i64,
    pub overdue: i64,
}

/// Derives a stable lookup key from a display name: lowercased, runs of
/// whitespace collapsed to `_`, everything outside `[a-z0-9_]` dropped.
pub fn derive_key(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

impl TaskStatus {
    fn from_model(model: task_status::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            key: model.key,
            color: model.color,
            is_system: model.is_system,
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = task_status::Entity::find()
            .order_by_asc(task_status::Column::Id)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = task_status::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateTaskStatus,
    ) -> Result<Self, TaskStatusError> {
        let key = derive_key(&data.name);
        let clash = task_status::Entity::find()
            .filter(
                task_status::Column::Name
                    .eq(data.name.as_str())
                    .or(task_status::Column::Key.eq(key.as_str())),
            )
            .one(db)
            .await?;
        if clash.is_some() {
            return Err(TaskStatusError::Duplicate);
        }

        let active = task_status::ActiveModel {
            name: Set(data.name.clone()),
            key: Set(key),
            color: Set(data.color.clone().unwrap_or_else(|| "#808080".to_string())),
            is_system: Set(false),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    /// Updates name and/or color. The key is fixed at creation and system
    /// statuses cannot be touched.
    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: i64,
        data: &UpdateTaskStatus,
    ) -> Result<Self, TaskStatusError> {
        if data.name.is_none() && data.color.is_none() {
            return Err(TaskStatusError::NoFieldsToUpdate);
        }

        let record = task_status::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(TaskStatusError::NotFound)?;
        if record.is_system {
            return Err(TaskStatusError::SystemProtected);
        }

        if let Some(name) = data.name.as_deref()
            && name != record.name
        {
            let clash = task_status::Entity::find()
                .filter(task_status::Column::Name.eq(name))
                .filter(task_status::Column::Id.ne(id))
                .one(db)
                .await?;
            if clash.is_some() {
                return Err(TaskStatusError::Duplicate);
            }
        }

        let mut active: task_status::ActiveModel = record.into();
        if let Some(name) = &data.name {
            active.name = Set(name.clone());
        }
        if let Some(color) = &data.color {
            active.color = Set(color.clone());
        }
        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    /// Removes a custom status. Checked in order: existence, system
    /// protection, references from tasks.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), TaskStatusError> {
        let record = task_status::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(TaskStatusError::NotFound)?;
        if record.is_system {
            return Err(TaskStatusError::SystemProtected);
        }

        let in_use = task::Entity::find()
            .filter(task::Column::StatusId.eq(id))
            .count(db)
            .await?;
        if in_use > 0 {
            return Err(TaskStatusError::InUse(in_use));
        }

        task_status::Entity::delete_by_id(id).exec(db).await?;
        Ok(())
    }

    /// Resolves a client-supplied reference to a stored status. Numeric input
    /// (including numeric strings) is treated as an id; other text must match
    /// a key or a display name exactly, case sensitively.
    pub async fn resolve<C: ConnectionTrait>(
        db: &C,
        input: &StatusInput,
    ) -> Result<Option<Self>, DbErr> {
        match input {
            StatusInput::Id(id) => Self::find_by_id(db, *id).await,
            StatusInput::Text(text) => {
                if let Ok(id) = text.parse::<i64>() {
                    return Self::find_by_id(db, id).await;
                }
                let record = task_status::Entity::find()
                    .filter(
                        task_status::Column::Key
                            .eq(text.as_str())
                            .or(task_status::Column::Name.eq(text.as_str())),
                    )
                    .one(db)
                    .await?;
                Ok(record.map(Self::from_model))
            }
        }
    }

    pub async fn id_for_key<C: ConnectionTrait>(
        db: &C,
        key: SystemStatusKey,
    ) -> Result<i64, DbErr> {
        let record = task_status::Entity::find()
            .filter(task_status::Column::Key.eq(key.as_key()))
            .one(db)
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!("System status '{}' not seeded", key.as_key()))
            })?;
        Ok(record.id)
    }
}

impl SystemStatusIds {
    pub async fn load<C: ConnectionTrait>(db: &C) -> Result<Self, DbErr> {
        Ok(Self {
            pending: TaskStatus::id_for_key(db, SystemStatusKey::Pending).await?,
            completed: TaskStatus::id_for_key(db, SystemStatusKey::Completed).await?,
            overdue: TaskStatus::id_for_key(db, SystemStatusKey::Overdue).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[test]
    fn key_derivation() {
        assert_eq!(derive_key("In Review"), "in_review");
        assert_eq!(derive_key("  QA   Pass 2 "), "qa_pass_2");
        assert_eq!(derive_key("Blocked!"), "blocked");
        assert_eq!(derive_key("Énfasis"), "nfasis");
    }

    #[tokio::test]
    async fn resolve_accepts_id_numeric_string_key_and_name() {
        let db = setup_db().await;
        let created = TaskStatus::create(
            &db,
            &CreateTaskStatus {
                name: "In Review".to_string(),
                color: None,
            },
        )
        .await
        .unwrap();

        let by_id = TaskStatus::resolve(&db, &StatusInput::Id(created.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.id, created.id);

        let by_numeric_string =
            TaskStatus::resolve(&db, &StatusInput::Text(created.id.to_string()))
                .await
                .unwrap()
                .unwrap();
        assert_eq!(by_numeric_string.id, created.id);

        let by_key = TaskStatus::resolve(&db, &StatusInput::Text("in_review".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_key.id, created.id);

        let by_name = TaskStatus::resolve(&db, &StatusInput::Text("In Review".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, created.id);

        // Matching is case sensitive for keys and names.
        let miss = TaskStatus::resolve(&db, &StatusInput::Text("IN_REVIEW".to_string()))
            .await
            .unwrap();
        assert!(miss.is_none());

        let unknown_id = TaskStatus::resolve(&db, &StatusInput::Id(9999)).await.unwrap();
        assert!(unknown_id.is_none());
    }

    #[tokio::test]
    async fn duplicate_name_or_key_is_rejected() {
        let db = setup_db().await;
        TaskStatus::create(
            &db,
            &CreateTaskStatus {
                name: "In Review".to_string(),
                color: None,
            },
        )
        .await
        .unwrap();

        // Same name.
        let err = TaskStatus::create(
            &db,
            &CreateTaskStatus {
                name: "In Review".to_string(),
                color: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskStatusError::Duplicate));

        // Different name, same derived key.
        let err = TaskStatus::create(
            &db,
            &CreateTaskStatus {
                name: "in review".to_string(),
                color: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskStatusError::Duplicate));
    }

    #[tokio::test]
    async fn system_statuses_are_protected() {
        let db = setup_db().await;
        let ids = SystemStatusIds::load(&db).await.unwrap();

        let err = TaskStatus::delete(&db, ids.pending).await.unwrap_err();
        assert!(matches!(err, TaskStatusError::SystemProtected));

        let err = TaskStatus::update(
            &db,
            ids.pending,
            &UpdateTaskStatus {
                name: Some("Renamed".to_string()),
                color: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskStatusError::SystemProtected));
    }

    #[tokio::test]
    async fn delete_checks_existence_before_protection() {
        let db = setup_db().await;
        let err = TaskStatus::delete(&db, 9999).await.unwrap_err();
        assert!(matches!(err, TaskStatusError::NotFound));
    }

    #[tokio::test]
    async fn zero_field_update_is_rejected() {
        let db = setup_db().await;
        let created = TaskStatus::create(
            &db,
            &CreateTaskStatus {
                name: "Custom".to_string(),
                color: None,
            },
        )
        .await
        .unwrap();
        let err = TaskStatus::update(
            &db,
            created.id,
            &UpdateTaskStatus {
                name: None,
                color: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TaskStatusError::NoFieldsToUpdate));
    }

    #[tokio::test]
    async fn update_keeps_key_stable() {
        let db = setup_db().await;
        let created = TaskStatus::create(
            &db,
            &CreateTaskStatus {
                name: "First Pass".to_string(),
                color: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(created.key, "first_pass");

        let updated = TaskStatus::update(
            &db,
            created.id,
            &UpdateTaskStatus {
                name: Some("Second Pass".to_string()),
                color: Some("#123456".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Second Pass");
        assert_eq!(updated.key, "first_pass");
        assert_eq!(updated.color, "#123456");
    }
}
