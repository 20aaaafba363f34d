use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{project, project_member, task, user},
    models::{ids, role::Role},
    types::{ProjectStatus, RoleName},
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("project not found")]
    NotFound,
    #[error("owner not found")]
    OwnerNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub owner_name: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectWithRole {
    #[serde(flatten)]
    #[ts(flatten)]
    pub project: Project,
    pub role: String,
}

impl std::ops::Deref for ProjectWithRole {
    type Target = Project;
    fn deref(&self) -> &Self::Target {
        &self.project
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Project {
    async fn from_model<C: ConnectionTrait>(db: &C, model: project::Model) -> Result<Self, DbErr> {
        let owner = user::Entity::find_by_id(model.owner_id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Owner not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            name: model.name,
            description: model.description,
            owner_id: owner.uuid,
            owner_name: owner.name,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    /// Creates the project and enrolls the owner as a member with the owner
    /// role in the same call.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateProject,
        project_id: Uuid,
        owner: Uuid,
    ) -> Result<Self, ProjectError> {
        let owner_row_id = ids::user_id_by_uuid(db, owner)
            .await?
            .ok_or(ProjectError::OwnerNotFound)?;
        let owner_role = Role::find_by_name(db, RoleName::Owner)
            .await?
            .ok_or(DbErr::RecordNotFound("Owner role not seeded".to_string()))?;

        let now = Utc::now();
        let active = project::ActiveModel {
            uuid: Set(project_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            owner_id: Set(owner_row_id),
            status: Set(ProjectStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        let membership = project_member::ActiveModel {
            project_id: Set(model.id),
            user_id: Set(owner_row_id),
            role_id: Set(owner_role.id),
            joined_at: Set(now),
        };
        membership.insert(db).await?;

        Ok(Self::from_model(db, model).await?)
    }

    pub async fn find_by_uuid<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Lists the projects the user belongs to, with the role they hold in each.
    pub async fn find_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<ProjectWithRole>, DbErr> {
        let user_row_id = match ids::user_id_by_uuid(db, user_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let memberships = project_member::Entity::find()
            .filter(project_member::Column::UserId.eq(user_row_id))
            .all(db)
            .await?;

        let mut projects = Vec::with_capacity(memberships.len());
        for membership in memberships {
            let Some(model) = project::Entity::find_by_id(membership.project_id)
                .one(db)
                .await?
            else {
                continue;
            };
            let role = crate::entities::role::Entity::find_by_id(membership.role_id)
                .one(db)
                .await?
                .map(|r| r.name)
                .unwrap_or_default();
            projects.push(ProjectWithRole {
                project: Self::from_model(db, model).await?,
                role,
            });
        }
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Self, ProjectError> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ProjectError::NotFound)?;

        let mut active: project::ActiveModel = record.into();
        if let Some(name) = &data.name {
            active.name = Set(name.clone());
        }
        if let Some(description) = &data.description {
            // An empty string clears the description.
            if description.trim().is_empty() {
                active.description = Set(None);
            } else {
                active.description = Set(Some(description.clone()));
            }
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Marks the project finished. Finishing an already finished project is a
    /// no-op that still succeeds.
    pub async fn finish<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Self, ProjectError> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ProjectError::NotFound)?;

        if record.status == ProjectStatus::Finished {
            return Ok(Self::from_model(db, record).await?);
        }

        let mut active: project::ActiveModel = record.into();
        active.status = Set(ProjectStatus::Finished);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let row_id = match ids::project_id_by_uuid(db, id).await? {
            Some(id) => id,
            None => return Ok(0),
        };

        // Sqlite connections may not have the foreign_keys pragma on.
        task::Entity::delete_many()
            .filter(task::Column::ProjectId.eq(row_id))
            .exec(db)
            .await?;
        project_member::Entity::delete_many()
            .filter(project_member::Column::ProjectId.eq(row_id))
            .exec(db)
            .await?;
        let result = project::Entity::delete_by_id(row_id).exec(db).await?;
        Ok(result.rows_affected)
    }

    /// True when the user is the project owner. Missing projects and missing
    /// users both read as "not the owner".
    pub async fn is_owner<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DbErr> {
        let Some(user_row_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(false);
        };
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(project_id))
            .filter(project::Column::OwnerId.eq(user_row_id))
            .one(db)
            .await?;
        Ok(record.is_some())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::user::{CreateUser, User};

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_user(db: &sea_orm::DatabaseConnection, email: &str) -> User {
        User::create(
            db,
            &CreateUser {
                name: "Test User".to_string(),
                email: email.to_string(),
                password_hash: "hash".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn creating_a_project_enrolls_the_owner() {
        let db = setup_db().await;
        let owner = seed_user(&db, "owner@example.com").await;

        let project = Project::create(
            &db,
            &CreateProject {
                name: "Backend".to_string(),
                description: None,
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();
        assert_eq!(project.owner_id, owner.id);
        assert_eq!(project.status, ProjectStatus::Active);

        let listed = Project::find_for_user(&db, owner.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].role, "owner");
    }

    #[tokio::test]
    async fn finish_is_idempotent() {
        let db = setup_db().await;
        let owner = seed_user(&db, "owner@example.com").await;
        let project = Project::create(
            &db,
            &CreateProject {
                name: "Backend".to_string(),
                description: None,
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();

        let finished = Project::finish(&db, project.id).await.unwrap();
        assert_eq!(finished.status, ProjectStatus::Finished);
        let again = Project::finish(&db, project.id).await.unwrap();
        assert_eq!(again.status, ProjectStatus::Finished);
    }

    #[tokio::test]
    async fn empty_description_clears_the_field() {
        let db = setup_db().await;
        let owner = seed_user(&db, "owner@example.com").await;
        let project = Project::create(
            &db,
            &CreateProject {
                name: "Backend".to_string(),
                description: Some("initial".to_string()),
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();

        let updated = Project::update(
            &db,
            project.id,
            &UpdateProject {
                name: None,
                description: Some("  ".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.description, None);
    }

    #[tokio::test]
    async fn delete_removes_memberships() {
        let db = setup_db().await;
        let owner = seed_user(&db, "owner@example.com").await;
        let project = Project::create(
            &db,
            &CreateProject {
                name: "Backend".to_string(),
                description: None,
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();

        let deleted = Project::delete(&db, project.id).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(Project::find_by_uuid(&db, project.id).await.unwrap().is_none());
        assert!(Project::find_for_user(&db, owner.id).await.unwrap().is_empty());
    }
}
