use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{project_member, role, user},
    models::ids,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectMemberInfo {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

pub struct ProjectMember;

impl ProjectMember {
    /// Adds a membership row unless one already exists. Returns whether a row
    /// was inserted, so re-adding an existing member is a quiet success.
    pub async fn add<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
        role_id: i64,
    ) -> Result<bool, DbErr> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        let existing = project_member::Entity::find_by_id((project_row_id, user_row_id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let active = project_member::ActiveModel {
            project_id: Set(project_row_id),
            user_id: Set(user_row_id),
            role_id: Set(role_id),
            joined_at: Set(Utc::now()),
        };
        active.insert(db).await?;
        Ok(true)
    }

    pub async fn remove<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, DbErr> {
        let Some(project_row_id) = ids::project_id_by_uuid(db, project_id).await? else {
            return Ok(0);
        };
        let Some(user_row_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(0);
        };

        let result = project_member::Entity::delete_by_id((project_row_id, user_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn exists<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DbErr> {
        let Some(project_row_id) = ids::project_id_by_uuid(db, project_id).await? else {
            return Ok(false);
        };
        let Some(user_row_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(false);
        };
        let existing = project_member::Entity::find_by_id((project_row_id, user_row_id))
            .one(db)
            .await?;
        Ok(existing.is_some())
    }

    pub async fn members_of<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<ProjectMemberInfo>, DbErr> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let memberships = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .all(db)
            .await?;

        let mut members = Vec::with_capacity(memberships.len());
        for membership in memberships {
            let Some(member) = user::Entity::find_by_id(membership.user_id).one(db).await? else {
                continue;
            };
            let role_name = role::Entity::find_by_id(membership.role_id)
                .one(db)
                .await?
                .map(|r| r.name)
                .unwrap_or_default();
            members.push(ProjectMemberInfo {
                user_id: member.uuid,
                name: member.name,
                email: member.email,
                role: role_name,
                joined_at: membership.joined_at,
            });
        }
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::{
        models::{
            project::{CreateProject, Project},
            role::Role,
            user::{CreateUser, User},
        },
        types::RoleName,
    };

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
    async fn adding_a_member_twice_leaves_one_row() {
        let db = setup_db().await;
        let owner = seed_user(&db, "owner@example.com").await;
        let member = seed_user(&db, "member@example.com").await;
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
        let member_role = Role::find_by_name(&db, RoleName::Member)
            .await
            .unwrap()
            .unwrap();

        let added = ProjectMember::add(&db, project.id, member.id, member_role.id)
            .await
            .unwrap();
        assert!(added);
        let added_again = ProjectMember::add(&db, project.id, member.id, member_role.id)
            .await
            .unwrap();
        assert!(!added_again);

        let members = ProjectMember::members_of(&db, project.id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert!(ProjectMember::exists(&db, project.id, member.id).await.unwrap());
    }

    #[tokio::test]
    async fn remove_reports_rows_affected() {
        let db = setup_db().await;
        let owner = seed_user(&db, "owner@example.com").await;
        let member = seed_user(&db, "member@example.com").await;
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
        let member_role = Role::find_by_name(&db, RoleName::Member)
            .await
            .unwrap()
            .unwrap();
        ProjectMember::add(&db, project.id, member.id, member_role.id)
            .await
            .unwrap();

        assert_eq!(
            ProjectMember::remove(&db, project.id, member.id).await.unwrap(),
            1
        );
        assert_eq!(
            ProjectMember::remove(&db, project.id, member.id).await.unwrap(),
            0
        );
    }
}
