use db::{ConnectionTrait, DbErr};
use db::models::{
    group::Group, group_member::GroupMember, project::Project, project_member::ProjectMember,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("you do not have access to this project")]
    Forbidden,
    #[error("not found")]
    NotFound,
}

/// Project checks fail loudly: a caller who is not a member learns the
/// project exists but is off limits. Group checks fail quietly: outsiders see
/// the same response a missing group would produce.
pub async fn ensure_project_member<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<(), AccessError> {
    if ProjectMember::exists(db, project_id, user_id).await? {
        Ok(())
    } else {
        Err(AccessError::Forbidden)
    }
}

pub async fn ensure_project_owner<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<(), AccessError> {
    if Project::is_owner(db, project_id, user_id).await? {
        Ok(())
    } else {
        Err(AccessError::Forbidden)
    }
}

pub async fn ensure_group_member<C: ConnectionTrait>(
    db: &C,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<(), AccessError> {
    if GroupMember::exists(db, group_id, user_id).await? {
        Ok(())
    } else {
        Err(AccessError::NotFound)
    }
}

pub async fn ensure_group_owner<C: ConnectionTrait>(
    db: &C,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<(), AccessError> {
    if Group::is_owner(db, group_id, user_id).await? {
        Ok(())
    } else {
        Err(AccessError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use db::models::{
        group::CreateGroup,
        project::CreateProject,
        role::Role,
        user::{CreateUser, User},
    };
    use db::types::RoleName;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

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
    async fn project_checks_distinguish_member_and_owner() {
        let db = setup_db().await;
        let owner = seed_user(&db, "owner@example.com").await;
        let member = seed_user(&db, "member@example.com").await;
        let outsider = seed_user(&db, "outsider@example.com").await;

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

        ensure_project_member(&db, project.id, member.id).await.unwrap();
        ensure_project_owner(&db, project.id, owner.id).await.unwrap();

        let err = ensure_project_member(&db, project.id, outsider.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Forbidden));

        let err = ensure_project_owner(&db, project.id, member.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Forbidden));
    }

    #[tokio::test]
    async fn group_checks_fail_as_not_found() {
        let db = setup_db().await;
        let owner = seed_user(&db, "owner@example.com").await;
        let outsider = seed_user(&db, "outsider@example.com").await;

        let group = Group::create(
            &db,
            &CreateGroup {
                name: "Research".to_string(),
                description: None,
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();

        ensure_group_member(&db, group.id, owner.id).await.unwrap();
        ensure_group_owner(&db, group.id, owner.id).await.unwrap();

        let err = ensure_group_member(&db, group.id, outsider.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotFound));

        let err = ensure_group_owner(&db, group.id, outsider.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotFound));

        // A group that never existed produces the same error.
        let err = ensure_group_member(&db, Uuid::new_v4(), owner.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotFound));
    }

    #[tokio::test]
    async fn deleted_groups_fail_every_check() {
        let db = setup_db().await;
        let owner = seed_user(&db, "owner@example.com").await;

        let group = Group::create(
            &db,
            &CreateGroup {
                name: "Research".to_string(),
                description: None,
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();
        Group::soft_delete(&db, group.id).await.unwrap();

        // Even the owner's own membership reads as absent once the group is
        // soft deleted.
        let err = ensure_group_member(&db, group.id, owner.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotFound));

        let err = ensure_group_owner(&db, group.id, owner.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotFound));
    }
}
