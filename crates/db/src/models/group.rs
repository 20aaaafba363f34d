use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{group, group_member, user},
    models::ids,
    types::GroupLifecycle,
};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("group not found")]
    NotFound,
    #[error("owner not found")]
    OwnerNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub owner_name: String,
    pub status: GroupLifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateGroup {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Group {
    async fn from_model<C: ConnectionTrait>(db: &C, model: group::Model) -> Result<Self, DbErr> {
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

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateGroup,
        group_id: Uuid,
        owner: Uuid,
    ) -> Result<Self, GroupError> {
        let owner_row_id = ids::user_id_by_uuid(db, owner)
            .await?
            .ok_or(GroupError::OwnerNotFound)?;

        let now = Utc::now();
        let active = group::ActiveModel {
            uuid: Set(group_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            owner_id: Set(owner_row_id),
            status: Set(GroupLifecycle::Active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        let membership = group_member::ActiveModel {
            group_id: Set(model.id),
            user_id: Set(owner_row_id),
            joined_at: Set(now),
        };
        membership.insert(db).await?;

        Ok(Self::from_model(db, model).await?)
    }

    /// Looks up an active group. Soft-deleted groups read as absent.
    pub async fn find_by_uuid<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = group::Entity::find()
            .filter(group::Column::Uuid.eq(id))
            .filter(group::Column::Status.eq(GroupLifecycle::Active))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let user_row_id = match ids::user_id_by_uuid(db, user_id).await? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        let memberships = group_member::Entity::find()
            .filter(group_member::Column::UserId.eq(user_row_id))
            .all(db)
            .await?;

        let mut groups = Vec::with_capacity(memberships.len());
        for membership in memberships {
            let record = group::Entity::find_by_id(membership.group_id)
                .filter(group::Column::Status.eq(GroupLifecycle::Active))
                .one(db)
                .await?;
            if let Some(model) = record {
                groups.push(Self::from_model(db, model).await?);
            }
        }
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(groups)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateGroup,
    ) -> Result<Self, GroupError> {
        let record = group::Entity::find()
            .filter(group::Column::Uuid.eq(id))
            .filter(group::Column::Status.eq(GroupLifecycle::Active))
            .one(db)
            .await?
            .ok_or(GroupError::NotFound)?;

        let mut active: group::ActiveModel = record.into();
        if let Some(name) = &data.name {
            active.name = Set(name.clone());
        }
        if let Some(description) = &data.description {
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

    /// Marks the group deleted. The row and its memberships stay in place so
    /// history survives; every read path filters them out.
    pub async fn soft_delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), GroupError> {
        let record = group::Entity::find()
            .filter(group::Column::Uuid.eq(id))
            .filter(group::Column::Status.eq(GroupLifecycle::Active))
            .one(db)
            .await?
            .ok_or(GroupError::NotFound)?;

        let mut active: group::ActiveModel = record.into();
        active.status = Set(GroupLifecycle::Deleted);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        Ok(())
    }

    pub async fn is_owner<C: ConnectionTrait>(
        db: &C,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DbErr> {
        let Some(user_row_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(false);
        };
        let record = group::Entity::find()
            .filter(group::Column::Uuid.eq(group_id))
            .filter(group::Column::Status.eq(GroupLifecycle::Active))
            .filter(group::Column::OwnerId.eq(user_row_id))
            .one(db)
            .await?;
        Ok(record.is_some())
    }
}
