use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    entities::{group_member, user},
    models::ids,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct GroupMemberInfo {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

pub struct GroupMember;

impl GroupMember {
    pub async fn add<C: ConnectionTrait>(
        db: &C,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DbErr> {
        let group_row_id = ids::group_id_by_uuid(db, group_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Group not found".to_string()))?;
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        Self::add_by_row_ids(db, group_row_id, user_row_id).await
    }

    async fn add_by_row_ids<C: ConnectionTrait>(
        db: &C,
        group_row_id: i64,
        user_row_id: i64,
    ) -> Result<bool, DbErr> {
        let existing = group_member::Entity::find_by_id((group_row_id, user_row_id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let active = group_member::ActiveModel {
            group_id: Set(group_row_id),
            user_id: Set(user_row_id),
            joined_at: Set(Utc::now()),
        };
        active.insert(db).await?;
        Ok(true)
    }

    /// Adds a batch of users and returns how many rows were inserted. Unknown
    /// users and existing members are skipped without failing the batch.
    pub async fn add_many<C: ConnectionTrait>(
        db: &C,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<usize, DbErr> {
        let group_row_id = ids::group_id_by_uuid(db, group_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Group not found".to_string()))?;

        let mut added = 0;
        for user_id in user_ids {
            let Some(user_row_id) = ids::user_id_by_uuid(db, *user_id).await? else {
                continue;
            };
            if Self::add_by_row_ids(db, group_row_id, user_row_id).await? {
                added += 1;
            }
        }
        Ok(added)
    }

    pub async fn remove<C: ConnectionTrait>(
        db: &C,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, DbErr> {
        let Some(group_row_id) = ids::group_id_by_uuid(db, group_id).await? else {
            return Ok(0);
        };
        let Some(user_row_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(0);
        };

        let result = group_member::Entity::delete_by_id((group_row_id, user_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// True when the user belongs to the group and the group is still active.
    /// Memberships of soft-deleted groups read as absent.
    pub async fn exists<C: ConnectionTrait>(
        db: &C,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, DbErr> {
        let Some(group_row_id) = ids::active_group_id_by_uuid(db, group_id).await? else {
            return Ok(false);
        };
        let Some(user_row_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(false);
        };
        let existing = group_member::Entity::find_by_id((group_row_id, user_row_id))
            .one(db)
            .await?;
        Ok(existing.is_some())
    }

    pub async fn members_of<C: ConnectionTrait>(
        db: &C,
        group_id: Uuid,
    ) -> Result<Vec<GroupMemberInfo>, DbErr> {
        let group_row_id = ids::group_id_by_uuid(db, group_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Group not found".to_string()))?;

        let memberships = group_member::Entity::find()
            .filter(group_member::Column::GroupId.eq(group_row_id))
            .all(db)
            .await?;

        let mut members = Vec::with_capacity(memberships.len());
        for membership in memberships {
            let Some(member) = user::Entity::find_by_id(membership.user_id).one(db).await? else {
                continue;
            };
            members.push(GroupMemberInfo {
                user_id: member.uuid,
                name: member.name,
                email: member.email,
                joined_at: membership.joined_at,
            });
        }
        Ok(members)
    }
}
