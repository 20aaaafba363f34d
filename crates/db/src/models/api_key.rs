use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::{entities::api_key, types::ApiKeyStatus};

pub struct ApiKey;

impl ApiKey {
    /// True when the key exists and has not been revoked.
    pub async fn is_active<C: ConnectionTrait>(db: &C, key: &str) -> Result<bool, DbErr> {
        let record = api_key::Entity::find()
            .filter(api_key::Column::ApiKey.eq(key))
            .filter(api_key::Column::Status.eq(ApiKeyStatus::Active))
            .one(db)
            .await?;
        Ok(record.is_some())
    }

    pub async fn issue<C: ConnectionTrait>(db: &C) -> Result<String, DbErr> {
        let key = Uuid::new_v4().simple().to_string();
        let active = api_key::ActiveModel {
            api_key: Set(key.clone()),
            status: Set(ApiKeyStatus::Active),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        active.insert(db).await?;
        Ok(key)
    }

    pub async fn revoke<C: ConnectionTrait>(db: &C, key: &str) -> Result<bool, DbErr> {
        let record = api_key::Entity::find()
            .filter(api_key::Column::ApiKey.eq(key))
            .one(db)
            .await?;
        let Some(record) = record else {
            return Ok(false);
        };
        let mut active: api_key::ActiveModel = record.into();
        active.status = Set(ApiKeyStatus::Revoked);
        active.update(db).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    #[tokio::test]
    async fn issue_and_revoke() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();

        let key = ApiKey::issue(&db).await.unwrap();
        assert!(ApiKey::is_active(&db, &key).await.unwrap());

        assert!(ApiKey::revoke(&db, &key).await.unwrap());
        assert!(!ApiKey::is_active(&db, &key).await.unwrap());
        assert!(!ApiKey::revoke(&db, "missing").await.unwrap());
    }
}
