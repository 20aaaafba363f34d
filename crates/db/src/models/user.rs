use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::user;

pub const SYSTEM_BOT_EMAIL: &str = "ia_bot@system.local";
pub const SYSTEM_BOT_NAME: &str = "IA Bot";

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("email is already registered")]
    EmailTaken,
    #[error("user not found")]
    NotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            email: model.email,
            created_at: model.created_at,
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateUser,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(data.email.as_str()))
            .one(db)
            .await?
            .is_some();
        if taken {
            return Err(UserError::EmailTaken);
        }

        let active = user::ActiveModel {
            uuid: Set(user_id),
            name: Set(data.name.clone()),
            email: Set(data.email.clone()),
            password: Set(data.password_hash.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }

    pub async fn find_by_uuid<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Returns the user together with the stored password hash, for credential checks.
    pub async fn find_by_email_with_password<C: ConnectionTrait>(
        db: &C,
        email: &str,
    ) -> Result<Option<(Self, String)>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(db)
            .await?;
        Ok(record.map(|model| {
            let hash = model.password.clone();
            (Self::from_model(model), hash)
        }))
    }

    /// Lists users, optionally narrowed by name and email fragments. Every
    /// whitespace-separated word of `name` must match somewhere in the stored name.
    pub async fn search<C: ConnectionTrait>(
        db: &C,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut condition = Condition::all();
        if let Some(name) = name {
            for word in name.split_whitespace() {
                condition = condition.add(user::Column::Name.contains(word));
            }
        }
        if let Some(email) = email {
            condition = condition.add(user::Column::Email.contains(email));
        }

        let models = user::Entity::find()
            .filter(condition)
            .order_by_asc(user::Column::Id)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateUser,
    ) -> Result<Self, UserError> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(UserError::NotFound)?;

        if let Some(email) = data.email.as_deref()
            && email != record.email
        {
            let taken = user::Entity::find()
                .filter(user::Column::Email.eq(email))
                .one(db)
                .await?
                .is_some();
            if taken {
                return Err(UserError::EmailTaken);
            }
        }

        let mut active: user::ActiveModel = record.into();
        if let Some(name) = &data.name {
            active.name = Set(name.clone());
        }
        if let Some(email) = &data.email {
            active.email = Set(email.clone());
        }
        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    /// Finds the automation bot account, creating it on first call.
    pub async fn ensure_system_bot<C: ConnectionTrait>(
        db: &C,
        password_hash: &str,
    ) -> Result<Self, UserError> {
        if let Some(record) = user::Entity::find()
            .filter(user::Column::Email.eq(SYSTEM_BOT_EMAIL))
            .one(db)
            .await?
        {
            return Ok(Self::from_model(record));
        }

        Self::create(
            db,
            &CreateUser {
                name: SYSTEM_BOT_NAME.to_string(),
                email: SYSTEM_BOT_EMAIL.to_string(),
                password_hash: password_hash.to_string(),
            },
            Uuid::new_v4(),
        )
        .await
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

    fn create_data(name: &str, email: &str) -> CreateUser {
        CreateUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = setup_db().await;
        User::create(&db, &create_data("Ana", "ana@example.com"), Uuid::new_v4())
            .await
            .unwrap();
        let err = User::create(&db, &create_data("Other", "ana@example.com"), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));
    }

    #[tokio::test]
    async fn search_matches_every_name_word() {
        let db = setup_db().await;
        User::create(
            &db,
            &create_data("Ana Maria Perez", "ana@example.com"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        User::create(
            &db,
            &create_data("Maria Lopez", "maria@example.com"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let hits = User::search(&db, Some("ana perez"), None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].email, "ana@example.com");

        let hits = User::search(&db, None, Some("example.com")).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn ensure_system_bot_is_idempotent() {
        let db = setup_db().await;
        let first = User::ensure_system_bot(&db, "hash").await.unwrap();
        let second = User::ensure_system_bot(&db, "other-hash").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.email, SYSTEM_BOT_EMAIL);
    }
}
