use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{entities::role, types::RoleName};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

impl Role {
    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = role::Entity::find()
            .order_by_asc(role::Column::Id)
            .all(db)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| Self {
                id: model.id,
                name: model.name,
            })
            .collect())
    }

    pub async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        name: RoleName,
    ) -> Result<Option<Self>, DbErr> {
        let record = role::Entity::find()
            .filter(role::Column::Name.eq(name.as_str()))
            .one(db)
            .await?;
        Ok(record.map(|model| Self {
            id: model.id,
            name: model.name,
        }))
    }
}
