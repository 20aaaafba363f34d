use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::entities::token_blocklist;

pub struct TokenBlocklist;

impl TokenBlocklist {
    /// Records a revoked token. Blocking a token twice is a no-op.
    pub async fn block<C: ConnectionTrait>(
        db: &C,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let existing = token_blocklist::Entity::find()
            .filter(token_blocklist::Column::Token.eq(token))
            .one(db)
            .await?;
        if existing.is_some() {
            return Ok(());
        }

        let active = token_blocklist::ActiveModel {
            token: Set(token.to_string()),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        active.insert(db).await?;
        Ok(())
    }

    pub async fn is_blocked<C: ConnectionTrait>(db: &C, token: &str) -> Result<bool, DbErr> {
        let existing = token_blocklist::Entity::find()
            .filter(token_blocklist::Column::Token.eq(token))
            .one(db)
            .await?;
        Ok(existing.is_some())
    }

    /// Drops entries whose token has expired on its own. Safe to run on a
    /// timer; returns the number of rows removed.
    pub async fn prune_expired<C: ConnectionTrait>(
        db: &C,
        now: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let result = token_blocklist::Entity::delete_many()
            .filter(token_blocklist::Column::ExpiresAt.lt(now))
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

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn block_and_prune() {
        let db = setup_db().await;
        let now = Utc::now();

        TokenBlocklist::block(&db, "stale", now - Duration::hours(1))
            .await
            .unwrap();
        TokenBlocklist::block(&db, "fresh", now + Duration::hours(1))
            .await
            .unwrap();
        TokenBlocklist::block(&db, "fresh", now + Duration::hours(1))
            .await
            .unwrap();

        assert!(TokenBlocklist::is_blocked(&db, "stale").await.unwrap());
        assert!(TokenBlocklist::is_blocked(&db, "fresh").await.unwrap());
        assert!(!TokenBlocklist::is_blocked(&db, "unknown").await.unwrap());

        let pruned = TokenBlocklist::prune_expired(&db, now).await.unwrap();
        assert_eq!(pruned, 1);
        assert!(!TokenBlocklist::is_blocked(&db, "stale").await.unwrap());
        assert!(TokenBlocklist::is_blocked(&db, "fresh").await.unwrap());
    }
}
