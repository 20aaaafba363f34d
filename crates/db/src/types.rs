use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// Lifecycle of a project. `active → finished` is one-way; there is no
/// operation that reopens a finished project.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "finished")]
    Finished,
}

/// Group lifecycle used for soft deletion. The stored values keep the
/// original backend's spelling; deleted groups stay in storage but are
/// excluded from every read query.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum GroupLifecycle {
    #[default]
    #[sea_orm(string_value = "activo")]
    Active,
    #[sea_orm(string_value = "eliminado")]
    Deleted,
}

#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyStatus {
    #[default]
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "revoked")]
    Revoked,
}

/// The four seeded task statuses. Their keys are stable machine identifiers:
/// the rows carrying them cannot be deleted and the keys are never reassigned
/// to another row. Custom statuses live alongside them as plain catalog rows.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SystemStatusKey {
    Pending,
    InProgress,
    Completed,
    Overdue,
}

impl SystemStatusKey {
    pub fn as_key(&self) -> &'static str {
        match self {
            SystemStatusKey::Pending => "pending",
            SystemStatusKey::InProgress => "in_progress",
            SystemStatusKey::Completed => "completed",
            SystemStatusKey::Overdue => "overdue",
        }
    }
}

/// The two seeded membership roles.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoleName {
    Owner,
    Member,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Owner => "owner",
            RoleName::Member => "member",
        }
    }
}
