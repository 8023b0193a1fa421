use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quotation")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub quotation_no: String,
    #[sea_orm(indexed)]
    pub customer_ref: Uuid,
    pub survey_ref: Option<Uuid>,
    pub packages: ServiceLines,
    pub total_amount: i64,
    pub tax_amount: i64,
    pub grand_total: i64,
    pub status: Status,
    pub valid_until: Option<Date>,
    pub notes: Option<String>,
    pub revision: i64,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

/// One `(serviceGroup, service, volume)` line of the quotation, carrying the
/// priced package options compared side by side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLine {
    #[serde(default)]
    pub id: String,
    pub service_group: String,
    pub service: String,
    #[serde(default)]
    pub volume: f64,
    /// Set once the volume has been edited by hand; a pinned volume is never
    /// overwritten from a linked survey.
    #[serde(default)]
    pub volume_pinned: bool,
    #[serde(default)]
    pub packages: Vec<PackagePrice>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagePrice {
    pub package_name: String,
    #[serde(default)]
    pub unit_price: i64,
    #[serde(default)]
    pub total_price: i64,
    #[serde(default)]
    pub is_selected: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ServiceLines(pub Vec<ServiceLine>);

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerRef",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::project_survey::Entity",
        from = "Column::SurveyRef",
        to = "super::project_survey::Column::Id",
        on_delete = "SetNull"
    )]
    ProjectSurvey,
    #[sea_orm(has_many = "super::quotation_status_history::Entity")]
    StatusHistory,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::quotation_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "quotation_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "SENT")]
    Sent,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

impl ActiveModelBehavior for ActiveModel {}
