use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "customer_care")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub care_id: String,
    #[sea_orm(indexed)]
    pub customer_ref: Uuid,
    pub care_type: String,
    pub status: Status,
    pub care_result: Option<String>,
    pub reject_group: Option<String>,
    pub reject_reason: Option<String>,
    #[sea_orm(indexed)]
    pub opportunity_ref: Option<Uuid>,
    pub survey_ref: Option<Uuid>,
    pub quotation_ref: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerRef",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::opportunity::Entity",
        from = "Column::OpportunityRef",
        to = "super::opportunity::Column::Id",
        on_delete = "SetNull"
    )]
    Opportunity,
    #[sea_orm(
        belongs_to = "super::project_survey::Entity",
        from = "Column::SurveyRef",
        to = "super::project_survey::Column::Id",
        on_delete = "SetNull"
    )]
    ProjectSurvey,
    #[sea_orm(
        belongs_to = "super::quotation::Entity",
        from = "Column::QuotationRef",
        to = "super::quotation::Column::Id",
        on_delete = "SetNull"
    )]
    Quotation,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::opportunity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Opportunity.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "care_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "DONE")]
    Done,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl Status {
    /// Display label as it appears on the care report forms.
    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Chờ báo cáo",
            Status::Done => "Hoàn thành",
            Status::Cancelled => "Hủy",
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
