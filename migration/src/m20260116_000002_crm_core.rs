use sea_orm_migration::prelude::*;

use crate::m20260116_000001_init::create_enum_type;

#[derive(DeriveIden)]
enum Customer {
    Table,
    Id,
    CustomerId,
    Name,
    ShortName,
    Phone,
    Email,
    Address,
    PotentialLevel,
    State,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Opportunity {
    Table,
    Id,
    OpportunityNo,
    CustomerRef,
    Demands,
    UnitPrice,
    Probability,
    OpportunityValue,
    Status,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CustomerCare {
    Table,
    Id,
    CareId,
    CustomerRef,
    CareType,
    Status,
    CareResult,
    RejectGroup,
    RejectReason,
    OpportunityRef,
    SurveyRef,
    QuotationRef,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ProjectSurvey {
    Table,
    Id,
    SurveyNo,
    CustomerRef,
    Status,
    Items,
    TotalVolume,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Quotation {
    Table,
    Id,
    QuotationNo,
    CustomerRef,
    SurveyRef,
    Packages,
    TotalAmount,
    TaxAmount,
    GrandTotal,
    Status,
    ValidUntil,
    Notes,
    Revision,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ServicePackage {
    Table,
    Id,
    Code,
    Name,
    ServiceGroup,
    Service,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

const RECORD_STATE_VALUES: &[&str] = &["ACTIVE", "DELETED"];
const OPPORTUNITY_STATUS_VALUES: &[&str] = &["OPEN", "NEGOTIATING", "WON", "LOST"];
const CARE_STATUS_VALUES: &[&str] = &["PENDING", "DONE", "CANCELLED"];
const SURVEY_STATUS_VALUES: &[&str] = &["IN_PROGRESS", "COMPLETED", "CANCELLED"];
const QUOTATION_STATUS_VALUES: &[&str] = &["DRAFT", "SENT", "APPROVED", "REJECTED", "COMPLETED"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        create_enum_type(manager, "record_state", RECORD_STATE_VALUES).await?;
        create_enum_type(manager, "opportunity_status", OPPORTUNITY_STATUS_VALUES).await?;
        create_enum_type(manager, "care_status", CARE_STATUS_VALUES).await?;
        create_enum_type(manager, "survey_status", SURVEY_STATUS_VALUES).await?;
        create_enum_type(manager, "quotation_status", QUOTATION_STATUS_VALUES).await?;

        manager
            .create_table(
                Table::create()
                    .table(Customer::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customer::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Customer::CustomerId).string_len(64).not_null())
                    .col(ColumnDef::new(Customer::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Customer::ShortName).string_len(64).not_null())
                    .col(ColumnDef::new(Customer::Phone).string_len(32))
                    .col(ColumnDef::new(Customer::Email).string_len(320))
                    .col(ColumnDef::new(Customer::Address).string_len(512))
                    .col(
                        ColumnDef::new(Customer::PotentialLevel)
                            .small_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Customer::State)
                            .custom(Alias::new("record_state"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Customer::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(Customer::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Customer::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Opportunity::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Opportunity::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Opportunity::OpportunityNo).string_len(64).not_null())
                    .col(ColumnDef::new(Opportunity::CustomerRef).uuid().not_null())
                    .col(
                        ColumnDef::new(Opportunity::Demands)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Opportunity::UnitPrice)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Opportunity::Probability)
                            .small_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Opportunity::OpportunityValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Opportunity::Status)
                            .custom(Alias::new("opportunity_status"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Opportunity::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(Opportunity::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Opportunity::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_opportunity_customer")
                            .from(Opportunity::Table, Opportunity::CustomerRef)
                            .to(Customer::Table, Customer::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProjectSurvey::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProjectSurvey::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(ProjectSurvey::SurveyNo).string_len(64).not_null())
                    .col(ColumnDef::new(ProjectSurvey::CustomerRef).uuid().not_null())
                    .col(
                        ColumnDef::new(ProjectSurvey::Status)
                            .custom(Alias::new("survey_status"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProjectSurvey::Items)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(ProjectSurvey::TotalVolume)
                            .double()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ProjectSurvey::Notes).text())
                    .col(ColumnDef::new(ProjectSurvey::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(ProjectSurvey::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(ProjectSurvey::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_survey_customer")
                            .from(ProjectSurvey::Table, ProjectSurvey::CustomerRef)
                            .to(Customer::Table, Customer::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Quotation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Quotation::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Quotation::QuotationNo).string_len(64).not_null())
                    .col(ColumnDef::new(Quotation::CustomerRef).uuid().not_null())
                    .col(ColumnDef::new(Quotation::SurveyRef).uuid())
                    .col(
                        ColumnDef::new(Quotation::Packages)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Quotation::TotalAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Quotation::TaxAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Quotation::GrandTotal)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Quotation::Status)
                            .custom(Alias::new("quotation_status"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Quotation::ValidUntil).date())
                    .col(ColumnDef::new(Quotation::Notes).text())
                    .col(
                        ColumnDef::new(Quotation::Revision)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Quotation::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(Quotation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Quotation::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quotation_customer")
                            .from(Quotation::Table, Quotation::CustomerRef)
                            .to(Customer::Table, Customer::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quotation_survey")
                            .from(Quotation::Table, Quotation::SurveyRef)
                            .to(ProjectSurvey::Table, ProjectSurvey::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CustomerCare::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomerCare::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(CustomerCare::CareId).string_len(64).not_null())
                    .col(ColumnDef::new(CustomerCare::CustomerRef).uuid().not_null())
                    .col(ColumnDef::new(CustomerCare::CareType).string_len(128).not_null())
                    .col(
                        ColumnDef::new(CustomerCare::Status)
                            .custom(Alias::new("care_status"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(CustomerCare::CareResult).text())
                    .col(ColumnDef::new(CustomerCare::RejectGroup).string_len(128))
                    .col(ColumnDef::new(CustomerCare::RejectReason).text())
                    .col(ColumnDef::new(CustomerCare::OpportunityRef).uuid())
                    .col(ColumnDef::new(CustomerCare::SurveyRef).uuid())
                    .col(ColumnDef::new(CustomerCare::QuotationRef).uuid())
                    .col(ColumnDef::new(CustomerCare::Notes).text())
                    .col(ColumnDef::new(CustomerCare::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(CustomerCare::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(CustomerCare::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_care_customer")
                            .from(CustomerCare::Table, CustomerCare::CustomerRef)
                            .to(Customer::Table, Customer::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_care_opportunity")
                            .from(CustomerCare::Table, CustomerCare::OpportunityRef)
                            .to(Opportunity::Table, Opportunity::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_care_survey")
                            .from(CustomerCare::Table, CustomerCare::SurveyRef)
                            .to(ProjectSurvey::Table, ProjectSurvey::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_care_quotation")
                            .from(CustomerCare::Table, CustomerCare::QuotationRef)
                            .to(Quotation::Table, Quotation::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ServicePackage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServicePackage::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(ServicePackage::Code).string_len(32).not_null())
                    .col(ColumnDef::new(ServicePackage::Name).string_len(128).not_null())
                    .col(ColumnDef::new(ServicePackage::ServiceGroup).string_len(128).not_null())
                    .col(ColumnDef::new(ServicePackage::Service).string_len(128).not_null())
                    .col(
                        ColumnDef::new(ServicePackage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(ServicePackage::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, table, column) in [
            ("idx_customer_customer_id", Customer::Table.into_iden(), Customer::CustomerId.into_iden()),
            ("idx_opportunity_no", Opportunity::Table.into_iden(), Opportunity::OpportunityNo.into_iden()),
            ("idx_customer_care_care_id", CustomerCare::Table.into_iden(), CustomerCare::CareId.into_iden()),
            ("idx_project_survey_no", ProjectSurvey::Table.into_iden(), ProjectSurvey::SurveyNo.into_iden()),
            ("idx_quotation_no", Quotation::Table.into_iden(), Quotation::QuotationNo.into_iden()),
            ("idx_service_package_code", ServicePackage::Table.into_iden(), ServicePackage::Code.into_iden()),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(table)
                        .col(column)
                        .unique()
                        .to_owned(),
                )
                .await?;
        }

        // Catalog names must stay unique regardless of casing; the pricing
        // engine matches package names case-insensitively.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_service_package_name_ci ON service_package (lower(name));",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CustomerCare::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Quotation::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectSurvey::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Opportunity::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ServicePackage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customer::Table).to_owned())
            .await?;
        for name in [
            "quotation_status",
            "survey_status",
            "care_status",
            "opportunity_status",
            "record_state",
        ] {
            manager
                .get_connection()
                .execute_unprepared(&format!("DROP TYPE IF EXISTS {};", name))
                .await?;
        }
        Ok(())
    }
}
