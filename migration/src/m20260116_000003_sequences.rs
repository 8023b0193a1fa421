use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum SequenceCounter {
    Table,
    Prefix,
    ScopeKey,
    Value,
}

#[derive(DeriveIden)]
enum QuotationStatusHistory {
    Table,
    Id,
    QuotationRef,
    FromStatus,
    ToStatus,
    Note,
    ChangedBy,
    ChangedAt,
}

#[derive(DeriveIden)]
enum Quotation {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SequenceCounter::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SequenceCounter::Prefix).string_len(16).not_null())
                    .col(ColumnDef::new(SequenceCounter::ScopeKey).string_len(64).not_null())
                    .col(
                        ColumnDef::new(SequenceCounter::Value)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(SequenceCounter::Prefix)
                            .col(SequenceCounter::ScopeKey),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(QuotationStatusHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuotationStatusHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(QuotationStatusHistory::QuotationRef).uuid().not_null())
                    .col(
                        ColumnDef::new(QuotationStatusHistory::FromStatus)
                            .custom(Alias::new("quotation_status"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuotationStatusHistory::ToStatus)
                            .custom(Alias::new("quotation_status"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(QuotationStatusHistory::Note).text())
                    .col(ColumnDef::new(QuotationStatusHistory::ChangedBy).uuid())
                    .col(
                        ColumnDef::new(QuotationStatusHistory::ChangedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quotation_status_history_quotation")
                            .from(QuotationStatusHistory::Table, QuotationStatusHistory::QuotationRef)
                            .to(Quotation::Table, Quotation::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_quotation_status_history_quotation_ref")
                    .table(QuotationStatusHistory::Table)
                    .col(QuotationStatusHistory::QuotationRef)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuotationStatusHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SequenceCounter::Table).to_owned())
            .await?;
        Ok(())
    }
}
