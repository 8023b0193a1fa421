//! Demo fixture data for `server seed` and the integration tests.

use chrono::Utc;
use entity::{
    customer::{self, RecordState},
    project_survey::{self, SurveyItem, SurveyItems},
    quotation::{self, PackagePrice, ServiceLine, ServiceLines},
    service_package, user,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::{auth, pricing, sequence, shortname, surveys};

#[derive(Debug, Clone)]
pub struct SeededRecords {
    pub admin: user::Model,
    pub sales: user::Model,
    pub customer: customer::Model,
    pub survey: project_survey::Model,
    pub packages: Vec<service_package::Model>,
    pub quotation: quotation::Model,
}

pub async fn seed_demo(db: &DatabaseConnection) -> ApiResult<SeededRecords> {
    let admin = ensure_user(
        db,
        "admin@crm.test",
        "Quản trị viên",
        "admin123",
        user::Role::Admin,
    )
    .await?;
    let sales = ensure_user(
        db,
        "sales@crm.test",
        "Nhân viên kinh doanh",
        "sales123",
        user::Role::Sales,
    )
    .await?;

    let now: DateTimeWithTimeZone = Utc::now().into();

    let customer_name = "Nguyễn Văn An";
    let short = shortname::derive_short_name(customer_name);
    let seq = sequence::next_value(db, sequence::CUSTOMER_PREFIX, &short).await?;
    let customer = customer::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(sequence::customer_code(&short, seq)),
        name: Set(customer_name.to_string()),
        short_name: Set(short),
        phone: Set(Some("0903123456".into())),
        email: Set(Some("an.nguyen@example.vn".into())),
        address: Set(Some("12 Lý Thường Kiệt, Hà Nội".into())),
        potential_level: Set(4),
        state: Set(RecordState::Active),
        created_by: Set(Some(admin.id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    let mut items = vec![
        SurveyItem {
            id: String::new(),
            name: "Phòng khách".into(),
            length: 6.0,
            width: 4.0,
            coefficient: 1.0,
            area: 0.0,
            volume: 0.0,
        },
        SurveyItem {
            id: String::new(),
            name: "Phòng ngủ".into(),
            length: 4.0,
            width: 3.0,
            coefficient: 1.5,
            area: 0.0,
            volume: 0.0,
        },
    ];
    crate::sanitize::assign_item_ids(&mut items);
    let total_volume = surveys::compute_items(&mut items)?;
    let survey = project_survey::ActiveModel {
        id: Set(Uuid::new_v4()),
        survey_no: Set("KS-2026-0001".into()),
        customer_ref: Set(customer.id),
        status: Set(project_survey::Status::InProgress),
        items: Set(SurveyItems(items)),
        total_volume: Set(total_volume),
        notes: Set(None),
        created_by: Set(Some(sales.id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    let mut packages = Vec::new();
    for (name, group, service) in [
        ("Gói cơ bản", "Thi công", "Hoàn thiện nội thất"),
        ("Gói tiêu chuẩn", "Thi công", "Hoàn thiện nội thất"),
        ("Gói cao cấp", "Thi công", "Hoàn thiện nội thất"),
    ] {
        let seq = sequence::next_value(db, sequence::PACKAGE_PREFIX, "").await?;
        let pkg = service_package::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(sequence::package_code(seq)),
            name: Set(name.to_string()),
            service_group: Set(group.to_string()),
            service: Set(service.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        packages.push(pkg);
    }

    let mut lines = vec![ServiceLine {
        id: Uuid::new_v4().to_string(),
        service_group: "Thi công".into(),
        service: "Hoàn thiện nội thất".into(),
        volume: 0.0,
        volume_pinned: false,
        packages: vec![
            PackagePrice {
                package_name: "Gói cơ bản".into(),
                unit_price: 500_000,
                total_price: 0,
                is_selected: false,
            },
            PackagePrice {
                package_name: "Gói cao cấp".into(),
                unit_price: 0,
                total_price: 0,
                is_selected: false,
            },
        ],
    }];
    pricing::apply_survey_volume(&mut lines, total_volume);
    pricing::recompute(&mut lines);
    let total_amount = pricing::total_amount(&lines);
    let tax_amount = total_amount / 10;
    let scope = sequence::month_scope(Utc::now());
    let seq = sequence::next_value(db, sequence::QUOTATION_PREFIX, &scope).await?;
    let quotation = quotation::ActiveModel {
        id: Set(Uuid::new_v4()),
        quotation_no: Set(sequence::quotation_code(&scope, seq)),
        customer_ref: Set(customer.id),
        survey_ref: Set(Some(survey.id)),
        packages: Set(ServiceLines(lines)),
        total_amount: Set(total_amount),
        tax_amount: Set(tax_amount),
        grand_total: Set(pricing::grand_total(total_amount, tax_amount)),
        status: Set(quotation::Status::Draft),
        valid_until: Set(None),
        notes: Set(None),
        revision: Set(1),
        created_by: Set(Some(sales.id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(SeededRecords {
        admin,
        sales,
        customer,
        survey,
        packages,
        quotation,
    })
}

async fn ensure_user(
    db: &DatabaseConnection,
    email: &str,
    name: &str,
    password: &str,
    role: user::Role,
) -> ApiResult<user::Model> {
    if let Some(existing) = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?
    {
        return Ok(existing);
    }
    let now: DateTimeWithTimeZone = Utc::now().into();
    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        name: Set(name.to_string()),
        password_hash: Set(auth::hash_password(password)?),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    Ok(created)
}
