use axum::{Extension, Json, extract::State};
use chrono::Utc;
use entity::service_package;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{CurrentUser, UserRole, require_role};
use crate::error::{ApiError, ApiResult, is_unique_violation, validation};
use crate::pricing::same_package;
use crate::{AppState, sequence};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInput {
    pub name: String,
    pub service_group: String,
    pub service: String,
}

/// Catalog entries are the canonical package headers the quotation summary
/// is matched against, so their names must be unique regardless of casing.
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<PackageInput>,
) -> ApiResult<Json<service_package::Model>> {
    require_role(&current, UserRole::Admin)?;
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(validation("a package name is required"));
    }
    let db = state.db.as_ref();
    let existing = service_package::Entity::find().all(db).await?;
    if existing.iter().any(|pkg| same_package(&pkg.name, &name)) {
        return Err(ApiError::Conflict(format!(
            "package name {} already exists",
            name
        )));
    }

    let seq = sequence::next_value(db, sequence::PACKAGE_PREFIX, "").await?;
    let code = sequence::package_code(seq);
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = service_package::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code.clone()),
        name: Set(name.clone()),
        service_group: Set(input.service_group.trim().to_string()),
        service: Set(input.service.trim().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let created = model.insert(db).await.map_err(|err| {
        if is_unique_violation(&err) {
            ApiError::Conflict(format!("package name {} already exists", name))
        } else {
            err.into()
        }
    })?;
    Ok(Json(created))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<service_package::Model>>> {
    let rows = service_package::Entity::find()
        .order_by_asc(service_package::Column::Code)
        .all(state.db.as_ref())
        .await?;
    Ok(Json(rows))
}
