use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use entity::customer::{self, RecordState};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{CurrentUser, UserRole, require_role};
use crate::error::{ApiError, ApiResult, is_unique_violation, validation};
use crate::sequence::{self, BatchAllocator};
use crate::{AppState, shortname};

const CODE_RETRIES: usize = 2;
const MAX_POTENTIAL_LEVEL: i16 = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub name: String,
    pub short_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub potential_level: i16,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub potential_level: Option<i16>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub rows: Vec<CustomerInput>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<Json<customer::Model>> {
    require_role(&current, UserRole::Sales)?;
    let (name, short) = validate_input(&input)?;
    let db = state.db.as_ref();

    let mut attempts = 0;
    let created = loop {
        let seq = sequence::next_value(db, sequence::CUSTOMER_PREFIX, &short).await?;
        let code = sequence::customer_code(&short, seq);
        match insert_customer(db, &input, &name, &short, &code, Some(current.user_id)).await {
            Ok(model) => break model,
            Err(err) if is_unique_violation(&err) && attempts < CODE_RETRIES => {
                attempts += 1;
                tracing::warn!(%code, "customer code collision, regenerating");
                tokio::time::sleep(sequence::retry_jitter()).await;
            }
            Err(err) if is_unique_violation(&err) => {
                return Err(ApiError::Conflict(format!(
                    "customer code {} already exists",
                    code
                )));
            }
            Err(err) => return Err(err.into()),
        }
    };
    Ok(Json(created))
}

/// Spreadsheet import: one counter reservation per distinct short-name scope,
/// codes assigned in memory row by row.
pub async fn import(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<Vec<customer::Model>>> {
    require_role(&current, UserRole::Sales)?;
    if request.rows.is_empty() {
        return Err(validation("import requires at least one row"));
    }
    let db = state.db.as_ref();

    let mut prepared = Vec::with_capacity(request.rows.len());
    let mut counts: HashMap<String, i64> = HashMap::new();
    for row in &request.rows {
        let (name, short) = validate_input(row)?;
        *counts.entry(short.clone()).or_insert(0) += 1;
        prepared.push((row, name, short));
    }

    let mut allocator = BatchAllocator::new(sequence::CUSTOMER_PREFIX);
    for (scope, count) in &counts {
        allocator.reserve(db, scope, *count).await?;
    }

    let mut created = Vec::with_capacity(prepared.len());
    for (row, name, short) in prepared {
        let seq = allocator
            .take(&short)
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("import allocator exhausted")))?;
        let code = sequence::customer_code(&short, seq);
        let model = insert_customer(db, row, &name, &short, &code, Some(current.user_id))
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    ApiError::Conflict(format!("customer code {} already exists", code))
                } else {
                    err.into()
                }
            })?;
        created.push(model);
    }
    Ok(Json(created))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<customer::Model>> {
    let found = find_active(state.db.as_ref(), id).await?;
    Ok(Json(found))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<CustomerPatch>,
) -> ApiResult<Json<customer::Model>> {
    require_role(&current, UserRole::Sales)?;
    let existing = find_active(state.db.as_ref(), id).await?;
    let mut active: customer::ActiveModel = existing.into();
    if let Some(name) = &patch.name {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(validation("customer name cannot be empty"));
        }
        active.name = Set(trimmed.to_string());
    }
    if patch.phone.is_some() {
        active.phone = Set(patch.phone.clone());
    }
    if patch.email.is_some() {
        active.email = Set(patch.email.clone());
    }
    if patch.address.is_some() {
        active.address = Set(patch.address.clone());
    }
    if let Some(level) = patch.potential_level {
        validate_potential_level(level)?;
        active.potential_level = Set(level);
    }
    let now: DateTimeWithTimeZone = Utc::now().into();
    active.updated_at = Set(now);
    let updated = active.update(state.db.as_ref()).await?;
    Ok(Json(updated))
}

/// Soft delete: the record flips to `Deleted` and disappears from every read
/// path; the code is never reissued.
pub async fn remove(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<customer::Model>> {
    require_role(&current, UserRole::Sales)?;
    let existing = find_active(state.db.as_ref(), id).await?;
    let mut active: customer::ActiveModel = existing.into();
    active.state = Set(RecordState::Deleted);
    let now: DateTimeWithTimeZone = Utc::now().into();
    active.updated_at = Set(now);
    let updated = active.update(state.db.as_ref()).await?;
    Ok(Json(updated))
}

pub(crate) async fn find_active<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> ApiResult<customer::Model> {
    customer::Entity::find_by_id(id)
        .filter(customer::Column::State.eq(RecordState::Active))
        .one(conn)
        .await?
        .ok_or(ApiError::NotFound("customer"))
}

async fn insert_customer<C: ConnectionTrait>(
    conn: &C,
    input: &CustomerInput,
    name: &str,
    short: &str,
    code: &str,
    created_by: Option<Uuid>,
) -> Result<customer::Model, sea_orm::DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    customer::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(code.to_string()),
        name: Set(name.to_string()),
        short_name: Set(short.to_string()),
        phone: Set(input.phone.clone()),
        email: Set(input.email.clone()),
        address: Set(input.address.clone()),
        potential_level: Set(input.potential_level),
        state: Set(RecordState::Active),
        created_by: Set(created_by),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
}

fn validate_input(input: &CustomerInput) -> ApiResult<(String, String)> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(validation("customer name cannot be empty"));
    }
    validate_potential_level(input.potential_level)?;
    let short = match input.short_name.as_deref().map(str::trim) {
        Some(explicit) if !explicit.is_empty() => shortname::derive_short_name(explicit),
        _ => shortname::derive_short_name(name),
    };
    if short.is_empty() {
        return Err(validation("customer name must contain letters or digits"));
    }
    Ok((name.to_string(), short))
}

fn validate_potential_level(level: i16) -> ApiResult<()> {
    if !(0..=MAX_POTENTIAL_LEVEL).contains(&level) {
        return Err(validation(format!(
            "potential level must be between 0 and {}",
            MAX_POTENTIAL_LEVEL
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, short: Option<&str>, level: i16) -> CustomerInput {
        CustomerInput {
            name: name.into(),
            short_name: short.map(Into::into),
            phone: None,
            email: None,
            address: None,
            potential_level: level,
        }
    }

    #[test]
    fn short_name_is_derived_when_absent() {
        let (name, short) = validate_input(&input("Nguyen Van A", None, 3)).unwrap();
        assert_eq!(name, "Nguyen Van A");
        assert_eq!(short, "NVA");
    }

    #[test]
    fn explicit_short_name_is_normalized() {
        let (_, short) = validate_input(&input("Nguyen Van A", Some("hoà bình"), 0)).unwrap();
        assert_eq!(short, "HBINH");
    }

    #[test]
    fn rejects_star_rating_out_of_range() {
        assert!(validate_input(&input("Nguyen Van A", None, 6)).is_err());
        assert!(validate_input(&input("Nguyen Van A", None, -1)).is_err());
    }

    #[test]
    fn rejects_unusable_names() {
        assert!(validate_input(&input("   ", None, 0)).is_err());
        assert!(validate_input(&input("!!!", None, 0)).is_err());
    }
}
