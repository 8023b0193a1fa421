use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use entity::project_survey::{self, SurveyItem, SurveyItems};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{CurrentUser, UserRole, require_role};
use crate::error::{ApiError, ApiResult, is_unique_violation, validation};
use crate::{AppState, customers, sanitize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyInput {
    pub survey_no: String,
    pub customer_ref: Uuid,
    #[serde(default)]
    pub items: Vec<SurveyItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyPatch {
    pub items: Option<Vec<SurveyItem>>,
    pub notes: Option<String>,
}

/// Derived measurements are recomputed on every save; whatever the payload
/// carried for `area`/`volume` is discarded. Returns the total volume.
pub fn compute_items(items: &mut [SurveyItem]) -> ApiResult<f64> {
    for item in items.iter_mut() {
        for (field, value) in [
            ("length", item.length),
            ("width", item.width),
            ("coefficient", item.coefficient),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(validation(format!(
                    "survey item {} must be a non-negative number",
                    field
                )));
            }
        }
        item.area = item.length * item.width;
        item.volume = item.length * item.width * item.coefficient;
    }
    Ok(items.iter().map(|item| item.volume).sum())
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<SurveyInput>,
) -> ApiResult<Json<project_survey::Model>> {
    require_role(&current, UserRole::Sales)?;
    let survey_no = input.survey_no.trim().to_string();
    if survey_no.is_empty() {
        return Err(validation("a survey number is required"));
    }
    let db = state.db.as_ref();
    customers::find_active(db, input.customer_ref).await?;

    let mut items = input.items;
    sanitize::assign_item_ids(&mut items);
    let total_volume = compute_items(&mut items)?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = project_survey::ActiveModel {
        id: Set(Uuid::new_v4()),
        survey_no: Set(survey_no.clone()),
        customer_ref: Set(input.customer_ref),
        status: Set(project_survey::Status::InProgress),
        items: Set(SurveyItems(items)),
        total_volume: Set(total_volume),
        notes: Set(input.notes.clone()),
        created_by: Set(Some(current.user_id)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let created = model.insert(db).await.map_err(|err| {
        if is_unique_violation(&err) {
            ApiError::Conflict(format!("survey number {} already exists", survey_no))
        } else {
            err.into()
        }
    })?;
    Ok(Json(created))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<project_survey::Model>> {
    let found = project_survey::Entity::find_by_id(id)
        .one(state.db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("survey"))?;
    Ok(Json(found))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<SurveyPatch>,
) -> ApiResult<Json<project_survey::Model>> {
    require_role(&current, UserRole::Sales)?;
    let db = state.db.as_ref();
    let existing = project_survey::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("survey"))?;

    let mut active: project_survey::ActiveModel = existing.into();
    if let Some(mut items) = patch.items {
        sanitize::assign_item_ids(&mut items);
        let total_volume = compute_items(&mut items)?;
        active.items = Set(SurveyItems(items));
        active.total_volume = Set(total_volume);
    }
    if patch.notes.is_some() {
        active.notes = Set(patch.notes.clone());
    }
    let now: DateTimeWithTimeZone = Utc::now().into();
    active.updated_at = Set(now);
    let updated = active.update(db).await?;
    Ok(Json(updated))
}
