use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use entity::{customer_care, opportunity, project_survey, quotation};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{CurrentUser, UserRole, require_role};
use crate::error::{ApiError, ApiResult, is_unique_violation, validation};
use crate::{AppState, customers, sequence};

const CODE_RETRIES: usize = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareInput {
    pub customer_ref: Uuid,
    pub care_type: String,
    pub opportunity_ref: Option<Uuid>,
    pub survey_ref: Option<Uuid>,
    pub quotation_ref: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub care_result: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub reject_group: String,
    pub reject_reason: String,
}

/// Done and Cancelled are terminal; only a Pending record can be finalized.
fn ensure_pending(status: customer_care::Status) -> ApiResult<()> {
    if status != customer_care::Status::Pending {
        return Err(validation("care record is already finalized"));
    }
    Ok(())
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<CareInput>,
) -> ApiResult<Json<customer_care::Model>> {
    require_role(&current, UserRole::Sales)?;
    let care_type = input.care_type.trim().to_string();
    if care_type.is_empty() {
        return Err(validation("a care type is required"));
    }
    let db = state.db.as_ref();
    customers::find_active(db, input.customer_ref).await?;
    if let Some(opportunity_ref) = input.opportunity_ref {
        opportunity::Entity::find_by_id(opportunity_ref)
            .one(db)
            .await?
            .ok_or(ApiError::NotFound("opportunity"))?;
    }
    if let Some(survey_ref) = input.survey_ref {
        project_survey::Entity::find_by_id(survey_ref)
            .one(db)
            .await?
            .ok_or(ApiError::NotFound("survey"))?;
    }
    if let Some(quotation_ref) = input.quotation_ref {
        quotation::Entity::find_by_id(quotation_ref)
            .one(db)
            .await?
            .ok_or(ApiError::NotFound("quotation"))?;
    }

    let mut attempts = 0;
    let created = loop {
        let scope = sequence::care_scope(Utc::now());
        let seq = sequence::next_value(db, sequence::CARE_PREFIX, &scope).await?;
        let code = sequence::care_code(&scope, seq);
        let now: DateTimeWithTimeZone = Utc::now().into();
        let model = customer_care::ActiveModel {
            id: Set(Uuid::new_v4()),
            care_id: Set(code.clone()),
            customer_ref: Set(input.customer_ref),
            care_type: Set(care_type.clone()),
            status: Set(customer_care::Status::Pending),
            care_result: Set(None),
            reject_group: Set(None),
            reject_reason: Set(None),
            opportunity_ref: Set(input.opportunity_ref),
            survey_ref: Set(input.survey_ref),
            quotation_ref: Set(input.quotation_ref),
            notes: Set(input.notes.clone()),
            created_by: Set(Some(current.user_id)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        match model.insert(db).await {
            Ok(model) => break model,
            Err(err) if is_unique_violation(&err) && attempts < CODE_RETRIES => {
                attempts += 1;
                tracing::warn!(%code, "care id collision, regenerating");
                tokio::time::sleep(sequence::retry_jitter()).await;
            }
            Err(err) if is_unique_violation(&err) => {
                return Err(ApiError::Conflict(format!(
                    "care id {} already exists",
                    code
                )));
            }
            Err(err) => return Err(err.into()),
        }
    };
    Ok(Json(created))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<customer_care::Model>> {
    let found = customer_care::Entity::find_by_id(id)
        .one(state.db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("care record"))?;
    Ok(Json(found))
}

pub async fn complete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteRequest>,
) -> ApiResult<Json<customer_care::Model>> {
    require_role(&current, UserRole::Sales)?;
    let care_result = request.care_result.trim().to_string();
    if care_result.is_empty() {
        return Err(validation("a care result is required to complete"));
    }
    let db = state.db.as_ref();
    let existing = customer_care::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("care record"))?;
    ensure_pending(existing.status)?;

    let mut active: customer_care::ActiveModel = existing.into();
    active.status = Set(customer_care::Status::Done);
    active.care_result = Set(Some(care_result));
    let now: DateTimeWithTimeZone = Utc::now().into();
    active.updated_at = Set(now);
    let updated = active.update(db).await?;
    tracing::info!(
        care_id = %updated.care_id,
        status = updated.status.label(),
        "care record finalized"
    );
    Ok(Json(updated))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelRequest>,
) -> ApiResult<Json<customer_care::Model>> {
    require_role(&current, UserRole::Sales)?;
    let reject_group = request.reject_group.trim().to_string();
    let reject_reason = request.reject_reason.trim().to_string();
    if reject_group.is_empty() || reject_reason.is_empty() {
        return Err(validation(
            "a reject group and reject reason are required to cancel",
        ));
    }
    let db = state.db.as_ref();
    let existing = customer_care::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("care record"))?;
    ensure_pending(existing.status)?;

    let mut active: customer_care::ActiveModel = existing.into();
    active.status = Set(customer_care::Status::Cancelled);
    active.reject_group = Set(Some(reject_group));
    active.reject_reason = Set(Some(reject_reason));
    let now: DateTimeWithTimeZone = Utc::now().into();
    active.updated_at = Set(now);
    let updated = active.update(db).await?;
    tracing::info!(
        care_id = %updated.care_id,
        status = updated.status.label(),
        "care record finalized"
    );
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::ensure_pending;
    use entity::customer_care::Status;

    #[test]
    fn only_pending_records_can_be_finalized() {
        assert!(ensure_pending(Status::Pending).is_ok());
        assert!(ensure_pending(Status::Done).is_err());
        assert!(ensure_pending(Status::Cancelled).is_err());
    }
}
