use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use entity::{
    customer_care,
    opportunity::{self, Demands},
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{CurrentUser, UserRole, require_role};
use crate::error::{ApiError, ApiResult, is_unique_violation, validation};
use crate::{AppState, customers, sequence};

const CODE_RETRIES: usize = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityInput {
    pub customer_ref: Uuid,
    #[serde(default)]
    pub demands: Vec<String>,
    #[serde(default)]
    pub unit_price: i64,
    #[serde(default)]
    pub probability: i16,
    pub status: Option<opportunity::Status>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityPatch {
    pub demands: Option<Vec<String>>,
    pub unit_price: Option<i64>,
    pub probability: Option<i16>,
    pub status: Option<opportunity::Status>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDetail {
    #[serde(flatten)]
    pub opportunity: opportunity::Model,
    pub care_history: Vec<customer_care::Model>,
}

/// The opportunity value is never taken from the payload; it is always
/// `unit_price × probability / 100`.
pub fn opportunity_value(unit_price: i64, probability: i16) -> i64 {
    unit_price * probability as i64 / 100
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<OpportunityInput>,
) -> ApiResult<Json<opportunity::Model>> {
    require_role(&current, UserRole::Sales)?;
    validate_terms(input.unit_price, input.probability)?;
    let db = state.db.as_ref();
    customers::find_active(db, input.customer_ref).await?;

    let mut attempts = 0;
    let created = loop {
        let scope = sequence::day_scope(Utc::now());
        let seq = sequence::next_value(db, sequence::OPPORTUNITY_PREFIX, &scope).await?;
        let code = sequence::opportunity_code(&scope, seq);
        let now: DateTimeWithTimeZone = Utc::now().into();
        let model = opportunity::ActiveModel {
            id: Set(Uuid::new_v4()),
            opportunity_no: Set(code.clone()),
            customer_ref: Set(input.customer_ref),
            demands: Set(Demands(input.demands.clone())),
            unit_price: Set(input.unit_price),
            probability: Set(input.probability),
            opportunity_value: Set(opportunity_value(input.unit_price, input.probability)),
            status: Set(input.status.unwrap_or(opportunity::Status::Open)),
            created_by: Set(Some(current.user_id)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        match model.insert(db).await {
            Ok(model) => break model,
            Err(err) if is_unique_violation(&err) && attempts < CODE_RETRIES => {
                attempts += 1;
                tracing::warn!(%code, "opportunity number collision, regenerating");
                tokio::time::sleep(sequence::retry_jitter()).await;
            }
            Err(err) if is_unique_violation(&err) => {
                return Err(ApiError::Conflict(format!(
                    "opportunity number {} already exists",
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
) -> ApiResult<Json<OpportunityDetail>> {
    let db = state.db.as_ref();
    let found = opportunity::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("opportunity"))?;
    let care_history = customer_care::Entity::find()
        .filter(customer_care::Column::OpportunityRef.eq(id))
        .order_by_desc(customer_care::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(Json(OpportunityDetail {
        opportunity: found,
        care_history,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<OpportunityPatch>,
) -> ApiResult<Json<opportunity::Model>> {
    require_role(&current, UserRole::Sales)?;
    let db = state.db.as_ref();
    let existing = opportunity::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("opportunity"))?;

    let unit_price = patch.unit_price.unwrap_or(existing.unit_price);
    let probability = patch.probability.unwrap_or(existing.probability);
    validate_terms(unit_price, probability)?;

    let mut active: opportunity::ActiveModel = existing.into();
    if let Some(demands) = patch.demands {
        active.demands = Set(Demands(demands));
    }
    if let Some(status) = patch.status {
        active.status = Set(status);
    }
    active.unit_price = Set(unit_price);
    active.probability = Set(probability);
    active.opportunity_value = Set(opportunity_value(unit_price, probability));
    let now: DateTimeWithTimeZone = Utc::now().into();
    active.updated_at = Set(now);
    let updated = active.update(db).await?;
    Ok(Json(updated))
}

fn validate_terms(unit_price: i64, probability: i16) -> ApiResult<()> {
    if unit_price < 0 {
        return Err(validation("unit price cannot be negative"));
    }
    if !(0..=100).contains(&probability) {
        return Err(validation("probability must be between 0 and 100"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{opportunity_value, validate_terms};

    #[test]
    fn value_is_price_weighted_by_probability() {
        assert_eq!(opportunity_value(500_000, 33), 165_000);
        assert_eq!(opportunity_value(500_000, 0), 0);
        assert_eq!(opportunity_value(500_000, 100), 500_000);
    }

    #[test]
    fn terms_are_range_checked() {
        assert!(validate_terms(-1, 50).is_err());
        assert!(validate_terms(0, 101).is_err());
        assert!(validate_terms(0, -1).is_err());
        assert!(validate_terms(1_000_000, 100).is_ok());
    }
}
