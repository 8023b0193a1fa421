use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use entity::{
    project_survey,
    quotation::{self, ServiceLine, ServiceLines, Status},
    quotation_status_history, service_package,
};
use sea_orm::prelude::{Date, DateTimeWithTimeZone};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{CurrentUser, UserRole, require_role};
use crate::error::{ApiError, ApiResult, is_unique_violation, validation};
use crate::pricing::{self, PackageAggregate};
use crate::{AppState, customers, sanitize, sequence};

const CODE_RETRIES: usize = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationInput {
    pub quotation_no: Option<String>,
    pub customer_ref: Uuid,
    pub survey_ref: Option<Uuid>,
    #[serde(default)]
    pub packages: Vec<ServiceLine>,
    #[serde(default)]
    pub tax_amount: i64,
    pub valid_until: Option<Date>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationPatch {
    pub revision: i64,
    pub survey_ref: Option<Uuid>,
    pub packages: Option<Vec<ServiceLine>>,
    pub tax_amount: Option<i64>,
    pub valid_until: Option<Date>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: Status,
    pub note: Option<String>,
}

/// One interactive pricing edit, as fired from the quotation form.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PriceOp {
    SetUnitPrice {
        line_index: usize,
        package_name: String,
        unit_price: i64,
    },
    SetVolume {
        line_index: usize,
        volume: f64,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationResponse {
    #[serde(flatten)]
    pub quotation: quotation::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationSummary {
    pub quotation_no: String,
    pub package_totals: Vec<PackageAggregate>,
    pub total_amount: i64,
    pub tax_amount: i64,
    pub grand_total: i64,
}

/// The only legal moves. Anything else is rejected before a write happens.
pub fn transition_allowed(from: Status, to: Status) -> bool {
    matches!(
        (from, to),
        (Status::Draft, Status::Sent)
            | (Status::Sent, Status::Approved)
            | (Status::Sent, Status::Rejected)
            | (Status::Approved, Status::Completed)
    )
}

pub fn is_locked(status: Status) -> bool {
    matches!(status, Status::Approved | Status::Completed)
}

fn status_str(status: Status) -> &'static str {
    match status {
        Status::Draft => "DRAFT",
        Status::Sent => "SENT",
        Status::Approved => "APPROVED",
        Status::Rejected => "REJECTED",
        Status::Completed => "COMPLETED",
    }
}

fn ensure_editable(status: Status) -> ApiResult<()> {
    if is_locked(status) {
        return Err(validation(
            "an approved or completed quotation is read-only",
        ));
    }
    Ok(())
}

/// Normalizes a submitted package list: placeholder ids replaced, duplicate
/// lines and package names merged away, volumes taken from the linked survey
/// (pinned lines excluded) or defaulted, every derived amount recomputed.
async fn assemble_lines<C: ConnectionTrait>(
    conn: &C,
    survey_ref: Option<Uuid>,
    lines: Vec<ServiceLine>,
) -> ApiResult<Vec<ServiceLine>> {
    let mut lines = pricing::normalize_lines(lines);
    sanitize::assign_line_ids(&mut lines);
    match survey_ref {
        Some(survey_id) => {
            let survey = project_survey::Entity::find_by_id(survey_id)
                .one(conn)
                .await?
                .ok_or(ApiError::NotFound("survey"))?;
            pricing::apply_survey_volume(&mut lines, survey.total_volume);
        }
        None => pricing::default_volumes(&mut lines),
    }
    pricing::recompute(&mut lines);
    Ok(lines)
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<QuotationInput>,
) -> ApiResult<Json<quotation::Model>> {
    require_role(&current, UserRole::Sales)?;
    if input.packages.is_empty() {
        return Err(validation("at least one service line is required"));
    }
    if input.tax_amount < 0 {
        return Err(validation("tax amount cannot be negative"));
    }
    let db = state.db.as_ref();
    customers::find_active(db, input.customer_ref).await?;

    let lines = assemble_lines(db, input.survey_ref, input.packages.clone()).await?;
    let total_amount = pricing::total_amount(&lines);
    let grand_total = pricing::grand_total(total_amount, input.tax_amount);

    let supplied_no = input
        .quotation_no
        .as_deref()
        .map(str::trim)
        .filter(|no| !no.is_empty())
        .map(str::to_string);

    let created = match supplied_no {
        Some(quotation_no) => {
            let model = build_model(&input, &quotation_no, &lines, total_amount, grand_total, &current);
            model.insert(db).await.map_err(|err| {
                if is_unique_violation(&err) {
                    ApiError::Conflict(format!(
                        "quotation number {} already exists",
                        quotation_no
                    ))
                } else {
                    err.into()
                }
            })?
        }
        None => {
            let mut attempts = 0;
            loop {
                let scope = sequence::month_scope(Utc::now());
                let seq = sequence::next_value(db, sequence::QUOTATION_PREFIX, &scope).await?;
                let code = sequence::quotation_code(&scope, seq);
                let model = build_model(&input, &code, &lines, total_amount, grand_total, &current);
                match model.insert(db).await {
                    Ok(model) => break model,
                    Err(err) if is_unique_violation(&err) && attempts < CODE_RETRIES => {
                        attempts += 1;
                        tracing::warn!(%code, "quotation number collision, regenerating");
                        tokio::time::sleep(sequence::retry_jitter()).await;
                    }
                    Err(err) if is_unique_violation(&err) => {
                        return Err(ApiError::Conflict(format!(
                            "quotation number {} already exists",
                            code
                        )));
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }
    };
    Ok(Json(created))
}

fn build_model(
    input: &QuotationInput,
    quotation_no: &str,
    lines: &[ServiceLine],
    total_amount: i64,
    grand_total: i64,
    current: &CurrentUser,
) -> quotation::ActiveModel {
    let now: DateTimeWithTimeZone = Utc::now().into();
    quotation::ActiveModel {
        id: Set(Uuid::new_v4()),
        quotation_no: Set(quotation_no.to_string()),
        customer_ref: Set(input.customer_ref),
        survey_ref: Set(input.survey_ref),
        packages: Set(ServiceLines(lines.to_vec())),
        total_amount: Set(total_amount),
        tax_amount: Set(input.tax_amount),
        grand_total: Set(grand_total),
        status: Set(Status::Draft),
        valid_until: Set(input.valid_until),
        notes: Set(input.notes.clone()),
        revision: Set(1),
        created_by: Set(Some(current.user_id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<quotation::Model>> {
    let found = quotation::Entity::find_by_id(id)
        .one(state.db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("quotation"))?;
    Ok(Json(found))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(patch): Json<QuotationPatch>,
) -> ApiResult<Json<quotation::Model>> {
    require_role(&current, UserRole::Sales)?;
    let db = state.db.as_ref();
    let existing = quotation::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("quotation"))?;
    ensure_editable(existing.status)?;
    if patch.revision != existing.revision {
        return Err(ApiError::Conflict(
            "quotation was modified by another request; reload and retry".into(),
        ));
    }

    let survey_ref = patch.survey_ref.or(existing.survey_ref);
    let submitted = patch
        .packages
        .clone()
        .unwrap_or_else(|| existing.packages.0.clone());
    let lines = assemble_lines(db, survey_ref, submitted).await?;
    let tax_amount = patch.tax_amount.unwrap_or(existing.tax_amount);
    if tax_amount < 0 {
        return Err(validation("tax amount cannot be negative"));
    }
    let total_amount = pricing::total_amount(&lines);
    let grand_total = pricing::grand_total(total_amount, tax_amount);
    let revision = existing.revision + 1;

    let mut active: quotation::ActiveModel = existing.into();
    active.survey_ref = Set(survey_ref);
    active.packages = Set(ServiceLines(lines));
    active.tax_amount = Set(tax_amount);
    active.total_amount = Set(total_amount);
    active.grand_total = Set(grand_total);
    active.revision = Set(revision);
    if patch.valid_until.is_some() {
        active.valid_until = Set(patch.valid_until);
    }
    if patch.notes.is_some() {
        active.notes = Set(patch.notes.clone());
    }
    let now: DateTimeWithTimeZone = Utc::now().into();
    active.updated_at = Set(now);
    let updated = active.update(db).await?;
    Ok(Json(updated))
}

pub async fn reprice(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(op): Json<PriceOp>,
) -> ApiResult<Json<quotation::Model>> {
    require_role(&current, UserRole::Sales)?;
    let db = state.db.as_ref();
    let existing = quotation::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("quotation"))?;
    ensure_editable(existing.status)?;

    let mut lines = existing.packages.0.clone();
    match op {
        PriceOp::SetUnitPrice {
            line_index,
            package_name,
            unit_price,
        } => pricing::set_unit_price(&mut lines, line_index, &package_name, unit_price)?,
        PriceOp::SetVolume { line_index, volume } => {
            pricing::set_volume(&mut lines, line_index, volume)?
        }
    }
    let total_amount = pricing::total_amount(&lines);
    let grand_total = pricing::grand_total(total_amount, existing.tax_amount);
    let revision = existing.revision + 1;

    let mut active: quotation::ActiveModel = existing.into();
    active.packages = Set(ServiceLines(lines));
    active.total_amount = Set(total_amount);
    active.grand_total = Set(grand_total);
    active.revision = Set(revision);
    let now: DateTimeWithTimeZone = Utc::now().into();
    active.updated_at = Set(now);
    let updated = active.update(db).await?;
    Ok(Json(updated))
}

pub async fn change_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Json<QuotationResponse>> {
    require_role(&current, UserRole::Sales)?;
    let (updated, warning) = change_status_internal(
        state.db.as_ref(),
        id,
        change.status,
        change.note,
        Some(current.user_id),
    )
    .await?;
    Ok(Json(QuotationResponse {
        quotation: updated,
        warning,
    }))
}

pub async fn change_status_internal(
    db: &DatabaseConnection,
    id: Uuid,
    target: Status,
    note: Option<String>,
    changed_by: Option<Uuid>,
) -> ApiResult<(quotation::Model, Option<String>)> {
    let txn = db.begin().await?;
    let existing = quotation::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(ApiError::NotFound("quotation"))?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    if existing.status == target {
        let mut active: quotation::ActiveModel = existing.into();
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        return Ok((updated, None));
    }
    if !transition_allowed(existing.status, target) {
        return Err(validation(format!(
            "illegal status transition {} -> {}",
            status_str(existing.status),
            status_str(target)
        )));
    }

    let from_status = existing.status;
    let survey_ref = existing.survey_ref;
    let mut active: quotation::ActiveModel = existing.into();
    active.status = Set(target);
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    let history = quotation_status_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        quotation_ref: Set(id),
        from_status: Set(from_status),
        to_status: Set(target),
        note: Set(note),
        changed_by: Set(changed_by),
        changed_at: Set(now),
    };
    quotation_status_history::Entity::insert(history)
        .exec_without_returning(&txn)
        .await?;
    txn.commit().await?;

    // Cascade to the linked survey outside the transaction: a failure here
    // must never undo the status change, only warn.
    let warning = match target {
        Status::Approved => cascade_survey(db, survey_ref, project_survey::Status::Completed).await,
        Status::Rejected => cascade_survey(db, survey_ref, project_survey::Status::Cancelled).await,
        _ => None,
    };
    Ok((updated, warning))
}

async fn cascade_survey(
    db: &DatabaseConnection,
    survey_ref: Option<Uuid>,
    status: project_survey::Status,
) -> Option<String> {
    let survey_id = survey_ref?;
    let found = match project_survey::Entity::find_by_id(survey_id).one(db).await {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(%survey_id, error = %err, "survey cascade lookup failed");
            return Some("quotation status changed, but the linked survey could not be updated".into());
        }
    };
    let Some(survey) = found else {
        tracing::warn!(%survey_id, "survey cascade target missing");
        return Some("quotation status changed, but the linked survey no longer exists".into());
    };
    let mut active: project_survey::ActiveModel = survey.into();
    active.status = Set(status);
    let now: DateTimeWithTimeZone = Utc::now().into();
    active.updated_at = Set(now);
    match active.update(db).await {
        Ok(_) => None,
        Err(err) => {
            tracing::warn!(%survey_id, error = %err, "survey cascade update failed");
            Some("quotation status changed, but the linked survey could not be updated".into())
        }
    }
}

pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<quotation_status_history::Model>>> {
    let db = state.db.as_ref();
    quotation::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("quotation"))?;
    let rows = quotation_status_history::Entity::find()
        .filter(quotation_status_history::Column::QuotationRef.eq(id))
        .order_by_desc(quotation_status_history::Column::ChangedAt)
        .all(db)
        .await?;
    Ok(Json(rows))
}

/// Side-by-side package totals, ordered by the catalog header list first
/// (matched case-insensitively), then any package the catalog does not know.
pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<QuotationSummary>> {
    let db = state.db.as_ref();
    let found = quotation::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ApiError::NotFound("quotation"))?;
    let mut aggregates = pricing::aggregate_by_package(&found.packages.0);
    let catalog = service_package::Entity::find()
        .order_by_asc(service_package::Column::Code)
        .all(db)
        .await?;

    let mut ordered = Vec::with_capacity(aggregates.len());
    for header in &catalog {
        if let Some(pos) = aggregates
            .iter()
            .position(|agg| pricing::same_package(&agg.package_name, &header.name))
        {
            ordered.push(aggregates.remove(pos));
        }
    }
    ordered.append(&mut aggregates);

    Ok(Json(QuotationSummary {
        quotation_no: found.quotation_no,
        package_totals: ordered,
        total_amount: found.total_amount,
        tax_amount: found.tax_amount,
        grand_total: found.grand_total,
    }))
}

#[cfg(test)]
mod tests {
    use super::{ensure_editable, is_locked, transition_allowed};
    use entity::quotation::Status;

    const ALL: [Status; 5] = [
        Status::Draft,
        Status::Sent,
        Status::Approved,
        Status::Rejected,
        Status::Completed,
    ];

    #[test]
    fn adjacency_is_exact() {
        let legal = [
            (Status::Draft, Status::Sent),
            (Status::Sent, Status::Approved),
            (Status::Sent, Status::Rejected),
            (Status::Approved, Status::Completed),
        ];
        for from in ALL {
            for to in ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(transition_allowed(from, to), expected, "{:?} -> {:?}", from, to);
            }
        }
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for to in ALL {
            assert!(!transition_allowed(Status::Rejected, to));
            assert!(!transition_allowed(Status::Completed, to));
        }
    }

    #[test]
    fn draft_cannot_jump_to_approved() {
        assert!(!transition_allowed(Status::Draft, Status::Approved));
        assert!(!transition_allowed(Status::Draft, Status::Completed));
        assert!(!transition_allowed(Status::Draft, Status::Rejected));
    }

    #[test]
    fn approved_and_completed_are_locked() {
        assert!(!is_locked(Status::Draft));
        assert!(!is_locked(Status::Sent));
        assert!(!is_locked(Status::Rejected));
        assert!(is_locked(Status::Approved));
        assert!(is_locked(Status::Completed));
        assert!(ensure_editable(Status::Draft).is_ok());
        assert!(ensure_editable(Status::Approved).is_err());
        assert!(ensure_editable(Status::Completed).is_err());
    }
}
