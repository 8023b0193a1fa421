mod common;

use api::error::ApiError;
use api::quotations::{self, PriceOp, QuotationInput, QuotationPatch};
use api::surveys::{self, SurveyInput};
use axum::{Extension, Json, extract::Path, extract::State};
use common::TestContext;
use entity::project_survey;
use entity::quotation::{PackagePrice, ServiceLine, Status};
use sea_orm::EntityTrait;

fn one_line(service: &str, package_name: &str, unit_price: i64) -> Vec<ServiceLine> {
    vec![ServiceLine {
        id: "tmp-1".into(),
        service_group: "Thi công".into(),
        service: service.into(),
        volume: 0.0,
        volume_pinned: false,
        packages: vec![PackagePrice {
            package_name: package_name.into(),
            unit_price,
            total_price: 0,
            is_selected: false,
        }],
    }]
}

#[tokio::test]
async fn survey_volume_drives_the_quotation_totals() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let Json(survey) = surveys::create(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Json(SurveyInput {
            survey_no: "KS-TEST-0001".into(),
            customer_ref: ctx.seeded.customer.id,
            items: vec![entity::project_survey::SurveyItem {
                id: "tmp-row".into(),
                name: "Phòng khách".into(),
                length: 2.0,
                width: 3.0,
                coefficient: 1.5,
                area: 0.0,
                volume: 0.0,
            }],
            notes: None,
        }),
    )
    .await
    .expect("survey create failed");
    assert_eq!(survey.items.0[0].area, 6.0);
    assert_eq!(survey.items.0[0].volume, 9.0);
    assert_eq!(survey.total_volume, 9.0);

    let Json(created) = quotations::create(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Json(QuotationInput {
            quotation_no: Some("BG-TEST-0001".into()),
            customer_ref: ctx.seeded.customer.id,
            survey_ref: Some(survey.id),
            packages: one_line("Thiết kế nhà", "Gói cơ bản", 500_000),
            tax_amount: 450_000,
            valid_until: None,
            notes: None,
        }),
    )
    .await
    .expect("quotation create failed");

    let line = &created.packages.0[0];
    assert_eq!(line.volume, 9.0, "volume derived from the linked survey");
    assert!(!line.id.starts_with("tmp-"), "placeholder id stripped");
    assert_eq!(line.packages[0].total_price, 4_500_000);
    assert!(line.packages[0].is_selected);
    assert_eq!(created.total_amount, 4_500_000);
    assert_eq!(created.grand_total, 4_950_000);
    assert_eq!(created.status, Status::Draft);
    assert_eq!(created.revision, 1);

    ctx.cleanup().await;
}

#[tokio::test]
async fn transitions_follow_the_adjacency_and_cascade_to_the_survey() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };
    let quotation_id = ctx.seeded.quotation.id;
    let survey_id = ctx.seeded.survey.id;

    // Draft cannot jump straight to approved.
    let err = quotations::change_status_internal(
        ctx.db.as_ref(),
        quotation_id,
        Status::Approved,
        None,
        Some(ctx.seeded.sales.id),
    )
    .await
    .expect_err("draft -> approved must be rejected");
    assert!(matches!(err, ApiError::Validation(_)));

    let (sent, warning) = quotations::change_status_internal(
        ctx.db.as_ref(),
        quotation_id,
        Status::Sent,
        None,
        Some(ctx.seeded.sales.id),
    )
    .await
    .expect("draft -> sent");
    assert_eq!(sent.status, Status::Sent);
    assert!(warning.is_none());

    let (approved, warning) = quotations::change_status_internal(
        ctx.db.as_ref(),
        quotation_id,
        Status::Approved,
        Some("khách đồng ý".into()),
        Some(ctx.seeded.sales.id),
    )
    .await
    .expect("sent -> approved");
    assert_eq!(approved.status, Status::Approved);
    assert!(warning.is_none());

    let survey = project_survey::Entity::find_by_id(survey_id)
        .one(ctx.db.as_ref())
        .await
        .expect("survey lookup")
        .expect("survey exists");
    assert_eq!(
        survey.status,
        project_survey::Status::Completed,
        "approval cascades to the linked survey"
    );

    let (completed, _) = quotations::change_status_internal(
        ctx.db.as_ref(),
        quotation_id,
        Status::Completed,
        None,
        Some(ctx.seeded.sales.id),
    )
    .await
    .expect("approved -> completed");
    assert_eq!(completed.status, Status::Completed);

    for target in [Status::Draft, Status::Sent, Status::Approved, Status::Rejected] {
        let err = quotations::change_status_internal(
            ctx.db.as_ref(),
            quotation_id,
            target,
            None,
            None,
        )
        .await
        .expect_err("completed is terminal");
        assert!(matches!(err, ApiError::Validation(_)));
    }

    let Json(history) = quotations::history(State(ctx.state.clone()), Path(quotation_id))
        .await
        .expect("history failed");
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].to_status, Status::Completed);

    ctx.cleanup().await;
}

#[tokio::test]
async fn locked_quotations_reject_edits_before_any_write() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };
    let quotation_id = ctx.seeded.quotation.id;

    for target in [Status::Sent, Status::Approved] {
        quotations::change_status_internal(ctx.db.as_ref(), quotation_id, target, None, None)
            .await
            .expect("transition");
    }

    let err = quotations::update(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Path(quotation_id),
        Json(QuotationPatch {
            revision: 1,
            survey_ref: None,
            packages: None,
            tax_amount: Some(0),
            valid_until: None,
            notes: Some("should not land".into()),
        }),
    )
    .await
    .expect_err("approved quotation is read-only");
    assert!(matches!(err, ApiError::Validation(_)));

    let Json(reloaded) = quotations::get(State(ctx.state.clone()), Path(quotation_id))
        .await
        .expect("get failed");
    assert_eq!(reloaded.notes, None, "nothing was written");
    assert_eq!(reloaded.revision, 1);

    ctx.cleanup().await;
}

#[tokio::test]
async fn stale_revisions_are_rejected_with_a_conflict() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };
    let quotation_id = ctx.seeded.quotation.id;

    let Json(updated) = quotations::update(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Path(quotation_id),
        Json(QuotationPatch {
            revision: 1,
            survey_ref: None,
            packages: None,
            tax_amount: Some(100_000),
            valid_until: None,
            notes: None,
        }),
    )
    .await
    .expect("first update");
    assert_eq!(updated.revision, 2);

    let err = quotations::update(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Path(quotation_id),
        Json(QuotationPatch {
            revision: 1,
            survey_ref: None,
            packages: None,
            tax_amount: Some(0),
            valid_until: None,
            notes: None,
        }),
    )
    .await
    .expect_err("stale revision");
    assert!(matches!(err, ApiError::Conflict(_)));

    ctx.cleanup().await;
}

#[tokio::test]
async fn interactive_pricing_edits_pin_volumes_and_keep_totals_consistent() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };
    let quotation_id = ctx.seeded.quotation.id;

    let Json(after_volume) = quotations::reprice(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Path(quotation_id),
        Json(PriceOp::SetVolume {
            line_index: 0,
            volume: 5.0,
        }),
    )
    .await
    .expect("set volume failed");
    let line = &after_volume.packages.0[0];
    assert_eq!(line.volume, 5.0);
    assert!(line.volume_pinned);
    assert_eq!(line.packages[0].total_price, 500_000 * 5);
    assert_eq!(
        after_volume.grand_total,
        after_volume.total_amount + after_volume.tax_amount
    );

    let Json(after_price) = quotations::reprice(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Path(quotation_id),
        Json(PriceOp::SetUnitPrice {
            line_index: 0,
            package_name: "gói cao cấp".into(),
            unit_price: 900_000,
        }),
    )
    .await
    .expect("set unit price failed");
    let line = &after_price.packages.0[0];
    let premium = line
        .packages
        .iter()
        .find(|p| p.package_name == "Gói cao cấp")
        .expect("existing package matched case-insensitively");
    assert_eq!(premium.unit_price, 900_000);
    assert_eq!(premium.total_price, 900_000 * 5);
    assert!(premium.is_selected);
    assert_eq!(after_price.revision, after_volume.revision + 1);

    ctx.cleanup().await;
}

#[tokio::test]
async fn rejection_cancels_the_linked_survey() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };
    let quotation_id = ctx.seeded.quotation.id;

    quotations::change_status_internal(ctx.db.as_ref(), quotation_id, Status::Sent, None, None)
        .await
        .expect("draft -> sent");
    let (rejected, warning) = quotations::change_status_internal(
        ctx.db.as_ref(),
        quotation_id,
        Status::Rejected,
        Some("giá quá cao".into()),
        None,
    )
    .await
    .expect("sent -> rejected");
    assert_eq!(rejected.status, Status::Rejected);
    assert!(warning.is_none());

    let survey = project_survey::Entity::find_by_id(ctx.seeded.survey.id)
        .one(ctx.db.as_ref())
        .await
        .expect("survey lookup")
        .expect("survey exists");
    assert_eq!(survey.status, project_survey::Status::Cancelled);

    ctx.cleanup().await;
}
