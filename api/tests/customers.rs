mod common;

use api::customers::{self, CustomerInput, ImportRequest};
use api::error::ApiError;
use axum::{Extension, Json, extract::Path, extract::State};
use common::TestContext;
use entity::customer::RecordState;

fn input(name: &str) -> CustomerInput {
    CustomerInput {
        name: name.into(),
        short_name: None,
        phone: None,
        email: None,
        address: None,
        potential_level: 0,
    }
}

#[tokio::test]
async fn derived_short_name_feeds_the_code_scope() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let Json(first) = customers::create(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Json(input("Nguyen Van A")),
    )
    .await
    .expect("create failed");
    assert_eq!(first.short_name, "NVA");
    assert_eq!(first.customer_id, "KH-NVA-0001");

    let Json(second) = customers::create(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Json(input("Nguyễn Viết A")),
    )
    .await
    .expect("create failed");
    assert_eq!(second.customer_id, "KH-NVA-0002", "same scope, next number");

    ctx.cleanup().await;
}

#[tokio::test]
async fn soft_deleted_customers_leave_every_read_path() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let Json(created) = customers::create(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Json(input("Tran Thi B")),
    )
    .await
    .expect("create failed");

    let Json(removed) = customers::remove(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Path(created.id),
    )
    .await
    .expect("remove failed");
    assert_eq!(removed.state, RecordState::Deleted);
    assert_eq!(removed.customer_id, created.customer_id, "code is never reissued");

    let err = customers::get(State(ctx.state.clone()), Path(created.id))
        .await
        .expect_err("deleted customer must not resolve");
    assert!(matches!(err, ApiError::NotFound(_)));

    ctx.cleanup().await;
}

#[tokio::test]
async fn import_assigns_codes_from_reserved_blocks() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let rows = vec![
        input("Le Van C"),
        input("Luu Viet Cuong"),
        input("Pham Thi D"),
    ];
    let Json(created) = customers::import(
        State(ctx.state.clone()),
        Extension(ctx.sales_actor()),
        Json(ImportRequest { rows }),
    )
    .await
    .expect("import failed");

    assert_eq!(created.len(), 3);
    assert_eq!(created[0].customer_id, "KH-LVC-0001");
    assert_eq!(created[1].customer_id, "KH-LVCUONG-0001");
    assert_eq!(created[2].customer_id, "KH-PTD-0001");

    ctx.cleanup().await;
}
