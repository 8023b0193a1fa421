mod common;

use api::sequence::{self, BatchAllocator};
use common::TestContext;
use entity::sequence_counter;
use sea_orm::EntityTrait;
use std::collections::HashSet;

#[tokio::test]
async fn concurrent_codes_are_unique_and_gapless() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = ctx.db.clone();
        handles.push(tokio::spawn(async move {
            sequence::next_value(db.as_ref(), sequence::CUSTOMER_PREFIX, "SMITH").await
        }));
    }
    let mut values = Vec::new();
    for handle in handles {
        values.push(handle.await.expect("task panicked").expect("sequence failed"));
    }

    let distinct: HashSet<i64> = values.iter().copied().collect();
    assert_eq!(distinct.len(), 8, "no duplicates under concurrency");
    values.sort_unstable();
    assert_eq!(values, (1..=8).collect::<Vec<i64>>(), "no gaps");

    let codes: HashSet<String> = values
        .iter()
        .map(|seq| sequence::customer_code("SMITH", *seq))
        .collect();
    assert!(codes.contains("KH-SMITH-0001"));
    assert!(codes.contains("KH-SMITH-0008"));

    let counter = sequence_counter::Entity::find_by_id((
        sequence::CUSTOMER_PREFIX.to_string(),
        "SMITH".to_string(),
    ))
    .one(ctx.db.as_ref())
    .await
    .expect("counter lookup")
    .expect("counter row exists");
    assert_eq!(counter.value, 8);

    ctx.cleanup().await;
}

#[tokio::test]
async fn batch_allocator_reserves_once_per_scope() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };
    let db = ctx.db.as_ref();

    let mut allocator = BatchAllocator::new(sequence::CUSTOMER_PREFIX);
    allocator.reserve(db, "AAA", 3).await.expect("reserve AAA");
    allocator.reserve(db, "BBB", 2).await.expect("reserve BBB");

    assert_eq!(allocator.take("AAA"), Some(1));
    assert_eq!(allocator.take("BBB"), Some(1));
    assert_eq!(allocator.take("AAA"), Some(2));
    assert_eq!(allocator.take("AAA"), Some(3));
    assert_eq!(allocator.take("BBB"), Some(2));
    assert_eq!(allocator.take("AAA"), None, "block exhausted");
    assert_eq!(allocator.take("CCC"), None, "never reserved");

    // The next database-issued value continues after the reserved block.
    let next = sequence::next_value(db, sequence::CUSTOMER_PREFIX, "AAA")
        .await
        .expect("sequence failed");
    assert_eq!(next, 4);

    ctx.cleanup().await;
}
