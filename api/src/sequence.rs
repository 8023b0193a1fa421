//! Prefix-scoped sequential code allocation.
//!
//! Every human-readable code (customer, opportunity, care, package, fallback
//! quotation number) draws from a `(prefix, scope_key)` counter row that is
//! bumped with a single upsert statement, so concurrent requests can never
//! observe the same value or leave gaps.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, Statement};

pub const CUSTOMER_PREFIX: &str = "KH";
pub const OPPORTUNITY_PREFIX: &str = "OPP";
pub const CARE_PREFIX: &str = "CSKH";
pub const PACKAGE_PREFIX: &str = "PKG";
pub const QUOTATION_PREFIX: &str = "BG";

/// Contiguous range of sequence values reserved in one counter bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedBlock {
    next: i64,
    end: i64,
}

impl ReservedBlock {
    pub fn take(&mut self) -> Option<i64> {
        if self.next > self.end {
            return None;
        }
        let value = self.next;
        self.next += 1;
        Some(value)
    }

    pub fn remaining(&self) -> i64 {
        self.end - self.next + 1
    }
}

pub async fn next_value<C: ConnectionTrait>(
    conn: &C,
    prefix: &str,
    scope_key: &str,
) -> Result<i64, DbErr> {
    let mut block = reserve_block(conn, prefix, scope_key, 1).await?;
    block
        .take()
        .ok_or_else(|| DbErr::Custom("sequence reservation returned an empty block".into()))
}

pub async fn reserve_block<C: ConnectionTrait>(
    conn: &C,
    prefix: &str,
    scope_key: &str,
    count: i64,
) -> Result<ReservedBlock, DbErr> {
    if count < 1 {
        return Err(DbErr::Custom("sequence block size must be positive".into()));
    }
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        "INSERT INTO sequence_counter (prefix, scope_key, value) VALUES ($1, $2, $3) \
         ON CONFLICT (prefix, scope_key) DO UPDATE SET value = sequence_counter.value + $3 \
         RETURNING value",
        [prefix.into(), scope_key.into(), count.into()],
    );
    let row = conn
        .query_one(stmt)
        .await?
        .ok_or_else(|| DbErr::Custom("sequence upsert returned no row".into()))?;
    let end: i64 = row.try_get("", "value")?;
    Ok(ReservedBlock {
        next: end - count + 1,
        end,
    })
}

/// Per-import code allocator: one counter bump per distinct scope key, every
/// later code within the import comes out of memory. Scoped to a single
/// import call; never reused across requests.
#[derive(Debug)]
pub struct BatchAllocator {
    prefix: &'static str,
    blocks: HashMap<String, ReservedBlock>,
}

impl BatchAllocator {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            blocks: HashMap::new(),
        }
    }

    pub async fn reserve<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        scope_key: &str,
        count: i64,
    ) -> Result<(), DbErr> {
        let block = reserve_block(conn, self.prefix, scope_key, count).await?;
        self.blocks.insert(scope_key.to_string(), block);
        Ok(())
    }

    pub fn take(&mut self, scope_key: &str) -> Option<i64> {
        self.blocks.get_mut(scope_key)?.take()
    }
}

pub fn customer_code(short_name: &str, seq: i64) -> String {
    format!("{}-{}-{:04}", CUSTOMER_PREFIX, short_name, seq)
}

pub fn opportunity_code(day_scope: &str, seq: i64) -> String {
    format!("{}-{}-{:04}", OPPORTUNITY_PREFIX, day_scope, seq)
}

pub fn care_code(month_scope: &str, seq: i64) -> String {
    format!("{}{}{:03}", CARE_PREFIX, month_scope, seq)
}

pub fn package_code(seq: i64) -> String {
    format!("{}-{:04}", PACKAGE_PREFIX, seq)
}

pub fn quotation_code(month_scope: &str, seq: i64) -> String {
    format!("{}-{}-{:04}", QUOTATION_PREFIX, month_scope, seq)
}

/// Small randomized pause between unique-key conflict retries.
pub fn retry_jitter() -> std::time::Duration {
    use rand::Rng;
    std::time::Duration::from_millis(rand::thread_rng().gen_range(5..25))
}

/// `YYYYMMDD` scope for opportunity numbers.
pub fn day_scope(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d").to_string()
}

/// `MMYY` scope for care ids, matching the legacy `CSKH<MM><YY>` shape.
pub fn care_scope(at: DateTime<Utc>) -> String {
    format!("{:02}{:02}", at.month(), at.year() % 100)
}

/// `YYYYMM` scope for generated quotation numbers.
pub fn month_scope(at: DateTime<Utc>) -> String {
    at.format("%Y%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn code_formats() {
        assert_eq!(customer_code("NVA", 1), "KH-NVA-0001");
        assert_eq!(opportunity_code("20260115", 12), "OPP-20260115-0012");
        assert_eq!(care_code("0126", 7), "CSKH0126007");
        assert_eq!(package_code(3), "PKG-0003");
        assert_eq!(quotation_code("202601", 42), "BG-202601-0042");
    }

    #[test]
    fn scope_keys() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap();
        assert_eq!(day_scope(at), "20260115");
        assert_eq!(care_scope(at), "0126");
        assert_eq!(month_scope(at), "202601");
    }

    #[test]
    fn reserved_block_hands_out_the_exact_range() {
        let mut block = ReservedBlock { next: 5, end: 7 };
        assert_eq!(block.remaining(), 3);
        assert_eq!(block.take(), Some(5));
        assert_eq!(block.take(), Some(6));
        assert_eq!(block.take(), Some(7));
        assert_eq!(block.take(), None);
        assert_eq!(block.remaining(), 0);
    }
}
