//! Paged table browsing.

use serde::{Deserialize, Serialize};

use crate::client::DatabaseClient;
use crate::config::MAX_PAGE_SIZE;
use crate::context::ConnectionContext;
use crate::error::{AdminError, AdminResult};
use crate::ident::Ident;
use crate::preview::count_value;
use crate::statement::{Params, Row};

/// One page of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePage {
    pub table: String,
    pub rows: Vec<Row>,
    pub total: u64,
    /// 1-based.
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

/// Page `page` (1-based, `0` treated as `1`) of `table`.
///
/// `per_page` defaults to the context's page size and is clamped to
/// `1..=1000`.
pub async fn browse<C: DatabaseClient>(
    ctx: &ConnectionContext<C>,
    table: &str,
    page: u64,
    per_page: Option<u64>,
) -> AdminResult<TablePage> {
    ctx.catalog().await?.require(table)?;

    let page = page.max(1);
    let per_page = per_page
        .unwrap_or(ctx.config.page_size)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1).saturating_mul(per_page);
    let quoted = Ident::new(table)?.to_sql(ctx.dialect());
    let params = Params::new();

    let count_sql = format!("SELECT COUNT(*) AS total FROM {quoted}");
    let total = ctx
        .query(&count_sql, &params)
        .await?
        .first()
        .and_then(|row| row.values().next())
        .and_then(count_value)
        .ok_or_else(|| AdminError::database(&count_sql, "COUNT(*) returned no usable value"))?;

    // Integers only, so inlining is safe.
    let page_sql = format!("SELECT * FROM {quoted} LIMIT {per_page} OFFSET {offset}");
    let rows = ctx.query(&page_sql, &params).await?;

    Ok(TablePage {
        table: table.to_string(),
        rows,
        total,
        page,
        per_page,
        total_pages: total_pages(total, per_page),
    })
}

pub fn total_pages(total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total.div_ceil(per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 50), 0);
        assert_eq!(total_pages(50, 50), 1);
        assert_eq!(total_pages(51, 50), 2);
        assert_eq!(total_pages(7, 0), 0);
    }
}
