//! Derived analytics over the pipeline store.
//!
//! Nothing in this module writes. Rows are read through the repositories
//! and the rollups are computed in memory, so a slow aggregation can never
//! hold a write transaction open.
//!
//! Timezone policy: timestamps are stored in UTC and all calendar bucketing
//! ("YYYY-MM" months, "YYYY-MM-DD" days) uses the UTC date portion of the
//! stored string.

use serde::Serialize;

use crate::db::{CallFeedback, DbError, DbSale, ProspectStatus, SalesDb};

/// Revenue and count for one product or service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRollup {
    pub product_or_service: String,
    pub revenue: f64,
    pub count: usize,
}

/// Revenue and count for one calendar month (`YYYY-MM`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRollup {
    pub month: String,
    pub revenue: f64,
    pub count: usize,
}

/// A label/count pair for histogram views. Entries appear in the order the
/// label was first encountered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

/// Everything the analytics screen renders, computed on demand.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    pub total_revenue: f64,
    pub average_sale_amount: f64,
    /// Won prospects as a percentage of all prospects.
    pub conversion_rate: f64,
    /// Top 5 products by revenue; ties keep first-encountered order.
    pub top_products: Vec<ProductRollup>,
    /// Ascending by month key (lexicographic == chronological for YYYY-MM).
    pub sales_by_month: Vec<MonthlyRollup>,
    pub prospects_by_status: Vec<CategoryCount>,
    pub calls_by_feedback: Vec<CategoryCount>,
}

/// Per-feedback tallies for one user on one UTC calendar day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCallStats {
    pub date: String,
    pub successful: usize,
    pub busy: usize,
    pub not_answered: usize,
    pub dnc: usize,
    pub connected_lead: usize,
    pub total: usize,
}

fn rollup_products(sales: &[DbSale]) -> Vec<ProductRollup> {
    let mut rollups: Vec<ProductRollup> = Vec::new();
    for sale in sales {
        match rollups
            .iter_mut()
            .find(|r| r.product_or_service == sale.product_or_service)
        {
            Some(rollup) => {
                rollup.revenue += sale.amount;
                rollup.count += 1;
            }
            None => rollups.push(ProductRollup {
                product_or_service: sale.product_or_service.clone(),
                revenue: sale.amount,
                count: 1,
            }),
        }
    }
    rollups
}

fn rollup_months(sales: &[DbSale]) -> Vec<MonthlyRollup> {
    let mut rollups: Vec<MonthlyRollup> = Vec::new();
    for sale in sales {
        let month = sale.date.get(..7).unwrap_or(&sale.date);
        match rollups.iter_mut().find(|r| r.month == month) {
            Some(rollup) => {
                rollup.revenue += sale.amount;
                rollup.count += 1;
            }
            None => rollups.push(MonthlyRollup {
                month: month.to_string(),
                revenue: sale.amount,
                count: 1,
            }),
        }
    }
    rollups.sort_by(|a, b| a.month.cmp(&b.month));
    rollups
}

fn count_category(counts: &mut Vec<CategoryCount>, label: &str) {
    match counts.iter_mut().find(|c| c.label == label) {
        Some(entry) => entry.count += 1,
        None => counts.push(CategoryCount {
            label: label.to_string(),
            count: 1,
        }),
    }
}

/// Compute the analytics view for one user, optionally bounding sales to
/// `[start, end]` (inclusive RFC3339 strings). Prospect, call and follow-up
/// derived figures are not date-bounded — they describe the pipeline as it
/// stands today.
pub fn analytics_data(
    db: &SalesDb,
    user_id: i64,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<AnalyticsData, DbError> {
    let sales = db.list_sales_for_user(user_id, start, end)?;
    let prospects = db.list_prospects(user_id)?;
    let calls = db.list_call_logs_for_user(user_id)?;

    let total_revenue: f64 = sales.iter().map(|s| s.amount).sum();
    let average_sale_amount = if sales.is_empty() {
        0.0
    } else {
        total_revenue / sales.len() as f64
    };

    let won = prospects
        .iter()
        .filter(|p| p.status == ProspectStatus::Won)
        .count();
    let conversion_rate = if prospects.is_empty() {
        0.0
    } else {
        won as f64 / prospects.len() as f64 * 100.0
    };

    let mut top_products = rollup_products(&sales);
    // Stable sort: equal-revenue products keep first-encountered order
    top_products.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    top_products.truncate(5);

    let sales_by_month = rollup_months(&sales);

    let mut prospects_by_status = Vec::new();
    for prospect in &prospects {
        count_category(&mut prospects_by_status, prospect.status.as_str());
    }

    let mut calls_by_feedback = Vec::new();
    for call in &calls {
        count_category(&mut calls_by_feedback, call.feedback.as_str());
    }

    Ok(AnalyticsData {
        total_revenue,
        average_sale_amount,
        conversion_rate,
        top_products,
        sales_by_month,
        prospects_by_status,
        calls_by_feedback,
    })
}

/// Tally one user's calls for the UTC calendar day of `date`. Accepts a
/// bare `YYYY-MM-DD` or any RFC3339 timestamp (the date portion is used).
pub fn daily_call_stats(db: &SalesDb, user_id: i64, date: &str) -> Result<DailyCallStats, DbError> {
    let day = date.get(..10).unwrap_or(date);
    let calls = db.list_call_logs_for_user_on_day(user_id, day)?;

    let mut stats = DailyCallStats {
        date: day.to_string(),
        successful: 0,
        busy: 0,
        not_answered: 0,
        dnc: 0,
        connected_lead: 0,
        total: calls.len(),
    };
    for call in &calls {
        match call.feedback {
            CallFeedback::Successful => stats.successful += 1,
            CallFeedback::Busy => stats.busy += 1,
            CallFeedback::NotAnswered => stats.not_answered += 1,
            CallFeedback::Dnc => stats.dnc += 1,
            CallFeedback::ConnectedLead => stats.connected_lead += 1,
        }
    }
    Ok(stats)
}
