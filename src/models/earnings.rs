use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Compensation for one delivered job. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsRecord {
    pub id: Uuid,
    pub courier_id: String,
    pub job_id: Uuid,
    pub order_id: String,
    pub order_amount: i64,
    pub delivery_fee: i64,
    pub bonus: i64,
    pub total: i64,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsHistoryItem {
    pub order_id: String,
    pub amount: i64,
    pub completed_at: DateTime<Utc>,
}

impl From<&EarningsRecord> for EarningsHistoryItem {
    fn from(record: &EarningsRecord) -> Self {
        Self {
            order_id: record.order_id.clone(),
            amount: record.total,
            completed_at: record.earned_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Today,
    #[default]
    Week,
    Month,
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "today" => Ok(Period::Today),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            other => Err(format!("unknown period: {other}, expected today/week/month")),
        }
    }
}

/// Totals over the earnings records that fall inside one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsAggregate {
    pub total_earnings: i64,
    pub deliveries_count: u64,
    pub avg_per_delivery: i64,
    pub bonus_earnings: i64,
}
