use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl JobStatus {
    pub const ACTIVE: [JobStatus; 3] = [JobStatus::Pending, JobStatus::PickedUp, JobStatus::InTransit];
    pub const FINISHED: [JobStatus; 2] = [JobStatus::Delivered, JobStatus::Cancelled];

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Delivered | JobStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::PickedUp => "picked_up",
            JobStatus::InTransit => "in_transit",
            JobStatus::Delivered => "delivered",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "pending" => Ok(JobStatus::Pending),
            "picked_up" => Ok(JobStatus::PickedUp),
            "in_transit" => Ok(JobStatus::InTransit),
            "delivered" => Ok(JobStatus::Delivered),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cod,
    Online,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: i64,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A delivery job. Status and the lifecycle timestamps only change through
/// the lifecycle engine; `courier_id` is a plain reference into the courier
/// directory, never an owning edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub order_id: String,
    pub courier_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub warehouse_id: Option<String>,
    pub status: JobStatus,
    pub pickup_address: String,
    pub delivery_address: String,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub distance_km: f64,
    pub order_amount: i64,
    pub delivery_fee: i64,
    pub items_count: u32,
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub in_transit_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order fields supplied by the upstream order system when a job is opened.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub order_id: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub warehouse_id: Option<String>,
    pub pickup_address: String,
    pub delivery_address: String,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    #[serde(default)]
    pub distance_km: f64,
    pub order_amount: i64,
    pub delivery_fee: i64,
    #[serde(default)]
    pub items_count: Option<u32>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl Job {
    pub fn open(new: NewJob, now: DateTime<Utc>) -> Self {
        let items_count = new
            .items_count
            .unwrap_or_else(|| {
                new.items
                    .iter()
                    .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
            });

        Self {
            id: Uuid::new_v4(),
            order_id: new.order_id,
            courier_id: None,
            customer_name: new.customer_name,
            customer_phone: new.customer_phone,
            warehouse_id: new.warehouse_id,
            status: JobStatus::Pending,
            pickup_address: new.pickup_address,
            delivery_address: new.delivery_address,
            pickup: new.pickup,
            dropoff: new.dropoff,
            distance_km: new.distance_km,
            order_amount: new.order_amount,
            delivery_fee: new.delivery_fee,
            items_count,
            items: new.items,
            payment_method: new.payment_method,
            notes: None,
            cancellation_reason: None,
            assigned_at: None,
            picked_up_at: None,
            in_transit_at: None,
            delivered_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Time the job left the active set, used as the history sort key.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at.or(self.cancelled_at)
    }

    pub fn is_bound_to(&self, courier_id: &str) -> bool {
        self.courier_id.as_deref() == Some(courier_id)
    }

    /// Sets the timestamp that belongs to `status`. Pending has none.
    pub fn stamp(&mut self, status: JobStatus, at: DateTime<Utc>) {
        let slot = match status {
            JobStatus::Pending => return,
            JobStatus::PickedUp => &mut self.picked_up_at,
            JobStatus::InTransit => &mut self.in_transit_at,
            JobStatus::Delivered => &mut self.delivered_at,
            JobStatus::Cancelled => &mut self.cancelled_at,
        };
        *slot = Some(at);
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            order_id: self.order_id.clone(),
            status: self.status,
            address: self.delivery_address.clone(),
            amount: self.order_amount,
            delivery_fee: self.delivery_fee,
            items_count: self.items_count,
            distance: self.distance_km,
            created_at: self.created_at,
        }
    }
}

/// List view of a job, as returned by the active-orders and history queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: Uuid,
    pub order_id: String,
    pub status: JobStatus,
    pub address: String,
    pub amount: i64,
    pub delivery_fee: i64,
    pub items_count: u32,
    pub distance: f64,
    pub created_at: DateTime<Utc>,
}
