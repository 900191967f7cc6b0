use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Bike,
    Scooter,
    Car,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Courier {
    pub id: String,
    pub phone_number: String,
    pub name: String,
    pub email: Option<String>,
    pub is_available: bool,
    pub location: Option<GeoPoint>,
    pub last_location_at: Option<DateTime<Utc>>,
    pub rating: f64,
    pub total_deliveries: u64,
    pub driving_license: Option<String>,
    pub vehicle_number: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub bank_account_number: Option<String>,
    pub ifsc: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Courier {
    pub fn register(id: String, phone_number: String, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            phone_number,
            name,
            email: None,
            is_available: false,
            location: None,
            last_location_at: None,
            rating: 0.0,
            total_deliveries: 0,
            driving_license: None,
            vehicle_number: None,
            vehicle_type: None,
            bank_account_number: None,
            ifsc: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update. Only fields that are `Some` are written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub driving_license: Option<String>,
    pub vehicle_number: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub bank_account_number: Option<String>,
    pub ifsc: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.driving_license.is_none()
            && self.vehicle_number.is_none()
            && self.vehicle_type.is_none()
            && self.bank_account_number.is_none()
            && self.ifsc.is_none()
    }

    pub fn apply_to(&self, courier: &mut Courier) {
        if let Some(name) = &self.name {
            courier.name = name.clone();
        }
        if let Some(email) = &self.email {
            courier.email = Some(email.clone());
        }
        if let Some(license) = &self.driving_license {
            courier.driving_license = Some(license.clone());
        }
        if let Some(number) = &self.vehicle_number {
            courier.vehicle_number = Some(number.clone());
        }
        if let Some(kind) = self.vehicle_type {
            courier.vehicle_type = Some(kind);
        }
        if let Some(account) = &self.bank_account_number {
            courier.bank_account_number = Some(account.clone());
        }
        if let Some(ifsc) = &self.ifsc {
            courier.ifsc = Some(ifsc.clone());
        }
    }
}
