//! Visit DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Currency, DoctorId, Money, UserId};
use domain_visit::{GeoPoint, OrderLine, OrderLineInput, Visit, VisitOutcome, VisitStatus};

use crate::error::ApiError;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordVisitRequest {
    pub doctor_id: Uuid,
    /// Required for owner/manager callers; ignored for MR callers
    pub mr_id: Option<Uuid>,
    /// Defaults to now
    pub visit_date: Option<DateTime<Utc>>,
    pub outcome: Option<String>,
    pub not_met_reason: Option<String>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub location: Option<GeoPointDto>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub orders: Vec<OrderLineDto>,
}

impl RecordVisitRequest {
    pub fn into_domain(self) -> Result<domain_visit::RecordVisitRequest, ApiError> {
        Ok(domain_visit::RecordVisitRequest {
            doctor_id: DoctorId::from(self.doctor_id),
            mr_id: self.mr_id.map(UserId::from),
            visit_date: self.visit_date,
            outcome: parse_outcome(self.outcome.as_deref())?,
            not_met_reason: self.not_met_reason,
            check_in: self.check_in,
            check_out: self.check_out,
            location: self.location.map(GeoPointDto::into_domain),
            notes: self.notes,
            orders: self
                .orders
                .into_iter()
                .map(OrderLineDto::into_domain)
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVisitRequest {
    pub visit_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub outcome: Option<String>,
    pub not_met_reason: Option<String>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub location: Option<GeoPointDto>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub orders: Option<Vec<OrderLineDto>>,
}

impl UpdateVisitRequest {
    pub fn into_domain(self) -> Result<domain_visit::UpdateVisitRequest, ApiError> {
        Ok(domain_visit::UpdateVisitRequest {
            visit_date: self.visit_date,
            status: parse_status(self.status.as_deref())?,
            outcome: parse_outcome(self.outcome.as_deref())?,
            not_met_reason: self.not_met_reason,
            check_in: self.check_in,
            check_out: self.check_out,
            location: self.location.map(GeoPointDto::into_domain),
            notes: self.notes,
            orders: self
                .orders
                .map(|lines| {
                    lines
                        .into_iter()
                        .map(OrderLineDto::into_domain)
                        .collect::<Result<_, _>>()
                })
                .transpose()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitListQuery {
    pub mr_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPointDto {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl GeoPointDto {
    fn into_domain(self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

impl From<GeoPoint> for GeoPointDto {
    fn from(point: GeoPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineDto {
    pub product: String,
    pub quantity: u32,
    pub amount: Decimal,
    /// ISO 4217 code; defaults to INR
    pub currency: Option<String>,
}

impl OrderLineDto {
    fn into_domain(self) -> Result<OrderLineInput, ApiError> {
        let currency = match self.currency.as_deref() {
            Some(code) => code
                .parse::<Currency>()
                .map_err(|e| ApiError::Validation(e.to_string()))?,
            None => Currency::default(),
        };
        Ok(OrderLineInput {
            product: self.product,
            quantity: self.quantity,
            amount: Money::new(self.amount, currency),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitResponse {
    pub id: Uuid,
    pub mr_id: Uuid,
    pub doctor_id: Uuid,
    pub visit_date: DateTime<Utc>,
    pub status: String,
    pub outcome: Option<String>,
    pub not_met_reason: Option<String>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub location: Option<GeoPointDto>,
    pub notes: Option<String>,
    pub orders: Vec<OrderLineResponse>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Visit> for VisitResponse {
    fn from(visit: Visit) -> Self {
        Self {
            id: visit.id.into(),
            mr_id: visit.mr_id.into(),
            doctor_id: visit.doctor_id.into(),
            visit_date: visit.visit_date,
            status: visit.status.as_str().to_string(),
            outcome: visit.outcome.map(|o| o.as_str().to_string()),
            not_met_reason: visit.not_met_reason,
            check_in: visit.check_in,
            check_out: visit.check_out,
            location: visit.location.map(GeoPointDto::from),
            notes: visit.notes,
            orders: visit.orders.into_iter().map(OrderLineResponse::from).collect(),
            created_by: visit.created_by.into(),
            created_at: visit.created_at,
            updated_at: visit.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub product: String,
    pub quantity: u32,
    pub amount: Decimal,
    pub currency: String,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            id: line.id.into(),
            product: line.product,
            quantity: line.quantity,
            amount: line.amount.amount(),
            currency: line.amount.currency().code().to_string(),
        }
    }
}

pub(crate) fn parse_outcome(raw: Option<&str>) -> Result<Option<VisitOutcome>, ApiError> {
    raw.map(|s| {
        s.parse::<VisitOutcome>()
            .map_err(|e| ApiError::Validation(e.to_string()))
    })
    .transpose()
}

pub(crate) fn parse_status(raw: Option<&str>) -> Result<Option<VisitStatus>, ApiError> {
    raw.map(|s| {
        s.parse::<VisitStatus>()
            .map_err(|e| ApiError::Validation(e.to_string()))
    })
    .transpose()
}
