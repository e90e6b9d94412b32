use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app_error::{ValidationError, require};

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Overdue => "overdue",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// Only a paid invoice carries a payment date.
    pub fn payment_date(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            PaymentStatus::Paid => Some(now),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "overdue" => Ok(PaymentStatus::Overdue),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(ValidationError::invalid(
                "payment_status",
                format!("'{}' is not a known payment status", other),
            )),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, ToSchema)]
pub struct LineItemDraft {
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub unit_price: f64,
}

fn default_quantity() -> i32 {
    1
}

impl LineItemDraft {
    pub fn total(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("description", &self.description)?;
        if self.quantity < 1 {
            return Err(ValidationError::invalid("quantity", "must be at least 1"));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(ValidationError::invalid(
                "unit_price",
                "must be a non-negative amount",
            ));
        }
        if !self.total().is_finite() {
            return Err(ValidationError::invalid("unit_price", "line total is too large"));
        }
        Ok(())
    }
}

/// Invoice amount: the sum of quantity × unit price over all lines.
pub fn invoice_total(items: &[LineItemDraft]) -> f64 {
    items.iter().map(LineItemDraft::total).sum()
}

/// `INV-YYYYMM-NNNN`, where `NNNN` is the low four decimal digits of `entropy`.
pub fn invoice_number(now: DateTime<Utc>, entropy: u128) -> String {
    format!(
        "INV-{:04}{:02}-{:04}",
        now.year(),
        now.month(),
        entropy % 10_000
    )
}

pub fn generate_invoice_number(now: DateTime<Utc>) -> String {
    invoice_number(now, Uuid::new_v4().as_u128())
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct InvoiceDraft {
    pub patient_id: Option<Uuid>,
    pub items: Vec<LineItemDraft>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl InvoiceDraft {
    pub fn validate(&self) -> Result<Uuid, ValidationError> {
        let patient_id = self.patient_id.ok_or(ValidationError::Required("patient_id"))?;
        if self.items.is_empty() {
            return Err(ValidationError::invalid("items", "must contain at least one line"));
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(patient_id)
    }

    pub fn total(&self) -> f64 {
        invoice_total(&self.items)
    }
}
