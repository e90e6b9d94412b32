use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    domain::billing::PaymentStatus,
    models::{InvoiceEntity, PatientEntity, PrescriptionEntity},
};

/// Inclusive UTC day range; an open end is unbounded.
#[derive(Deserialize, Debug, Default, Clone, Copy, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        let day = timestamp.date_naive();
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }
}

#[derive(Serialize, Debug, Default, PartialEq, ToSchema)]
pub struct GenderDistribution {
    pub male: usize,
    pub female: usize,
    pub other: usize,
}

#[derive(Serialize, Debug, Default, PartialEq, ToSchema)]
pub struct PaymentStatusCounts {
    pub paid: usize,
    pub pending: usize,
    pub overdue: usize,
    pub cancelled: usize,
}

#[derive(Serialize, Debug, Default, PartialEq, ToSchema)]
pub struct MonthlyPoint {
    /// `YYYY-MM`
    pub month: String,
    pub new_patients: usize,
    pub paid_revenue: f64,
}

#[derive(Serialize, Debug, Default, PartialEq, ToSchema)]
pub struct AnalyticsSummary {
    pub total_patients: usize,
    pub total_prescriptions: usize,
    pub total_invoices: usize,
    pub paid_revenue: f64,
    pub pending_revenue: f64,
    pub gender_distribution: GenderDistribution,
    pub payment_status: PaymentStatusCounts,
    pub monthly: Vec<MonthlyPoint>,
}

fn month_key(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m").to_string()
}

pub fn summarize(
    range: DateRange,
    patients: &[PatientEntity],
    prescriptions: &[PrescriptionEntity],
    invoices: &[InvoiceEntity],
) -> AnalyticsSummary {
    let patients: Vec<_> = patients
        .iter()
        .filter(|p| range.contains(&p.created_at))
        .collect();
    let invoices: Vec<_> = invoices
        .iter()
        .filter(|i| range.contains(&i.created_at))
        .collect();
    let total_prescriptions = prescriptions
        .iter()
        .filter(|p| range.contains(&p.created_at))
        .count();

    let mut summary = AnalyticsSummary {
        total_patients: patients.len(),
        total_prescriptions,
        total_invoices: invoices.len(),
        ..Default::default()
    };

    let mut monthly: BTreeMap<String, MonthlyPoint> = BTreeMap::new();

    for patient in &patients {
        match patient.gender.trim().to_ascii_lowercase().as_str() {
            "male" => summary.gender_distribution.male += 1,
            "female" => summary.gender_distribution.female += 1,
            _ => summary.gender_distribution.other += 1,
        }
        let key = month_key(&patient.created_at);
        monthly
            .entry(key.clone())
            .or_insert_with(|| MonthlyPoint {
                month: key,
                ..Default::default()
            })
            .new_patients += 1;
    }

    for invoice in &invoices {
        let Ok(status) = invoice.payment_status.parse::<PaymentStatus>() else {
            tracing::warn!(
                "Invoice {} has unknown payment status '{}'",
                invoice.id,
                invoice.payment_status
            );
            continue;
        };
        match status {
            PaymentStatus::Paid => {
                summary.payment_status.paid += 1;
                summary.paid_revenue += invoice.amount;
                let key = month_key(&invoice.created_at);
                monthly
                    .entry(key.clone())
                    .or_insert_with(|| MonthlyPoint {
                        month: key,
                        ..Default::default()
                    })
                    .paid_revenue += invoice.amount;
            }
            PaymentStatus::Pending => {
                summary.payment_status.pending += 1;
                summary.pending_revenue += invoice.amount;
            }
            PaymentStatus::Overdue => summary.payment_status.overdue += 1,
            PaymentStatus::Cancelled => summary.payment_status.cancelled += 1,
        }
    }

    summary.monthly = monthly.into_values().collect();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 30, 0).unwrap()
    }

    fn patient(gender: &str, created: DateTime<Utc>) -> PatientEntity {
        PatientEntity {
            id: Uuid::new_v4(),
            doctor_id: Uuid::nil(),
            full_name: "Patient".into(),
            age: 33,
            gender: gender.into(),
            phone: "9000000000".into(),
            address: None,
            blood_group: None,
            medical_history: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn invoice(status: &str, amount: f64, created: DateTime<Utc>) -> InvoiceEntity {
        InvoiceEntity {
            id: Uuid::new_v4(),
            doctor_id: Uuid::nil(),
            patient_id: Uuid::nil(),
            invoice_number: "INV-202501-0001".into(),
            amount,
            payment_status: status.into(),
            payment_method: None,
            payment_date: None,
            notes: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn prescription(created: DateTime<Utc>) -> PrescriptionEntity {
        PrescriptionEntity {
            id: Uuid::new_v4(),
            doctor_id: Uuid::nil(),
            patient_id: Uuid::nil(),
            diagnosis: "Cold".into(),
            medications: "1. Rest".into(),
            instructions: None,
            details: None,
            created_at: created,
        }
    }

    #[test]
    fn revenue_and_counts() {
        let patients = vec![
            patient("male", at(2025, 1, 5)),
            patient("Female", at(2025, 1, 20)),
            patient("non-binary", at(2025, 2, 1)),
        ];
        let prescriptions = vec![prescription(at(2025, 1, 5)), prescription(at(2025, 2, 2))];
        let invoices = vec![
            invoice("paid", 500.0, at(2025, 1, 5)),
            invoice("paid", 250.0, at(2025, 2, 3)),
            invoice("pending", 120.0, at(2025, 2, 3)),
            invoice("overdue", 80.0, at(2025, 2, 4)),
            invoice("cancelled", 60.0, at(2025, 2, 4)),
        ];

        let summary = summarize(DateRange::default(), &patients, &prescriptions, &invoices);

        assert_eq!(summary.total_patients, 3);
        assert_eq!(summary.total_prescriptions, 2);
        assert_eq!(summary.total_invoices, 5);
        assert_eq!(summary.paid_revenue, 750.0);
        assert_eq!(summary.pending_revenue, 120.0);
        assert_eq!(
            summary.gender_distribution,
            GenderDistribution {
                male: 1,
                female: 1,
                other: 1
            }
        );
        assert_eq!(
            summary.payment_status,
            PaymentStatusCounts {
                paid: 2,
                pending: 1,
                overdue: 1,
                cancelled: 1
            }
        );
        assert_eq!(
            summary.monthly,
            vec![
                MonthlyPoint {
                    month: "2025-01".into(),
                    new_patients: 2,
                    paid_revenue: 500.0
                },
                MonthlyPoint {
                    month: "2025-02".into(),
                    new_patients: 1,
                    paid_revenue: 250.0
                },
            ]
        );
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2025, 2, 1),
            to: NaiveDate::from_ymd_opt(2025, 2, 28),
        };
        assert!(range.contains(&at(2025, 2, 1)));
        assert!(range.contains(&at(2025, 2, 28)));
        assert!(!range.contains(&at(2025, 1, 31)));
        assert!(!range.contains(&at(2025, 3, 1)));

        let patients = vec![patient("male", at(2025, 1, 5)), patient("male", at(2025, 2, 5))];
        let summary = summarize(range, &patients, &[], &[]);
        assert_eq!(summary.total_patients, 1);
    }

    #[test]
    fn empty_inputs_give_zeroes() {
        let summary = summarize(DateRange::default(), &[], &[], &[]);
        assert_eq!(summary, AnalyticsSummary::default());
    }
}
