//! Printable HTML documents: the prescription pad and the billing receipt.
//! Layout is left to the browser's print stylesheet; only content is composed here.
//! The templates live under `templates/print/` and are compiled into the binary.

use std::sync::LazyLock;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use utoipa::IntoParams;

use crate::{
    domain::prescribing::ClinicalDetails,
    models::{InvoiceEntity, InvoiceItemEntity, PatientEntity, PrescriptionEntity, ProfileEntity},
};

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Names end in `.html`, so tera escapes every interpolated value.
static TEMPLATES: LazyLock<Result<Tera, tera::Error>> = LazyLock::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("layout.html", include_str!("../../templates/print/layout.html")),
        (
            "doctor_header.html",
            include_str!("../../templates/print/doctor_header.html"),
        ),
        (
            "patient_block.html",
            include_str!("../../templates/print/patient_block.html"),
        ),
        (
            "prescription.html",
            include_str!("../../templates/print/prescription.html"),
        ),
        ("receipt.html", include_str!("../../templates/print/receipt.html")),
    ])?;
    Ok(tera)
});

fn templates() -> anyhow::Result<&'static Tera> {
    TEMPLATES
        .as_ref()
        .map_err(|err| anyhow::anyhow!("Failed to load print templates: {:?}", err))
}

/// Toggles from the prescription pad's print bar. Every section prints unless
/// switched off.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(default)]
pub struct PrintOptions {
    pub show_doctor_info: bool,
    pub show_patient_info: bool,
    pub show_bottom_info: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        PrintOptions {
            show_doctor_info: true,
            show_patient_info: true,
            show_bottom_info: true,
        }
    }
}

fn trimmed(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

#[derive(Serialize)]
struct DoctorView {
    full_name: String,
    credentials: String,
    nmc_id: String,
    clinic_name: String,
    shift: String,
    working_days: String,
    phone: String,
}

impl From<&ProfileEntity> for DoctorView {
    fn from(profile: &ProfileEntity) -> Self {
        let credentials = [
            profile.qualification.as_deref(),
            profile.specialization.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

        DoctorView {
            full_name: profile.full_name.trim().to_string(),
            credentials,
            nmc_id: trimmed(profile.nmc_id.as_deref()),
            clinic_name: profile.clinic_name.trim().to_string(),
            shift: profile.shift.trim().to_string(),
            working_days: profile
                .working_days
                .as_deref()
                .map(|days| days.join(", "))
                .unwrap_or_default(),
            phone: trimmed(profile.phone.as_deref()),
        }
    }
}

#[derive(Serialize)]
struct PatientView {
    full_name: String,
    age: i32,
    gender: String,
    phone: String,
    address: String,
}

impl From<&PatientEntity> for PatientView {
    fn from(patient: &PatientEntity) -> Self {
        PatientView {
            full_name: patient.full_name.trim().to_string(),
            age: patient.age,
            gender: patient.gender.trim().to_string(),
            phone: patient.phone.trim().to_string(),
            address: trimmed(patient.address.as_deref()),
        }
    }
}

#[derive(Serialize)]
struct TestView {
    name: String,
    note: String,
}

#[derive(Serialize, Default)]
struct ClinicalView {
    complaints: String,
    chronic_conditions: String,
    vitals: Vec<VitalLine>,
    tests: Vec<TestView>,
    referral: String,
    follow_up: String,
    surgery_advice: String,
}

#[derive(Serialize)]
struct VitalLine {
    name: String,
    result: String,
}

impl From<&ClinicalDetails> for ClinicalView {
    fn from(details: &ClinicalDetails) -> Self {
        ClinicalView {
            complaints: details.complaints.trim().to_string(),
            chronic_conditions: details.chronic_conditions.flagged().join(", "),
            vitals: details
                .vitals
                .iter()
                .filter(|vital| !vital.result.trim().is_empty())
                .map(|vital| VitalLine {
                    name: vital.name.trim().to_string(),
                    result: vital.result.trim().to_string(),
                })
                .collect(),
            tests: details
                .tests
                .iter()
                .map(|test| TestView {
                    name: test.name.trim().to_string(),
                    note: test.note.trim().to_string(),
                })
                .collect(),
            referral: details.referral.trim().to_string(),
            follow_up: details.follow_up.trim().to_string(),
            surgery_advice: details.surgery_advice.trim().to_string(),
        }
    }
}

#[derive(Serialize)]
struct ReceiptLine<'a> {
    description: &'a str,
    quantity: i32,
    unit_price: String,
    total: String,
}

pub fn render_prescription(
    profile: &ProfileEntity,
    patient: &PatientEntity,
    prescription: &PrescriptionEntity,
    details: Option<&ClinicalDetails>,
    options: PrintOptions,
    printed_at: DateTime<Utc>,
) -> anyhow::Result<String> {
    let mut context = Context::new();
    context.insert("options", &options);
    context.insert("doctor", &DoctorView::from(profile));
    context.insert("patient", &PatientView::from(patient));
    context.insert("printed_date", &printed_at.format(DATE_FORMAT).to_string());
    context.insert("printed_time", &printed_at.format("%H:%M").to_string());
    context.insert(
        "clinical",
        &details.map(ClinicalView::from).unwrap_or_default(),
    );
    context.insert("diagnosis", prescription.diagnosis.trim());
    context.insert(
        "medication_lines",
        &prescription.medications.lines().collect::<Vec<_>>(),
    );
    context.insert(
        "instructions",
        &trimmed(prescription.instructions.as_deref()),
    );

    templates()?
        .render("prescription.html", &context)
        .context("Failed to render prescription")
}

pub fn render_receipt(
    profile: &ProfileEntity,
    patient: &PatientEntity,
    invoice: &InvoiceEntity,
    items: &[InvoiceItemEntity],
) -> anyhow::Result<String> {
    let lines: Vec<ReceiptLine> = items
        .iter()
        .map(|item| ReceiptLine {
            description: &item.description,
            quantity: item.quantity,
            unit_price: format!("{:.2}", item.unit_price),
            total: format!("{:.2}", item.total),
        })
        .collect();

    let mut context = Context::new();
    context.insert("doctor", &DoctorView::from(profile));
    context.insert("patient", &PatientView::from(patient));
    context.insert("invoice", invoice);
    context.insert("issued_on", &invoice.created_at.format(DATE_FORMAT).to_string());
    context.insert(
        "paid_on",
        &invoice
            .payment_date
            .map(|paid_on| paid_on.format(DATE_FORMAT).to_string()),
    );
    context.insert("items", &lines);
    context.insert("amount", &format!("{:.2}", invoice.amount));

    templates()?
        .render("receipt.html", &context)
        .context("Failed to render receipt")
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prescribing::{ChronicConditions, TestLine, Vital};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn profile() -> ProfileEntity {
        let now = Utc::now();
        ProfileEntity {
            id: Uuid::new_v4(),
            email: "dr.rao@clinic.in".into(),
            full_name: "Dr. Anil Rao".into(),
            clinic_name: "Rao & Sons Clinic".into(),
            shift: "Morning".into(),
            phone: Some("044-222333".into()),
            specialization: Some("General Medicine".into()),
            age: None,
            gender: None,
            qualification: Some("MBBS".into()),
            experience: None,
            nmc_id: Some("NMC-1123".into()),
            working_days: Some(vec!["Monday".into(), "Tuesday".into()]),
            created_at: now,
            updated_at: now,
        }
    }

    fn patient() -> PatientEntity {
        let now = Utc::now();
        PatientEntity {
            id: Uuid::new_v4(),
            doctor_id: Uuid::nil(),
            full_name: "Meena <Iyer>".into(),
            age: 41,
            gender: "female".into(),
            phone: "9876500000".into(),
            address: None,
            blood_group: None,
            medical_history: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn prescription() -> PrescriptionEntity {
        PrescriptionEntity {
            id: Uuid::new_v4(),
            doctor_id: Uuid::nil(),
            patient_id: Uuid::nil(),
            diagnosis: "Acute bronchitis".into(),
            medications: "1. Azithromycin 500 mg\n2. Steam inhalation".into(),
            instructions: Some("Rest for 3 days".into()),
            details: None,
            created_at: Utc::now(),
        }
    }

    fn printed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 7, 9, 5, 0).unwrap()
    }

    #[test]
    fn toggles_control_sections() {
        let hidden = render_prescription(
            &profile(),
            &patient(),
            &prescription(),
            None,
            PrintOptions {
                show_doctor_info: false,
                show_patient_info: false,
                show_bottom_info: false,
            },
            printed_at(),
        )
        .unwrap();
        assert!(!hidden.contains("Dr. Anil Rao"));
        assert!(!hidden.contains("9876500000"));
        assert!(hidden.contains("Acute bronchitis"));
        assert!(hidden.contains("Date: 07/04/2025 Time: 09:05"));

        let shown = render_prescription(
            &profile(),
            &patient(),
            &prescription(),
            None,
            PrintOptions::default(),
            printed_at(),
        )
        .unwrap();
        assert!(shown.contains("<h1>Dr. Anil Rao</h1>"));
        assert!(shown.contains("MBBS, General Medicine"));
        assert!(shown.contains("9876500000"));
        assert!(shown.contains("<footer>"));
    }

    #[test]
    fn missing_toggles_default_to_shown() {
        let options: PrintOptions =
            serde_json::from_str(r#"{ "show_bottom_info": false }"#).unwrap();
        assert!(options.show_doctor_info);
        assert!(options.show_patient_info);
        assert!(!options.show_bottom_info);
    }

    #[test]
    fn values_are_escaped() {
        let html = render_prescription(
            &profile(),
            &patient(),
            &prescription(),
            None,
            PrintOptions {
                show_doctor_info: true,
                show_patient_info: true,
                show_bottom_info: false,
            },
            printed_at(),
        )
        .unwrap();
        assert!(html.contains("Meena &lt;Iyer&gt;"));
        assert!(html.contains("Rao &amp; Sons Clinic"));
        assert!(!html.contains("<Iyer>"));
    }

    #[test]
    fn clinical_details_are_printed() {
        let details = ClinicalDetails {
            complaints: "Cough for a week".into(),
            chronic_conditions: ChronicConditions {
                asthma: true,
                ..Default::default()
            },
            vitals: vec![Vital {
                name: "BP".into(),
                result: "130/85".into(),
            }],
            tests: vec![TestLine {
                name: "Chest X-ray".into(),
                note: "PA view".into(),
            }],
            follow_up: "After 5 days".into(),
            ..Default::default()
        };
        let html = render_prescription(
            &profile(),
            &patient(),
            &prescription(),
            Some(&details),
            PrintOptions::default(),
            printed_at(),
        )
        .unwrap();
        assert!(html.contains("<b>Chronic conditions:</b> Asthma"));
        assert!(html.contains("<b>BP:</b> 130&#x2F;85"));
        assert!(html.contains("<li>Chest X-ray - PA view</li>"));
        assert!(html.contains("1. Azithromycin 500 mg<br/>2. Steam inhalation"));
        assert!(html.contains("<b>Follow up:</b> After 5 days"));
        assert!(!html.contains("Referral"));
    }

    #[test]
    fn receipt_lists_items_and_amount() {
        let now = Utc.with_ymd_and_hms(2025, 4, 7, 9, 5, 0).unwrap();
        let invoice = InvoiceEntity {
            id: Uuid::new_v4(),
            doctor_id: Uuid::nil(),
            patient_id: Uuid::nil(),
            invoice_number: "INV-202504-0042".into(),
            amount: 860.0,
            payment_status: "paid".into(),
            payment_method: Some("UPI".into()),
            payment_date: Some(now),
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let items = vec![
            InvoiceItemEntity {
                id: Uuid::new_v4(),
                invoice_id: invoice.id,
                description: "Consultation".into(),
                quantity: 1,
                unit_price: 500.0,
                total: 500.0,
                created_at: now,
            },
            InvoiceItemEntity {
                id: Uuid::new_v4(),
                invoice_id: invoice.id,
                description: "Nebulisation".into(),
                quantity: 3,
                unit_price: 120.0,
                total: 360.0,
                created_at: now,
            },
        ];
        let html = render_receipt(&profile(), &patient(), &invoice, &items).unwrap();
        assert!(html.contains("<h3>Receipt INV-202504-0042</h3>"));
        assert!(html.contains("<td>Nebulisation</td><td>3</td><td>120.00</td><td>360.00</td>"));
        assert!(html.contains("<b>860.00</b>"));
        assert!(html.contains("<b>Payment method:</b> UPI"));
        assert!(html.contains("<b>Paid on:</b> 07/04/2025"));
    }

    #[test]
    fn receipt_escapes_item_descriptions() {
        let now = Utc::now();
        let invoice = InvoiceEntity {
            id: Uuid::new_v4(),
            doctor_id: Uuid::nil(),
            patient_id: Uuid::nil(),
            invoice_number: "INV-202504-0043".into(),
            amount: 100.0,
            payment_status: "pending".into(),
            payment_method: None,
            payment_date: None,
            notes: Some("<script>alert(1)</script>".into()),
            created_at: now,
            updated_at: now,
        };
        let items = vec![InvoiceItemEntity {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            description: "Dressing \"large\" & tape".into(),
            quantity: 1,
            unit_price: 100.0,
            total: 100.0,
            created_at: now,
        }];
        let html = render_receipt(&profile(), &patient(), &invoice, &items).unwrap();
        assert!(html.contains("<td>Dressing &quot;large&quot; &amp; tape</td>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("Paid on"));
        assert!(!html.contains("Payment method"));
    }
}
