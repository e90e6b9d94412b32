use chrono::{DateTime, Utc};
use diesel::{
    AsChangeset, Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

// Profiles

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProfileEntity {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub clinic_name: String,
    pub shift: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub nmc_id: Option<String>,
    pub working_days: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::profiles)]
pub struct CreateProfileEntity {
    pub email: String,
    pub full_name: String,
    pub clinic_name: String,
    pub shift: String,
}

/// Every editable profile field; `None` is written as NULL.
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::profiles)]
#[diesel(treat_none_as_null = true)]
pub struct UpdateProfileEntity {
    pub full_name: String,
    pub clinic_name: String,
    pub shift: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub nmc_id: Option<String>,
    pub working_days: Option<Vec<String>>,
}

// Sessions

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SessionEntity {
    pub token: Uuid,
    pub doctor_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::sessions)]
pub struct CreateSessionEntity {
    pub doctor_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

// Patients

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::patients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PatientEntity {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub full_name: String,
    pub age: i32,
    pub gender: String,
    pub phone: String,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub medical_history: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::patients)]
pub struct CreatePatientEntity {
    pub doctor_id: Uuid,
    pub full_name: String,
    pub age: i32,
    pub gender: String,
    pub phone: String,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub medical_history: Option<String>,
}

#[derive(AsChangeset, Deserialize, Debug, Default, ToSchema)]
#[diesel(table_name = crate::schema::patients)]
pub struct UpdatePatientEntity {
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub medical_history: Option<String>,
}

impl UpdatePatientEntity {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.blood_group.is_none()
            && self.medical_history.is_none()
    }
}

/// Patient columns embedded next to prescriptions, appointments and invoices.
#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::patients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PatientSummary {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub age: i32,
    pub gender: String,
}

// Prescriptions

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::prescriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PrescriptionEntity {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub diagnosis: String,
    pub medications: String,
    pub instructions: Option<String>,
    pub details: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::prescriptions)]
pub struct CreatePrescriptionEntity {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub diagnosis: String,
    pub medications: String,
    pub instructions: Option<String>,
    pub details: Option<Value>,
}

// Appointments

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AppointmentEntity {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::appointments)]
pub struct CreateAppointmentEntity {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
}

// Invoices

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::invoices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InvoiceEntity {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub invoice_number: String,
    pub amount: f64,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::invoices)]
pub struct CreateInvoiceEntity {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub invoice_number: String,
    pub amount: f64,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::invoice_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InvoiceItemEntity {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub total: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::invoice_items)]
pub struct CreateInvoiceItemEntity {
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub total: f64,
}

// Medicine and diagnostics lists

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::medicines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MedicineEntity {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub name: String,
    pub dose: String,
    pub medicine_type: String,
    pub timing: String,
    pub dose_unit: String,
    pub duration: String,
    pub frequency: String,
    pub instructions: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::medicines)]
pub struct CreateMedicineEntity {
    pub doctor_id: Uuid,
    pub name: String,
    pub dose: String,
    pub medicine_type: String,
    pub timing: String,
    pub dose_unit: String,
    pub duration: String,
    pub frequency: String,
    pub instructions: String,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::medicines)]
pub struct UpdateMedicineEntity {
    pub name: String,
    pub dose: String,
    pub medicine_type: String,
    pub timing: String,
    pub dose_unit: String,
    pub duration: String,
    pub frequency: String,
    pub instructions: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::diagnostic_tests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DiagnosticTestEntity {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub test_name: String,
    pub instructions: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::diagnostic_tests)]
pub struct CreateDiagnosticTestEntity {
    pub doctor_id: Uuid,
    pub test_name: String,
    pub instructions: String,
}
