use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    app_error::{ValidationError, require},
    domain::prescribing::NewPatient,
    models::{CreatePatientEntity, UpdatePatientEntity},
};

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Rules shared by every way a patient is registered.
pub fn validate_patient_fields(
    full_name: &str,
    phone: &str,
    gender: &str,
    age: i32,
) -> Result<(), ValidationError> {
    require("full_name", full_name)?;
    require("phone", phone)?;
    require("gender", gender)?;
    validate_age(age)
}

/// Ages are whole years between 1 and 150.
pub fn validate_age(age: i32) -> Result<(), ValidationError> {
    if !(1..=150).contains(&age) {
        return Err(ValidationError::invalid("age", "must be between 1 and 150"));
    }
    Ok(())
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct PatientForm {
    pub full_name: String,
    pub phone: String,
    pub age: i32,
    pub gender: String,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub medical_history: Option<String>,
}

impl PatientForm {
    pub fn into_entity(self, doctor_id: Uuid) -> Result<CreatePatientEntity, ValidationError> {
        validate_patient_fields(&self.full_name, &self.phone, &self.gender, self.age)?;
        Ok(CreatePatientEntity {
            doctor_id,
            full_name: self.full_name.trim().to_string(),
            age: self.age,
            gender: self.gender.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: trimmed(self.address),
            blood_group: trimmed(self.blood_group),
            medical_history: trimmed(self.medical_history),
        })
    }
}

impl From<NewPatient> for PatientForm {
    fn from(patient: NewPatient) -> Self {
        PatientForm {
            full_name: patient.full_name,
            phone: patient.phone,
            age: patient.age,
            gender: patient.gender,
            address: patient.address,
            ..Default::default()
        }
    }
}

/// Partial update: absent fields stay untouched, present required fields
/// must not be blank.
pub fn validate_patient_patch(patch: &UpdatePatientEntity) -> Result<(), ValidationError> {
    if patch.is_empty() {
        return Err(ValidationError::invalid("body", "has no fields to update"));
    }
    if let Some(full_name) = &patch.full_name {
        require("full_name", full_name)?;
    }
    if let Some(phone) = &patch.phone {
        require("phone", phone)?;
    }
    if let Some(gender) = &patch.gender {
        require("gender", gender)?;
    }
    if let Some(age) = patch.age {
        validate_age(age)?;
    }
    Ok(())
}
