//! Per-doctor medicine and diagnostic test lists used to prefill the pad.

use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    app_error::{ValidationError, require},
    models::{CreateDiagnosticTestEntity, CreateMedicineEntity, UpdateMedicineEntity},
};

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(default)]
pub struct MedicineForm {
    pub name: String,
    pub dose: String,
    pub medicine_type: String,
    pub timing: String,
    pub dose_unit: String,
    pub duration: String,
    pub frequency: String,
    pub instructions: String,
}

impl MedicineForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)
    }

    pub fn into_changeset(self) -> Result<UpdateMedicineEntity, ValidationError> {
        self.validate()?;
        Ok(UpdateMedicineEntity {
            name: self.name.trim().to_string(),
            dose: self.dose.trim().to_string(),
            medicine_type: self.medicine_type.trim().to_string(),
            timing: self.timing.trim().to_string(),
            dose_unit: self.dose_unit.trim().to_string(),
            duration: self.duration.trim().to_string(),
            frequency: self.frequency.trim().to_string(),
            instructions: self.instructions.trim().to_string(),
        })
    }

    pub fn into_entity(self, doctor_id: Uuid) -> Result<CreateMedicineEntity, ValidationError> {
        let fields = self.into_changeset()?;
        Ok(CreateMedicineEntity {
            doctor_id,
            name: fields.name,
            dose: fields.dose,
            medicine_type: fields.medicine_type,
            timing: fields.timing,
            dose_unit: fields.dose_unit,
            duration: fields.duration,
            frequency: fields.frequency,
            instructions: fields.instructions,
        })
    }
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct DiagnosticTestForm {
    pub test_name: String,
    #[serde(default)]
    pub instructions: String,
}

impl DiagnosticTestForm {
    pub fn into_entity(self, doctor_id: Uuid) -> Result<CreateDiagnosticTestEntity, ValidationError> {
        require("test_name", &self.test_name)?;
        Ok(CreateDiagnosticTestEntity {
            doctor_id,
            test_name: self.test_name.trim().to_string(),
            instructions: self.instructions.trim().to_string(),
        })
    }
}
