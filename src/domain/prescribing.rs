//! Prescription authoring: the clinical draft a doctor fills in, its validation,
//! and the text columns derived from it.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    app_error::{ValidationError, require},
    domain::patients::validate_patient_fields,
};

/// Chronic-disease checklist shown on the prescription pad.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, ToSchema)]
#[serde(default)]
pub struct ChronicConditions {
    pub hypertension: bool,
    pub diabetes: bool,
    pub heart_failure: bool,
    pub type2dm: bool,
    pub dyslipidemia: bool,
    pub smoking: bool,
    pub family_history: bool,
    pub asthma: bool,
    pub migraine: bool,
    pub arthritis: bool,
}

impl ChronicConditions {
    /// Labels of the ticked conditions, in checklist order.
    pub fn flagged(&self) -> Vec<&'static str> {
        [
            (self.hypertension, "Hypertension"),
            (self.diabetes, "Diabetes"),
            (self.heart_failure, "Heart failure"),
            (self.type2dm, "Type 2 DM"),
            (self.dyslipidemia, "Dyslipidemia"),
            (self.smoking, "Smoking"),
            (self.family_history, "Family history"),
            (self.asthma, "Asthma"),
            (self.migraine, "Migraine"),
            (self.arthritis, "Arthritis"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, ToSchema)]
#[serde(default)]
pub struct Vital {
    pub name: String,
    pub result: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, ToSchema)]
#[serde(default)]
pub struct TestLine {
    pub name: String,
    pub note: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, ToSchema)]
#[serde(default)]
pub struct MedicineLine {
    pub name: String,
    pub dose: String,
    pub dose_unit: String,
    pub medicine_type: String,
    pub timing: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: String,
}

impl MedicineLine {
    /// e.g. `Paracetamol 500 mg (Tablet) - 1-0-1 - After food - 5 days`
    pub fn describe(&self) -> String {
        let mut head = self.name.trim().to_string();
        let dose = [self.dose.trim(), self.dose_unit.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !dose.is_empty() {
            head.push(' ');
            head.push_str(&dose);
        }
        if !self.medicine_type.trim().is_empty() {
            head.push_str(&format!(" ({})", self.medicine_type.trim()));
        }

        let mut parts = vec![head];
        parts.extend(
            [
                self.frequency.trim(),
                self.timing.trim(),
                self.duration.trim(),
                self.instructions.trim(),
            ]
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        );
        parts.join(" - ")
    }
}

/// Patient created on the fly from the prescription pad.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct NewPatient {
    pub full_name: String,
    pub phone: String,
    pub age: i32,
    pub gender: String,
    pub address: Option<String>,
}

impl NewPatient {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_patient_fields(&self.full_name, &self.phone, &self.gender, self.age)
    }
}

/// Clinical content kept alongside the row in `prescriptions.details`.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, ToSchema)]
#[serde(default)]
pub struct ClinicalDetails {
    pub complaints: String,
    pub chronic_conditions: ChronicConditions,
    pub vitals: Vec<Vital>,
    pub tests: Vec<TestLine>,
    pub medicines: Vec<MedicineLine>,
    pub general_advice: String,
    pub referral: String,
    pub follow_up: String,
    pub surgery_advice: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct PrescriptionDraft {
    /// An existing patient of the doctor. Mutually exclusive with `new_patient`.
    pub patient_id: Option<Uuid>,
    pub new_patient: Option<NewPatient>,
    pub diagnosis: String,
    #[serde(flatten)]
    pub details: ClinicalDetails,
}

/// Where the prescription's patient comes from once the draft is accepted.
#[derive(Debug, PartialEq)]
pub enum PatientSource<'a> {
    Existing(Uuid),
    New(&'a NewPatient),
}

impl PrescriptionDraft {
    pub fn validate(&self) -> Result<PatientSource<'_>, ValidationError> {
        let source = match (&self.patient_id, &self.new_patient) {
            (Some(id), None) => PatientSource::Existing(*id),
            (None, Some(new_patient)) => {
                new_patient.validate()?;
                PatientSource::New(new_patient)
            }
            (None, None) => return Err(ValidationError::Required("patient_id")),
            (Some(_), Some(_)) => {
                return Err(ValidationError::invalid(
                    "patient_id",
                    "cannot be combined with new_patient",
                ));
            }
        };

        require("diagnosis", &self.diagnosis)?;
        if self.details.medicines.is_empty() {
            return Err(ValidationError::invalid(
                "medicines",
                "must contain at least one medicine",
            ));
        }
        for medicine in &self.details.medicines {
            require("medicine name", &medicine.name)?;
        }
        for test in &self.details.tests {
            require("test name", &test.name)?;
        }
        Ok(source)
    }

    /// Numbered medicine lines stored in `prescriptions.medications`.
    pub fn medications_text(&self) -> String {
        compose_medications(&self.details.medicines)
    }

    pub fn instructions_text(&self) -> Option<String> {
        let advice = self.details.general_advice.trim();
        (!advice.is_empty()).then(|| advice.to_string())
    }
}

pub fn compose_medications(medicines: &[MedicineLine]) -> String {
    medicines
        .iter()
        .enumerate()
        .map(|(i, medicine)| format!("{}. {}", i + 1, medicine.describe()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paracetamol() -> MedicineLine {
        MedicineLine {
            name: "Paracetamol".into(),
            dose: "500".into(),
            dose_unit: "mg".into(),
            medicine_type: "Tablet".into(),
            timing: "After food".into(),
            frequency: "1-0-1".into(),
            duration: "5 days".into(),
            instructions: String::new(),
        }
    }

    fn draft() -> PrescriptionDraft {
        PrescriptionDraft {
            patient_id: Some(Uuid::new_v4()),
            new_patient: None,
            diagnosis: "Viral fever".into(),
            details: ClinicalDetails {
                medicines: vec![paracetamol()],
                ..Default::default()
            },
        }
    }

    #[test]
    fn flagged_conditions_follow_checklist_order() {
        let conditions = ChronicConditions {
            arthritis: true,
            hypertension: true,
            smoking: true,
            ..Default::default()
        };
        assert_eq!(conditions.flagged(), vec!["Hypertension", "Smoking", "Arthritis"]);
        assert!(ChronicConditions::default().flagged().is_empty());
    }

    #[test]
    fn medicine_lines_are_composed_and_numbered() {
        let cetirizine = MedicineLine {
            name: "Cetirizine".into(),
            frequency: "0-0-1".into(),
            ..Default::default()
        };
        assert_eq!(
            compose_medications(&[paracetamol(), cetirizine]),
            "1. Paracetamol 500 mg (Tablet) - 1-0-1 - After food - 5 days\n2. Cetirizine - 0-0-1"
        );
    }

    #[test]
    fn valid_draft_uses_existing_patient() {
        let draft = draft();
        let id = draft.patient_id.unwrap();
        assert_eq!(draft.validate(), Ok(PatientSource::Existing(id)));
    }

    #[test]
    fn draft_rejects_missing_required_fields() {
        let mut missing_patient = draft();
        missing_patient.patient_id = None;
        assert_eq!(
            missing_patient.validate(),
            Err(ValidationError::Required("patient_id"))
        );

        let mut missing_diagnosis = draft();
        missing_diagnosis.diagnosis = " ".into();
        assert_eq!(
            missing_diagnosis.validate(),
            Err(ValidationError::Required("diagnosis"))
        );

        let mut no_medicines = draft();
        no_medicines.details.medicines.clear();
        assert!(no_medicines.validate().is_err());

        let mut unnamed_test = draft();
        unnamed_test.details.tests.push(TestLine::default());
        assert_eq!(
            unnamed_test.validate(),
            Err(ValidationError::Required("test name"))
        );
    }

    #[test]
    fn new_patient_path_is_validated() {
        let mut with_new = draft();
        with_new.patient_id = None;
        with_new.new_patient = Some(NewPatient {
            full_name: "Lakshmi".into(),
            phone: "".into(),
            age: 52,
            gender: "female".into(),
            address: None,
        });
        assert_eq!(with_new.validate(), Err(ValidationError::Required("phone")));

        if let Some(patient) = with_new.new_patient.as_mut() {
            patient.phone = "9840011111".into();
        }
        assert!(matches!(with_new.validate(), Ok(PatientSource::New(_))));

        with_new.patient_id = Some(Uuid::new_v4());
        assert!(with_new.validate().is_err());
    }

    #[test]
    fn instructions_come_from_general_advice() {
        let mut draft = draft();
        assert_eq!(draft.instructions_text(), None);
        draft.details.general_advice = "  Drink plenty of fluids ".into();
        assert_eq!(
            draft.instructions_text().as_deref(),
            Some("Drink plenty of fluids")
        );
    }

    #[test]
    fn flattened_draft_deserializes() {
        let json = r#"{
            "patient_id": "3f1c2a1e-9a55-4b7e-8a51-2f4f1b0c9d11",
            "diagnosis": "Migraine",
            "complaints": "Headache for 3 days",
            "chronic_conditions": { "migraine": true },
            "medicines": [{ "name": "Sumatriptan", "dose": "50", "dose_unit": "mg" }]
        }"#;
        let draft: PrescriptionDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.details.complaints, "Headache for 3 days");
        assert!(draft.details.chronic_conditions.migraine);
        assert_eq!(draft.medications_text(), "1. Sumatriptan 50 mg");
    }
}
