//! In-memory filtering and pagination over rows already fetched for a doctor.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{PatientEntity, PatientSummary, PrescriptionEntity};

pub const PAGE_SIZE: usize = 10;

#[derive(Serialize, Debug, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Returns the 1-based `page` window of `items`. Page 0 is treated as page 1;
/// a page past the end yields no items but keeps the totals.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);
    let start = (page - 1).saturating_mul(per_page);

    let items = items.into_iter().skip(start).take(per_page).collect();

    Page {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    }
}

/// `%fragment%` for `ILIKE`. Wildcards typed by the user match literally.
pub fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for ch in fragment.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn created_on(timestamp: &DateTime<Utc>, day: NaiveDate) -> bool {
    timestamp.date_naive() == day
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Manage-patients search: one free-text term and an optional creation day.
#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientSearch {
    /// Matches name (case-insensitive), phone or id.
    pub term: Option<String>,
    /// Creation day, `YYYY-MM-DD`, UTC.
    pub date: Option<NaiveDate>,
    pub page: Option<usize>,
}

impl PatientSearch {
    pub fn matches(&self, patient: &PatientEntity) -> bool {
        if let Some(term) = non_blank(&self.term) {
            let hit = contains_ignore_case(&patient.full_name, term)
                || patient.phone.contains(term)
                || contains_ignore_case(&patient.id.to_string(), term);
            if !hit {
                return false;
            }
        }

        match self.date {
            Some(day) => created_on(&patient.created_at, day),
            None => true,
        }
    }

    pub fn apply(&self, patients: Vec<PatientEntity>) -> Page<PatientEntity> {
        let filtered = patients.into_iter().filter(|p| self.matches(p)).collect();
        paginate(filtered, self.page.unwrap_or(1), PAGE_SIZE)
    }
}

/// Manage-records search over prescriptions joined with their patient.
#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecordSearch {
    /// Prescription id substring, case-insensitive.
    pub id: Option<String>,
    /// Patient name substring, case-insensitive.
    pub name: Option<String>,
    /// Patient phone substring.
    pub phone: Option<String>,
    /// Creation day, `YYYY-MM-DD`, UTC.
    pub date: Option<NaiveDate>,
    pub page: Option<usize>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct PrescriptionRecord {
    pub prescription: PrescriptionEntity,
    pub patient: PatientSummary,
}

impl RecordSearch {
    pub fn matches(&self, record: &PrescriptionRecord) -> bool {
        if let Some(id) = non_blank(&self.id) {
            if !contains_ignore_case(&record.prescription.id.to_string(), id) {
                return false;
            }
        }
        if let Some(name) = non_blank(&self.name) {
            if !contains_ignore_case(&record.patient.full_name, name) {
                return false;
            }
        }
        if let Some(phone) = non_blank(&self.phone) {
            if !record.patient.phone.contains(phone) {
                return false;
            }
        }
        match self.date {
            Some(day) => created_on(&record.prescription.created_at, day),
            None => true,
        }
    }

    pub fn apply(&self, records: Vec<PrescriptionRecord>) -> Page<PrescriptionRecord> {
        let filtered = records.into_iter().filter(|r| self.matches(r)).collect();
        paginate(filtered, self.page.unwrap_or(1), PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn patient(name: &str, phone: &str, created: DateTime<Utc>) -> PatientEntity {
        PatientEntity {
            id: Uuid::new_v4(),
            doctor_id: Uuid::nil(),
            full_name: name.into(),
            age: 40,
            gender: "female".into(),
            phone: phone.into(),
            address: None,
            blood_group: None,
            medical_history: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn record(name: &str, phone: &str, created: DateTime<Utc>) -> PrescriptionRecord {
        let patient_id = Uuid::new_v4();
        PrescriptionRecord {
            prescription: PrescriptionEntity {
                id: Uuid::new_v4(),
                doctor_id: Uuid::nil(),
                patient_id,
                diagnosis: "Viral fever".into(),
                medications: "1. Paracetamol".into(),
                instructions: None,
                details: None,
                created_at: created,
            },
            patient: PatientSummary {
                id: patient_id,
                full_name: name.into(),
                phone: phone.into(),
                age: 30,
                gender: "male".into(),
            },
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn paginate_returns_requested_window() {
        let page = paginate((1..=25).collect::<Vec<_>>(), 2, 10);
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total_items, 25);
        assert_eq!(page.total_pages, 3);

        let last = paginate((1..=25).collect::<Vec<_>>(), 3, 10);
        assert_eq!(last.items, vec![21, 22, 23, 24, 25]);
    }

    #[test]
    fn paginate_handles_edges() {
        let first = paginate((1..=5).collect::<Vec<_>>(), 0, 10);
        assert_eq!(first.page, 1);
        assert_eq!(first.items.len(), 5);
        assert_eq!(first.total_pages, 1);

        let beyond = paginate((1..=5).collect::<Vec<_>>(), 4, 2);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_pages, 3);

        let empty = paginate(Vec::<u8>::new(), 1, 10);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn patient_term_matches_name_phone_or_id() {
        let day = at(2025, 3, 14, 9);
        let asha = patient("Asha Verma", "9840012345", day);
        let ravi = patient("Ravi Kumar", "9000000000", day);
        let id_prefix = asha.id.to_string()[..8].to_uppercase();

        let by_name = PatientSearch {
            term: Some("asha".into()),
            ..Default::default()
        };
        assert!(by_name.matches(&asha));
        assert!(!by_name.matches(&ravi));

        let by_phone = PatientSearch {
            term: Some("40012".into()),
            ..Default::default()
        };
        assert!(by_phone.matches(&asha));
        assert!(!by_phone.matches(&ravi));

        let by_id = PatientSearch {
            term: Some(id_prefix),
            ..Default::default()
        };
        assert!(by_id.matches(&asha));
    }

    #[test]
    fn patient_date_keeps_only_that_day() {
        let search = PatientSearch {
            date: NaiveDate::from_ymd_opt(2025, 3, 14),
            ..Default::default()
        };
        let page = search.apply(vec![
            patient("Morning", "1", at(2025, 3, 14, 0)),
            patient("Night", "2", at(2025, 3, 14, 23)),
            patient("Next day", "3", at(2025, 3, 15, 0)),
        ]);
        let names: Vec<_> = page.items.iter().map(|p| p.full_name.as_str()).collect();
        assert_eq!(names, vec!["Morning", "Night"]);
    }

    #[test]
    fn blank_filters_match_everything() {
        let search = PatientSearch {
            term: Some("   ".into()),
            ..Default::default()
        };
        assert!(search.matches(&patient("Anyone", "1", at(2024, 1, 1, 1))));
    }

    #[test]
    fn record_filters_combine() {
        let day = at(2025, 5, 2, 10);
        let records = vec![
            record("Meena Iyer", "9876500000", day),
            record("Meena Shah", "9123400000", day),
            record("Kiran Rao", "9876511111", at(2025, 5, 3, 10)),
        ];

        let search = RecordSearch {
            name: Some("MEENA".into()),
            phone: Some("98765".into()),
            ..Default::default()
        };
        let page = search.apply(records.clone());
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].patient.full_name, "Meena Iyer");

        let by_date = RecordSearch {
            date: NaiveDate::from_ymd_opt(2025, 5, 3),
            ..Default::default()
        };
        let page = by_date.apply(records.clone());
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].patient.full_name, "Kiran Rao");

        let wanted = records[1].prescription.id.to_string();
        let by_id = RecordSearch {
            id: Some(wanted[..13].to_string()),
            ..Default::default()
        };
        assert!(by_id.matches(&records[1]));
        assert!(!by_id.matches(&records[0]));
    }

    #[test]
    fn record_search_paginates_ten_per_page() {
        let day = at(2025, 1, 1, 8);
        let records: Vec<_> = (0..23).map(|i| record(&format!("P{}", i), "1", day)).collect();
        let search = RecordSearch {
            page: Some(3),
            ..Default::default()
        };
        let page = search.apply(records);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("98765"), "%98765%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("_1"), "%\\_1%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }
}
