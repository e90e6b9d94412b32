//! Doctor accounts: signup/login forms and the profile edit form.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    app_error::{ValidationError, require},
    domain::patients::validate_age,
    models::UpdateProfileEntity,
};

pub const LOGIN_ROUTE: &str = "/auth";
pub const MIN_PASSWORD_LEN: usize = 8;

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub fn session_expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now + ttl
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    require("email", email)?;
    let valid = email
        .trim()
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(ValidationError::invalid("email", "is not a valid address"));
    }
    Ok(())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub clinic_name: String,
    pub shift: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::invalid(
                "password",
                format!("must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }
        require("full_name", &self.full_name)?;
        require("clinic_name", &self.clinic_name)?;
        require("shift", &self.shift)
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

/// Canonicalises weekday names: case-insensitive, deduplicated, week order.
/// An empty selection becomes `None`.
pub fn normalize_working_days(days: &[String]) -> Result<Option<Vec<String>>, ValidationError> {
    let mut selected = [false; 7];
    for day in days {
        let index = WEEKDAYS
            .iter()
            .position(|known| known.eq_ignore_ascii_case(day.trim()))
            .ok_or_else(|| {
                ValidationError::invalid("working_days", format!("'{}' is not a weekday", day))
            })?;
        selected[index] = true;
    }

    let normalized: Vec<String> = WEEKDAYS
        .iter()
        .zip(selected)
        .filter_map(|(day, on)| on.then(|| day.to_string()))
        .collect();

    Ok((!normalized.is_empty()).then_some(normalized))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Profile edit form. Every save rewrites all editable fields.
#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct ProfileForm {
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
    #[serde(default)]
    pub working_days: Vec<String>,
}

impl ProfileForm {
    pub fn into_changeset(self) -> Result<UpdateProfileEntity, ValidationError> {
        require("full_name", &self.full_name)?;
        require("clinic_name", &self.clinic_name)?;
        require("shift", &self.shift)?;
        if let Some(age) = self.age {
            validate_age(age)?;
        }
        let working_days = normalize_working_days(&self.working_days)?;

        Ok(UpdateProfileEntity {
            full_name: self.full_name.trim().to_string(),
            clinic_name: self.clinic_name.trim().to_string(),
            shift: self.shift.trim().to_string(),
            phone: blank_to_none(self.phone),
            specialization: blank_to_none(self.specialization),
            age: self.age,
            gender: blank_to_none(self.gender),
            qualification: blank_to_none(self.qualification),
            experience: blank_to_none(self.experience),
            nmc_id: blank_to_none(self.nmc_id),
            working_days,
        })
    }
}
