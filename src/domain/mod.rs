pub mod account;
pub mod analytics;
pub mod billing;
pub mod catalog;
pub mod patients;
pub mod prescribing;
pub mod print;
pub mod scheduling;
pub mod search;
