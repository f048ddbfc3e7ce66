pub mod dashboard;
pub mod take;
