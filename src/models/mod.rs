pub mod dashboard;
pub mod price;
