pub mod index;
pub mod upload;
pub mod uploads;
