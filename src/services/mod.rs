pub mod booking;
pub mod dashboard;
pub mod media;
pub mod payment;
