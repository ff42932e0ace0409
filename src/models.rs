pub mod auth;
pub mod client;
pub mod notification;
pub mod payment;
pub mod prospect;
pub mod workflow;
