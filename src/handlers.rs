pub mod activities;
pub mod auth;
pub mod cases;
pub mod clients;
pub mod notifications;
pub mod payments;
pub mod prospects;
pub mod realtime;
pub mod users;
pub mod workflows;
