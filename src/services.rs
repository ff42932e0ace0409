pub mod auth;
pub mod role_policy;
pub mod realtime;
pub mod mailer;
pub mod notification_service;
pub mod workflow_catalog;
pub mod user_service;
pub mod assignment_service;
pub mod document_service;
pub mod payment_service;
pub mod case_service;
pub mod client_service;
pub mod prospect_service;

#[cfg(all(test, feature = "db-tests"))]
pub mod test_support;
