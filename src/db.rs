pub mod user_repo;
pub use user_repo::UserRepository;
pub mod client_repo;
pub use client_repo::ClientRepository;
pub mod case_repo;
pub use case_repo::CaseRepository;
pub mod prospect_repo;
pub use prospect_repo::ProspectRepository;
pub mod payment_repo;
pub use payment_repo::PaymentRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
pub mod activity_repo;
pub use activity_repo::ActivityRepository;
pub mod workflow_repo;
pub use workflow_repo::WorkflowRepository;
