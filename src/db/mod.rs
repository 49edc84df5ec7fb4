pub mod gateway_event_log_repository;
pub mod mock_db;
pub mod postgres_gateway_event_log_repository;
pub mod postgres_subscription_repository;
pub mod postgres_workspace_repository;
pub mod subscription_repository;
pub mod workspace_repository;
