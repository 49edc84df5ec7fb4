pub mod asaas;
pub mod auth;
pub mod billing;
