pub mod asaas;
pub mod subscription;
