use serde::{Deserialize, Serialize};

pub mod admin;
pub mod auth;
pub mod customer;
pub mod health;

#[derive(Clone, Deserialize, Serialize, Debug)]
pub struct PaginationParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}
