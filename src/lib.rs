pub mod backend;
pub mod config;
pub mod eligibility;
pub mod forms;
pub mod output;
pub mod products;
pub mod response;
pub mod server;
