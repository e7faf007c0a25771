pub mod account;
pub mod bidding;
pub mod catalog;
pub mod config;
pub mod handlers;
pub mod saved;
pub mod storage;
