pub mod birth;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod message;
pub mod session;
pub mod storage;
