pub mod auth;
pub mod config;
pub mod contact;
pub mod feed;
