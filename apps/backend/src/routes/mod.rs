//! HTTP route handlers

pub mod accounts;
