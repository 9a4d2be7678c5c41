//! HTTP handlers

pub mod health;
pub mod auth;
pub mod home;
pub mod dashboard;
pub mod pages;
