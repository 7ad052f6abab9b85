//! Inkpress - a small publishing system
//!
//! This library provides the core functionality for Inkpress: accounts
//! with editable profiles, categorized blog posts, and session auth.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
