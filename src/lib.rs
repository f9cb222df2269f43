//! Leadflow API Library
//!
//! Lead intake, scoring and scheduling service for home-service providers:
//! customers submit service requests, every lead is scored on a 0-10 scale, and
//! providers triage, book and convert them through a bearer-token protected API.
//!
//! # Modules
//!
//! - `api`: Router and middleware stack.
//! - `auth`: Password hashing, bearer tokens and provider extractors.
//! - `data`: Data access layer (leads, accounts, appointments).
//! - `obs`: Observability and logging.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `handlers`: Shared application state and health check.
//! - `*_handler`: HTTP request handlers per resource.
//! - `insights`: Dashboard and automation figures.
//! - `models`: Core data models.
//! - `rescoring`: Bulk rescoring pass.
//! - `scheduling`: Appointment slot generation.
//! - `scoring`: Lead scoring engine.
//! - `validation`: Request validation.

pub mod api;
pub mod auth;
pub mod data;
pub mod obs;

pub mod analytics_handler;
pub mod appointment_handler;
pub mod auth_handler;
pub mod automation_handler;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod insights;
pub mod lead_handler;
pub mod models;
pub mod rescoring;
pub mod scheduling;
pub mod scoring;
pub mod validation;
