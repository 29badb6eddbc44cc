//! Companies & Partners API Library
//!
//! CRUD HTTP API over companies (empresas) and the partners (sócios) they own.
//! A company owns many partners; every partner belongs to exactly one company,
//! and deleting a company removes its partners.
//!
//! # Modules
//!
//! - `auth`: Optional access-token guard for `/api/*`.
//! - `config`: Configuration management.
//! - `db`: Database connection and schema bootstrap.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Domain records, service inputs and request bodies.
//! - `openapi`: OpenAPI document.
//! - `presentation`: JSON views of domain records.
//! - `routes`: Router assembly and middleware.
//! - `services`: Company and partner services.
//! - `storage`: Storage trait with in-memory and Postgres backends.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod presentation;
pub mod routes;
pub mod services;
pub mod storage;
