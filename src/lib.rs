// Upstream password encryption
pub mod credentials;

// Session tokens and password hashing
pub mod auth;

// Local accounts (store + service)
pub mod accounts;

// Bitbucket API client and proxy
pub mod upstream;

// HTTP API
pub mod api;

// File and environment configuration
pub mod config;
