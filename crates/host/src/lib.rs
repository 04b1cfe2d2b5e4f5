// okd-deployer host library
// HTTP API and cluster session for OpenShift deployments

// Cluster session, discovery cache and `oc` executor
pub mod cluster;

// Configuration
pub mod config;

// REST API
pub mod api;

// API token middleware
pub mod auth;
