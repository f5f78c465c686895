//! End-to-end tests exercising registration, routing, and request
//! translation against recording doubles for the host and the backend.

mod support;
