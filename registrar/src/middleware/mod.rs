//! Middleware: the admin gate and request tracking layers

pub mod admin;
pub mod request_tracking;

pub use admin::RequireAdmin;
pub use request_tracking::{
    propagate_header_layers, request_id_header, request_id_layer, request_id_propagation_layer,
    sensitive_headers_layer, PROPAGATE_HEADERS, SENSITIVE_HEADERS,
};
