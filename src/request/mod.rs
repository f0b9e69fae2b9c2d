//! Jolokia request model
//!
//! This module contains:
//! - `object_name`: JMX ObjectName parsing and rendering
//! - `processing`: per-request processing options
//! - `base`: attributes shared by all requests
//! - `variants`: the concrete request types
//! - `decoder`: GET and POST decoding, batches included

pub mod base;
pub mod decoder;
pub mod object_name;
pub mod path;
pub mod processing;
pub mod request_type;
pub mod variants;

pub use base::{HasObjectName, ObjectNameRequest, ProxyTarget, RequestHeader};
pub use decoder::{
    BatchFailure, BatchItem, BodyError, DecodedBody, RequestDecoder, RequestPolicy,
};
pub use object_name::ObjectName;
pub use processing::{ConfigKey, KeyOrder, ProcessingConfig};
pub use request_type::RequestType;
pub use variants::{
    Attributes, ExecRequest, JmxRequest, ListRequest, NotificationRequest, ReadRequest,
    SearchRequest, VersionRequest, WriteRequest,
};
