//! Client core for a signed query-parameter commerce API.
//!
//! # Overview
//! Builds signed requests and interprets responses without touching the
//! network itself. The caller injects a `Transport` that performs the HTTP
//! round-trip, so the pipeline stays deterministic and testable:
//! parameters are canonicalized (`params`), signed (`signer`), dispatched
//! (`client`), decoded (`response`, `xml`) and failures classified (`error`).
//!
//! # Design
//! - `MwsClient` is stateless. It holds only `MwsOptions` and the transport.
//! - `build_request` and `interpret` are the explicit I/O boundary;
//!   `request` glues them around one `Transport::send`.
//! - Structured responses decode into `serde_json::Value` first and then into
//!   caller types, with `codec` helpers for the wire's quirks.
//! - `sections` holds thin typed wrappers for a few resources; every other
//!   action is reachable through `request` / `request_document`.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod params;
pub mod resource;
pub mod response;
pub mod sections;
pub mod signer;
pub mod xml;

pub use client::MwsClient;
pub use config::MwsOptions;
pub use error::{ErrorKind, MwsError, Result, ServiceError};
pub use http::{HttpMethod, ResponseEnvelope, SignedRequest, Transport, TransportError};
pub use params::{canonicalize, CanonicalParams, ParameterValue, Parameters};
pub use resource::{Resource, ResourceInfo};
pub use response::{RequestMeta, ResponseBody};
