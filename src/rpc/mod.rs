//! JSON-over-HTTP transport between the gateway and the post service.

use serde::{Deserialize, Serialize};

pub mod client;
pub mod server;

pub use client::RemotePostBackend;
pub use server::rpc_router;

pub const CREATE_PATH: &str = "/rpc/posts/create";
pub const GET_PATH: &str = "/rpc/posts/get";
pub const LIST_PATH: &str = "/rpc/posts/list";

/// Error body returned by the post service for any failed call. `kind` names
/// the `BackendError` variant: `deadline_exceeded`, `storage`, `unavailable`
/// or `protocol`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcFailure {
    pub kind: String,
    pub message: String,
}
