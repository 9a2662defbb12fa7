//! Plain data holders for one request/response cycle.
//!
//! Nothing in this module performs I/O; the parser adapters populate a
//! [`Request`], handlers and intercepters fill a [`Response`], and the
//! connection's writer drains it.

mod form;
mod request;
mod response;

use std::sync::Arc;

use smallvec::SmallVec;

pub use form::{items_from_parts, DataKind, FormDataItem, FormPayload};
pub use request::{HeaderMap, MultiPart, Request, RequestUrl};
pub(crate) use response::Body;
pub use response::{chunk_channel, Chunk, ChunkReceiver, ChunkSender, Response, SetCookie};

/// Maximum number of path/query parameters before heap allocation.
///
/// Most routes carry well under eight parameters, so the common case stays
/// on the stack.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage.
///
/// Parameter names use `Arc<str>` because they originate in the static
/// routing tables (known at registration time) and are shared per match;
/// values are per-request data extracted from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;
