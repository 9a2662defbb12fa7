//! # Gantry
//!
//! **Gantry** is an embeddable, coroutine-powered HTTP application server:
//! a per-connection request pipeline that turns a raw byte stream into a
//! routed, intercepter-processed response.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`transport`]** - duplex byte-stream abstraction over `may` sockets
//! - **[`model`]** - plain request/response data holders, the header map,
//!   form-data items, and the chunk queue
//! - **[`parse`]** - the incremental HTTP parser and the nested multipart
//!   sub-parser, both explicit typed state machines
//! - **[`router`]** - the three routing strategies (Equals, StartsWith,
//!   Regex) with path-parameter extraction
//! - **[`app`]** - the `Application`: routing tables, intercepter chain,
//!   URL root, collaborator wiring, and request resolution
//! - **[`chain`]** - the Context and the bidirectional intercepter chain
//!   engine (Request → Handle → Response with Pass/Stop semantics)
//! - **[`server`]** - accept loop, round-robin I/O worker pool, the
//!   per-connection lifecycle, and the chunked response writer
//! - **[`collab`]** - interfaces of the external collaborators (template
//!   store, upload persistence policy)
//!
//! ## Request Handling Flow
//!
//! 1. The accept loop binds each socket to one I/O worker, round-robin; the
//!    connection never migrates.
//! 2. The connection reads transport bytes and feeds them to the
//!    [`parse::HttpParser`], which populates the [`model::Request`],
//!    activating the multipart sub-parser when the content type calls for
//!    it.
//! 3. On message completion a [`chain::Context`] is created and the chain
//!    engine walks the intercepters forward, runs the handler resolved by
//!    [`app::Application::resolve`] (Equals → StartsWith → Regex, with the
//!    `/index` retry), then unwinds the chain backward.
//! 4. The finished response is written back: a plain body with a
//!    `Content-Length`, or a chunked stream drained from the queue with
//!    backpressure until the final chunk.
//! 5. On keep-alive the request and parser are reset (not reallocated)
//!    and the connection waits for the next message.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use gantry::{Application, Flow, RoutePattern, Server};
//! use http::Method;
//!
//! let mut app = Application::new();
//! app.add_handler(
//!     &[Method::GET],
//!     RoutePattern::Equals("/hello".to_string()),
//!     Arc::new(|ctx| {
//!         ctx.response.set_body("Hello, world!");
//!         Flow::Pass
//!     }),
//!     None,
//! );
//!
//! let handle = Server::new(app).start("0.0.0.0:8080").unwrap();
//! handle.join().unwrap();
//! ```
//!
//! ## Runtime Considerations
//!
//! Gantry runs on the `may` coroutine runtime, not tokio or async-std:
//!
//! - Reads, writes, and chunk-queue waits suspend the coroutine, never the
//!   OS thread.
//! - The worker pool size and coroutine stack size come from
//!   [`runtime_config::RuntimeConfig`] (`GANTRY_WORKERS`,
//!   `GANTRY_STACK_SIZE`).
//! - For a single connection, parse callbacks, routing, the chain phases,
//!   and the final write are strictly sequential; only the chunk queue may
//!   be touched from another execution context.
//!
//! Out of scope by design: HTTP/2, request pipelining (at most one in-flight
//! request per connection), and general content negotiation. Template
//! rendering and upload persistence are external collaborators behind the
//! [`collab`] traits.

pub mod app;
pub mod chain;
pub mod collab;
pub mod ids;
pub mod model;
pub mod parse;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod transport;

pub use app::{Application, Resolution, RoutePattern};
pub use chain::{Context, Flow, Handler, Intercepter, Phase};
pub use collab::{KeepInMemory, TemplateStore, UploadPolicy};
pub use model::{DataKind, FormDataItem, Request, Response};
pub use server::{Server, ServerHandle};
