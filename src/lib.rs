#![warn(future_incompatible, nonstandard_style, rust_2018_idioms, unused)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::similar_names,
    clippy::cast_possible_truncation, // TODO
)]

pub mod buffer;
mod client;
pub mod error;
pub mod flags;
pub mod frame;
pub mod frame_builder;
pub mod hpack;
mod registry;
mod request;
mod response;
mod session;
pub mod settings;
mod stream;
pub mod types;
pub mod window;

pub use buffer::ByteBuf;
pub use bytes::Bytes;
pub use client::Client;
pub use error::Error;
pub use request::{Method, Request};
pub use response::Response;
pub use session::{Session, ShutdownHook};
pub use settings::Settings;
pub use types::ErrorCode;
pub use url::Url;
