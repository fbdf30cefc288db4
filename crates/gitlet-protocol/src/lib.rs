//! # gitlet-protocol
//!
//! Client side of git's smart HTTP protocol: pkt-line wire framing, the
//! pack-format decoder, and the HTTP transport used to discover refs and
//! fetch packfiles.

mod error;
mod http;
mod pack;
mod pktline;

pub use error::{ProtocolError, Result};
pub use http::HttpClient;
pub use pack::{PackBuilder, PackParser};
pub use pktline::{
    build_want_request, parse_head_advert, strip_sideband, PktLine, PktLineScanner,
};
