//! Parsing of inbound notification payloads

mod parser;

pub use parser::{parse_notification, parse_update};
