pub mod decoders;
pub mod envelope;
pub mod fetcher;
pub mod imap_client;
pub mod mime;
pub mod session;
