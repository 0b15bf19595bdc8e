//! Terminal IMAP reader: lists the most recent messages of one mailbox and
//! shows the text/plain body of the one you pick.

pub mod config;
pub mod domain;
pub mod error;
pub mod mail;
pub mod terminal;
