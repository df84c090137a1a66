pub mod decoders;
pub mod extract;
pub mod imap_client;
pub mod outbound;
pub mod session;
