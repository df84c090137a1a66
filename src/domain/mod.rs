pub mod credential;
pub mod message;
pub mod reply;
