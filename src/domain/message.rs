pub type MessageUid = u32;

/// One unread inbox item as retrieved from the server. Lives for a single tick.
#[derive(Debug, Clone, Default)]
pub struct RawMessage {
    pub uid: MessageUid,
    pub fragments: Vec<Vec<u8>>,
}

impl RawMessage {
    pub fn new(uid: MessageUid, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            uid,
            fragments: vec![raw.into()],
        }
    }

    /// Joins the body fragments in retrieval order.
    pub fn concat(&self) -> Vec<u8> {
        self.fragments.concat()
    }
}

pub const UNKNOWN_SENDER: &str = "Unknown Sender";
pub const NO_CONTENT: &str = "No content available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub sender: String,
    pub body: String,
}
