use serde::{Deserialize, Serialize};

/// Broadcast mail sent to every registered user.
#[derive(Debug, Deserialize)]
pub struct MailingRequest {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct MailingResponse {
    pub message: String,
    pub sent: usize,
    pub failed: usize,
}
