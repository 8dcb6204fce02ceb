// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook payloads shaped like real vendor deliveries.

use serde_json::{Value, json};

/// `conversation_created` from a website inbox, contact Kim.
pub fn conversation_created(id: u64) -> Value {
    json!({
        "event": "conversation_created",
        "id": id,
        "status": "open",
        "inbox_id": 2,
        "meta": {
            "channel": {"name": "Website"},
            "sender": {"id": 31, "name": "Kim", "email": "kim@example.com"}
        }
    })
}

/// An incoming `message_created` for `conversation_id`.
pub fn message_created(conversation_id: u64, message_id: u64, content: &str) -> Value {
    json!({
        "event": "message_created",
        "id": message_id,
        "content": content,
        "message_type": "incoming",
        "conversation": {"id": conversation_id},
        "sender": {"id": 31, "name": "Kim", "type": "contact"}
    })
}

/// A Formbricks response delivery with a packed contact-info answer.
pub fn survey_response(event: &str, response_id: &str, finished: bool) -> Value {
    json!({
        "webhookEvent": event,
        "data": {
            "id": response_id,
            "surveyId": "srv-1",
            "createdAt": "2026-05-02T08:00:00.000Z",
            "finished": finished,
            "data": {
                "contactinfo7h2": ["Grace", "Hopper", "grace@example.com", "555-0199", "Navy"],
                "timeline9k": "months13aaaaa"
            }
        }
    })
}

/// Serializes a payload the way a vendor puts it on the wire.
pub fn to_body(payload: &Value) -> Vec<u8> {
    serde_json::to_vec(payload).unwrap_or_default()
}

/// Hex HMAC-SHA256 signature of `body`, as the vendors send it.
pub fn signature(secret: &str, body: &[u8]) -> String {
    crmbridge_gateway::signature::sign(secret, body).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_gateway_verification() {
        let body = to_body(&conversation_created(1));
        let sig = signature("k", &body);
        assert_eq!(sig.len(), 64);
        assert!(crmbridge_gateway::signature::verify("k", &body, Some(&sig)).is_ok());
    }
}
