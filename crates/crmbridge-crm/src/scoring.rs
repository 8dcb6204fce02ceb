// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort lead scoring from survey answers.

use crmbridge_core::ContactStore;
use serde_json::Value;
use tracing::{debug, warn};

const URGENCY_KEYWORDS: &[&str] = &["urgent", "asap", "immediately", "soon", "quickly"];

/// (points, any of these keys present)
const SIGNALS: &[(i64, &[&str])] = &[
    (10, &["email"]),
    (10, &["phone", "phoneNumber"]),
    (15, &["company", "companyName"]),
    (20, &["budget", "projectBudget"]),
    (15, &["timeline", "projectTimeline"]),
];

/// Scores a response's answer map by completeness and urgency.
pub fn score_response(data: &Value) -> i64 {
    let mut score: i64 = SIGNALS
        .iter()
        .filter(|(_, keys)| keys.iter().any(|k| data.get(*k).is_some_and(is_truthy)))
        .map(|(points, _)| points)
        .sum();

    let text = data.to_string().to_lowercase();
    if URGENCY_KEYWORDS.iter().any(|k| text.contains(k)) {
        score += 10;
    }
    score
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Scores `data` and stores the result on the Lead. Failures are logged and
/// otherwise ignored.
pub async fn apply_lead_score<S>(store: &S, lead_name: &str, data: &Value) -> i64
where
    S: ContactStore + ?Sized,
{
    let score = score_response(data);
    let result = async {
        if let Some(mut lead) = store.get_lead(lead_name).await? {
            lead.lead_score = Some(score);
            store.update_lead(&lead).await?;
        }
        Ok::<_, crmbridge_core::BridgeError>(())
    }
    .await;
    match result {
        Ok(()) => debug!(lead = lead_name, score, "scored lead"),
        Err(e) => warn!(lead = lead_name, error = %e, "lead scoring failed"),
    }
    score
}
