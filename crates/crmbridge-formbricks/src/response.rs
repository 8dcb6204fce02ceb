// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciling survey responses into local records.
//!
//! Responses are keyed by their remote id and the local record name is
//! derived from it, so every delivery of one response targets the same row.
//! Two deliveries racing on the first insert collide on that name; the loser
//! reloads the winner's row and merges its completion state into it.
//!
//! Lead creation rereads the stored response first and adopts any link a
//! concurrent delivery already wrote. Deliveries that both pass that check
//! before either links can still create two leads for one response.

use crmbridge_config::FormbricksConfig;
use crmbridge_core::types::{ContactField, LEAD_STATUS_OPEN, Lead, SurveyResponse};
use crmbridge_core::{BridgeError, Store, time};
use crmbridge_crm::contact::email_local_part;
use crmbridge_crm::naming::{LEAD_PREFIX, new_record_name};
use crmbridge_crm::{apply_lead_score, resolve_by_email, resolve_lead_source};
use tracing::{debug, error, info};

use crate::events::ResponsePayload;
use crate::extract::extract_contact;

/// Inserts or updates the local record for a response.
///
/// Extracted contact fields replace stored ones only when found. Completion
/// only moves forward: an update reporting `finished: false` does not reopen
/// a finished response.
pub async fn upsert_response<S>(
    store: &S,
    payload: &ResponsePayload,
) -> Result<SurveyResponse, BridgeError>
where
    S: Store + ?Sized,
{
    let existing = store.get_response(&payload.response_id).await?;
    let is_new = existing.is_none();
    let mut response =
        existing.unwrap_or_else(|| SurveyResponse::new(payload.response_id.clone()));

    if let Some(survey_id) = payload.survey_id.as_deref()
        && store.get_survey(survey_id).await?.is_some()
    {
        response.survey = Some(survey_id.to_string());
    }

    response.data = payload.data.clone();
    let contact = extract_contact(&payload.data);
    if contact.name.is_some() {
        response.contact_name = contact.name;
    }
    if contact.email.is_some() {
        response.contact_email = contact.email;
    }
    if contact.phone.is_some() {
        response.contact_phone = contact.phone;
    }

    if payload.created_at.is_some() {
        response.created_at = payload.created_at;
    }
    apply_completion(&mut response, payload);

    if !response.is_linked()
        && let Some(found) = resolve_by_email(store, response.contact_email.as_deref()).await?
    {
        response.link(&found);
    }

    if !is_new {
        store.update_response(&response).await?;
        return Ok(response);
    }

    match store.insert_response(&response).await {
        Ok(()) => {
            debug!(response_id = %response.response_id, "stored survey response");
            Ok(response)
        }
        Err(e) if e.is_duplicate() => {
            debug!(
                response_id = %response.response_id,
                "response inserted concurrently, merging"
            );
            let Some(mut winner) = store.get_response(&payload.response_id).await? else {
                return Err(e);
            };
            apply_completion(&mut winner, payload);
            store.update_response(&winner).await?;
            Ok(winner)
        }
        Err(e) => Err(e),
    }
}

fn apply_completion(response: &mut SurveyResponse, payload: &ResponsePayload) {
    if payload.finished {
        response.finished = true;
        if payload.finished_at.is_some() {
            response.finished_at = payload.finished_at;
        }
    }
}

/// Upserts a finished response, marks it complete, and evaluates lead
/// creation.
///
/// Lead creation failures are logged; the response itself is still stored.
pub async fn finalize_response<S>(
    store: &S,
    settings: &FormbricksConfig,
    payload: &ResponsePayload,
) -> Result<SurveyResponse, BridgeError>
where
    S: Store + ?Sized,
{
    let mut response = upsert_response(store, payload).await?;
    response.finished = true;
    response.finished_at = Some(time::now());
    store.update_response(&response).await?;

    if !settings.auto_create_lead || response.is_linked() {
        return Ok(response);
    }
    if !survey_allowed(settings, &response, payload) {
        debug!(
            response_id = %response.response_id,
            survey_id = ?payload.survey_id,
            "survey not in lead allow-list"
        );
        return Ok(response);
    }

    if let Some(stored) = store.get_response(&response.response_id).await?
        && stored.is_linked()
    {
        debug!(
            response_id = %response.response_id,
            lead = ?stored.lead,
            "response linked by a concurrent delivery"
        );
        response.lead = stored.lead;
        response.customer = stored.customer;
        return Ok(response);
    }

    match lead_for_response(store, settings, &response).await {
        Ok(Some(lead)) => {
            response.lead = Some(lead);
            store.update_response(&response).await?;
        }
        Ok(None) => {}
        Err(e) => error!(
            response_id = %response.response_id,
            error = %e,
            "failed to create lead from survey response"
        ),
    }
    Ok(response)
}

/// Whether the response's survey may create leads. An empty allow-list, or
/// a response carrying no survey id at all, allows it. Otherwise the mirrored
/// survey id, falling back to the payload's, must be listed.
fn survey_allowed(
    settings: &FormbricksConfig,
    response: &SurveyResponse,
    payload: &ResponsePayload,
) -> bool {
    if settings.lead_survey_ids.is_empty() {
        return true;
    }
    let survey_id = response.survey.as_deref().or(payload.survey_id.as_deref());
    survey_id.is_none_or(|id| {
        settings
            .lead_survey_ids
            .iter()
            .any(|allowed| allowed.trim() == id)
    })
}

/// Reuses the Lead with the response's email, or creates one.
async fn lead_for_response<S>(
    store: &S,
    settings: &FormbricksConfig,
    response: &SurveyResponse,
) -> Result<Option<String>, BridgeError>
where
    S: Store + ?Sized,
{
    let Some(email) = response.contact_email.as_deref() else {
        debug!(response_id = %response.response_id, "no email in response, not creating lead");
        return Ok(None);
    };

    if let Some(mut lead) = store.find_lead(ContactField::Email, email).await? {
        if lead.formbricks_response_id.is_none() {
            lead.formbricks_response_id = Some(response.response_id.clone());
            store.update_lead(&lead).await?;
        }
        return Ok(Some(lead.name));
    }

    let lead = Lead {
        name: new_record_name(LEAD_PREFIX),
        lead_name: response
            .contact_name
            .clone()
            .unwrap_or_else(|| email_local_part(email).to_string()),
        email_id: Some(email.to_string()),
        mobile_no: response.contact_phone.clone(),
        source: resolve_lead_source(store, &settings.lead_source).await?,
        status: LEAD_STATUS_OPEN.to_string(),
        formbricks_response_id: Some(response.response_id.clone()),
        ..Default::default()
    };
    store.insert_lead(&lead).await?;
    info!(lead = %lead.name, response_id = %response.response_id, "created lead from survey response");

    apply_lead_score(store, &lead.name, &response.data).await;
    Ok(Some(lead.name))
}
