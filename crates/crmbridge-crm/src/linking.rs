// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Linking chat contacts to existing business records.

use crmbridge_core::types::{ContactField, ContactRef, EntityKind};
use crmbridge_core::{BridgeError, ContactStore};
use tracing::debug;

use crate::contact::RemoteContact;
use crate::resolver;

/// Finds the Customer or Lead for a chat contact without creating anything.
///
/// Tries the stored chat contact id first, then the email. A record found by
/// email gets the chat contact id written to it when it has none yet; an
/// existing, different id is left alone.
pub async fn link_chat_contact<S>(
    store: &S,
    contact: &RemoteContact,
) -> Result<Option<ContactRef>, BridgeError>
where
    S: ContactStore + ?Sized,
{
    if let Some(id) = contact.id.as_deref() {
        if let Some(customer) = store
            .find_customer(ContactField::ChatwootContactId, id)
            .await?
        {
            return Ok(Some(ContactRef::customer(customer.name)));
        }
        if let Some(lead) = store.find_lead(ContactField::ChatwootContactId, id).await? {
            return Ok(Some(ContactRef::lead(lead.name)));
        }
    }

    let Some(found) = resolver::resolve_by_email(store, contact.email.as_deref()).await? else {
        return Ok(None);
    };

    if let Some(id) = contact.id.as_deref() {
        backfill_chat_id(store, &found, id).await?;
    }
    Ok(Some(found))
}

async fn backfill_chat_id<S>(store: &S, found: &ContactRef, id: &str) -> Result<(), BridgeError>
where
    S: ContactStore + ?Sized,
{
    match found.kind {
        EntityKind::Customer => {
            if let Some(mut customer) = store.get_customer(&found.name).await?
                && customer.chatwoot_contact_id.is_none()
            {
                customer.chatwoot_contact_id = Some(id.to_string());
                store.update_customer(&customer).await?;
                debug!(customer = %found.name, contact_id = id, "linked chat contact");
            }
        }
        EntityKind::Lead => {
            if let Some(mut lead) = store.get_lead(&found.name).await?
                && lead.chatwoot_contact_id.is_none()
            {
                lead.chatwoot_contact_id = Some(id.to_string());
                store.update_lead(&lead).await?;
                debug!(lead = %found.name, contact_id = id, "linked chat contact");
            }
        }
    }
    Ok(())
}
