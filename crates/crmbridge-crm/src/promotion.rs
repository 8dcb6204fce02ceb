// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Creating Leads and Customers from remote contacts.
//!
//! Every path here links to an existing record before creating one, and a
//! create needs at least an email or phone.

use crmbridge_config::{ChatwootConfig, ContactPolicy};
use crmbridge_core::types::{
    ContactField, ContactRef, Customer, LEAD_STATUS_OPEN, Lead,
};
use crmbridge_core::{BridgeError, ContactStore};
use tracing::{debug, info};

use crate::contact::RemoteContact;
use crate::linking;
use crate::naming::{CUSTOMER_PREFIX, LEAD_PREFIX, new_record_name};

pub const DEFAULT_CUSTOMER_GROUP: &str = "All Customer Groups";
pub const DEFAULT_TERRITORY: &str = "All Territories";

/// Tried in order when the configured lead source is not in the lookup table.
pub const FALLBACK_LEAD_SOURCES: &[&str] = &["Survey", "Website", "Campaign", "Advertisement"];

/// The configured lead source if it exists, else the first existing
/// fallback, else none.
pub async fn resolve_lead_source<S>(
    store: &S,
    configured: &str,
) -> Result<Option<String>, BridgeError>
where
    S: ContactStore + ?Sized,
{
    let configured = configured.trim();
    if !configured.is_empty() && store.lead_source_exists(configured).await? {
        return Ok(Some(configured.to_string()));
    }
    for candidate in FALLBACK_LEAD_SOURCES {
        if store.lead_source_exists(candidate).await? {
            debug!(configured, fallback = candidate, "lead source not found, using fallback");
            return Ok(Some((*candidate).to_string()));
        }
    }
    Ok(None)
}

/// Links a chat contact to an existing record, creating one only when the
/// contact policy is `auto_create` and an auto-create flag is on.
pub async fn apply_contact_policy<S>(
    store: &S,
    settings: &ChatwootConfig,
    contact: &RemoteContact,
) -> Result<Option<ContactRef>, BridgeError>
where
    S: ContactStore + ?Sized,
{
    if let Some(linked) = linking::link_chat_contact(store, contact).await? {
        return Ok(Some(linked));
    }
    if settings.contact_policy == ContactPolicy::LinkOnly {
        debug!(contact_id = ?contact.id, "no matching record; link-only policy");
        return Ok(None);
    }
    if !contact.is_reachable() {
        debug!(contact_id = ?contact.id, "contact has no email or phone; not creating");
        return Ok(None);
    }

    if settings.auto_create_lead {
        let lead = create_lead(store, &settings.lead_source, contact, None).await?;
        Ok(Some(ContactRef::lead(lead.name)))
    } else if settings.auto_create_customer {
        let customer = create_customer(store, settings, contact).await?;
        Ok(Some(ContactRef::customer(customer.name)))
    } else {
        Ok(None)
    }
}

/// Creates or reuses a Lead for the contact behind a chat conversation.
///
/// Gated by `auto_create_lead`. Reuses a Lead by chat contact id, then by
/// email (filling in missing chat ids), and otherwise needs an email or
/// phone to create one.
pub async fn maybe_create_lead_from_conversation<S>(
    store: &S,
    settings: &ChatwootConfig,
    contact: &RemoteContact,
    conversation_id: &str,
) -> Result<Option<ContactRef>, BridgeError>
where
    S: ContactStore + ?Sized,
{
    if !settings.auto_create_lead {
        return Ok(None);
    }

    if let Some(id) = contact.id.as_deref()
        && let Some(lead) = store.find_lead(ContactField::ChatwootContactId, id).await?
    {
        return Ok(Some(ContactRef::lead(lead.name)));
    }

    if let Some(email) = contact.email.as_deref()
        && let Some(mut lead) = store.find_lead(ContactField::Email, email).await?
    {
        let mut changed = false;
        if lead.chatwoot_contact_id.is_none() && contact.id.is_some() {
            lead.chatwoot_contact_id = contact.id.clone();
            changed = true;
        }
        if lead.chatwoot_conversation_id.is_none() {
            lead.chatwoot_conversation_id = Some(conversation_id.to_string());
            changed = true;
        }
        if changed {
            store.update_lead(&lead).await?;
        }
        return Ok(Some(ContactRef::lead(lead.name)));
    }

    if !contact.is_reachable() {
        return Ok(None);
    }

    let lead = create_lead(
        store,
        &settings.lead_source,
        contact,
        Some(conversation_id),
    )
    .await?;
    Ok(Some(ContactRef::lead(lead.name)))
}

/// Inserts a new Lead from a chat contact.
async fn create_lead<S>(
    store: &S,
    configured_source: &str,
    contact: &RemoteContact,
    conversation_id: Option<&str>,
) -> Result<Lead, BridgeError>
where
    S: ContactStore + ?Sized,
{
    let lead = Lead {
        name: new_record_name(LEAD_PREFIX),
        lead_name: contact.display_name(),
        email_id: contact.email.clone(),
        mobile_no: contact.phone.clone(),
        source: resolve_lead_source(store, configured_source).await?,
        status: LEAD_STATUS_OPEN.to_string(),
        chatwoot_contact_id: contact.id.clone(),
        chatwoot_conversation_id: conversation_id.map(str::to_string),
        ..Default::default()
    };
    store.insert_lead(&lead).await?;
    info!(lead = %lead.name, contact_id = ?contact.id, "created lead from chat contact");
    Ok(lead)
}

async fn create_customer<S>(
    store: &S,
    settings: &ChatwootConfig,
    contact: &RemoteContact,
) -> Result<Customer, BridgeError>
where
    S: ContactStore + ?Sized,
{
    let customer = Customer {
        name: new_record_name(CUSTOMER_PREFIX),
        customer_name: contact.display_name(),
        customer_type: "Individual".to_string(),
        customer_group: Some(
            settings
                .customer_group
                .clone()
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CUSTOMER_GROUP.to_string()),
        ),
        territory: Some(DEFAULT_TERRITORY.to_string()),
        email_id: contact.email.clone(),
        mobile_no: contact.phone.clone(),
        chatwoot_contact_id: contact.id.clone(),
        formbricks_contact_id: None,
    };
    store.insert_customer(&customer).await?;
    info!(customer = %customer.name, contact_id = ?contact.id, "created customer from chat contact");
    Ok(customer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmbridge_core::types::EntityKind;
    use crmbridge_storage::SqliteStore;

    fn visitor(id: &str, email: Option<&str>) -> RemoteContact {
        RemoteContact {
            id: Some(id.into()),
            name: Some("Visitor".into()),
            email: email.map(Into::into),
            phone: None,
        }
    }

    #[tokio::test]
    async fn lead_source_falls_back_in_order() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(
            resolve_lead_source(&store, "Chat").await.unwrap().as_deref(),
            Some("Chat")
        );
        assert_eq!(
            resolve_lead_source(&store, "Trade Show")
                .await
                .unwrap()
                .as_deref(),
            Some("Survey")
        );
        assert_eq!(
            resolve_lead_source(&store, "").await.unwrap().as_deref(),
            Some("Survey")
        );
    }

    #[tokio::test]
    async fn link_only_never_creates() {
        let store = SqliteStore::in_memory().await.unwrap();
        let settings = ChatwootConfig {
            auto_create_lead: true,
            ..Default::default()
        };
        let out = apply_contact_policy(&store, &settings, &visitor("1", Some("v@example.com")))
            .await
            .unwrap();
        assert_eq!(out, None);
        assert!(
            store
                .find_lead(ContactField::Email, "v@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn auto_create_makes_customer_with_defaults() {
        let store = SqliteStore::in_memory().await.unwrap();
        let settings = ChatwootConfig {
            contact_policy: ContactPolicy::AutoCreate,
            auto_create_customer: true,
            ..Default::default()
        };
        let out = apply_contact_policy(&store, &settings, &visitor("5", Some("c@example.com")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.kind, EntityKind::Customer);
        let customer = store.get_customer(&out.name).await.unwrap().unwrap();
        assert_eq!(customer.customer_group.as_deref(), Some(DEFAULT_CUSTOMER_GROUP));
        assert_eq!(customer.territory.as_deref(), Some(DEFAULT_TERRITORY));
        assert_eq!(customer.chatwoot_contact_id.as_deref(), Some("5"));

        // A second delivery links instead of creating again.
        let again = apply_contact_policy(&store, &settings, &visitor("5", Some("c@example.com")))
            .await
            .unwrap();
        assert_eq!(again, Some(out));
    }

    #[tokio::test]
    async fn auto_create_skips_anonymous_contacts() {
        let store = SqliteStore::in_memory().await.unwrap();
        let settings = ChatwootConfig {
            contact_policy: ContactPolicy::AutoCreate,
            auto_create_lead: true,
            ..Default::default()
        };
        let out = apply_contact_policy(&store, &settings, &visitor("8", None))
            .await
            .unwrap();
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn conversation_lead_is_gated_and_reused() {
        let store = SqliteStore::in_memory().await.unwrap();
        let off = ChatwootConfig::default();
        let contact = visitor("11", Some("lead@example.com"));
        assert_eq!(
            maybe_create_lead_from_conversation(&store, &off, &contact, "900")
                .await
                .unwrap(),
            None
        );

        let on = ChatwootConfig {
            auto_create_lead: true,
            ..Default::default()
        };
        let created = maybe_create_lead_from_conversation(&store, &on, &contact, "900")
            .await
            .unwrap()
            .unwrap();
        let lead = store.get_lead(&created.name).await.unwrap().unwrap();
        assert_eq!(lead.source.as_deref(), Some("Chat"));
        assert_eq!(lead.chatwoot_conversation_id.as_deref(), Some("900"));

        let reused = maybe_create_lead_from_conversation(&store, &on, &contact, "901")
            .await
            .unwrap();
        assert_eq!(reused, Some(created));
    }

    #[tokio::test]
    async fn conversation_lead_by_email_fills_missing_ids() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert_lead(&Lead {
                name: "LEAD-9".into(),
                lead_name: "Old".into(),
                status: LEAD_STATUS_OPEN.into(),
                email_id: Some("old@example.com".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let on = ChatwootConfig {
            auto_create_lead: true,
            ..Default::default()
        };
        let hit = maybe_create_lead_from_conversation(
            &store,
            &on,
            &visitor("12", Some("old@example.com")),
            "77",
        )
        .await
        .unwrap();
        assert_eq!(hit, Some(ContactRef::lead("LEAD-9")));
        let lead = store.get_lead("LEAD-9").await.unwrap().unwrap();
        assert_eq!(lead.chatwoot_contact_id.as_deref(), Some("12"));
        assert_eq!(lead.chatwoot_conversation_id.as_deref(), Some("77"));
    }

    #[tokio::test]
    async fn conversation_lead_needs_email_or_phone() {
        let store = SqliteStore::in_memory().await.unwrap();
        let on = ChatwootConfig {
            auto_create_lead: true,
            ..Default::default()
        };
        let out = maybe_create_lead_from_conversation(&store, &on, &visitor("13", None), "1")
            .await
            .unwrap();
        assert_eq!(out, None);
    }
}
