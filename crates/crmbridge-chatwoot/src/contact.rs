// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact events, outbound contact push, and the contact pull sync.

use crmbridge_config::ChatwootConfig;
use crmbridge_core::json::id_field;
use crmbridge_core::types::{ContactField, ContactRef, Customer, Integration, Lead};
use crmbridge_core::{BridgeError, Store, SyncReport, time};
use crmbridge_crm::{RemoteContact, apply_contact_policy};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::client::{ChatwootClient, NewContact, created_contact_id};
use crate::events::contact_from;

/// Upper bound on pages fetched by one pull sync.
const MAX_PAGES: u32 = 500;

/// Applies the contact policy to a `contact_created` event.
pub async fn handle_contact_created<S>(
    store: &S,
    settings: &ChatwootConfig,
    contact: &RemoteContact,
) -> Result<Option<ContactRef>, BridgeError>
where
    S: Store + ?Sized,
{
    let outcome = apply_contact_policy(store, settings, contact).await?;
    if let Some(linked) = &outcome {
        debug!(contact_id = ?contact.id, kind = %linked.kind, record = %linked.name, "chat contact resolved");
    }
    Ok(outcome)
}

/// Copies name, email, and phone from a `contact_updated` event onto the
/// Customer, else the Lead, linked to that chat contact.
pub async fn handle_contact_updated<S>(
    store: &S,
    contact: &RemoteContact,
) -> Result<Option<ContactRef>, BridgeError>
where
    S: Store + ?Sized,
{
    let Some(id) = contact.id.as_deref() else {
        return Ok(None);
    };

    if let Some(mut customer) = store
        .find_customer(ContactField::ChatwootContactId, id)
        .await?
    {
        if let Some(name) = &contact.name {
            customer.customer_name = name.clone();
        }
        if contact.email.is_some() {
            customer.email_id = contact.email.clone();
        }
        if contact.phone.is_some() {
            customer.mobile_no = contact.phone.clone();
        }
        store.update_customer(&customer).await?;
        debug!(customer = %customer.name, contact_id = id, "customer updated from chat contact");
        return Ok(Some(ContactRef::customer(customer.name)));
    }

    if let Some(mut lead) = store.find_lead(ContactField::ChatwootContactId, id).await? {
        if let Some(name) = &contact.name {
            lead.lead_name = name.clone();
        }
        if contact.email.is_some() {
            lead.email_id = contact.email.clone();
        }
        if contact.phone.is_some() {
            lead.mobile_no = contact.phone.clone();
        }
        store.update_lead(&lead).await?;
        debug!(lead = %lead.name, contact_id = id, "lead updated from chat contact");
        return Ok(Some(ContactRef::lead(lead.name)));
    }

    Ok(None)
}

/// Outcome of pushing a local record to Chatwoot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactPush {
    /// The record already carries a chat contact id.
    AlreadyLinked,
    /// An existing remote contact matched by email was linked.
    LinkedExisting(String),
    /// A new remote contact was created and linked.
    Created(String),
    /// The remote side returned no id; nothing was linked.
    NoRemoteId,
}

/// The identity fields of a Customer or Lead, as pushed to Chatwoot.
struct PushTarget {
    name: String,
    display_name: String,
    email: Option<String>,
    phone: Option<String>,
    custom_attributes: Value,
}

/// Pushes a Customer without a chat contact id to Chatwoot.
pub async fn push_customer<S>(
    store: &S,
    client: &ChatwootClient,
    name: &str,
) -> Result<ContactPush, BridgeError>
where
    S: Store + ?Sized,
{
    let mut customer = store
        .get_customer(name)
        .await?
        .ok_or_else(|| BridgeError::NotFound {
            entity: "customer",
            key: name.to_string(),
        })?;
    if customer.chatwoot_contact_id.is_some() {
        return Ok(ContactPush::AlreadyLinked);
    }

    let outcome = push(client, customer_target(&customer)).await?;
    if let ContactPush::LinkedExisting(id) | ContactPush::Created(id) = &outcome {
        customer.chatwoot_contact_id = Some(id.clone());
        store.update_customer(&customer).await?;
        info!(customer = %customer.name, contact_id = %id, "customer linked to chat contact");
    }
    Ok(outcome)
}

/// Pushes a Lead without a chat contact id to Chatwoot.
pub async fn push_lead<S>(
    store: &S,
    client: &ChatwootClient,
    name: &str,
) -> Result<ContactPush, BridgeError>
where
    S: Store + ?Sized,
{
    let mut lead = store
        .get_lead(name)
        .await?
        .ok_or_else(|| BridgeError::NotFound {
            entity: "lead",
            key: name.to_string(),
        })?;
    if lead.chatwoot_contact_id.is_some() {
        return Ok(ContactPush::AlreadyLinked);
    }

    let outcome = push(client, lead_target(&lead)).await?;
    if let ContactPush::LinkedExisting(id) | ContactPush::Created(id) = &outcome {
        lead.chatwoot_contact_id = Some(id.clone());
        store.update_lead(&lead).await?;
        info!(lead = %lead.name, contact_id = %id, "lead linked to chat contact");
    }
    Ok(outcome)
}

fn customer_target(customer: &Customer) -> PushTarget {
    PushTarget {
        name: customer.name.clone(),
        display_name: customer.customer_name.clone(),
        email: customer.email_id.clone(),
        phone: customer.mobile_no.clone(),
        custom_attributes: json!({
            "erpnext_customer": customer.name,
            "customer_group": customer.customer_group,
        }),
    }
}

fn lead_target(lead: &Lead) -> PushTarget {
    PushTarget {
        name: lead.name.clone(),
        display_name: lead.lead_name.clone(),
        email: lead.email_id.clone(),
        phone: lead.mobile_no.clone(),
        custom_attributes: json!({
            "erpnext_lead": lead.name,
            "lead_source": lead.source,
        }),
    }
}

/// Links to the first remote contact with the same email, else creates one.
async fn push(client: &ChatwootClient, target: PushTarget) -> Result<ContactPush, BridgeError> {
    if let Some(email) = target.email.as_deref().filter(|e| !e.is_empty()) {
        let hits = client.search_contacts(email).await?;
        if let Some(id) = hits.first().and_then(|hit| id_field(hit, "id")) {
            return Ok(ContactPush::LinkedExisting(id));
        }
    }

    let result = client
        .create_contact(&NewContact {
            name: target.display_name,
            email: target.email,
            phone: target.phone,
            identifier: Some(target.name.clone()),
            custom_attributes: Some(target.custom_attributes),
        })
        .await?;
    match created_contact_id(&result) {
        Some(id) => Ok(ContactPush::Created(id)),
        None => {
            warn!(record = %target.name, "chatwoot created a contact but returned no id");
            Ok(ContactPush::NoRemoteId)
        }
    }
}

/// Whether a local Customer or Lead already matches this chat contact.
async fn contact_exists<S>(store: &S, contact: &RemoteContact) -> Result<bool, BridgeError>
where
    S: Store + ?Sized,
{
    if let Some(id) = contact.id.as_deref()
        && (store
            .find_customer(ContactField::ChatwootContactId, id)
            .await?
            .is_some()
            || store
                .find_lead(ContactField::ChatwootContactId, id)
                .await?
                .is_some())
    {
        return Ok(true);
    }
    if let Some(email) = contact.email.as_deref() {
        return Ok(store.find_customer(ContactField::Email, email).await?.is_some()
            || store.find_lead(ContactField::Email, email).await?.is_some());
    }
    Ok(false)
}

/// Pages through remote contacts and applies the contact policy to every
/// contact with no local match, then records the sync time.
///
/// A failure on the first page is returned; later page and per-contact
/// failures are logged and counted.
pub async fn sync_contacts<S>(
    store: &S,
    settings: &ChatwootConfig,
    client: &ChatwootClient,
) -> Result<SyncReport, BridgeError>
where
    S: Store + ?Sized,
{
    let mut report = SyncReport::default();
    let mut page = 1;

    while page <= MAX_PAGES {
        let listing = match client.list_contacts(page).await {
            Ok(listing) => listing,
            Err(e) if page == 1 => return Err(e),
            Err(e) => {
                warn!(page, error = %e, "failed to fetch contact page, stopping");
                report.failed += 1;
                break;
            }
        };
        let contacts = listing
            .get("payload")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if contacts.is_empty() {
            break;
        }

        for raw in &contacts {
            report.fetched += 1;
            let contact = contact_from(raw);
            match sync_one(store, settings, &contact).await {
                Ok(true) => report.synced += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!(contact_id = ?contact.id, error = %e, "failed to sync chat contact");
                    report.failed += 1;
                }
            }
        }

        let total_pages = listing
            .pointer("/meta/total_pages")
            .and_then(Value::as_u64);
        if total_pages.is_some_and(|total| u64::from(page) >= total) {
            break;
        }
        page += 1;
    }

    let mut state = store.integration_state(Integration::Chatwoot).await?;
    state.last_sync = Some(time::now());
    store.save_integration_state(&state).await?;

    info!(
        fetched = report.fetched,
        synced = report.synced,
        skipped = report.skipped,
        failed = report.failed,
        "chatwoot contact sync finished"
    );
    Ok(report)
}

async fn sync_one<S>(
    store: &S,
    settings: &ChatwootConfig,
    contact: &RemoteContact,
) -> Result<bool, BridgeError>
where
    S: Store + ?Sized,
{
    if contact_exists(store, contact).await? {
        return Ok(false);
    }
    Ok(apply_contact_policy(store, settings, contact)
        .await?
        .is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmbridge_config::ContactPolicy;
    use crmbridge_core::{ContactStore, StateStore};
    use crmbridge_storage::SqliteStore;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn customer(name: &str, email: Option<&str>, chat_id: Option<&str>) -> Customer {
        Customer {
            name: name.into(),
            customer_name: "Robin".into(),
            customer_type: "Individual".into(),
            email_id: email.map(Into::into),
            chatwoot_contact_id: chat_id.map(Into::into),
            ..Default::default()
        }
    }

    async fn client(server: &MockServer) -> ChatwootClient {
        ChatwootClient::new(server.uri(), "1", "tok").unwrap()
    }

    #[tokio::test]
    async fn update_touches_linked_customer_only() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert_customer(&customer("CUST-1", Some("old@example.com"), Some("8")))
            .await
            .unwrap();

        let update = RemoteContact {
            id: Some("8".into()),
            name: Some("Robin Q".into()),
            email: Some("new@example.com".into()),
            phone: None,
        };
        let hit = handle_contact_updated(&store, &update).await.unwrap();
        assert_eq!(hit, Some(ContactRef::customer("CUST-1")));
        let stored = store.get_customer("CUST-1").await.unwrap().unwrap();
        assert_eq!(stored.customer_name, "Robin Q");
        assert_eq!(stored.email_id.as_deref(), Some("new@example.com"));

        let stranger = RemoteContact {
            id: Some("999".into()),
            ..Default::default()
        };
        assert_eq!(handle_contact_updated(&store, &stranger).await.unwrap(), None);
    }

    #[tokio::test]
    async fn push_links_first_search_hit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/1/contacts/search"))
            .and(query_param("q", "robin@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "payload": [{"id": 31}, {"id": 32}]
            })))
            .mount(&server)
            .await;

        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert_customer(&customer("CUST-2", Some("robin@example.com"), None))
            .await
            .unwrap();

        let outcome = push_customer(&store, &client(&server).await, "CUST-2")
            .await
            .unwrap();
        assert_eq!(outcome, ContactPush::LinkedExisting("31".into()));
        let stored = store.get_customer("CUST-2").await.unwrap().unwrap();
        assert_eq!(stored.chatwoot_contact_id.as_deref(), Some("31"));

        let again = push_customer(&store, &client(&server).await, "CUST-2")
            .await
            .unwrap();
        assert_eq!(again, ContactPush::AlreadyLinked);
    }

    #[tokio::test]
    async fn push_creates_when_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/1/contacts/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"payload": []})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/1/contacts"))
            .and(body_partial_json(json!({
                "name": "Lee",
                "identifier": "CRM-LEAD-1",
                "custom_attributes": {"erpnext_lead": "CRM-LEAD-1"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "payload": {"contact": {"id": 64}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert_lead(&Lead {
                name: "CRM-LEAD-1".into(),
                lead_name: "Lee".into(),
                email_id: Some("lee@example.com".into()),
                status: "Lead".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let outcome = push_lead(&store, &client(&server).await, "CRM-LEAD-1")
            .await
            .unwrap();
        assert_eq!(outcome, ContactPush::Created("64".into()));
        let lead = store.get_lead("CRM-LEAD-1").await.unwrap().unwrap();
        assert_eq!(lead.chatwoot_contact_id.as_deref(), Some("64"));
    }

    #[tokio::test]
    async fn pull_sync_skips_known_and_creates_new() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/1/contacts"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"total_pages": 2},
                "payload": [
                    {"id": 1, "name": "Known", "email": "known@example.com"},
                    {"id": 2, "name": "New", "email": "new@example.com"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/1/contacts"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"total_pages": 2},
                "payload": [{"id": 3, "name": "No Address"}]
            })))
            .mount(&server)
            .await;

        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert_customer(&customer("CUST-3", Some("known@example.com"), None))
            .await
            .unwrap();
        let settings = ChatwootConfig {
            enabled: true,
            contact_policy: ContactPolicy::AutoCreate,
            auto_create_lead: true,
            ..Default::default()
        };

        let report = sync_contacts(&store, &settings, &client(&server).await)
            .await
            .unwrap();
        assert_eq!(report.fetched, 3);
        assert_eq!(report.synced, 1);
        assert_eq!(report.skipped, 2);
        assert!(report.is_clean());
        assert!(
            store
                .find_lead(ContactField::Email, "new@example.com")
                .await
                .unwrap()
                .is_some()
        );
        let state = store.integration_state(Integration::Chatwoot).await.unwrap();
        assert!(state.last_sync.is_some());
    }

    #[tokio::test]
    async fn pull_sync_first_page_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/1/contacts"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let store = SqliteStore::in_memory().await.unwrap();
        let err = sync_contacts(&store, &ChatwootConfig::default(), &client(&server).await)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Remote { status: Some(500), .. }));
    }
}
