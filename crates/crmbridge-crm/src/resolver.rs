// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exact-match lookup of Customers and Leads by email or phone.
//!
//! Customers are checked before Leads and the first hit wins. When several
//! records share a value, which one is returned is unspecified.

use crmbridge_core::types::{ContactField, ContactRef};
use crmbridge_core::{BridgeError, ContactStore};
use tracing::debug;

/// Finds the Customer, else the Lead, with exactly this email.
pub async fn resolve_by_email<S>(
    store: &S,
    email: Option<&str>,
) -> Result<Option<ContactRef>, BridgeError>
where
    S: ContactStore + ?Sized,
{
    let Some(email) = email.filter(|e| !e.trim().is_empty()) else {
        return Ok(None);
    };
    resolve(store, ContactField::Email, email).await
}

/// Finds the Customer, else the Lead, with this mobile number.
///
/// Digits are extracted for logging, but the stored value is compared
/// against the phone string exactly as given. `+1 (555) 010-0100` does not
/// match a stored `15550100100`.
pub async fn resolve_by_phone<S>(
    store: &S,
    phone: Option<&str>,
) -> Result<Option<ContactRef>, BridgeError>
where
    S: ContactStore + ?Sized,
{
    let Some(phone) = phone.filter(|p| !p.trim().is_empty()) else {
        return Ok(None);
    };
    let normalized = normalize_phone(phone);
    debug!(phone, normalized, "resolving contact by phone");
    resolve(store, ContactField::Mobile, phone).await
}

async fn resolve<S>(
    store: &S,
    field: ContactField,
    value: &str,
) -> Result<Option<ContactRef>, BridgeError>
where
    S: ContactStore + ?Sized,
{
    if let Some(customer) = store.find_customer(field, value).await? {
        return Ok(Some(ContactRef::customer(customer.name)));
    }
    if let Some(lead) = store.find_lead(field, value).await? {
        return Ok(Some(ContactRef::lead(lead.name)));
    }
    Ok(None)
}

/// Digits only.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}
