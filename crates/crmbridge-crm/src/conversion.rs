// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manual Lead to Customer conversion.
//!
//! Unlike the webhook paths, every failure here is returned to the caller.

use crmbridge_core::types::{Customer, LEAD_STATUS_CONVERTED};
use crmbridge_core::{BridgeError, ContactStore};
use tracing::{error, info};

use crate::naming::{CUSTOMER_PREFIX, new_record_name};
use crate::promotion::{DEFAULT_CUSTOMER_GROUP, DEFAULT_TERRITORY};

/// Copies a Lead's identity and vendor links into a new Customer and marks
/// the Lead converted.
pub async fn convert_lead_to_customer<S>(
    store: &S,
    lead_name: &str,
    customer_group: Option<&str>,
) -> Result<Customer, BridgeError>
where
    S: ContactStore + ?Sized,
{
    let result = convert(store, lead_name, customer_group).await;
    if let Err(e) = &result {
        error!(lead = lead_name, error = %e, "lead conversion failed");
    }
    result
}

async fn convert<S>(
    store: &S,
    lead_name: &str,
    customer_group: Option<&str>,
) -> Result<Customer, BridgeError>
where
    S: ContactStore + ?Sized,
{
    let mut lead = store
        .get_lead(lead_name)
        .await?
        .ok_or_else(|| BridgeError::NotFound {
            entity: "lead",
            key: lead_name.to_string(),
        })?;
    if lead.status == LEAD_STATUS_CONVERTED {
        return Err(BridgeError::Validation(format!(
            "lead {lead_name} is already converted"
        )));
    }

    let customer = Customer {
        name: new_record_name(CUSTOMER_PREFIX),
        customer_name: lead.lead_name.clone(),
        customer_type: "Individual".to_string(),
        customer_group: Some(
            customer_group
                .filter(|g| !g.trim().is_empty())
                .unwrap_or(DEFAULT_CUSTOMER_GROUP)
                .to_string(),
        ),
        territory: Some(DEFAULT_TERRITORY.to_string()),
        email_id: lead.email_id.clone(),
        mobile_no: lead.mobile_no.clone(),
        chatwoot_contact_id: lead.chatwoot_contact_id.clone(),
        formbricks_contact_id: lead.formbricks_contact_id.clone(),
    };
    store.insert_customer(&customer).await?;

    lead.status = LEAD_STATUS_CONVERTED.to_string();
    store.update_lead(&lead).await?;

    info!(lead = lead_name, customer = %customer.name, "converted lead to customer");
    Ok(customer)
}
