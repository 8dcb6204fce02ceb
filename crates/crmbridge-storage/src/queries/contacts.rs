// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer, Lead, and lead-source queries.

use crmbridge_core::types::{ContactField, Customer, Lead};
use crmbridge_core::{BridgeError, time};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, is_constraint_violation, map_tr_err};

const CUSTOMER_COLUMNS: &str = "name, customer_name, customer_type, customer_group, territory, \
     email_id, mobile_no, chatwoot_contact_id, formbricks_contact_id";

const LEAD_COLUMNS: &str = "name, lead_name, email_id, mobile_no, source, status, \
     chatwoot_contact_id, chatwoot_conversation_id, formbricks_contact_id, \
     formbricks_response_id, lead_score";

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        name: row.get(0)?,
        customer_name: row.get(1)?,
        customer_type: row.get(2)?,
        customer_group: row.get(3)?,
        territory: row.get(4)?,
        email_id: row.get(5)?,
        mobile_no: row.get(6)?,
        chatwoot_contact_id: row.get(7)?,
        formbricks_contact_id: row.get(8)?,
    })
}

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        name: row.get(0)?,
        lead_name: row.get(1)?,
        email_id: row.get(2)?,
        mobile_no: row.get(3)?,
        source: row.get(4)?,
        status: row.get(5)?,
        chatwoot_contact_id: row.get(6)?,
        chatwoot_conversation_id: row.get(7)?,
        formbricks_contact_id: row.get(8)?,
        formbricks_response_id: row.get(9)?,
        lead_score: row.get(10)?,
    })
}

pub async fn get_customer(db: &Database, name: &str) -> Result<Option<Customer>, BridgeError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Customer>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE name = ?1"),
                params![name],
                customer_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// First customer whose `field` equals `value`. Order among several matches
/// is whatever SQLite returns.
pub async fn find_customer(
    db: &Database,
    field: ContactField,
    value: &str,
) -> Result<Option<Customer>, BridgeError> {
    let value = value.to_string();
    let sql = format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE {} = ?1 LIMIT 1",
        field.column()
    );
    db.connection()
        .call(move |conn| -> Result<Option<Customer>, rusqlite::Error> {
            conn.query_row(&sql, params![value], customer_from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_customer(db: &Database, customer: &Customer) -> Result<(), BridgeError> {
    let c = customer.clone();
    let key = c.name.clone();
    let now = time::to_storage(&time::now());
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO customers (name, customer_name, customer_type, customer_group, \
                 territory, email_id, mobile_no, chatwoot_contact_id, formbricks_contact_id, \
                 created_at, modified_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    c.name,
                    c.customer_name,
                    c.customer_type,
                    c.customer_group,
                    c.territory,
                    c.email_id,
                    c.mobile_no,
                    c.chatwoot_contact_id,
                    c.formbricks_contact_id,
                    now,
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;
    if inserted {
        Ok(())
    } else {
        Err(BridgeError::Duplicate {
            entity: "customer",
            key,
        })
    }
}

pub async fn update_customer(db: &Database, customer: &Customer) -> Result<(), BridgeError> {
    let c = customer.clone();
    let key = c.name.clone();
    let now = time::to_storage(&time::now());
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE customers SET customer_name = ?2, customer_type = ?3, \
                 customer_group = ?4, territory = ?5, email_id = ?6, mobile_no = ?7, \
                 chatwoot_contact_id = ?8, formbricks_contact_id = ?9, modified_at = ?10 \
                 WHERE name = ?1",
                params![
                    c.name,
                    c.customer_name,
                    c.customer_type,
                    c.customer_group,
                    c.territory,
                    c.email_id,
                    c.mobile_no,
                    c.chatwoot_contact_id,
                    c.formbricks_contact_id,
                    now,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(BridgeError::NotFound {
            entity: "customer",
            key,
        });
    }
    Ok(())
}

pub async fn get_lead(db: &Database, name: &str) -> Result<Option<Lead>, BridgeError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Lead>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE name = ?1"),
                params![name],
                lead_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// First lead whose `field` equals `value`.
pub async fn find_lead(
    db: &Database,
    field: ContactField,
    value: &str,
) -> Result<Option<Lead>, BridgeError> {
    let value = value.to_string();
    let sql = format!(
        "SELECT {LEAD_COLUMNS} FROM leads WHERE {} = ?1 LIMIT 1",
        field.column()
    );
    db.connection()
        .call(move |conn| -> Result<Option<Lead>, rusqlite::Error> {
            conn.query_row(&sql, params![value], lead_from_row).optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_lead(db: &Database, lead: &Lead) -> Result<(), BridgeError> {
    let l = lead.clone();
    let key = l.name.clone();
    let now = time::to_storage(&time::now());
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO leads (name, lead_name, email_id, mobile_no, source, status, \
                 chatwoot_contact_id, chatwoot_conversation_id, formbricks_contact_id, \
                 formbricks_response_id, lead_score, created_at, modified_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                params![
                    l.name,
                    l.lead_name,
                    l.email_id,
                    l.mobile_no,
                    l.source,
                    l.status,
                    l.chatwoot_contact_id,
                    l.chatwoot_conversation_id,
                    l.formbricks_contact_id,
                    l.formbricks_response_id,
                    l.lead_score,
                    now,
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;
    if inserted {
        Ok(())
    } else {
        Err(BridgeError::Duplicate { entity: "lead", key })
    }
}

pub async fn update_lead(db: &Database, lead: &Lead) -> Result<(), BridgeError> {
    let l = lead.clone();
    let key = l.name.clone();
    let now = time::to_storage(&time::now());
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE leads SET lead_name = ?2, email_id = ?3, mobile_no = ?4, source = ?5, \
                 status = ?6, chatwoot_contact_id = ?7, chatwoot_conversation_id = ?8, \
                 formbricks_contact_id = ?9, formbricks_response_id = ?10, lead_score = ?11, \
                 modified_at = ?12 WHERE name = ?1",
                params![
                    l.name,
                    l.lead_name,
                    l.email_id,
                    l.mobile_no,
                    l.source,
                    l.status,
                    l.chatwoot_contact_id,
                    l.chatwoot_conversation_id,
                    l.formbricks_contact_id,
                    l.formbricks_response_id,
                    l.lead_score,
                    now,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(BridgeError::NotFound { entity: "lead", key });
    }
    Ok(())
}

pub async fn lead_source_exists(db: &Database, source: &str) -> Result<bool, BridgeError> {
    let source = source.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM lead_sources WHERE name = ?1)",
                params![source],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
