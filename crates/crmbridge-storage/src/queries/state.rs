// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-integration state queries.

use crmbridge_core::types::{Integration, IntegrationState};
use crmbridge_core::{BridgeError, time};
use rusqlite::{OptionalExtension, params};

use super::ts_opt;
use crate::database::{Database, map_tr_err};

/// Stored state for `integration`, or a fresh default.
pub async fn integration_state(
    db: &Database,
    integration: Integration,
) -> Result<IntegrationState, BridgeError> {
    let key = integration.to_string();
    let row = db
        .connection()
        .call(move |conn| -> Result<Option<(Option<String>, bool, Option<String>)>, rusqlite::Error> {
            conn.query_row(
                "SELECT last_sync, webhook_registered, sync_status \
                 FROM integration_state WHERE integration = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;

    Ok(match row {
        Some((last_sync, webhook_registered, sync_status)) => IntegrationState {
            integration,
            last_sync: ts_opt(last_sync),
            webhook_registered,
            sync_status,
        },
        None => IntegrationState::new(integration),
    })
}

pub async fn save_integration_state(
    db: &Database,
    state: &IntegrationState,
) -> Result<(), BridgeError> {
    let key = state.integration.to_string();
    let last_sync = state.last_sync.as_ref().map(time::to_storage);
    let registered = state.webhook_registered;
    let status = state.sync_status.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO integration_state (integration, last_sync, webhook_registered, \
                 sync_status) VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(integration) DO UPDATE SET last_sync = excluded.last_sync, \
                 webhook_registered = excluded.webhook_registered, \
                 sync_status = excluded.sync_status",
                params![key, last_sync, registered, status],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_state_is_default() {
        let db = Database::open_in_memory().await.unwrap();
        let state = integration_state(&db, Integration::Chatwoot).await.unwrap();
        assert_eq!(state, IntegrationState::new(Integration::Chatwoot));
    }

    #[tokio::test]
    async fn state_is_kept_per_integration() {
        let db = Database::open_in_memory().await.unwrap();
        let mut chat = IntegrationState::new(Integration::Chatwoot);
        chat.webhook_registered = true;
        chat.last_sync = Some(time::now());
        chat.sync_status = Some("Success".into());
        save_integration_state(&db, &chat).await.unwrap();

        assert_eq!(
            integration_state(&db, Integration::Chatwoot).await.unwrap(),
            chat
        );
        assert!(
            !integration_state(&db, Integration::Formbricks)
                .await
                .unwrap()
                .webhook_registered
        );
    }
}
