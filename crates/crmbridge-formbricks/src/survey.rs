// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pulling survey definitions into the local mirror.

use crmbridge_core::json::{id_field, str_field};
use crmbridge_core::types::{Integration, Survey};
use crmbridge_core::{BridgeError, Store, SyncReport, time};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::client::{FormbricksClient, PAGE_LIMIT, data_items};

const MAX_PAGES: u32 = 100;

/// Builds a local survey from an API object. `None` without an id.
pub fn survey_from(object: &Value) -> Option<Survey> {
    Some(Survey {
        survey_id: id_field(object, "id")?,
        name: str_field(object, "name").unwrap_or_else(|| "Unnamed Survey".into()),
        status: str_field(object, "status").unwrap_or_else(|| "draft".into()),
        survey_type: str_field(object, "type").unwrap_or_else(|| "link".into()),
        questions: object
            .get("questions")
            .filter(|q| !q.is_null())
            .cloned()
            .unwrap_or_else(|| json!([])),
    })
}

/// Upserts every remote survey by id and records the sync time.
///
/// A failed first page is returned; anything later is logged and counted.
pub async fn sync_surveys<S>(
    store: &S,
    client: &FormbricksClient,
) -> Result<SyncReport, BridgeError>
where
    S: Store + ?Sized,
{
    let mut report = SyncReport::default();

    for page in 0..MAX_PAGES {
        let offset = page * PAGE_LIMIT;
        let items = match client.surveys(PAGE_LIMIT, offset).await {
            Ok(envelope) => data_items(&envelope),
            Err(e) if page == 0 => return Err(e),
            Err(e) => {
                warn!(offset, error = %e, "failed to fetch survey page, stopping");
                report.failed += 1;
                break;
            }
        };

        for raw in &items {
            report.fetched += 1;
            let Some(survey) = survey_from(raw) else {
                report.skipped += 1;
                continue;
            };
            match store.save_survey(&survey).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    warn!(survey_id = %survey.survey_id, error = %e, "failed to save survey");
                    report.failed += 1;
                }
            }
        }

        if items.len() < PAGE_LIMIT as usize {
            break;
        }
    }

    let mut state = store.integration_state(Integration::Formbricks).await?;
    state.last_sync = Some(time::now());
    store.save_integration_state(&state).await?;

    info!(
        fetched = report.fetched,
        synced = report.synced,
        failed = report.failed,
        "formbricks survey sync finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmbridge_core::{StateStore, SurveyStore};
    use crmbridge_storage::SqliteStore;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn defaults_fill_missing_fields() {
        let survey = survey_from(&json!({"id": "s1"})).unwrap();
        assert_eq!(survey.name, "Unnamed Survey");
        assert_eq!(survey.status, "draft");
        assert_eq!(survey.survey_type, "link");
        assert_eq!(survey.questions, json!([]));
        assert!(survey_from(&json!({"name": "no id"})).is_none());
    }

    #[tokio::test]
    async fn sync_upserts_and_records_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/management/surveys"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "s1", "name": "NPS", "status": "inProgress", "type": "app",
                     "questions": [{"id": "q1"}]},
                    {"id": "s2"},
                    {"name": "broken"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = SqliteStore::in_memory().await.unwrap();
        let client = FormbricksClient::new(server.uri(), None, "k").unwrap();
        let report = sync_surveys(&store, &client).await.unwrap();
        assert_eq!(report.fetched, 3);
        assert_eq!(report.synced, 2);
        assert_eq!(report.skipped, 1);

        let nps = store.get_survey("s1").await.unwrap().unwrap();
        assert_eq!(nps.survey_type, "app");
        assert_eq!(nps.questions, json!([{"id": "q1"}]));

        let state = store
            .integration_state(Integration::Formbricks)
            .await
            .unwrap();
        assert!(state.last_sync.is_some());
    }

    #[tokio::test]
    async fn first_page_failure_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let store = SqliteStore::in_memory().await.unwrap();
        let client = FormbricksClient::new(server.uri(), None, "k").unwrap();
        assert!(sync_surveys(&store, &client).await.is_err());
    }
}
