// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Survey and survey-response queries.

use crmbridge_core::types::{Survey, SurveyResponse};
use crmbridge_core::{BridgeError, time};
use rusqlite::{OptionalExtension, params};

use super::ts_opt;
use crate::database::{Database, is_constraint_violation, map_tr_err};

pub async fn get_survey(db: &Database, survey_id: &str) -> Result<Option<Survey>, BridgeError> {
    let id = survey_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Survey>, rusqlite::Error> {
            conn.query_row(
                "SELECT survey_id, name, status, survey_type, questions \
                 FROM surveys WHERE survey_id = ?1",
                params![id],
                |row| {
                    let questions: String = row.get(4)?;
                    Ok(Survey {
                        survey_id: row.get(0)?,
                        name: row.get(1)?,
                        status: row.get(2)?,
                        survey_type: row.get(3)?,
                        questions: serde_json::from_str(&questions)
                            .unwrap_or(serde_json::Value::Null),
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Inserts or updates a survey keyed by `survey_id`.
pub async fn save_survey(db: &Database, survey: &Survey) -> Result<(), BridgeError> {
    let s = survey.clone();
    let questions = s.questions.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO surveys (survey_id, name, status, survey_type, questions) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(survey_id) DO UPDATE SET name = excluded.name, \
                 status = excluded.status, survey_type = excluded.survey_type, \
                 questions = excluded.questions",
                params![s.survey_id, s.name, s.status, s.survey_type, questions],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_response(
    db: &Database,
    response_id: &str,
) -> Result<Option<SurveyResponse>, BridgeError> {
    let id = response_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<SurveyResponse>, rusqlite::Error> {
            conn.query_row(
                "SELECT name, response_id, survey, data, contact_name, contact_email, \
                 contact_phone, finished, finished_at, created_at, customer, lead \
                 FROM survey_responses WHERE response_id = ?1",
                params![id],
                |row| {
                    let data: String = row.get(3)?;
                    Ok(SurveyResponse {
                        name: row.get(0)?,
                        response_id: row.get(1)?,
                        survey: row.get(2)?,
                        data: serde_json::from_str(&data)
                            .unwrap_or_else(|_| serde_json::json!({})),
                        contact_name: row.get(4)?,
                        contact_email: row.get(5)?,
                        contact_phone: row.get(6)?,
                        finished: row.get(7)?,
                        finished_at: ts_opt(row.get(8)?),
                        created_at: ts_opt(row.get(9)?),
                        customer: row.get(10)?,
                        lead: row.get(11)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Inserts a new response. Losing a race on `name`/`response_id` yields
/// `BridgeError::Duplicate`.
pub async fn insert_response(db: &Database, r: &SurveyResponse) -> Result<(), BridgeError> {
    let r = r.clone();
    let key = r.response_id.clone();
    let data = r.data.to_string();
    let finished_at = r.finished_at.as_ref().map(time::to_storage);
    let created_at = r.created_at.as_ref().map(time::to_storage);
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO survey_responses (name, response_id, survey, data, contact_name, \
                 contact_email, contact_phone, finished, finished_at, created_at, customer, lead) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    r.name,
                    r.response_id,
                    r.survey,
                    data,
                    r.contact_name,
                    r.contact_email,
                    r.contact_phone,
                    r.finished,
                    finished_at,
                    created_at,
                    r.customer,
                    r.lead,
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
            entity: "survey response",
            key,
        })
    }
}

pub async fn update_response(db: &Database, r: &SurveyResponse) -> Result<(), BridgeError> {
    let r = r.clone();
    let key = r.response_id.clone();
    let data = r.data.to_string();
    let finished_at = r.finished_at.as_ref().map(time::to_storage);
    let created_at = r.created_at.as_ref().map(time::to_storage);
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE survey_responses SET survey = ?2, data = ?3, contact_name = ?4, \
                 contact_email = ?5, contact_phone = ?6, finished = ?7, finished_at = ?8, \
                 created_at = ?9, customer = ?10, lead = ?11 WHERE response_id = ?1",
                params![
                    r.response_id,
                    r.survey,
                    data,
                    r.contact_name,
                    r.contact_email,
                    r.contact_phone,
                    r.finished,
                    finished_at,
                    created_at,
                    r.customer,
                    r.lead,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(BridgeError::NotFound {
            entity: "survey response",
            key,
        });
    }
    Ok(())
}
