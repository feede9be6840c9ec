//! Turns page interactions into writes against the session's two documents.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::records::{
    Answer, FinalResponse, InteractionRecord, FINAL_RESPONSE, INTERACTIONS, SESSION_ID,
};
use crate::store::{DocumentStore, StoreError};

#[derive(Clone)]
pub struct InteractionRecorder {
    store: Arc<DocumentStore>,
    session_id: String,
}

impl InteractionRecorder {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            store,
            session_id: SESSION_ID.to_string(),
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Drops the previous answer and interactions, then starts a zeroed record.
    pub async fn reset_session(&self) -> Result<(), StoreError> {
        self.store.delete(FINAL_RESPONSE, &self.session_id).await?;
        self.store.delete(INTERACTIONS, &self.session_id).await?;

        let fresh = InteractionRecord::fresh(Utc::now());
        self.store
            .set(INTERACTIONS, &self.session_id, serde_json::to_value(fresh)?)
            .await
    }

    pub async fn record_dodge(&self, new_count: u32, points_at_time: u32) -> Result<(), StoreError> {
        let now = Utc::now();
        self.store
            .update(INTERACTIONS, &self.session_id, move |current| {
                let mut record = match current {
                    Some(doc) => serde_json::from_value::<InteractionRecord>(doc)?,
                    None => InteractionRecord::fresh(now),
                };
                record.push_dodge(new_count, points_at_time, now);
                Ok(serde_json::to_value(record)?)
            })
            .await
    }

    pub async fn record_reward(&self, new_points: u32) -> Result<(), StoreError> {
        let fields = json!({
            "points": new_points,
            "lastUpdated": serde_json::to_value(Utc::now())?,
        });
        self.store.merge(INTERACTIONS, &self.session_id, fields).await
    }

    pub async fn record_acceptance(&self, dodge_count: u32, points: u32) -> Result<(), StoreError> {
        let response = FinalResponse {
            response: Answer::Yes,
            timestamp: Utc::now(),
            dodge_count_before_yes: dodge_count,
            final_points: points,
        };
        self.store
            .set(FINAL_RESPONSE, &self.session_id, serde_json::to_value(response)?)
            .await
    }

    pub async fn interactions(&self) -> Result<Option<InteractionRecord>, StoreError> {
        match self.store.get(INTERACTIONS, &self.session_id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn final_response(&self) -> Result<Option<FinalResponse>, StoreError> {
        match self.store.get(FINAL_RESPONSE, &self.session_id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }
}
