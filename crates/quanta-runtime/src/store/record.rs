use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quanta_core::{
    durable_id, is_placeholder_id, Message, NewSession, Page, PageRequest, ProgressStep,
    ResearchResult, Session, SessionCounts, SessionDetail, SessionSummary,
};

use super::StoreError;

/// Id a new session is stored under. Placeholder ids never become durable.
pub(crate) fn new_session_id(draft: &NewSession) -> Result<String, StoreError> {
    match &draft.id {
        Some(id) if is_placeholder_id(id) => Err(StoreError::InvalidId(format!(
            "session {} is a placeholder id",
            id
        ))),
        Some(id) => Ok(id.clone()),
        None => Ok(durable_id()),
    }
}

/// A session together with everything it owns, in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionRecord {
    pub session: Session,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub progress: Vec<ProgressStep>,
    #[serde(default)]
    pub results: Vec<ResearchResult>,
}

impl SessionRecord {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            messages: Vec::new(),
            progress: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn counts(&self) -> SessionCounts {
        SessionCounts {
            messages: self.messages.len(),
            progress: self.progress.len(),
            results: self.results.len(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session: self.session.clone(),
            counts: self.counts(),
        }
    }

    pub fn detail(&self) -> SessionDetail {
        let mut results = self.results.clone();
        newest_first(&mut results, |r| r.timestamp);
        SessionDetail {
            session: self.session.clone(),
            messages: self.messages.clone(),
            progress: self.progress.clone(),
            results,
        }
    }
}

/// Sort newest first; among equal timestamps the later insert wins.
pub(crate) fn newest_first<T>(items: &mut [T], timestamp: impl Fn(&T) -> DateTime<Utc>) {
    items.reverse();
    items.sort_by(|a, b| timestamp(b).cmp(&timestamp(a)));
}

/// Cut one page out of a full listing.
pub(crate) fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len();
    let items = items
        .into_iter()
        .skip(page.offset())
        .take(page.limit() as usize)
        .collect();
    Page { items, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quanta_core::{NewMessage, NewSession};

    #[test]
    fn test_newest_first_breaks_ties_by_insertion() {
        let now = Utc::now();
        let mut items = vec![(1, now), (2, now), (3, now + Duration::seconds(1))];
        newest_first(&mut items, |(_, ts)| *ts);
        let order: Vec<i32> = items.iter().map(|(n, _)| *n).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn test_paginate() {
        let page = paginate((1..=25).collect::<Vec<_>>(), PageRequest::new(3, 10).unwrap());
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);

        let beyond = paginate(vec![1, 2], PageRequest::new(5, 10).unwrap());
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 2);
    }

    #[test]
    fn test_record_counts() {
        let mut record =
            SessionRecord::new(Session::from_draft("s1", NewSession::titled("Optics")));
        record
            .messages
            .push(Message::from_draft("m1", NewMessage::user("s1", "hi")));
        assert_eq!(record.counts().messages, 1);
        assert_eq!(record.summary().counts.results, 0);
    }
}
