use chrono::DateTime;
use tracing::instrument;

use deskhub_store::{Database, Reminder, ReminderRepo};

use crate::error::{required, EngineError};

pub struct ReminderService {
    repo: ReminderRepo,
}

impl ReminderService {
    pub fn new(db: Database) -> Self {
        Self {
            repo: ReminderRepo::new(db),
        }
    }

    /// `reminder_time` must be RFC 3339; it is stored normalized to UTC.
    #[instrument(skip(self, text))]
    pub fn add(&self, text: &str, reminder_time: &str) -> Result<Reminder, EngineError> {
        let text = required("text", text)?;
        let when = DateTime::parse_from_rfc3339(reminder_time.trim()).map_err(|e| {
            EngineError::Validation(format!("reminder_time must be RFC 3339: {e}"))
        })?;
        let when = when.with_timezone(&chrono::Utc).to_rfc3339();
        Ok(self.repo.insert(&text, &when)?)
    }

    pub fn list_active(&self) -> Result<Vec<Reminder>, EngineError> {
        Ok(self.repo.list_active()?)
    }

    #[instrument(skip(self))]
    pub fn dismiss(&self, id: i64) -> Result<(), EngineError> {
        Ok(self.repo.dismiss(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ReminderService {
        ReminderService::new(Database::in_memory().unwrap())
    }

    #[test]
    fn add_normalizes_time_and_lists_soonest_first() {
        let svc = service();
        let later = svc.add("review PRs", "2026-05-01T10:00:00Z").unwrap();
        let sooner = svc.add("standup", "2026-05-01T11:00:00+02:00").unwrap();
        assert_eq!(sooner.reminder_time, "2026-05-01T09:00:00+00:00");

        let active = svc.list_active().unwrap();
        assert_eq!(active, vec![sooner, later]);
    }

    #[test]
    fn add_validates_input() {
        let svc = service();
        assert!(matches!(svc.add("", "2026-05-01T10:00:00Z"), Err(EngineError::Validation(_))));
        assert!(matches!(svc.add("lunch", "tomorrow noon"), Err(EngineError::Validation(_))));
    }

    #[test]
    fn dismiss_then_unknown() {
        let svc = service();
        let r = svc.add("stretch", "2026-05-01T15:00:00Z").unwrap();
        svc.dismiss(r.id).unwrap();
        assert!(svc.list_active().unwrap().is_empty());
        assert!(matches!(svc.dismiss(r.id + 100), Err(EngineError::NotFound(_))));
    }
}
