use anyhow::{anyhow, Result};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{from_document, new_document_id, to_fields, DocumentStore};
use crate::models::{AuthSession, JobApplication};
use crate::sample;

pub const JOB_APPLICATIONS: &str = "job_applications";

pub struct JobApplicationRepository<'a> {
    store: &'a dyn DocumentStore,
    session: &'a AuthSession,
}

impl<'a> JobApplicationRepository<'a> {
    pub fn new(store: &'a dyn DocumentStore, session: &'a AuthSession) -> Self {
        Self { store, session }
    }

    /// Applications owned by the signed-in user, most recently updated first.
    pub fn list(&self) -> Result<Vec<JobApplication>> {
        let docs = self
            .store
            .query_eq(
                self.session,
                JOB_APPLICATIONS,
                "userId",
                &Value::String(self.session.uid.clone()),
            )
            .inspect_err(|e| warn!(error = %e, "failed to list job applications"))?;

        let mut apps = docs
            .into_iter()
            .map(from_document::<JobApplication>)
            .collect::<Result<Vec<_>>>()?;
        apps.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        debug!(count = apps.len(), "listed job applications");
        Ok(apps)
    }

    /// The fixed sample set, owned by the signed-in user. Nothing is read
    /// from the store.
    pub fn sample(&self) -> Vec<JobApplication> {
        sample::job_applications(&self.session.uid, Utc::now())
    }

    pub fn get(&self, id: &str) -> Result<Option<JobApplication>> {
        self.store
            .get(self.session, JOB_APPLICATIONS, id)?
            .map(from_document)
            .transpose()
    }

    pub fn get_required(&self, id: &str) -> Result<JobApplication> {
        self.get(id)?
            .ok_or_else(|| anyhow!("Job application '{}' not found", id))
    }

    /// Stores a new application and returns it with its assigned id and owner.
    pub fn add(&self, application: JobApplication) -> Result<JobApplication> {
        let now = Utc::now();
        let stored = JobApplication {
            id: new_document_id(),
            user_id: self.session.uid.clone(),
            applied_date: now,
            last_updated: now,
            ..application
        };
        self.store
            .set(self.session, JOB_APPLICATIONS, &stored.id, &to_fields(&stored)?)
            .inspect_err(|e| warn!(error = %e, "failed to add job application"))?;
        debug!(id = %stored.id, "added job application");
        Ok(stored)
    }

    /// Re-sends the whole record.
    pub fn update(&self, application: JobApplication) -> Result<JobApplication> {
        if application.id.is_empty() {
            return Err(anyhow!("Cannot update a job application without an id"));
        }
        let stored = JobApplication {
            last_updated: Utc::now(),
            ..application
        };
        self.store
            .set(self.session, JOB_APPLICATIONS, &stored.id, &to_fields(&stored)?)
            .inspect_err(|e| warn!(id = %stored.id, error = %e, "failed to update job application"))?;
        Ok(stored)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.store
            .delete(self.session, JOB_APPLICATIONS, id)
            .inspect_err(|e| warn!(id, error = %e, "failed to delete job application"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationStatus;
    use crate::testing::{session, FakeBackend, FakeError};

    fn draft(title: &str) -> JobApplication {
        JobApplication::new(title, "Acme", Utc::now())
    }

    #[test]
    fn test_add_assigns_id_and_owner() {
        let backend = FakeBackend::new();
        let s = session("u1", "a@b.c");
        let repo = JobApplicationRepository::new(&backend, &s);

        let stored = repo.add(draft("Android Engineer")).unwrap();
        assert_eq!(stored.id.len(), 20);
        assert_eq!(stored.user_id, "u1");
        assert_eq!(stored.job_title, "Android Engineer");

        let raw = backend.stored(JOB_APPLICATIONS, &stored.id).unwrap();
        assert_eq!(raw["userId"], "u1");
        assert_eq!(raw["status"], "SUBMITTED");
        assert!(!raw.contains_key("id"));
    }

    #[test]
    fn test_list_returns_only_own_applications() {
        let backend = FakeBackend::new();
        let mine = session("u1", "a@b.c");
        let theirs = session("u2", "x@y.z");

        JobApplicationRepository::new(&backend, &mine).add(draft("Mine")).unwrap();
        JobApplicationRepository::new(&backend, &theirs).add(draft("Theirs")).unwrap();

        let apps = JobApplicationRepository::new(&backend, &mine).list().unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].job_title, "Mine");
    }

    #[test]
    fn test_update_resends_whole_record() {
        let backend = FakeBackend::new();
        let s = session("u1", "a@b.c");
        let repo = JobApplicationRepository::new(&backend, &s);

        let stored = repo.add(draft("SRE")).unwrap();
        let changed = stored
            .clone()
            .with_status(ApplicationStatus::InterviewScheduled, Utc::now())
            .with_notes("Tuesday 10am", Utc::now());
        repo.update(changed).unwrap();

        let fetched = repo.get_required(&stored.id).unwrap();
        assert_eq!(fetched.status, ApplicationStatus::InterviewScheduled);
        assert_eq!(fetched.notes, "Tuesday 10am");
        assert_eq!(fetched.job_title, "SRE");
        assert_eq!(backend.count(JOB_APPLICATIONS), 1);
    }

    #[test]
    fn test_update_without_id_fails() {
        let backend = FakeBackend::new();
        let s = session("u1", "a@b.c");
        let repo = JobApplicationRepository::new(&backend, &s);
        assert!(repo.update(draft("No id")).is_err());
    }

    #[test]
    fn test_delete_removes_record() {
        let backend = FakeBackend::new();
        let s = session("u1", "a@b.c");
        let repo = JobApplicationRepository::new(&backend, &s);

        let stored = repo.add(draft("Temp")).unwrap();
        repo.delete(&stored.id).unwrap();
        assert!(repo.get(&stored.id).unwrap().is_none());
        assert!(repo.get_required(&stored.id).is_err());
    }

    #[test]
    fn test_failures_are_surfaced() {
        let backend = FakeBackend::new();
        let s = session("u1", "a@b.c");
        let repo = JobApplicationRepository::new(&backend, &s);

        backend.fail_next("permission denied");
        let err = repo.add(draft("X")).unwrap_err();
        assert!(err.downcast_ref::<FakeError>().is_some());
        assert_eq!(backend.count(JOB_APPLICATIONS), 0);

        backend.fail_next("unavailable");
        assert_eq!(repo.delete("any").unwrap_err().to_string(), "unavailable");

        backend.fail_next("unavailable");
        assert!(repo.list().is_err());
    }

    #[test]
    fn test_sample_does_not_touch_store() {
        let backend = FakeBackend::new();
        let s = session("u1", "a@b.c");
        let repo = JobApplicationRepository::new(&backend, &s);

        // A pending failure would trip on any store access
        backend.fail_next("should not be reached");
        let apps = repo.sample();
        assert!(!apps.is_empty());
        assert!(apps.iter().all(|a| a.user_id == "u1"));
        assert!(repo.list().is_err());
    }
}
