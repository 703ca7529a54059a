use anyhow::{anyhow, Result};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::backend::{from_document, new_document_id, to_fields, DocumentStore, Functions};
use crate::models::{AuthSession, Company, FlaggedCompany};

pub const FLAGGED_COMPANIES: &str = "flaggedCompanies";
pub const DETECT_FRAUD: &str = "detectFraud";

pub struct FraudRepository<'a> {
    functions: &'a dyn Functions,
    store: &'a dyn DocumentStore,
    session: &'a AuthSession,
}

impl<'a> FraudRepository<'a> {
    pub fn new(
        functions: &'a dyn Functions,
        store: &'a dyn DocumentStore,
        session: &'a AuthSession,
    ) -> Self {
        Self {
            functions,
            store,
            session,
        }
    }

    /// Asks the remote classifier whether the company looks fake.
    pub fn classify(&self, company: &Company) -> Result<bool> {
        let payload = json!({
            "name": company.name,
            "address": company.address.clone().unwrap_or_default(),
            "reviews": company.reviews,
        });

        let response = self
            .functions
            .call(self.session, DETECT_FRAUD, &payload)
            .inspect_err(|e| warn!(company = %company.name, error = %e, "fraud check failed"))?;

        let verdict = read_verdict(&response)
            .inspect_err(|e| warn!(company = %company.name, error = %e, "unexpected fraud check response"))?;
        info!(company = %company.name, is_fraud = verdict, "fraud check complete");
        Ok(verdict)
    }

    /// Classifies and returns the company record marked with the verdict.
    pub fn classify_and_mark(&self, company: Company) -> Result<Company> {
        let verdict = self.classify(&company)?;
        Ok(company.with_flagged_as_fake(verdict))
    }

    /// Appends a manual flag to the shared flagged-companies collection.
    pub fn flag(&self, company: &Company, reason: &str) -> Result<FlaggedCompany> {
        let flagged = FlaggedCompany {
            id: new_document_id(),
            company_id: company.id.clone(),
            company_name: company.name.clone(),
            reason: reason.to_string(),
            flagged_by: self.session.uid.clone(),
            flagged_at: Utc::now(),
        };
        self.store
            .set(self.session, FLAGGED_COMPANIES, &flagged.id, &to_fields(&flagged)?)
            .inspect_err(|e| warn!(company = %company.name, error = %e, "failed to flag company"))?;
        info!(company = %company.name, "company flagged");
        Ok(flagged)
    }

    /// All flags, newest first.
    pub fn list_flagged(&self) -> Result<Vec<FlaggedCompany>> {
        let docs = self
            .store
            .list(self.session, FLAGGED_COMPANIES)
            .inspect_err(|e| warn!(error = %e, "failed to list flagged companies"))?;
        let mut flagged = docs
            .into_iter()
            .map(from_document::<FlaggedCompany>)
            .collect::<Result<Vec<_>>>()?;
        flagged.sort_by(|a, b| b.flagged_at.cmp(&a.flagged_at));
        Ok(flagged)
    }
}

fn read_verdict(response: &Value) -> Result<bool> {
    let map = response
        .as_object()
        .ok_or_else(|| anyhow!("{} returned a non-object response: {}", DETECT_FRAUD, response))?;
    match map.get("isFraud") {
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(anyhow!("{} returned non-boolean isFraud: {}", DETECT_FRAUD, other)),
        None => Err(anyhow!("{} response is missing isFraud", DETECT_FRAUD)),
    }
}
