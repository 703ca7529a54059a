use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub role: UserRole,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub reviews: Vec<String>,
    #[serde(default)]
    pub flagged_as_fake: bool,
}

impl Company {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_address(self, address: &str) -> Self {
        Self {
            address: Some(address.to_string()),
            ..self
        }
    }

    pub fn with_review(mut self, review: &str) -> Self {
        self.reviews.push(review.to_string());
        self
    }

    pub fn with_flagged_as_fake(self, flagged: bool) -> Self {
        Self {
            flagged_as_fake: flagged,
            ..self
        }
    }
}

/// Lifecycle of an application. Order of `ALL` is the order a typical
/// application moves through; transitions are not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    InterviewScheduled,
    Interviewed,
    Offered,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::Interviewed,
        ApplicationStatus::Offered,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::InterviewScheduled => "INTERVIEW_SCHEDULED",
            ApplicationStatus::Interviewed => "INTERVIEWED",
            ApplicationStatus::Offered => "OFFERED",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Withdrawn => "WITHDRAWN",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "Submitted",
            ApplicationStatus::UnderReview => "Under Review",
            ApplicationStatus::InterviewScheduled => "Interview Scheduled",
            ApplicationStatus::Interviewed => "Interviewed",
            ApplicationStatus::Offered => "Offered",
            ApplicationStatus::Accepted => "Accepted",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Withdrawn => "Withdrawn",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
            .collect();

        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                let names: Vec<_> = ApplicationStatus::ALL
                    .iter()
                    .map(|s| s.as_str().to_lowercase().replace('_', "-"))
                    .collect();
                anyhow!("Unknown status '{}'. Available: {}", s, names.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub job_title: String,
    pub company_name: String,
    #[serde(default)]
    pub company_id: String,
    pub status: ApplicationStatus,
    pub applied_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub documents: Vec<String>,
}

impl JobApplication {
    pub fn new(job_title: &str, company_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            user_id: String::new(),
            job_title: job_title.to_string(),
            company_name: company_name.to_string(),
            company_id: String::new(),
            status: ApplicationStatus::Submitted,
            applied_date: now,
            last_updated: now,
            notes: String::new(),
            documents: Vec::new(),
        }
    }

    pub fn with_status(self, status: ApplicationStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            last_updated: now,
            ..self
        }
    }

    pub fn with_notes(self, notes: &str, now: DateTime<Utc>) -> Self {
        Self {
            notes: notes.to_string(),
            last_updated: now,
            ..self
        }
    }

    pub fn with_document(mut self, url: &str, now: DateTime<Utc>) -> Self {
        self.documents.push(url.to_string());
        self.last_updated = now;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationCategory {
    ApplicationUpdate,
    InterviewReminder,
    JobRecommendation,
    FraudAlert,
    System,
}

impl NotificationCategory {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationCategory::ApplicationUpdate => "application",
            NotificationCategory::InterviewReminder => "interview",
            NotificationCategory::JobRecommendation => "recommendation",
            NotificationCategory::FraudAlert => "fraud",
            NotificationCategory::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    pub category: NotificationCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub headline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: Author,
    pub content: String,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub reposts: u32,
    #[serde(default)]
    pub liked: bool,
}

impl Post {
    pub fn toggle_like(self) -> Self {
        if self.liked {
            Self {
                liked: false,
                likes: self.likes.saturating_sub(1),
                ..self
            }
        } else {
            Self {
                liked: true,
                likes: self.likes.saturating_add(1),
                ..self
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedCompany {
    #[serde(default)]
    pub id: String,
    pub company_id: String,
    pub company_name: String,
    #[serde(default)]
    pub reason: String,
    pub flagged_by: String,
    pub flagged_at: DateTime<Utc>,
}

/// A signed-in identity as handed back by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        // Treat tokens within a minute of expiry as already stale
        now + chrono::Duration::seconds(60) >= self.expires_at
    }
}
