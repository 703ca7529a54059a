use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::models::{
    ApplicationStatus, Author, JobApplication, Notification, NotificationCategory, Post,
};

fn fixed(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn job_applications(user_id: &str, now: DateTime<Utc>) -> Vec<JobApplication> {
    let entries = [
        ("s1", "Android Developer", "Google", "google", ApplicationStatus::InterviewScheduled, 12, "Onsite loop next week"),
        ("s2", "Software Engineer", "Microsoft", "microsoft", ApplicationStatus::UnderReview, 9, ""),
        ("s3", "Mobile Engineer", "Spotify", "spotify", ApplicationStatus::Submitted, 3, "Referred by a former teammate"),
        ("s4", "Kotlin Developer", "JetBrains", "jetbrains", ApplicationStatus::Offered, 30, "Offer expires Friday"),
        ("s5", "Frontend Engineer", "Shopify", "shopify", ApplicationStatus::Rejected, 45, ""),
    ];

    entries
        .into_iter()
        .map(|(id, title, company, company_id, status, days_ago, notes)| {
            let applied = now - Duration::days(days_ago);
            JobApplication {
                id: id.to_string(),
                user_id: user_id.to_string(),
                job_title: title.to_string(),
                company_name: company.to_string(),
                company_id: company_id.to_string(),
                status,
                applied_date: applied,
                last_updated: applied + Duration::days(days_ago / 2),
                notes: notes.to_string(),
                documents: Vec::new(),
            }
        })
        .collect()
}

pub fn posts() -> Vec<Post> {
    let author = |id: &str, name: &str, headline: &str| Author {
        id: id.to_string(),
        name: name.to_string(),
        headline: headline.to_string(),
    };

    vec![
        Post {
            id: "post-1".to_string(),
            author: author("u-sarah", "Sarah Chen", "Senior Recruiter at TechCorp"),
            content: "We're hiring Android engineers! Remote friendly, Kotlin and Compose experience a plus.".to_string(),
            posted_at: fixed(5, 14, 16),
            likes: 42,
            comments: 8,
            reposts: 5,
            liked: false,
        },
        Post {
            id: "post-2".to_string(),
            author: author("u-marcus", "Marcus Johnson", "Software Engineer"),
            content: "Three months of applications, one offer. Keep tracking everything and keep going.".to_string(),
            posted_at: fixed(5, 13, 10),
            likes: 128,
            comments: 23,
            reposts: 11,
            liked: true,
        },
        Post {
            id: "post-3".to_string(),
            author: author("u-sarah", "Sarah Chen", "Senior Recruiter at TechCorp"),
            content: "Tip: a recruiter will never ask you to pay for equipment or training up front. Report it.".to_string(),
            posted_at: fixed(5, 12, 9),
            likes: 310,
            comments: 41,
            reposts: 87,
            liked: false,
        },
        Post {
            id: "post-4".to_string(),
            author: author("u-priya", "Priya Patel", "Product Designer"),
            content: "Portfolio reviews this weekend for anyone prepping design interviews.".to_string(),
            posted_at: fixed(5, 10, 18),
            likes: 56,
            comments: 14,
            reposts: 2,
            liked: false,
        },
    ]
}

pub fn notifications(now: DateTime<Utc>) -> Vec<Notification> {
    vec![
        Notification {
            id: "n1".to_string(),
            title: "Interview scheduled".to_string(),
            message: "Your interview with Google is confirmed.".to_string(),
            timestamp: now - Duration::hours(2),
            read: false,
            category: NotificationCategory::InterviewReminder,
        },
        Notification {
            id: "n2".to_string(),
            title: "Application update".to_string(),
            message: "Microsoft moved your application to review.".to_string(),
            timestamp: now - Duration::days(1),
            read: false,
            category: NotificationCategory::ApplicationUpdate,
        },
        Notification {
            id: "n3".to_string(),
            title: "Possible scam".to_string(),
            message: "A company you viewed was flagged by other users.".to_string(),
            timestamp: now - Duration::days(2),
            read: true,
            category: NotificationCategory::FraudAlert,
        },
        Notification {
            id: "n4".to_string(),
            title: "New matches".to_string(),
            message: "5 new Android roles match your profile.".to_string(),
            timestamp: now - Duration::days(3),
            read: true,
            category: NotificationCategory::JobRecommendation,
        },
    ]
}
