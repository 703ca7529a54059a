mod applications;
mod auth;
mod backend;
mod config;
mod documents;
mod feed;
mod firebase;
mod fraud;
mod models;
mod sample;
mod telemetry;
#[cfg(test)]
mod testing;

use anyhow::{anyhow, Result};
use applications::JobApplicationRepository;
use auth::AuthRepository;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use config::{AppPaths, BackendConfig};
use documents::DocumentRepository;
use feed::FeedStore;
use firebase::Firebase;
use fraud::FraudRepository;
use models::{ApplicationStatus, Author, Company, JobApplication, Post};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications, share updates, and check employers for fraud")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup {
        email: String,
        password: String,

        /// Display name shown on your profile
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Sign in
    Login { email: String, password: String },

    /// Sign out and forget the saved session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Manage your account
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Manage job applications
    Apps {
        #[command(subcommand)]
        command: AppCommands,
    },

    /// Manage uploaded documents
    Docs {
        #[command(subcommand)]
        command: DocCommands,
    },

    /// Check employers for fraud
    Fraud {
        #[command(subcommand)]
        command: FraudCommands,
    },

    /// Browse and post to the feed
    Feed {
        #[command(subcommand)]
        command: FeedCommands,
    },

    /// Show notifications
    Notifications {
        /// Only unread notifications
        #[arg(short, long)]
        unread: bool,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Email a password reset link
    ResetPassword { email: String },

    /// Email a verification link to the signed-in address
    Verify,

    /// Change the sign-in email
    Email {
        new_email: String,

        /// Current password, to reauthenticate
        #[arg(short, long)]
        password: String,
    },

    /// Change the password
    Password {
        new_password: String,

        /// Current password, to reauthenticate
        #[arg(short, long)]
        current: String,
    },

    /// Change the display name
    Name { name: String },

    /// Permanently delete the account
    Delete {
        /// Current password, to reauthenticate
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum AppCommands {
    /// List your applications
    List {
        /// Filter by status (submitted, under-review, interview-scheduled, ...)
        #[arg(short, long)]
        status: Option<String>,

        /// Show the built-in sample applications instead of stored ones
        #[arg(long)]
        sample: bool,
    },

    /// Show one application
    Show { id: String },

    /// Record a new application
    Add {
        /// Job title
        title: String,

        /// Company name
        #[arg(short, long)]
        company: String,

        /// Company identifier
        #[arg(long, default_value = "")]
        company_id: String,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Change an application's status
    Status { id: String, status: String },

    /// Replace an application's notes
    Note { id: String, notes: String },

    /// Upload a document and attach it to an application
    Attach { id: String, file: PathBuf },

    /// Delete an application
    Delete { id: String },
}

#[derive(Subcommand)]
enum DocCommands {
    /// Upload a file and print its URL
    Upload { file: PathBuf },
}

#[derive(Subcommand)]
enum FraudCommands {
    /// Ask the fraud classifier about a company
    Check {
        /// Company name
        name: String,

        /// Company identifier
        #[arg(long, default_value = "")]
        id: String,

        #[arg(short, long)]
        address: Option<String>,

        /// A review of the company (repeatable)
        #[arg(short, long = "review")]
        reviews: Vec<String>,

        /// Flag the company if the classifier says it is fake
        #[arg(long)]
        flag: bool,
    },

    /// Flag a company as fake
    Flag {
        /// Company name
        name: String,

        /// Company identifier
        #[arg(long, default_value = "")]
        id: String,

        #[arg(short, long, default_value = "")]
        reason: String,
    },

    /// List flagged companies
    List,
}

#[derive(Subcommand)]
enum FeedCommands {
    /// Show the feed
    List {
        /// Only posts by this author id
        #[arg(short, long)]
        author: Option<String>,
    },

    /// Post to the feed
    Post { content: String },

    /// Like or unlike a post
    Like { id: String },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init(&config::log_level())?;

    let cli = Cli::parse();
    let paths = AppPaths::default_location();

    match cli.command {
        Commands::Feed { command } => run_feed(&paths, command),
        Commands::Notifications { unread } => {
            print_notifications(unread);
            Ok(())
        }
        command => run_remote(&paths, command),
    }
}

fn run_remote(paths: &AppPaths, command: Commands) -> Result<()> {
    let firebase = Firebase::new(BackendConfig::from_env()?)?;
    let mut auth = AuthRepository::new(&firebase, paths.load_session()?);
    if auth.refresh_if_expired() {
        paths.save_session(auth.session())?;
    }

    match command {
        Commands::Signup {
            email,
            password,
            name,
        } => {
            let created = auth
                .sign_up(&firebase, &email, &password, name.as_deref())
                .map(|s| format!("Created account for {} ({})", s.email, s.uid));
            // The account may exist even when naming it failed
            paths.save_session(auth.session())?;
            println!("{}", created?);
        }

        Commands::Login { email, password } => {
            let session = auth.sign_in(&email, &password)?;
            println!("Signed in as {}", session.email);
            paths.save_session(auth.session())?;
        }

        Commands::Logout => {
            match auth.sign_out() {
                Some(session) => println!("Signed out {}", session.email),
                None => println!("Not signed in."),
            }
            paths.save_session(None)?;
        }

        Commands::Whoami => {
            let user = auth.current_user(&firebase)?;
            println!("User: {}", user.id);
            println!("Email: {}", user.email);
            if !user.display_name.is_empty() {
                println!("Name: {}", user.display_name);
            }
            println!("Role: {}", if user.is_admin() { "admin" } else { "user" });
        }

        Commands::Account { command } => run_account(paths, &mut auth, command)?,

        Commands::Apps { command } => {
            let session = auth.require_session()?;
            run_apps(&firebase, session, command)?;
        }

        Commands::Docs {
            command: DocCommands::Upload { file },
        } => {
            let session = auth.require_session()?;
            let url = DocumentRepository::new(&firebase, session).upload(&file)?;
            println!("Uploaded {}", file.display());
            println!("{}", url);
        }

        Commands::Fraud { command } => {
            let session = auth.require_session()?;
            run_fraud(&firebase, session, command)?;
        }

        Commands::Feed { .. } | Commands::Notifications { .. } => {
            return Err(anyhow!("Local command routed to the backend"));
        }
    }

    Ok(())
}

fn run_account(paths: &AppPaths, auth: &mut AuthRepository, command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::ResetPassword { email } => {
            auth.send_password_reset(&email)?;
            println!("Password reset email sent to {}", email);
        }

        AccountCommands::Verify => {
            auth.send_email_verification()?;
            println!("Verification email sent.");
        }

        AccountCommands::Email {
            new_email,
            password,
        } => {
            auth.reauthenticate(&password)?;
            let session = auth.update_email(&new_email)?;
            println!("Email changed to {}", session.email);
            paths.save_session(auth.session())?;
        }

        AccountCommands::Password {
            new_password,
            current,
        } => {
            auth.reauthenticate(&current)?;
            auth.update_password(&new_password)?;
            println!("Password changed.");
            paths.save_session(auth.session())?;
        }

        AccountCommands::Name { name } => {
            auth.update_display_name(&name)?;
            println!("Display name set to '{}'", name);
            paths.save_session(auth.session())?;
        }

        AccountCommands::Delete { password } => {
            auth.reauthenticate(&password)?;
            auth.delete_account()?;
            paths.save_session(None)?;
            println!("Account deleted.");
        }
    }
    Ok(())
}

fn run_apps(firebase: &Firebase, session: &models::AuthSession, command: AppCommands) -> Result<()> {
    let repo = JobApplicationRepository::new(firebase, session);

    match command {
        AppCommands::List { status, sample } => {
            let status = status
                .as_deref()
                .map(str::parse::<ApplicationStatus>)
                .transpose()?;
            let apps = if sample { repo.sample() } else { repo.list()? };
            let apps: Vec<_> = apps
                .into_iter()
                .filter(|a| status.is_none_or(|s| a.status == s))
                .collect();

            if apps.is_empty() {
                println!("No applications found.");
            } else {
                println!("{:<22} {:<20} {:<28} {:<20} {:>10}", "ID", "STATUS", "TITLE", "COMPANY", "APPLIED");
                println!("{}", "-".repeat(104));
                for app in apps {
                    println!(
                        "{:<22} {:<20} {:<28} {:<20} {:>10}",
                        app.id,
                        app.status.label(),
                        truncate(&app.job_title, 26),
                        truncate(&app.company_name, 18),
                        app.applied_date.format("%Y-%m-%d")
                    );
                }
            }
        }

        AppCommands::Show { id } => match repo.get(&id)? {
            Some(app) => print_application(&app),
            None => println!("Application '{}' not found.", id),
        },

        AppCommands::Add {
            title,
            company,
            company_id,
            notes,
        } => {
            let draft = JobApplication {
                company_id,
                notes: notes.unwrap_or_default(),
                ..JobApplication::new(&title, &company, Utc::now())
            };
            let stored = repo.add(draft)?;
            println!("Added application {} ({} at {})", stored.id, stored.job_title, stored.company_name);
        }

        AppCommands::Status { id, status } => {
            let status: ApplicationStatus = status.parse()?;
            let app = repo.get_required(&id)?.with_status(status, Utc::now());
            let stored = repo.update(app)?;
            println!("Application {} is now {}", stored.id, stored.status);
        }

        AppCommands::Note { id, notes } => {
            let app = repo.get_required(&id)?.with_notes(&notes, Utc::now());
            repo.update(app)?;
            println!("Notes updated for {}", id);
        }

        AppCommands::Attach { id, file } => {
            let app = repo.get_required(&id)?;
            let url = DocumentRepository::new(firebase, session).upload(&file)?;
            let stored = repo.update(app.with_document(&url, Utc::now()))?;
            println!("Attached {} to {} ({} document(s))", file.display(), stored.id, stored.documents.len());
        }

        AppCommands::Delete { id } => {
            repo.delete(&id)?;
            println!("Deleted application {}", id);
        }
    }
    Ok(())
}

fn run_fraud(firebase: &Firebase, session: &models::AuthSession, command: FraudCommands) -> Result<()> {
    let repo = FraudRepository::new(firebase, firebase, session);

    match command {
        FraudCommands::Check {
            name,
            id,
            address,
            reviews,
            flag,
        } => {
            let mut company = Company::new(&id, &name);
            if let Some(address) = &address {
                company = company.with_address(address);
            }
            for review in &reviews {
                company = company.with_review(review);
            }
            let company = repo.classify_and_mark(company)?;
            if company.flagged_as_fake {
                println!("'{}' looks FAKE.", company.name);
                if flag {
                    repo.flag(&company, "Flagged by fraud check")?;
                    println!("Flag recorded.");
                }
            } else {
                println!("'{}' looks legitimate.", company.name);
            }
        }

        FraudCommands::Flag { name, id, reason } => {
            let flagged = repo.flag(&Company::new(&id, &name), &reason)?;
            println!("Flagged '{}' ({})", flagged.company_name, flagged.id);
        }

        FraudCommands::List => {
            let flagged = repo.list_flagged()?;
            if flagged.is_empty() {
                println!("No flagged companies.");
            } else {
                println!("{:<28} {:<30} {:<17}", "COMPANY", "REASON", "FLAGGED");
                println!("{}", "-".repeat(77));
                for f in flagged {
                    println!(
                        "{:<28} {:<30} {:<17}",
                        truncate(&f.company_name, 26),
                        truncate(&f.reason, 28),
                        f.flagged_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_feed(paths: &AppPaths, command: FeedCommands) -> Result<()> {
    let feed_path = paths.feed_file();
    let feed = FeedStore::load_or_seed(&feed_path)?;

    match command {
        FeedCommands::List { author } => {
            let posts = match author {
                Some(author_id) => feed.by_author(&author_id)?,
                None => feed.posts()?,
            };
            if posts.is_empty() {
                println!("No posts.");
            } else {
                println!("{} post(s)\n", posts.len());
            }
            for post in posts {
                print_post(&post);
            }
        }

        FeedCommands::Post { content } => {
            let author = match paths.load_session()? {
                Some(session) => Author {
                    id: session.uid,
                    name: session.display_name.unwrap_or(session.email),
                    headline: String::new(),
                },
                None => Author {
                    id: "local".to_string(),
                    name: "You".to_string(),
                    headline: String::new(),
                },
            };
            let post = Post {
                id: backend::new_document_id(),
                author,
                content,
                posted_at: Utc::now(),
                likes: 0,
                comments: 0,
                reposts: 0,
                liked: false,
            };
            println!("Posted {}", publish(&feed, &feed_path, post)?);
        }

        FeedCommands::Like { id } => {
            let post = feed.toggle_like(&id)?;
            println!(
                "{} post {} ({} likes)",
                if post.liked { "Liked" } else { "Unliked" },
                post.id,
                post.likes
            );
            feed.save(&feed_path)?;
        }
    }
    Ok(())
}

/// Adds the post and persists the feed, returning the new post's id.
fn publish(feed: &FeedStore, path: &Path, post: Post) -> Result<String> {
    let id = post.id.clone();
    feed.add(post)?;
    feed.save(path)?;
    Ok(id)
}

fn print_application(app: &JobApplication) {
    println!("Application {}", app.id);
    println!("Title: {}", app.job_title);
    println!("Company: {}", app.company_name);
    if app.status.is_final() {
        println!("Status: {} (closed)", app.status);
    } else {
        println!("Status: {}", app.status);
    }
    println!("Applied: {}", app.applied_date.format("%Y-%m-%d"));
    println!("Updated: {}", app.last_updated.format("%Y-%m-%d %H:%M"));
    if !app.documents.is_empty() {
        println!("Documents:");
        for doc in &app.documents {
            println!("  {}", doc);
        }
    }
    if !app.notes.is_empty() {
        println!("\n--- Notes ---\n{}", app.notes);
    }
}

fn print_post(post: &Post) {
    let heart = if post.liked { "♥" } else { "♡" };
    println!("{} · {}  [{}]", post.author.name, time_ago(post.posted_at, Utc::now()), post.id);
    if !post.author.headline.is_empty() {
        println!("{}", post.author.headline);
    }
    for line in textwrap::fill(&post.content, 70).lines() {
        println!("  {}", line);
    }
    println!(
        "  {} {}   {} comments   {} reposts\n",
        heart, post.likes, post.comments, post.reposts
    );
}

fn print_notifications(unread_only: bool) {
    let now = Utc::now();
    let notifications: Vec<_> = sample::notifications(now)
        .into_iter()
        .filter(|n| !unread_only || !n.read)
        .collect();

    if notifications.is_empty() {
        println!("No notifications.");
        return;
    }
    for n in notifications {
        let marker = if n.read { " " } else { "*" };
        println!(
            "{} [{:<14}] {:<22} {:>8}  {}",
            marker,
            n.category.label(),
            truncate(&n.title, 20),
            time_ago(n.timestamp, now),
            n.message
        );
    }
}

fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    if elapsed.num_days() > 0 {
        format!("{}d ago", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}m ago", elapsed.num_minutes())
    } else {
        "just now".to_string()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
