//! Command-line interface and command handlers
//!
//! Every handler that talks to Gmail takes the remote service as
//! `&dyn GmailApi`, so the command logic can be exercised against a
//! substitute implementation in tests. Recipient validation always happens
//! before the first remote call.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::attachments;
use crate::auth::{Authenticator, Scope};
use crate::client::{GmailApi, HeaderSet};
use crate::error::{GmailError, Result};
use crate::mime::{self, validate_email};
use crate::models::OutgoingMail;
use crate::output;
use crate::query::SearchFilters;
use crate::reply;

#[derive(Parser, Debug)]
#[command(name = "gmail-agent")]
#[command(version)]
#[command(about = "Search, read, and send Gmail from the command line", long_about = None)]
pub struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check setup status
    Setup {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Authenticate with Gmail
    Auth {
        /// Manual copy/paste flow for headless or remote machines
        #[arg(long)]
        manual: bool,
    },

    /// View or change the API scope
    Scope {
        /// Set a new scope (readonly, modify, full)
        #[arg(long)]
        set: Option<String>,
    },

    /// Search emails
    Search(SearchArgs),

    /// Download all attachments of a message
    Download(DownloadArgs),

    /// List labels
    Labels {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send an email
    Send(SendArgs),

    /// Create an email draft
    Draft(SendArgs),

    /// Reply to an email
    Reply(ReplyArgs),
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query (Gmail syntax)
    #[arg(default_value = "")]
    pub query: String,

    /// Filter by sender
    #[arg(long)]
    pub from: Option<String>,

    /// Filter by recipient
    #[arg(long)]
    pub to: Option<String>,

    /// Filter by subject
    #[arg(long)]
    pub subject: Option<String>,

    /// Filter by label
    #[arg(long)]
    pub label: Option<String>,

    /// Messages after date (YYYY/MM/DD)
    #[arg(long)]
    pub after: Option<String>,

    /// Messages before date (YYYY/MM/DD)
    #[arg(long)]
    pub before: Option<String>,

    /// Only messages with attachments
    #[arg(long)]
    pub has_attachment: bool,

    /// Only unread messages
    #[arg(long)]
    pub unread: bool,

    /// Only starred messages
    #[arg(long)]
    pub starred: bool,

    /// Maximum results
    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Include full message body
    #[arg(long)]
    pub full: bool,

    /// Include attachment info
    #[arg(long)]
    pub attachments: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    fn filters(&self) -> SearchFilters {
        SearchFilters {
            query: self.query.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            subject: self.subject.clone(),
            label: self.label.clone(),
            after: self.after.clone(),
            before: self.before.clone(),
            has_attachment: self.has_attachment,
            unread: self.unread,
            starred: self.starred,
        }
    }
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Message ID
    pub message_id: String,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Recipient email address
    #[arg(long)]
    pub to: String,

    /// Email subject
    #[arg(long)]
    pub subject: String,

    /// Email body
    #[arg(long)]
    pub body: String,

    /// CC recipients (comma-separated)
    #[arg(long)]
    pub cc: Option<String>,

    /// BCC recipients (comma-separated)
    #[arg(long)]
    pub bcc: Option<String>,

    /// Body is HTML (default: plain text)
    #[arg(long)]
    pub html: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ReplyArgs {
    /// Message ID to reply to
    pub message_id: String,

    /// Reply body
    #[arg(long)]
    pub body: String,

    /// Body is HTML (default: plain text)
    #[arg(long)]
    pub html: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SetupStatus {
    configured: bool,
    scope: String,
    token_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Report whether the client secret is in place and a usable token is cached
pub async fn cmd_setup(auth: &Authenticator, json: bool) -> Result<()> {
    auth.paths().ensure_dir().await?;

    let configured = auth.is_configured();
    let scope = auth.current_scope().await;
    let token_valid = auth.load_token().await.is_some_and(|t| t.is_valid());

    let message = if !configured {
        Some(format!(
            "credentials.json not found. Save your OAuth client credentials to {} and run 'gmail-agent auth'.",
            auth.paths().client_secret_file().display()
        ))
    } else if token_valid {
        Some("Gmail API configured and authenticated".to_string())
    } else {
        Some("Credentials found but not authenticated. Run: gmail-agent auth".to_string())
    };

    let status = SetupStatus {
        configured,
        scope: scope.to_string(),
        token_valid,
        message,
    };

    if json {
        println!("{}", output::to_json(&status)?);
        return Ok(());
    }

    if !configured {
        println!("Gmail API not configured. To set up:\n");
        println!(
            "1. Save your OAuth client credentials to: {}",
            auth.paths().client_secret_file().display()
        );
        println!("\n   Expected file shape:");
        println!("   {{");
        println!("     \"installed\": {{");
        println!("       \"client_id\": \"YOUR_CLIENT_ID\",");
        println!("       \"client_secret\": \"YOUR_CLIENT_SECRET\",");
        println!("       \"auth_uri\": \"https://accounts.google.com/o/oauth2/auth\",");
        println!("       \"token_uri\": \"https://oauth2.googleapis.com/token\",");
        println!("       \"redirect_uris\": [\"http://localhost\"]");
        println!("     }}");
        println!("   }}");
        println!("\n2. Run: gmail-agent auth");
        println!(
            "\nCurrent scope: {scope} (change with 'gmail-agent scope --set <scope>')"
        );
    } else {
        println!(
            "Status: {}",
            if token_valid { "Ready" } else { "Needs authentication" }
        );
        println!("Scope: {scope}");
        if !token_valid {
            println!("\nRun: gmail-agent auth");
        }
    }
    Ok(())
}

/// Force a fresh full authorization flow
pub async fn cmd_auth(auth: &Authenticator, manual: bool) -> Result<()> {
    if !auth.is_configured() {
        return Err(GmailError::NotConfigured);
    }

    // Drop any cached token so the flow always runs.
    auth.force_reauth().await?;
    auth.acquire(manual).await?;

    println!("Authentication successful!");
    println!("Scope: {}", auth.current_scope().await);
    Ok(())
}

/// View or change the persisted scope setting
pub async fn cmd_scope(auth: &Authenticator, set: Option<&str>) -> Result<()> {
    match set {
        Some(value) => {
            let scope: Scope = value.parse()?;
            auth.set_scope(scope).await?;
            println!("Scope set to: {scope}");
            println!("Token cleared; re-authentication required.");
            println!("Run: gmail-agent auth");
        }
        None => {
            let current = auth.current_scope().await;
            println!("Current scope: {current}");
            println!("\nAvailable scopes:");
            for scope in Scope::ALL {
                let marker = if scope == current { " (current)" } else { "" };
                println!("  {scope}{marker}: {}", scope.scope_urls()[0]);
            }
        }
    }
    Ok(())
}

/// Search messages and print the shaped results
pub async fn cmd_search(api: &dyn GmailApi, args: &SearchArgs) -> Result<()> {
    let mut query = args.filters().build();
    if query.is_empty() {
        query = "in:inbox".to_string();
    }
    debug!("Searching with query: {query}");

    let refs = api.list_messages(&query, args.limit).await?;

    let mut messages = Vec::with_capacity(refs.len());
    for msg_ref in refs {
        let msg = if args.full {
            api.get_message_full(&msg_ref.id).await?
        } else {
            api.get_message_metadata(&msg_ref.id, HeaderSet::Display).await?
        };
        let mut details = mime::extract_message(&msg, args.full);
        if !args.attachments {
            details.attachments.clear();
        }
        messages.push(details);
    }

    if args.json {
        println!("{}", output::to_json(&messages)?);
    } else {
        println!("{}", output::messages_markdown(&messages, args.full));
    }
    Ok(())
}

#[derive(Serialize)]
struct DownloadedAttachment {
    filename: String,
    path: String,
    size: u64,
}

/// Download every attachment of a message into the output directory
pub async fn cmd_download(api: &dyn GmailApi, args: &DownloadArgs) -> Result<()> {
    let msg = api.get_message_full(&args.message_id).await?;
    let found = msg
        .payload
        .as_ref()
        .map(mime::extract_attachments)
        .unwrap_or_default();

    if found.is_empty() {
        println!("No attachments found in this message.");
        return Ok(());
    }

    let dir = match &args.output {
        Some(dir) => dir.clone(),
        None => attachments::default_download_dir()?,
    };
    tokio::fs::create_dir_all(&dir).await?;

    let mut downloaded = Vec::new();
    for attachment in &found {
        let Some(attachment_id) = attachment.attachment_id.as_deref() else {
            continue;
        };
        let payload = api.get_attachment(&args.message_id, attachment_id).await?;
        let data = payload.data.ok_or_else(|| {
            GmailError::InvalidFormat(format!("attachment {} has no payload", attachment.filename))
        })?;
        let path = attachments::save_attachment(&data, &dir, &attachment.filename).await?;
        downloaded.push(DownloadedAttachment {
            filename: attachment.filename.clone(),
            path: path.display().to_string(),
            size: attachment.size,
        });
    }

    if args.json {
        println!("{}", output::to_json(&json!({ "downloaded": downloaded }))?);
    } else {
        println!(
            "Downloaded {} attachment(s) to {}:",
            downloaded.len(),
            dir.display()
        );
        for item in &downloaded {
            println!("  - {} ({} bytes)", item.filename, item.size);
        }
    }
    Ok(())
}

/// List labels
pub async fn cmd_labels(api: &dyn GmailApi, json: bool) -> Result<()> {
    let labels = api.list_labels().await?;

    if json {
        println!("{}", output::to_json(&labels)?);
    } else {
        println!("{}", output::labels_markdown(&labels));
    }
    Ok(())
}

/// Send an email
pub async fn cmd_send(api: &dyn GmailApi, args: &SendArgs) -> Result<()> {
    validate_recipients(args)?;

    let raw = mime::build_message(&outgoing_from_args(args));
    let result = api.send_message(&raw).await?;

    if args.json {
        println!("{}", output::to_json(&result)?);
    } else {
        println!("Email sent successfully!");
        println!("Message ID: {}", result.id);
        if let Some(thread_id) = &result.thread_id {
            println!("Thread ID: {thread_id}");
        }
        print_envelope_summary(args);
    }
    Ok(())
}

/// Create a draft
pub async fn cmd_draft(api: &dyn GmailApi, args: &SendArgs) -> Result<()> {
    validate_recipients(args)?;

    let raw = mime::build_message(&outgoing_from_args(args));
    let draft = api.create_draft(&raw).await?;

    if args.json {
        println!("{}", output::to_json(&draft)?);
    } else {
        println!("Draft created successfully!");
        println!("Draft ID: {}", draft.id);
        println!("Message ID: {}", draft.message.id);
        print_envelope_summary(args);
    }
    Ok(())
}

/// Reply to a message, preserving conversation threading
pub async fn cmd_reply(api: &dyn GmailApi, args: &ReplyArgs) -> Result<()> {
    let original = api
        .get_message_metadata(&args.message_id, HeaderSet::Threading)
        .await?;
    let ctx = reply::derive_reply_context(&original);

    if !validate_email(&ctx.to) {
        return Err(GmailError::InvalidRecipient(ctx.to));
    }

    let mail = OutgoingMail {
        to: ctx.to.clone(),
        subject: ctx.subject.clone(),
        body: args.body.clone(),
        html: args.html,
        in_reply_to: ctx.message_id.clone(),
        references: ctx.references.clone(),
        thread_id: ctx.thread_id.clone(),
        ..Default::default()
    };
    let result = api.send_message(&mime::build_message(&mail)).await?;

    if args.json {
        println!("{}", output::to_json(&result)?);
    } else {
        println!("Reply sent successfully!");
        println!("Message ID: {}", result.id);
        if let Some(thread_id) = &result.thread_id {
            println!("Thread ID: {thread_id}");
        }
        println!("To: {}", ctx.to);
        println!("Subject: {}", ctx.subject);
    }
    Ok(())
}

fn outgoing_from_args(args: &SendArgs) -> OutgoingMail {
    OutgoingMail {
        to: args.to.clone(),
        subject: args.subject.clone(),
        body: args.body.clone(),
        cc: args.cc.clone().unwrap_or_default(),
        bcc: args.bcc.clone().unwrap_or_default(),
        html: args.html,
        ..Default::default()
    }
}

/// Reject malformed recipients before anything touches the network
fn validate_recipients(args: &SendArgs) -> Result<()> {
    if !validate_email(&args.to) {
        return Err(GmailError::InvalidRecipient(args.to.clone()));
    }
    for list in [&args.cc, &args.bcc] {
        if let Some(list) = list.as_deref().filter(|l| !l.is_empty()) {
            for address in list.split(',') {
                if !validate_email(address) {
                    return Err(GmailError::InvalidRecipient(address.trim().to_string()));
                }
            }
        }
    }
    Ok(())
}

fn print_envelope_summary(args: &SendArgs) {
    println!("To: {}", args.to);
    if let Some(cc) = args.cc.as_deref().filter(|c| !c.is_empty()) {
        println!("CC: {cc}");
    }
    if let Some(bcc) = args.bcc.as_deref().filter(|b| !b.is_empty()) {
        println!("BCC: {bcc}");
    }
    println!("Subject: {}", args.subject);
}
