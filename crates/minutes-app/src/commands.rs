//! Subcommand implementations.

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use tokio::io::{AsyncBufReadExt, BufReader};

use minutes_api::{ApiClient, ApiError, MeetingInput, MeetingSource};
use minutes_chat::{ChatError, ConversationEngine, Exchange};
use minutes_core::{MeetingDetail, MeetingSummary};
use minutes_session::{SessionManager, SessionStatus};

use crate::cli::{self, Command, ProcessSource};

const LOAD_FAILED: &str = "Failed to load conversation";
const PROCESS_FAILED: &str = "Processing failed";
const HISTORY_FAILED: &str = "Failed to load meetings";

/// Everything a command needs, built once in `main`.
pub struct App {
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
}

impl App {
    pub async fn run(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Login { email, password } => self.login(&email, password).await,
            Command::Register { email, password } => self.register(&email, password).await,
            Command::Logout => {
                self.session.logout();
                println!("Logged out.");
                Ok(())
            }
            Command::Whoami => self.whoami(),
            Command::Ask {
                question,
                meeting,
                date,
            } => self.ask(&question.join(" "), meeting, date).await,
            Command::Chat => self.chat().await,
            Command::History => self.history().await,
            Command::Show { id } => self.show(id).await,
            Command::Process {
                source,
                title,
                date,
            } => self.process(source, title, date).await,
            Command::Memories => self.memories().await,
        }
    }

    // -- Account --

    async fn login(&self, email: &str, password: Option<String>) -> anyhow::Result<()> {
        let password = password_or_prompt(password)?;
        let user = self.session.login(email, &password).await?;
        println!("Logged in as {}.", user.email);
        Ok(())
    }

    async fn register(&self, email: &str, password: Option<String>) -> anyhow::Result<()> {
        let password = password_or_prompt(password)?;
        let user = self.session.register(email, &password).await?;
        println!(
            "Account created for {}. Run `minutes login {}` to sign in.",
            user.email, user.email
        );
        Ok(())
    }

    fn whoami(&self) -> anyhow::Result<()> {
        self.require_credential()?;
        let Some(user) = self.session.identity() else {
            bail!("Not logged in");
        };
        println!("{} (id {})", user.email, user.id);
        if let Some(created) = user.created_at {
            println!("Member since {}", created.format("%Y-%m-%d"));
        }
        Ok(())
    }

    // -- Questions --

    async fn ask(
        &self,
        question: &str,
        meeting: Option<i64>,
        date: Option<NaiveDate>,
    ) -> anyhow::Result<()> {
        self.require_credential()?;
        let engine = self.engine();
        if date.is_some() && meeting.is_some() {
            // The catalog decides whether the meeting falls on the date.
            engine.refresh_meetings().await;
        }
        engine.set_scope(meeting, date);
        if let (Some(requested), None) = (meeting, engine.scope().meeting_id) {
            println!("Meeting {} is not from that day; asking across the day instead.", requested);
        }

        match engine.ask(question).await {
            Ok(Some(exchange)) => {
                print_answer(&exchange);
                Ok(())
            }
            Ok(None) => bail!("Question is empty"),
            Err(e) => Err(chat_failure(e)),
        }
    }

    async fn chat(&self) -> anyhow::Result<()> {
        self.require_credential()?;
        let engine = self.engine();
        engine.refresh_meetings().await;

        println!("Ask about your meetings. Type /help for commands, /quit to leave.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt(&scope_label(&engine))?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('/') {
                let (name, arg) = match rest.split_once(char::is_whitespace) {
                    Some((name, arg)) => (name, arg.trim()),
                    None => (rest, ""),
                };
                match name {
                    "quit" | "exit" => break,
                    "help" => print_chat_help(),
                    "date" => chat_set_date(&engine, arg),
                    "meeting" => chat_set_meeting(&engine, arg),
                    "clear" => {
                        engine.clear_scope();
                        println!("Scope cleared.");
                    }
                    "dates" => {
                        let dates = engine.available_dates();
                        if dates.is_empty() {
                            println!("No meetings yet.");
                        }
                        for date in dates {
                            println!("  {}", date);
                        }
                    }
                    "meetings" => {
                        for meeting in engine.meeting_options() {
                            print_meeting_row(&meeting);
                        }
                    }
                    "refresh" => engine.refresh_meetings().await,
                    "transcript" => print!("{}", engine.transcript()),
                    other => println!("Unknown command /{}. Type /help.", other),
                }
                continue;
            }

            match engine.ask(line).await {
                Ok(Some(exchange)) => print_answer(&exchange),
                Ok(None) => {}
                Err(ChatError::RequestFailed(message)) => println!("! {}", message),
                Err(e) => return Err(chat_failure(e)),
            }
        }
        Ok(())
    }

    async fn memories(&self) -> anyhow::Result<()> {
        let token = self.require_credential()?;
        let memories = self
            .api
            .memory_count(&token)
            .await
            .map_err(|e| self.request_failure(e, "Failed to load memory count"))?;
        println!("{} meeting memories stored ({})", memories.count, memories.status);
        Ok(())
    }

    // -- Meetings --

    async fn history(&self) -> anyhow::Result<()> {
        let token = self.require_credential()?;
        let meetings = self
            .api
            .list_meetings(&token)
            .await
            .map_err(|e| self.request_failure(e, HISTORY_FAILED))?;
        if meetings.is_empty() {
            println!("No meetings processed yet.");
        }
        for meeting in &meetings {
            print_meeting_row(meeting);
        }
        Ok(())
    }

    async fn show(&self, id: i64) -> anyhow::Result<()> {
        let token = self.require_credential()?;
        let meeting = self
            .api
            .get_meeting(&token, id)
            .await
            .map_err(|e| self.request_failure(e, LOAD_FAILED))?;
        print_meeting_detail(&meeting);
        Ok(())
    }

    async fn process(
        &self,
        source: ProcessSource,
        title: Option<String>,
        date: Option<NaiveDate>,
    ) -> anyhow::Result<()> {
        let token = self.require_credential()?;
        let source = match source {
            ProcessSource {
                text: Some(path), ..
            } => MeetingSource::Text(
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
            ),
            ProcessSource {
                link: Some(url), ..
            } => MeetingSource::Link(url),
            ProcessSource {
                file: Some(path), ..
            } => MeetingSource::File(path),
            _ => bail!("Meeting input cannot be empty"),
        };
        let mut input = MeetingInput::new(source);
        if let Some(title) = title {
            input = input.with_title(title);
        }
        if let Some(date) = date {
            input = input.with_date(date);
        }

        println!("Processing meeting...");
        let meeting = self
            .api
            .process_meeting(&token, &input)
            .await
            .map_err(|e| {
                if e.is_auth_invalid() {
                    self.session.invalidate();
                    return anyhow::anyhow!("Session expired; log in again");
                }
                tracing::warn!(error = %e, "Meeting processing failed");
                anyhow::anyhow!(e.detail_or_body(PROCESS_FAILED))
            })?;
        print_meeting_detail(&meeting);
        Ok(())
    }

    // -- Private helpers --

    fn engine(&self) -> ConversationEngine {
        ConversationEngine::new(self.session.clone(), self.api.clone())
    }

    fn require_credential(&self) -> anyhow::Result<String> {
        match self.session.credential() {
            Some(token) if self.session.status() == SessionStatus::Authenticated => Ok(token),
            _ => bail!("Not logged in"),
        }
    }

    /// Message for a failed protected request. A rejected credential ends
    /// the session.
    fn request_failure(&self, err: ApiError, fallback: &str) -> anyhow::Error {
        if err.is_auth_invalid() {
            self.session.invalidate();
            return anyhow::anyhow!("Session expired; log in again");
        }
        tracing::warn!(error = %err, "Request failed");
        anyhow::anyhow!(err.detail_or(fallback))
    }
}

fn chat_failure(err: ChatError) -> anyhow::Error {
    match err {
        ChatError::SessionInvalidated => anyhow::anyhow!("Session expired; log in again"),
        ChatError::NotAuthenticated | ChatError::SessionEnded => anyhow::anyhow!("Not logged in"),
        ChatError::RequestFailed(message) => anyhow::anyhow!(message),
    }
}

fn chat_set_date(engine: &ConversationEngine, arg: &str) {
    if arg.is_empty() {
        engine.set_date(None);
        println!("Date filter cleared.");
        return;
    }
    match arg.parse::<NaiveDate>() {
        Ok(date) => {
            let had_meeting = engine.scope().meeting_id.is_some();
            engine.set_date(Some(date));
            if had_meeting && engine.scope().meeting_id.is_none() {
                println!("Meeting selection cleared; it is not from {}.", date);
            }
        }
        Err(_) => println!("Expected a date like 2024-05-01."),
    }
}

fn chat_set_meeting(engine: &ConversationEngine, arg: &str) {
    if arg.is_empty() {
        engine.set_meeting(None);
        println!("Meeting filter cleared.");
        return;
    }
    match arg.parse::<i64>() {
        Ok(id) => engine.set_meeting(Some(id)),
        Err(_) => println!("Expected a meeting id; see /meetings."),
    }
}

fn scope_label(engine: &ConversationEngine) -> String {
    let scope = engine.scope();
    match (scope.meeting_id, scope.date) {
        (None, None) => "all".to_string(),
        (Some(id), None) => format!("meeting {}", id),
        (None, Some(date)) => date.to_string(),
        (Some(id), Some(date)) => format!("{} / meeting {}", date, id),
    }
}

fn prompt(label: &str) -> std::io::Result<()> {
    print!("[{}] > ", label);
    std::io::stdout().flush()
}

fn password_or_prompt(flag: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = cli::resolve_password(flag) {
        return Ok(password);
    }
    prompt("password")?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password is required");
    }
    Ok(password)
}

fn print_chat_help() {
    println!("  /date [YYYY-MM-DD]  limit to one day (no argument clears)");
    println!("  /meeting [ID]       limit to one meeting (no argument clears)");
    println!("  /clear              clear both filters");
    println!("  /dates              list days with meetings");
    println!("  /meetings           list meetings for the selected day");
    println!("  /refresh            reload the meeting list");
    println!("  /transcript         print the conversation so far");
    println!("  /quit               leave");
}

fn print_answer(exchange: &Exchange) {
    println!("{}", exchange.answer);
    if !exchange.sources.is_empty() {
        println!("Sources: {}", exchange.sources.join(", "));
    }
}

fn print_meeting_row(meeting: &MeetingSummary) {
    println!(
        "{:>5}  {}  {}  ({} tasks)",
        meeting.id,
        meeting.date(),
        meeting.display_title(),
        meeting.task_count
    );
}

fn print_meeting_detail(meeting: &MeetingDetail) {
    println!(
        "{} ({})",
        meeting.title.as_deref().unwrap_or("Untitled meeting"),
        meeting.created_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(summary) = &meeting.summary {
        println!("\n{}", summary);
    }
    if !meeting.key_points.is_empty() {
        println!("\nKey points:");
        for point in &meeting.key_points {
            println!("  - {}", point);
        }
    }
    if !meeting.decisions.is_empty() {
        println!("\nDecisions:");
        for decision in &meeting.decisions {
            println!("  - {}", decision);
        }
    }
    if !meeting.tasks.is_empty() {
        println!("\nTasks:");
        for task in &meeting.tasks {
            let owner = task.assigned_to.as_deref().unwrap_or("unassigned");
            match &task.deadline {
                Some(deadline) => {
                    println!("  [{}] {} ({}, due {})", task.status, task.title, owner, deadline)
                }
                None => println!("  [{}] {} ({})", task.status, task.title, owner),
            }
        }
    }
}
