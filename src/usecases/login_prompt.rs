//! Interactive login over a line terminal: password phase, username
//! phase, and the one-time admin setup phase, driving [`LoginFlow`].

use std::io;

use anyhow::Result;
use chrono::Utc;

use crate::infra::contracts::{ChatTerminal, SessionStore};
use crate::usecases::access::{
    AccessLevel, AdminSetupOutcome, LoginFlow, LoginSession, PasswordOutcome, UsernameOutcome,
    UsernameRejection,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub password_attempts: usize,
    pub username_attempts: usize,
    pub setup_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            password_attempts: 3,
            username_attempts: 3,
            setup_attempts: 3,
        }
    }
}

pub struct StdTerminal;

impl ChatTerminal for StdTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()> {
        println!("{line}");
        Ok(())
    }

    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        use std::io::Write;

        print!("{prompt}");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = io::stdin().read_line(&mut line)?;
        if bytes == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim().to_owned()))
    }

    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match rpassword::prompt_password(prompt) {
            Ok(password) => Ok(Some(password.trim().to_owned())),
            Err(source) if source.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(source) => Err(source),
        }
    }
}

enum UsernameStep {
    LoggedIn(LoginSession),
    AdminSetup,
}

/// Runs the full login conversation. Returns `None` when the user gives
/// up (EOF) or runs out of attempts; store failures propagate.
pub fn run_login_prompt(
    terminal: &mut dyn ChatTerminal,
    store: &mut dyn SessionStore,
    master_password: &str,
    policy: &RetryPolicy,
) -> Result<Option<LoginSession>> {
    let mut flow = LoginFlow::new();

    if !collect_password(
        terminal,
        &*store,
        &mut flow,
        master_password,
        policy.password_attempts,
    )? {
        return Ok(None);
    }

    let Some(step) = collect_username(terminal, store, &mut flow, policy.username_attempts)? else {
        return Ok(None);
    };

    let session = match step {
        UsernameStep::LoggedIn(session) => session,
        UsernameStep::AdminSetup => {
            let Some(session) =
                collect_admin_password(terminal, store, &mut flow, policy.setup_attempts)?
            else {
                return Ok(None);
            };
            session
        }
    };

    terminal.print_line(&format!("Welcome, {}.", session.identity.username))?;
    if session.grant.level == AccessLevel::Room {
        terminal.print_line("This password opens a single room; other areas stay hidden.")?;
    }

    Ok(Some(session))
}

fn collect_password(
    terminal: &mut dyn ChatTerminal,
    store: &dyn SessionStore,
    flow: &mut LoginFlow,
    master_password: &str,
    attempts: usize,
) -> Result<bool> {
    for attempt in 1..=attempts {
        let Some(supplied) = terminal.prompt_secret("Password: ")? else {
            terminal.print_line("Input cancelled (EOF).")?;
            return Ok(false);
        };

        match flow.submit_password(store, master_password, &supplied)? {
            PasswordOutcome::Accepted(_) => return Ok(true),
            PasswordOutcome::Rejected => terminal.print_line(&format!(
                "Wrong password. Attempts left: {}",
                attempts.saturating_sub(attempt)
            ))?,
        }
    }

    terminal.print_line("Too many failed password attempts.")?;
    Ok(false)
}

fn collect_username(
    terminal: &mut dyn ChatTerminal,
    store: &mut dyn SessionStore,
    flow: &mut LoginFlow,
    attempts: usize,
) -> Result<Option<UsernameStep>> {
    for attempt in 1..=attempts {
        let Some(username) = terminal.prompt_line("Username: ")? else {
            terminal.print_line("Input cancelled (EOF).")?;
            return Ok(None);
        };

        match flow.submit_username(store, &username, Utc::now())? {
            UsernameOutcome::LoggedIn(session) => {
                return Ok(Some(UsernameStep::LoggedIn(session)))
            }
            UsernameOutcome::AdminSetupRequired => {
                terminal.print_line("No admin exists yet. Choose the admin password to finish setup.")?;
                return Ok(Some(UsernameStep::AdminSetup));
            }
            UsernameOutcome::Rejected(rejection) => {
                let reason = match rejection {
                    UsernameRejection::TooShort => "Username must be at least 2 characters.",
                    UsernameRejection::InUse => "That name is taken by someone currently online.",
                    UsernameRejection::InvalidAdminCredentials => {
                        "Admin credentials do not match."
                    }
                };
                terminal.print_line(&format!(
                    "{reason} Attempts left: {}",
                    attempts.saturating_sub(attempt)
                ))?;
            }
        }
    }

    terminal.print_line("Too many failed username attempts.")?;
    Ok(None)
}

fn collect_admin_password(
    terminal: &mut dyn ChatTerminal,
    store: &mut dyn SessionStore,
    flow: &mut LoginFlow,
    attempts: usize,
) -> Result<Option<LoginSession>> {
    for attempt in 1..=attempts {
        let Some(password) = terminal.prompt_secret("New admin password: ")? else {
            terminal.print_line("Input cancelled (EOF).")?;
            return Ok(None);
        };

        match flow.submit_admin_password(store, &password, Utc::now())? {
            AdminSetupOutcome::Completed(session) => return Ok(Some(session)),
            AdminSetupOutcome::PasswordTooShort => terminal.print_line(&format!(
                "Admin password must be at least 6 characters. Attempts left: {}",
                attempts.saturating_sub(attempt)
            ))?,
        }
    }

    terminal.print_line("Admin setup abandoned.")?;
    Ok(None)
}
