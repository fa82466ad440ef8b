//! Binary entrypoints: bootstrap, the interactive shell loop, and the
//! `logout` subcommand.

use anyhow::Result;

use crate::{
    cli::{Cli, Command},
    domain::{
        admin::DEFAULT_RETENTION_HOURS,
        context::{ChatContext, ContextKind},
        identity::Identity,
        message::Message,
    },
    infra::{
        config::{self, AppConfig},
        contracts::{ChatTerminal, SessionStore},
        json_store::JsonSessionStore,
        logging,
        storage_layout::StorageLayout,
    },
    usecases::{
        engine::ChatEngine,
        login_prompt::{run_login_prompt, RetryPolicy, StdTerminal},
        rooms::JoinOutcome,
    },
};

pub fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;
    logging::init(&config.logging)?;

    match cli.command_or_default() {
        Command::Run => {
            let store = open_store(&config)?;
            let mut engine = ChatEngine::new(store, config.features.clone())?;
            let mut terminal = StdTerminal;
            run_session(&mut terminal, &mut engine, &config)
        }
        Command::Logout => {
            let mut store = open_store(&config)?;
            let removed = clear_session(&mut store)?;
            tracing::info!(identity_removed = removed, "logout completed");
            println!("Logged out. The stored identity is no longer marked present.");
            Ok(())
        }
    }
}

fn open_store(config: &AppConfig) -> Result<JsonSessionStore> {
    let layout = match &config.storage.data_dir {
        Some(dir) => StorageLayout::at(dir.clone()),
        None => StorageLayout::resolve()?,
    };
    Ok(JsonSessionStore::open(layout)?)
}

/// Offline logout: drops the current identity from the presence
/// collection without entering the shell.
fn clear_session(store: &mut dyn SessionStore) -> Result<bool> {
    let Some(identity) = store.load_current_identity()? else {
        return Ok(false);
    };

    let users: Vec<Identity> = store
        .load_users()?
        .into_iter()
        .filter(|user| user.id != identity.id)
        .collect();
    store.save_users(&users)?;
    store.clear_current_identity()?;
    Ok(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellExit {
    Quit,
    Logout,
}

enum Signal {
    Continue,
    Logout,
    Quit,
}

/// Login/shell cycle: `/logout` returns to the login prompt, `/quit`
/// (or EOF at the login prompt) leaves the program.
fn run_session<S: SessionStore>(
    terminal: &mut dyn ChatTerminal,
    engine: &mut ChatEngine<S>,
    config: &AppConfig,
) -> Result<()> {
    terminal.print_line("Welcome to the parlor. Enter the shared password to join.")?;

    loop {
        let Some(session) = run_login_prompt(
            terminal,
            engine.store_mut(),
            &config.auth.master_password,
            &RetryPolicy::default(),
        )?
        else {
            return Ok(());
        };
        engine.login(session)?;

        if let Some(welcome) = engine
            .store_mut()
            .load_admin_config()?
            .and_then(|admin| admin.welcome_message)
        {
            terminal.print_line(&welcome)?;
        }

        match run_shell(terminal, engine)? {
            ShellExit::Quit => return Ok(()),
            ShellExit::Logout => terminal.print_line("Logged out.")?,
        }
    }
}

fn run_shell<S: SessionStore>(
    terminal: &mut dyn ChatTerminal,
    engine: &mut ChatEngine<S>,
) -> Result<ShellExit> {
    print_messages(terminal, engine)?;

    loop {
        engine.sweep_presence()?;

        let reply_marker = if engine.reply_target().is_some() {
            "(reply) "
        } else {
            ""
        };
        let prompt = match engine.active_context() {
            Some(context) => format!("{reply_marker}[{}] ", context.name),
            None => "> ".to_owned(),
        };
        let Some(line) = terminal.prompt_line(&prompt)? else {
            engine.logout()?;
            return Ok(ShellExit::Quit);
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            match dispatch(terminal, engine, command)? {
                Signal::Continue => {}
                Signal::Logout => {
                    engine.logout()?;
                    return Ok(ShellExit::Logout);
                }
                Signal::Quit => {
                    engine.logout()?;
                    return Ok(ShellExit::Quit);
                }
            }
        } else if engine.is_authenticated() {
            engine.send_message(line, None)?;
        } else {
            terminal.print_line("Not logged in.")?;
        }
    }
}

fn dispatch<S: SessionStore>(
    terminal: &mut dyn ChatTerminal,
    engine: &mut ChatEngine<S>,
    input: &str,
) -> Result<Signal> {
    let mut parts = input.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "help" => print_help(terminal)?,
        "messages" => print_messages(terminal, engine)?,
        "users" => {
            let current_id = engine.session().map(|session| session.identity.id.clone());
            for user in engine.present_users()? {
                let mut line = format!("  {}", user.username);
                if user.is_admin {
                    line.push_str(" [admin]");
                }
                if Some(&user.id) == current_id.as_ref() {
                    line.push_str(" (you)");
                }
                terminal.print_line(&line)?;
            }
        }
        "rooms" => print_rooms(terminal, engine)?,
        "general" => {
            engine.switch_context(ChatContext::general());
            engine.clear_reply_target();
            terminal.print_line("Switched to General Chat.")?;
            print_messages(terminal, engine)?;
        }
        "create" => create_room(terminal, engine, rest)?,
        "join" => join_room(terminal, engine, rest)?,
        "leave" => leave_room(terminal, engine)?,
        "dm" => start_dm(terminal, engine, rest)?,
        "reply" => match nth_message_id(engine, rest)? {
            Some(id) => {
                engine.set_reply_target(&id);
                terminal.print_line("Replying; your next message will reference it.")?;
            }
            None => terminal.print_line("Usage: /reply <message number>")?,
        },
        "cancel" => {
            engine.clear_reply_target();
            terminal.print_line("Reply cancelled.")?;
        }
        "edit" => edit_message(terminal, engine, rest)?,
        "del" => match nth_message_id(engine, rest)? {
            Some(id) if engine.delete_message(&id)? => {
                terminal.print_line("Message deleted.")?
            }
            Some(_) => terminal.print_line("Could not delete that message.")?,
            None => terminal.print_line("Usage: /del <message number>")?,
        },
        "pin" => match nth_message_id(engine, rest)? {
            Some(id) if engine.pin_message(&id)? => terminal.print_line("Message pinned.")?,
            _ => terminal.print_line("Usage: /pin <message number>")?,
        },
        "unpin" => match nth_message_id(engine, rest)? {
            Some(id) if engine.unpin_message(&id)? => {
                terminal.print_line("Message unpinned.")?
            }
            _ => terminal.print_line("Usage: /unpin <message number>")?,
        },
        "react" => react_to_message(terminal, engine, rest)?,
        "retention" => match rest.parse::<i64>() {
            Ok(hours) if hours > 0 => {
                if engine.update_retention(hours)? {
                    terminal.print_line(&format!("Default retention set to {hours} hours."))?;
                } else {
                    terminal.print_line("Admin access required.")?;
                }
            }
            _ => terminal.print_line("Usage: /retention <hours>")?,
        },
        "adminpass" => {
            if rest.is_empty() {
                terminal.print_line("Usage: /adminpass <new password>")?;
            } else if engine.update_admin_password(rest)? {
                terminal.print_line("Admin password updated.")?;
            } else {
                terminal.print_line("Admin access required.")?;
            }
        }
        "logout" => return Ok(Signal::Logout),
        "quit" | "exit" => return Ok(Signal::Quit),
        _ => terminal.print_line("Unknown command. Try /help.")?,
    }

    Ok(Signal::Continue)
}

fn create_room<S: SessionStore>(
    terminal: &mut dyn ChatTerminal,
    engine: &mut ChatEngine<S>,
    rest: &str,
) -> Result<()> {
    let mut args = rest.split_whitespace();
    let (Some(name), Some(password)) = (args.next(), args.next()) else {
        terminal.print_line("Usage: /create <name> <password> [private]")?;
        return Ok(());
    };
    let is_private = args.next() == Some("private");

    match engine.create_room(name, password, is_private, None, DEFAULT_RETENTION_HOURS)? {
        Some(room) => terminal.print_line(&format!("Created and joined room {}.", room.name))?,
        None => terminal.print_line("Room creation is not available for this session.")?,
    }
    Ok(())
}

fn join_room<S: SessionStore>(
    terminal: &mut dyn ChatTerminal,
    engine: &mut ChatEngine<S>,
    rest: &str,
) -> Result<()> {
    let mut args = rest.split_whitespace();
    let (Some(name), Some(password)) = (args.next(), args.next()) else {
        terminal.print_line("Usage: /join <room> <password>")?;
        return Ok(());
    };

    let room_id = engine
        .visible_rooms()
        .iter()
        .find(|room| room.id == name || room.name.eq_ignore_ascii_case(name))
        .map(|room| room.id.clone())
        .unwrap_or_else(|| name.to_owned());

    match engine.join_room(&room_id, password)? {
        JoinOutcome::Joined => terminal.print_line("Joined.")?,
        JoinOutcome::AlreadyMember => terminal.print_line("Already a member; switched over.")?,
        JoinOutcome::Rejected => terminal.print_line("Wrong room password.")?,
        JoinOutcome::UnknownRoom => terminal.print_line("No such room.")?,
    }
    Ok(())
}

fn leave_room<S: SessionStore>(
    terminal: &mut dyn ChatTerminal,
    engine: &mut ChatEngine<S>,
) -> Result<()> {
    let Some(context) = engine.active_context().cloned() else {
        return Ok(());
    };
    if context.kind != ContextKind::Room {
        terminal.print_line("Not in a room.")?;
        return Ok(());
    }

    if engine.leave_room(&context.id)? {
        engine.switch_context(ChatContext::general());
        terminal.print_line(&format!("Left {}.", context.name))?;
    } else {
        terminal.print_line("Leaving rooms is not enabled.")?;
    }
    Ok(())
}

fn start_dm<S: SessionStore>(
    terminal: &mut dyn ChatTerminal,
    engine: &mut ChatEngine<S>,
    rest: &str,
) -> Result<()> {
    if rest.is_empty() {
        terminal.print_line("Usage: /dm <username>")?;
        return Ok(());
    }

    let Some(partner) = engine
        .present_users()?
        .into_iter()
        .find(|user| user.has_username(rest))
    else {
        terminal.print_line("No such user online.")?;
        return Ok(());
    };

    if engine.start_direct_message(&partner) {
        terminal.print_line(&format!("Direct chat with {}.", partner.username))?;
        print_messages(terminal, engine)?;
    } else {
        terminal.print_line("Direct messages are not available for this session.")?;
    }
    Ok(())
}

fn edit_message<S: SessionStore>(
    terminal: &mut dyn ChatTerminal,
    engine: &mut ChatEngine<S>,
    rest: &str,
) -> Result<()> {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let (Some(number), Some(body)) = (parts.next(), parts.next()) else {
        terminal.print_line("Usage: /edit <message number> <new text>")?;
        return Ok(());
    };

    match nth_message_id(engine, number)? {
        Some(id) if engine.edit_message(&id, body.trim())? => {
            terminal.print_line("Message edited.")?
        }
        Some(_) => terminal.print_line("Only your own messages can be edited.")?,
        None => terminal.print_line("Usage: /edit <message number> <new text>")?,
    }
    Ok(())
}

fn react_to_message<S: SessionStore>(
    terminal: &mut dyn ChatTerminal,
    engine: &mut ChatEngine<S>,
    rest: &str,
) -> Result<()> {
    let mut parts = rest.split_whitespace();
    let (Some(number), Some(emoji)) = (parts.next(), parts.next()) else {
        terminal.print_line("Usage: /react <message number> <emoji>")?;
        return Ok(());
    };

    match nth_message_id(engine, number)? {
        Some(id) if engine.react_to_message(&id, emoji)? => {}
        _ => terminal.print_line("Usage: /react <message number> <emoji>")?,
    }
    Ok(())
}

/// Resolves a 1-based position in the active context to a message id.
fn nth_message_id<S: SessionStore>(
    engine: &mut ChatEngine<S>,
    token: &str,
) -> Result<Option<String>> {
    let Ok(index) = token.trim().parse::<usize>() else {
        return Ok(None);
    };
    if index == 0 {
        return Ok(None);
    }

    Ok(engine
        .list_visible_messages()?
        .get(index - 1)
        .map(|message| message.id.clone()))
}

fn print_messages<S: SessionStore>(
    terminal: &mut dyn ChatTerminal,
    engine: &mut ChatEngine<S>,
) -> Result<()> {
    let messages = engine.list_visible_messages()?;
    if messages.is_empty() {
        terminal.print_line("No messages here yet.")?;
        return Ok(());
    }

    for (index, message) in messages.iter().enumerate() {
        terminal.print_line(&format_message(index + 1, message))?;
    }
    Ok(())
}

fn format_message(index: usize, message: &Message) -> String {
    let body = message.display_body().unwrap_or("[deleted]");
    let mut line = format!(
        "{index:>3}. [{}] {}: {body}",
        message.sent_at.format("%H:%M"),
        message.author_name
    );

    if message.is_pinned {
        line.push_str(" [pinned]");
    }
    if message.is_edited {
        line.push_str(" (edited)");
    }
    if message.reply_to.is_some() {
        line.push_str(" (reply)");
    }
    if !message.reactions.is_empty() {
        let summary: Vec<String> = message
            .reactions
            .iter()
            .map(|(emoji, reactors)| format!("{emoji}x{}", reactors.len()))
            .collect();
        line.push_str(&format!("  {}", summary.join(" ")));
    }

    line
}

fn print_rooms<S: SessionStore>(
    terminal: &mut dyn ChatTerminal,
    engine: &mut ChatEngine<S>,
) -> Result<()> {
    let Some(view) = engine.room_view() else {
        return Ok(());
    };

    if view.mine.is_empty() && view.available.is_empty() {
        terminal.print_line("No rooms yet. /create <name> <password> starts one.")?;
        return Ok(());
    }

    let mut lines = Vec::new();
    if !view.mine.is_empty() {
        lines.push("Your rooms:".to_owned());
        for room in &view.mine {
            lines.push(format_room(room));
        }
    }
    if !view.available.is_empty() {
        lines.push("Available rooms:".to_owned());
        for room in &view.available {
            lines.push(format_room(room));
        }
    }

    for line in lines {
        terminal.print_line(&line)?;
    }
    Ok(())
}

fn format_room(room: &crate::domain::room::Room) -> String {
    let privacy = if room.is_private { " (private)" } else { "" };
    format!("  {}{privacy} — {} member(s)", room.name, room.members.len())
}

fn print_help(terminal: &mut dyn ChatTerminal) -> Result<()> {
    const LINES: [&str; 10] = [
        "Plain text sends a message to the active context.",
        "/messages /users /rooms /general — look around",
        "/create <name> <password> [private] — start a room",
        "/join <room> <password>  /leave — room membership",
        "/dm <username> — switch to a direct chat",
        "/reply <n>  /cancel — reply to message n",
        "/edit <n> <text>  /del <n> — change your messages",
        "/pin <n>  /unpin <n>  /react <n> <emoji>",
        "/retention <hours>  /adminpass <pw> — admin only",
        "/logout — back to login   /quit — exit",
    ];
    for line in LINES {
        terminal.print_line(line)?;
    }
    Ok(())
}
