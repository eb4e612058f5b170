//! Terminal surface
//!
//! The gate decides which of the two surfaces runs: the anonymous
//! login/signup forms or the authenticated chat loop. Entering the chat
//! surface lands the user in a freshly created conversation, mirroring
//! the home redirect of the hosted assistant.

use std::io::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::config::Config;
use crate::conversation::{Conversation, Delivery};
use crate::core::validate::{self, FieldErrors};
use crate::core::{ChatError, ChatService};
use crate::session::guard::{self, Gate};

const WELCOME: &str = "Welcome to the government services assistant. How can we help you today?";

const CHAT_HELP: &str =
    "commands: /new  /list  /open <n>  /history  /logout  /quit; anything else is sent as a message";

type Input = Lines<BufReader<Stdin>>;

pub async fn run(service: ChatService, config: Config) -> anyhow::Result<()> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let proceed = match guard::require_authenticated(service.api(), service.store()).await? {
            Gate::Proceed => chat_surface(&service, &config, &mut input).await?,
            _ => auth_surface(&service, &mut input).await?,
        };
        if !proceed {
            return Ok(());
        }
    }
}

/// Anonymous-only surface. Returns `false` when the user quits.
async fn auth_surface(service: &ChatService, input: &mut Input) -> anyhow::Result<bool> {
    if guard::require_anonymous(service.api(), service.store()).await? == Gate::RedirectToHome {
        return Ok(true);
    }

    loop {
        let Some(choice) = prompt(input, "1) log in   2) sign up   q) quit > ").await? else {
            return Ok(false);
        };
        match choice.as_str() {
            "1" => {
                if login_form(service, input).await? {
                    return Ok(true);
                }
            }
            "2" => {
                if signup_form(service, input).await? {
                    return Ok(true);
                }
            }
            "q" => return Ok(false),
            "" => {}
            other => println!("unrecognized choice: {other}"),
        }
    }
}

async fn login_form(service: &ChatService, input: &mut Input) -> anyhow::Result<bool> {
    let Some(email) = prompt(input, "email: ").await? else {
        return Ok(false);
    };
    let Some(password) = prompt(input, "password: ").await? else {
        return Ok(false);
    };

    // blocked locally: no request leaves before the fields pass
    let errors = validate::validate_login(&email, &password);
    if !errors.is_valid() {
        print_field_errors(&errors);
        return Ok(false);
    }

    match service.login(&email, &password).await {
        Ok(()) => {
            println!("Logged in.");
            Ok(true)
        }
        Err(err) => {
            println!("Login failed: {}", general_error(&err));
            Ok(false)
        }
    }
}

async fn signup_form(service: &ChatService, input: &mut Input) -> anyhow::Result<bool> {
    let Some(name) = prompt(input, "full name: ").await? else {
        return Ok(false);
    };
    let Some(email) = prompt(input, "email: ").await? else {
        return Ok(false);
    };
    let Some(password) = prompt(input, "password: ").await? else {
        return Ok(false);
    };

    let errors = validate::validate_signup(&name, &email, &password);
    if !errors.is_valid() {
        print_field_errors(&errors);
        return Ok(false);
    }

    match service.signup(&name, &email, &password).await {
        Ok(()) => {
            println!("Account created.");
            Ok(true)
        }
        Err(err) => {
            println!("Signup failed: {}", general_error(&err));
            Ok(false)
        }
    }
}

/// Authenticated surface. Returns `false` when the user quits, `true`
/// after logout so the gate runs again.
async fn chat_surface(
    service: &ChatService,
    config: &Config,
    input: &mut Input,
) -> anyhow::Result<bool> {
    if let Some(user) = service.store().session().and_then(|s| s.user().cloned()) {
        println!("Signed in as {} <{}>", user.name, user.email);
    }
    println!("{CHAT_HELP}");

    // home lands in a fresh conversation
    let mut current = match enter_new_conversation(service, config).await? {
        Some(id) => id,
        None => return Ok(false),
    };

    loop {
        let Some(line) = prompt(input, "> ").await? else {
            return Ok(false);
        };

        match line.as_str() {
            "" => {}
            "/quit" => return Ok(false),
            "/logout" => match service.logout().await {
                Ok(()) => {
                    println!("Logged out.");
                    return Ok(true);
                }
                Err(err) => println!("Logout failed: {}", general_error(&err)),
            },
            "/new" => {
                if let Some(id) = enter_new_conversation(service, config).await? {
                    current = id;
                }
            }
            "/list" => match service.refresh_conversations().await {
                Ok(list) => {
                    for (index, conv) in list.iter().enumerate() {
                        println!("{:>3}) {}", index + 1, conv.title);
                    }
                }
                Err(err) => println!("Could not load conversations: {}", general_error(&err)),
            },
            "/history" => {
                if let Some(chat) = service.store().chat(&current) {
                    render_conversation(&chat, config.show_welcome);
                }
            }
            _ if line.starts_with("/open") => match parse_open(&line) {
                Some(index) => match pick_conversation(service, index).await {
                    Ok(Some(id)) => {
                        let chat = service.open_conversation(&id).await?;
                        render_conversation(&chat, config.show_welcome);
                        current = id;
                    }
                    Ok(None) => println!("no conversation {index}"),
                    Err(err) => println!("Could not open conversation: {}", general_error(&err)),
                },
                None => println!("usage: /open <n>"),
            },
            _ if line.starts_with('/') => println!("{CHAT_HELP}"),
            text => {
                print!("assistant> ");
                flush();
                let sent = service
                    .send_message_with(&current, text, |piece| {
                        print!("{piece}");
                        flush();
                    })
                    .await;
                println!();
                if sent.is_err() {
                    // partial content stays in the store, marked failed
                    println!("[answer interrupted]");
                }
            }
        }
    }
}

async fn enter_new_conversation(
    service: &ChatService,
    config: &Config,
) -> anyhow::Result<Option<String>> {
    match service.create_conversation().await {
        Ok(created) => {
            if created.already_listed {
                println!("You are already in a fresh conversation.");
            }
            let chat = service.open_conversation(&created.summary.id).await?;
            render_conversation(&chat, config.show_welcome);
            Ok(Some(created.summary.id))
        }
        Err(err) => {
            println!("Could not start a conversation: {}", general_error(&err));
            Ok(None)
        }
    }
}

async fn pick_conversation(
    service: &ChatService,
    index: usize,
) -> Result<Option<String>, ChatError> {
    let list = service.conversations().await?;
    Ok(index
        .checked_sub(1)
        .and_then(|i| list.get(i))
        .map(|conv| conv.id.clone()))
}

fn parse_open(line: &str) -> Option<usize> {
    line.strip_prefix("/open")?.trim().parse().ok()
}

fn render_conversation(chat: &Conversation, show_welcome: bool) {
    println!("── {} ──", chat.title);
    if show_welcome {
        println!("assistant> {WELCOME}");
    }
    // stored newest first; the terminal reads top-down chronologically
    for msg in chat.messages.iter().rev() {
        let who = if msg.is_user { "you" } else { "assistant" };
        match msg.delivery {
            Delivery::Failed => println!("{who}> {} [failed]", msg.content),
            _ => println!("{who}> {}", msg.content),
        }
    }
}

fn print_field_errors(errors: &FieldErrors) {
    for (field, message) in [
        ("name", errors.name),
        ("email", errors.email),
        ("password", errors.password),
    ] {
        if let Some(message) = message {
            println!("  {field}: {message}");
        }
    }
}

fn general_error(err: &ChatError) -> String {
    match err {
        ChatError::Api(crate::api::ApiError::Api { detail, .. }) => detail.clone(),
        other => other.to_string(),
    }
}

async fn prompt(input: &mut Input, label: &str) -> anyhow::Result<Option<String>> {
    print!("{label}");
    flush();
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

fn flush() {
    let _ = std::io::stdout().flush();
}
