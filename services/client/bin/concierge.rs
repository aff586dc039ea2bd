//! Main Entrypoint for the Concierge Terminal Client
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Building the application context and restoring any signed-in session.
//! 4. Running the requested command, then tearing the context down.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use concierge_client::{
    auth::{AccessGate, AuthState},
    config::Config,
    context::AppContext,
    render::{render_turn, render_voice_line},
    voice::TransportEvent,
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "concierge", version, about = "Talk to the property concierge from a terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with your phone number and a one-time password.
    Login,
    /// Show the signed-in account.
    Whoami,
    /// Chat with the assistant.
    Chat,
    /// Start a voice call and print the live transcript.
    Voice,
    /// Sign out and forget the conversation.
    Logout,
}

/// Resolves on `Ctrl+C`. If the handler cannot be installed it never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal.");
}

/// Line-oriented prompts on stdin.
struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Returns `None` once stdin is closed.
    async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        print!("{label}");
        std::io::stdout().flush()?;
        Ok(self.lines.next_line().await?)
    }

    async fn require(&mut self, label: &str) -> Result<String> {
        match self.ask(label).await? {
            Some(line) => Ok(line),
            None => bail!("input closed"),
        }
    }
}

async fn login(ctx: &mut AppContext, prompt: &mut Prompt) -> Result<()> {
    loop {
        match ctx.auth.gate() {
            AccessGate::Loading => bail!("session restoration did not complete"),
            AccessGate::SignIn => {
                let phone = prompt.require("Phone number: ").await?;
                match ctx.auth.send_otp(&phone).await {
                    Ok(()) => println!("OTP sent."),
                    Err(e) => println!("{e}"),
                }
            }
            AccessGate::VerifyOtp => {
                let phone = match ctx.auth.state() {
                    AuthState::OtpPending { phone } => phone.clone(),
                    _ => continue,
                };
                let code = prompt.require("OTP: ").await?;
                if let Err(e) = ctx.auth.verify_otp(&phone, code.trim()).await {
                    println!("{e}");
                }
            }
            AccessGate::CompleteProfile => {
                println!("Almost there. Tell us a little about yourself.");
                let name = prompt.require("Name: ").await?;
                let email = prompt.require("Email: ").await?;
                if let Err(e) = ctx.auth.complete_profile(&name, &email).await {
                    println!("{e}");
                }
            }
            AccessGate::Ready => {
                whoami(ctx);
                return Ok(());
            }
        }
    }
}

fn whoami(ctx: &AppContext) {
    match ctx.auth.account() {
        Some(account) => println!(
            "Signed in as {} ({}){}",
            account.name.as_deref().unwrap_or("unnamed"),
            account.phone,
            account
                .email
                .as_deref()
                .map(|email| format!(", {email}"))
                .unwrap_or_default()
        ),
        None => println!("Not signed in."),
    }
}

/// Chat and voice are only offered once sign-in is complete.
fn require_ready(ctx: &AppContext) -> Result<()> {
    match ctx.auth.require_ready() {
        Ok(_) => Ok(()),
        Err(e) => bail!("{e}. Run `concierge login` first."),
    }
}

async fn chat(ctx: &mut AppContext, prompt: &mut Prompt) -> Result<()> {
    for turn in ctx.chat.transcript() {
        println!("{}\n", render_turn(&turn));
    }
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = prompt.ask("> ") => line?,
            _ = &mut shutdown => break,
        };
        let Some(line) = line else { break };
        if matches!(line.trim(), "/quit" | "/exit") {
            break;
        }

        let reply = tokio::select! {
            reply = ctx.send_chat(&line) => reply,
            _ = &mut shutdown => break,
        };
        match reply {
            Ok(turn) => println!("{}\n", render_turn(&turn)),
            Err(e) => println!("{e}"),
        }
    }
    Ok(())
}

async fn voice(ctx: &mut AppContext) -> Result<()> {
    ctx.voice.start().await.context("Could not start the call")?;
    println!("Connecting... press Ctrl+C to hang up.");
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut connected = false;

    loop {
        let event = tokio::select! {
            event = ctx.voice.next_event() => Some(event),
            _ = &mut shutdown => None,
        };
        let Some(event) = event else {
            ctx.voice.stop();
            break;
        };
        match event {
            None => break,
            Some(TransportEvent::CallStart) => {
                if !std::mem::replace(&mut connected, true) {
                    println!("Call connected. Start speaking.");
                }
            }
            Some(TransportEvent::CallEnd) => {
                println!("Call ended.");
                break;
            }
            Some(TransportEvent::Transcript { .. }) => {
                if let Some(entry) = ctx.voice.recent(1).first().filter(|e| e.is_final) {
                    println!("{}", render_voice_line(entry));
                }
            }
            Some(TransportEvent::Error(_)) => {}
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!(
        api = %config.api_base_url,
        storage = %config.storage_path.display(),
        "Configuration loaded. Initializing client context..."
    );

    // --- 3. Build Context and Restore Session ---
    let mut ctx = AppContext::new(config).context("Failed to open client storage")?;
    ctx.init().await;

    // --- 4. Run Command ---
    let mut prompt = Prompt::new();
    let result = match cli.command {
        Command::Login => login(&mut ctx, &mut prompt).await,
        Command::Whoami => {
            whoami(&ctx);
            Ok(())
        }
        Command::Chat => match require_ready(&ctx) {
            Ok(()) => chat(&mut ctx, &mut prompt).await,
            Err(e) => Err(e),
        },
        Command::Voice => match require_ready(&ctx) {
            Ok(()) => voice(&mut ctx).await,
            Err(e) => Err(e),
        },
        Command::Logout => {
            ctx.logout();
            println!("Signed out.");
            Ok(())
        }
    };

    ctx.teardown();
    result
}
