//! unified-inbox - Command-line front end for the unified unread feed

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use unified_inbox::config::{Settings, ENV_PREFIX};
use unified_inbox::domain::{NormalizedMessage, ProviderKind};
use unified_inbox::providers::email::{
    generate_state, GmailProvider, OutlookProvider, DEFAULT_GMAIL_SCOPES, DEFAULT_OUTLOOK_SCOPES,
};
use unified_inbox::services::{InboxService, ProviderTokens};
use unified_inbox::storage::{InMemoryTokenStore, TokenStore};

#[derive(Parser)]
#[command(name = "unified-inbox")]
#[command(about = "Unread Gmail and Outlook mail in one feed", long_about = None)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the merged unread feed (default)
    Inbox {
        /// Unread messages to request per provider (clamped to 1..=100)
        #[arg(long, allow_negative_numbers = true)]
        max_results: Option<f64>,
    },

    /// Print the authorization URL to start sign-in
    AuthUrl {
        provider: ProviderKind,

        /// Explicit state value; a random one is generated otherwise
        #[arg(long)]
        state: Option<String>,
    },

    /// Exchange an authorization code and print the tokens
    ///
    /// Tokens are not saved. Export the access token as
    /// UNIFIED_INBOX_<PROVIDER>_TOKEN and the refresh token as
    /// UNIFIED_INBOX_<PROVIDER>_REFRESH_TOKEN for later commands.
    Exchange {
        provider: ProviderKind,

        #[arg(long)]
        code: String,
    },

    /// Obtain a fresh access token and print it
    ///
    /// The new token is not saved; export it as UNIFIED_INBOX_<PROVIDER>_TOKEN.
    Refresh {
        provider: ProviderKind,

        /// Refresh token; read from UNIFIED_INBOX_<PROVIDER>_REFRESH_TOKEN otherwise
        #[arg(long)]
        refresh_token: Option<String>,
    },

    /// Mark one message as read
    MarkRead { provider: ProviderKind, id: String },

    /// Show the signed-in account
    Whoami { provider: ProviderKind },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config)?;
    let store = InMemoryTokenStore::from_lookup(ENV_PREFIX, |name| std::env::var(name).ok());

    let client = reqwest::Client::new();
    let gmail = Arc::new(GmailProvider::with_endpoints(
        client.clone(),
        settings.gmail.endpoints.clone(),
    ));
    let outlook = Arc::new(
        OutlookProvider::with_endpoints(client, settings.outlook.endpoints.clone())
            .with_scopes(settings.outlook.scopes.clone()),
    );
    let service = InboxService::new(gmail, outlook).with_page_size(settings.inbox.page_size());

    match cli.cmd.unwrap_or(Command::Inbox { max_results: None }) {
        Command::Inbox { max_results } => {
            let service = match max_results {
                Some(n) => service.with_page_size(n.into()),
                None => service,
            };
            let tokens = ProviderTokens::load(&store).await?;
            if tokens.is_empty() {
                println!("No accounts connected. Set {ENV_PREFIX}_GMAIL_TOKEN or {ENV_PREFIX}_OUTLOOK_TOKEN.");
                return Ok(());
            }

            let feed = service.aggregate(&tokens).await;
            for failure in &feed.failures {
                eprintln!("warning: {}", failure.error);
            }
            if feed.is_empty() {
                println!("No unread messages.");
            }
            for message in &feed.messages {
                print_message(message);
            }
            Ok(())
        }

        Command::AuthUrl { provider, state } => {
            let client = client_settings(&settings, provider);
            let state = state.unwrap_or_else(generate_state);
            let url = service.provider(provider).authorization_url(
                &client.client_id,
                &client.redirect_uri,
                &client.scopes,
                Some(&state),
            )?;
            println!("{url}");
            eprintln!("state: {state}");
            Ok(())
        }

        Command::Exchange { provider, code } => {
            let client = client_settings(&settings, provider);
            let token = service
                .provider(provider)
                .exchange_code(
                    &code,
                    &client.client_id,
                    &client.client_secret,
                    &client.redirect_uri,
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&token)?);
            Ok(())
        }

        Command::Refresh {
            provider,
            refresh_token,
        } => {
            let refresh_token = match refresh_token {
                Some(token) => token,
                None => store
                    .refresh_token(provider)
                    .await?
                    .ok_or_else(|| anyhow!("no refresh token for {provider}"))?,
            };
            let client = client_settings(&settings, provider);
            let token = service
                .provider(provider)
                .refresh_token(&refresh_token, &client.client_id, &client.client_secret)
                .await?;
            println!("{}", serde_json::to_string_pretty(&token)?);
            Ok(())
        }

        Command::MarkRead { provider, id } => {
            let tokens = ProviderTokens::load(&store).await?;
            let message = NormalizedMessage::new(provider, id, String::new());
            service.mark_as_read(&tokens, &message).await?;
            println!("Marked {} {} as read", provider, message.id());
            Ok(())
        }

        Command::Whoami { provider } => {
            let token = store
                .access_token(provider)
                .await?
                .ok_or_else(|| anyhow!("{provider} is not connected"))?;
            let profile = service.provider(provider).user_info(&token).await?;
            match &profile.display_name {
                Some(name) => println!("{name} <{}>", profile.email),
                None => println!("{}", profile.email),
            }
            Ok(())
        }
    }
}

/// OAuth client settings for one provider, with default scopes filled in.
struct ClientSettings {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: Vec<String>,
}

fn client_settings(settings: &Settings, provider: ProviderKind) -> ClientSettings {
    let (client_id, client_secret, redirect_uri, scopes) = match provider {
        ProviderKind::Gmail => (
            &settings.gmail.client_id,
            &settings.gmail.client_secret,
            &settings.gmail.redirect_uri,
            &settings.gmail.scopes,
        ),
        ProviderKind::Outlook => (
            &settings.outlook.client_id,
            &settings.outlook.client_secret,
            &settings.outlook.redirect_uri,
            &settings.outlook.scopes,
        ),
    };
    let defaults: &[&str] = match provider {
        ProviderKind::Gmail => &DEFAULT_GMAIL_SCOPES,
        ProviderKind::Outlook => &DEFAULT_OUTLOOK_SCOPES,
    };

    if client_id.is_empty() {
        tracing::warn!(provider = %provider, "No OAuth client ID configured");
    }

    ClientSettings {
        client_id: client_id.clone(),
        client_secret: client_secret.clone(),
        redirect_uri: redirect_uri.clone(),
        scopes: if scopes.is_empty() {
            defaults.iter().map(|s| s.to_string()).collect()
        } else {
            scopes.clone()
        },
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<Settings> {
    let mut settings = match path.or_else(Settings::default_path) {
        Some(path) => Settings::load_or_default(&path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    settings.apply_env(|name| std::env::var(name).ok());
    Ok(settings)
}

fn print_message(message: &NormalizedMessage) {
    println!(
        "[{:<7}] {:<24} {}",
        message.provider().as_str(),
        truncate(message.from(), 24),
        message.subject()
    );
    if !message.date().is_empty() {
        println!("          {}", message.date());
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}
