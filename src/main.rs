//! Admin CLI for the Maktaba backend.
//!
//! Drives the data layer the same way the web UI does: cached reads,
//! optimistic settings updates, bulk user administration. Useful for
//! scripting and for poking the backend without a browser.

use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use maktaba::api::types::{SettingsSection, SettingsUpdate, UserFilters};
use maktaba::{
  ApiClient, CancelToken, Config, HttpClient, MaktabaClient, Severity, StaticTokens,
};

#[derive(Parser, Debug)]
#[command(name = "maktaba")]
#[command(about = "Admin CLI for the Maktaba library management backend")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/maktaba/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Inspect or change the current user's settings
  Settings {
    #[command(subcommand)]
    action: SettingsCommand,
  },
  /// List users and run bulk administrative actions
  Users {
    #[command(subcommand)]
    action: UsersCommand,
  },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
  /// Print the current settings
  Show,
  /// Change individual preferences
  Set {
    /// Visual theme: light, dark or auto
    #[arg(long)]
    theme: Option<String>,
    /// UI language: en or ar
    #[arg(long)]
    language: Option<String>,
    /// Rows per page in list views
    #[arg(long)]
    items_per_page: Option<u32>,
  },
  /// Reset a section (general, appearance, notifications, security) or all
  Reset { section: String },
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
  /// List users
  List {
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    role: Option<String>,
    #[arg(long)]
    page: Option<u32>,
  },
  /// Activate the given user ids
  Activate { ids: Vec<String> },
  /// Deactivate the given user ids
  Deactivate { ids: Vec<String> },
  /// Delete the given user ids
  Delete { ids: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let token = Config::api_token()?;

  let http = HttpClient::new(config.base_url()?, Arc::new(StaticTokens::new(token)))?;
  let api = Arc::new(ApiClient::new(http));
  let (client, mut notifications) = MaktabaClient::new(api);
  let client = match config.stale_time_minutes {
    Some(minutes) => client.with_stale_time(chrono::Duration::minutes(minutes)),
    None => client,
  };

  // The CLI runs one command to completion; nothing ever tears it down
  // mid-flight.
  let cancel = CancelToken::never();

  let outcome = run(&client, &cancel, args.command).await;

  // Render whatever the data layer reported, toast-style.
  while let Ok(notification) = notifications.try_recv() {
    let prefix = match notification.severity {
      Severity::Success => "ok",
      Severity::Error => "error",
      Severity::Info => "info",
    };
    match notification.detail {
      Some(detail) => eprintln!("[{prefix}] {}: {detail}", notification.title),
      None => eprintln!("[{prefix}] {}", notification.title),
    }
  }

  outcome
}

async fn run(client: &MaktabaClient, cancel: &CancelToken, command: Command) -> Result<()> {
  match command {
    Command::Settings { action } => match action {
      SettingsCommand::Show => {
        let settings = client.settings().await?;
        println!("{}", serde_json::to_string_pretty(&settings)?);
      }
      SettingsCommand::Set {
        theme,
        language,
        items_per_page,
      } => {
        let current = client.settings().await?;
        let mut update = SettingsUpdate::default();

        if let Some(theme) = theme {
          let mut appearance = current.appearance.clone();
          appearance.theme = theme.parse().map_err(|e: String| eyre!(e))?;
          update.appearance = Some(appearance);
        }
        if language.is_some() || items_per_page.is_some() {
          let mut general = current.general.clone();
          if let Some(language) = language {
            general.language = language;
          }
          if let Some(items_per_page) = items_per_page {
            general.items_per_page = items_per_page;
          }
          update.general = Some(general);
        }

        if update == SettingsUpdate::default() {
          return Err(eyre!("nothing to change; pass at least one --flag"));
        }
        client.update_settings(update, cancel).await?;
      }
      SettingsCommand::Reset { section } => {
        let section: SettingsSection = section.parse().map_err(|e: String| eyre!(e))?;
        client.reset_settings(section, cancel).await?;
      }
    },
    Command::Users { action } => match action {
      UsersCommand::List { search, role, page } => {
        let filters = UserFilters {
          search,
          role,
          page: page.unwrap_or(1),
          ..UserFilters::default()
        };
        let users = client.users(filters).await?;
        println!("{}", serde_json::to_string_pretty(&users)?);
      }
      UsersCommand::Activate { ids } => {
        client.bulk_set_active(ids, true, cancel).await?;
      }
      UsersCommand::Deactivate { ids } => {
        client.bulk_set_active(ids, false, cancel).await?;
      }
      UsersCommand::Delete { ids } => {
        client.bulk_delete(ids, cancel).await?;
      }
    },
  }
  Ok(())
}
