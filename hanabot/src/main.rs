use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hanabot::commands::{self, Group};
use hanabot::{BotSettings, Dispatcher, Hanabot};
use hanabot_channels::{ConsoleTransport, IrcTransport, Transport, CONSOLE_CHANNEL};
use hanabot_common::config::{normalize_channel, Config, SessionScope};
use hanabot_common::logging::init_logging_with_exclusions;
use tracing::info;

/// hanabot - Hanabi for IRC channels.
#[derive(Parser, Debug)]
#[command(name = "hanabot")]
#[command(version)]
#[command(about = "Runs Hanabi games for IRC channels.", long_about = None)]
struct Cli {
    /// Config file (default: ~/.hanabot/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to IRC and serve games
    Run {
        /// IRC server host
        #[arg(short, long)]
        server: Option<String>,

        /// IRC server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Home channel
        #[arg(short, long)]
        channel: Option<String>,

        /// Bot nickname
        #[arg(short, long)]
        nick: Option<String>,

        /// Session scope (named, channel)
        #[arg(long)]
        scope: Option<SessionScope>,

        /// Log level
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// Play locally on stdin/stdout
    Console {
        /// Nick used for plain input lines
        #[arg(long, default_value = "player")]
        user: String,

        /// Session scope (named, channel)
        #[arg(long)]
        scope: Option<SessionScope>,

        /// Log level
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// List the command table
    Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load_with_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            server,
            port,
            channel,
            nick,
            scope,
            log_level,
        } => {
            if let Some(server) = server {
                config.irc.server = server;
            }
            if let Some(port) = port {
                config.irc.port = port;
            }
            if let Some(channel) = channel {
                config.irc.channel = normalize_channel(&channel);
            }
            if let Some(nick) = nick {
                config.irc.nickname = nick;
            }
            apply_common(&mut config, scope, log_level)?;

            let transport: Arc<dyn Transport> = Arc::new(IrcTransport::new(&config.irc));
            let dispatcher = Dispatcher::from_config(&config)?;
            info!(
                server = %config.irc.server,
                port = config.irc.port,
                channel = %config.irc.home_channel(),
                "starting hanabot"
            );
            Hanabot::new(transport, dispatcher, BotSettings::from_config(&config))
                .run()
                .await
        }
        Commands::Console {
            user,
            scope,
            log_level,
        } => {
            // the console has no IRC control codes
            if config.router.markup == "irc" {
                config.router.markup = "xterm".into();
            }
            apply_common(&mut config, scope, log_level)?;

            let transport: Arc<dyn Transport> =
                Arc::new(ConsoleTransport::new(user, config.irc.nickname.clone()));
            let dispatcher = Dispatcher::from_config(&config)?.with_home_channel(CONSOLE_CHANNEL);
            let settings = BotSettings {
                topic: None,
                ..BotSettings::from_config(&config)
            };
            Hanabot::new(transport, dispatcher, settings).run().await
        }
        Commands::Commands => {
            print_commands(config.router.sigil_char());
            Ok(())
        }
    }
}

/// Overrides shared by every serving subcommand, then validation and logging.
fn apply_common(
    config: &mut Config,
    scope: Option<SessionScope>,
    log_level: Option<String>,
) -> Result<()> {
    if let Some(scope) = scope {
        config.router.scope = scope;
    }
    if let Some(level) = log_level {
        config.observability.log_level = level;
    }
    config.validate().context("invalid configuration")?;

    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );
    Ok(())
}

fn print_commands(sigil: char) {
    for group in Group::USER.iter().copied().chain([Group::Admin]) {
        println!("{}", group.as_str());
        for spec in commands::COMMANDS.iter().filter(|c| c.group == group) {
            let needs = if spec.needs_session { " (needs game)" } else { "" };
            println!("  {:<28}{needs}", spec.signature());
            println!("      {}", spec.usage(sigil));
        }
        println!();
    }
}
