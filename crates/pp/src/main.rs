mod files_cmd;
mod output;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pp_core::{
    collect::members::MemberFilters,
    config::Config,
    domain::Caller,
    platform::{
        governor::RateLimitNotice,
        port::PlatformClient,
        throttled::{ThrottleConfig, ThrottledPlatform},
    },
    service::{CollectionService, ServiceSettings},
    store::JsonFileStore,
    utils::AuditLogger,
};
use pp_gateway::GatewayClient;

use files_cmd::FileCommands;

#[derive(Parser)]
#[command(name = "pp")]
#[command(about = "Collect chat members and channel commenters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect the members of a chat
    Members {
        /// Username, t.me link or numeric id
        chat: String,
        #[arg(long)]
        premium_only: bool,
        #[arg(long)]
        with_phone: bool,
        /// Only users seen within this many hours (0 = no limit)
        #[arg(long, value_name = "HOURS")]
        last_seen: Option<u32>,
        /// Save the result under this file name
        #[arg(long, value_name = "NAME")]
        save: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Collect the commenters of a channel's recent posts
    Comments {
        /// Username, t.me link or numeric id
        channel: String,
        /// Number of recent posts to scan
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, value_name = "NAME")]
        save: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Manage saved result files
    Files {
        #[command(subcommand)]
        command: FileCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    pp_core::logging::init("pp")?;
    let cli = Cli::parse();
    let cfg = Config::load()?;

    let gateway = GatewayClient::new(
        cfg.gateway_url.clone(),
        cfg.gateway_token.clone(),
        cfg.request_timeout,
    )?;
    let platform: Arc<dyn PlatformClient> = Arc::new(ThrottledPlatform::new(
        Arc::new(gateway),
        ThrottleConfig {
            min_interval: cfg.min_call_interval,
        },
    ));
    let store = Arc::new(JsonFileStore::open(&cfg.data_dir)?);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current call");
            on_ctrl_c.cancel();
        }
    });

    let service = CollectionService::new(ServiceSettings::from(&cfg), platform, store)
        .with_audit(AuditLogger::new(&cfg.audit_log_path, cfg.audit_log_json))
        .with_observer(Arc::new(|notice: &RateLimitNotice| {
            eprintln!("{}", output::rate_limit_notice(notice));
        }))
        .cancel_token(cancel);

    let caller = Caller::new(cfg.operator_id);
    info!(operator = caller.id.0, data_dir = %cfg.data_dir.display(), "pp starting");

    match cli.command {
        Commands::Members {
            chat,
            premium_only,
            with_phone,
            last_seen,
            save,
            page,
        } => {
            let filters = MemberFilters {
                premium_only,
                with_phone,
                max_hours_since_seen: last_seen,
            };
            let run = service.collect_members(&caller, &chat, &filters).await?;
            if run.result.is_empty() {
                println!("{}", output::NO_MEMBERS);
                return Ok(());
            }
            let view = run.result.page(page, service.page_size());
            print!("{}", output::members_page(&view, service.page_size()));
            if let Some(name) = save {
                let saved = service
                    .save_members(&caller, &run, &filters, Some(&name))
                    .await?;
                println!("Saved as #{} ({})", saved.id, saved.file_path.display());
            }
        }
        Commands::Comments {
            channel,
            limit,
            save,
            page,
        } => {
            let message_limit = Some(limit).filter(|n| *n > 0);
            let run = service
                .collect_commenters(&caller, &channel, message_limit)
                .await?;
            if run.result.is_empty() {
                println!("{}", output::no_comments(limit));
                return Ok(());
            }
            let view = run.result.page(page, service.page_size());
            print!("{}", output::commenters_page(&view, service.page_size()));
            if run.stats.truncated() {
                println!(
                    "Note: {} thread(s) had more replies than were scanned.",
                    run.stats.truncated_threads.len()
                );
            }
            if let Some(name) = save {
                let saved = service
                    .save_commenters(&caller, &run, message_limit, Some(&name))
                    .await?;
                println!("Saved as #{} ({})", saved.id, saved.file_path.display());
            }
        }
        Commands::Files { command } => files_cmd::run(&service, &caller, command).await?,
    }

    Ok(())
}
