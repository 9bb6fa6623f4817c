mod cli;
mod commands;
mod config;
mod output;

use dbdesk::backup::BackupOptions;
use dbdesk::pg::{DEFAULT_POOL_SIZE, create_pool_with_config, redact_url};
use dbdesk::{ConnectionContext, PgDatabase};
use tracing_subscriber::EnvFilter;

use cli::{Action, Command};
use config::ConfigFile;

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let (global, action) = match cli::parse_args(&args)? {
        Command::Help(topic) => {
            cli::print_help(topic);
            return Ok(());
        }
        Command::Run(global, action) => (global, action),
    };

    let file = ConfigFile::load(&global.config, global.config_explicit)?;
    init_logging(&file.logging.level);
    tracing::debug!(
        config = %global.config.display(),
        from_file = global.config.exists(),
        "configuration loaded"
    );

    let url = file.database_url(global.database.as_deref())?;
    let pool = create_pool_with_config(&url, file.database.pool_size.unwrap_or(DEFAULT_POOL_SIZE))?;
    let ctx = ConnectionContext::new(PgDatabase::new(pool), redact_url(&url)).with_config(file.admin);
    let json = global.json;

    match action {
        Action::Tables => commands::tables(&ctx, json).await,
        Action::Describe { table } => commands::describe(&ctx, json, &table).await,
        Action::Browse {
            table,
            page,
            per_page,
        } => commands::browse_table(&ctx, json, &table, page, per_page).await,
        Action::Build { spec, surface } => commands::build(&ctx, json, &spec, surface).await,
        Action::Exec { statement, yes } => commands::exec(&ctx, json, &statement, yes).await,
        Action::Sql { sql, confirm } => commands::sql(&ctx, json, sql, confirm).await,
        Action::Backup {
            tables,
            structure,
            data,
            output,
        } => {
            let options = BackupOptions {
                include_structure: structure,
                include_data: data,
            };
            commands::backup(&ctx, &tables, options, output.as_ref()).await
        }
        Action::Restore { input } => commands::restore(&ctx, json, &input).await,
    }
}

/// `RUST_LOG` wins over `logging.level`. Logs go to stderr so stdout stays
/// usable for dumps and JSON.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
