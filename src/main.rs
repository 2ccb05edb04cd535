use std::{process, sync::Arc};

use clap::Parser;
use lectern::{
    application::{articles::ArticleRepository, error::AppError, repos::Store},
    cache::{ArticleCache, CacheConfig},
    config::{self, CliArgs, Command},
    domain::entities::ArticleRecord,
    infra::{db::PostgresRepositories, error::InfraError, telemetry},
};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let chain = error.chain();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?chain, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?chain, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let cli_args = CliArgs::parse();
    let settings = config::load(&cli_args)?;

    telemetry::init(&settings.logging)?;

    let pool = connect(&settings).await?;
    match cli_args.command {
        Command::Migrate => run_migrate(&pool).await,
        Command::Recent(args) => {
            let articles = article_repository(&settings, pool, None);
            print_json(&articles.get_recent_articles(args.count).await?)
        }
        Command::Random(args) => {
            let articles = article_repository(&settings, pool, args.seed);
            print_json(&articles.get_randomly(args.count.count).await?)
        }
        Command::Show(args) => {
            let articles = article_repository(&settings, pool, None);
            let article = articles
                .get_by_permalink(&args.permalink)
                .await?
                .ok_or(AppError::NotFound)?;
            print_json(&article)
        }
        Command::Neighbors(args) => {
            let articles = article_repository(&settings, pool, None);
            if articles.get(&args.id).await?.is_none() {
                return Err(AppError::NotFound);
            }
            let previous = articles.get_previous_article(&args.id).await?;
            let next = articles.get_next_article(&args.id).await?;
            print_json(&json!({ "previous": previous, "next": next }))
        }
    }
}

async fn connect(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn run_migrate(pool: &PgPool) -> Result<(), AppError> {
    PostgresRepositories::run_migrations(pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;
    info!(target = "lectern::migrate", "migrations applied");
    Ok(())
}

fn article_repository(
    settings: &config::Settings,
    pool: PgPool,
    seed: Option<u64>,
) -> ArticleRepository {
    let store: Arc<dyn Store<ArticleRecord>> = Arc::new(PostgresRepositories::new(pool));
    let cache = Arc::new(ArticleCache::new(&CacheConfig::from(&settings.cache)));
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    ArticleRepository::with_rng(store, cache, rng)
        .with_pivot_offset(settings.sampling.pivot_offset)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
