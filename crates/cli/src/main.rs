//! Timberline cart CLI - drive the storefront cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! tl-cart show
//!
//! # Add two units of a product
//! tl-cart add 42 --name "Oak Bench" --price 249.00 --quantity 2
//!
//! # Log in with a token issued by the storefront and merge the guest cart
//! tl-cart login --token "$TOKEN"
//!
//! # Apply a coupon (logged-in only)
//! tl-cart coupon OAK10
//! ```
//!
//! # Environment Variables
//!
//! - `TIMBERLINE_API_URL` - Base URL of the storefront cart API (required)
//! - `TIMBERLINE_STORAGE_DIR` - Directory for the local cart (default `.timberline`)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Error tracking (optional)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timberline_core::{ProductId, SpecificationId};
use timberline_storefront::config::StorefrontConfig;

mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "tl-cart")]
#[command(author, version, about = "Timberline storefront cart")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        id: ProductId,

        /// Product display name
        #[arg(short, long)]
        name: String,

        /// Unit price
        #[arg(short, long)]
        price: Decimal,

        /// Units to add
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,

        /// Product image URL
        #[arg(long)]
        image: Option<String>,

        /// Specification (variant) ID
        #[arg(long)]
        variant: Option<SpecificationId>,
    },
    /// Remove a product from the cart
    Remove {
        /// Product ID
        id: ProductId,
    },
    /// Increase a line's quantity
    Inc {
        /// Product ID
        id: ProductId,

        /// Units to add
        #[arg(default_value_t = 1)]
        amount: u32,
    },
    /// Decrease a line's quantity, removing it at zero
    Dec {
        /// Product ID
        id: ProductId,

        /// Units to remove
        #[arg(default_value_t = 1)]
        amount: u32,
    },
    /// Set a line's quantity; zero or less removes it
    Set {
        /// Product ID
        id: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the local cart
    Clear,
    /// Apply a coupon code
    Coupon {
        /// Coupon code
        code: String,
    },
    /// Reconcile the local cart with the account cart
    Sync,
    /// Store an auth token and merge the guest cart into the account cart
    Login {
        /// Bearer token issued by the storefront
        #[arg(long, env = "TIMBERLINE_AUTH_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Log out and clear the local cart
    Logout,
    /// Detect and clear a server session left without a local token
    CheckSession,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "timberline_storefront=info,timberline_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), CliError> {
    let ctx = Context::new(config)?;

    if let Err(e) = ctx.cart.initialize().await {
        tracing::warn!(error = %e, "Continuing with local cart");
    }

    match cli.command {
        Commands::Show => commands::cart::show(&ctx)?,
        Commands::Add {
            id,
            name,
            price,
            quantity,
            image,
            variant,
        } => commands::cart::add(&ctx, id, name, price, quantity, image, variant).await?,
        Commands::Remove { id } => ctx.cart.remove_item(&id).await?,
        Commands::Inc { id, amount } => ctx.cart.increase_quantity(&id, amount).await?,
        Commands::Dec { id, amount } => ctx.cart.decrease_quantity(&id, amount).await?,
        Commands::Set { id, quantity } => ctx.cart.set_quantity(&id, quantity).await?,
        Commands::Clear => ctx.cart.clear(),
        Commands::Coupon { code } => ctx.cart.apply_coupon(&code).await?,
        Commands::Sync => commands::cart::sync(&ctx).await?,
        Commands::Login { token } => commands::session::login(&ctx, token.into()).await?,
        Commands::Logout => commands::session::logout(&ctx).await?,
        Commands::CheckSession => commands::session::check(&ctx).await,
    }
    Ok(())
}
