use billing_coordinator::application::lifecycle::SubscriptionManager;
use billing_coordinator::application::provisioning::PaymentMethodCoordinator;
use billing_coordinator::config::BillingConfig;
use billing_coordinator::domain::account::AccountId;
use billing_coordinator::domain::billing_details::{Address, BillingDetails, CardHandle};
use billing_coordinator::domain::ports::EventSinkRef;
use billing_coordinator::error::BillingError;
use billing_coordinator::infrastructure::events::ChannelEventSink;
use billing_coordinator::infrastructure::in_memory::InMemoryBillingBackend;
use billing_coordinator::interfaces::json::fixture_reader::FixtureReader;
use billing_coordinator::interfaces::json::report_writer::{AccountReport, ReportWriter};
use clap::{ArgAction, Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Runs the billing flows against a simulated backend seeded from a fixture.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Billing accounts fixture (JSON)
    #[arg(long)]
    accounts: PathBuf,

    /// JSON file overriding user-facing fallback messages
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated latency of every remote call, in milliseconds
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the subscription panel state of an account
    Show { account: String },
    /// Add a card to an account
    AddCard(AddCardArgs),
    /// Cancel the subscription of an account at the end of its billing period
    Cancel { account: String },
}

#[derive(Args)]
struct AddCardArgs {
    account: String,

    /// Card capture handle issued by the gateway widget (e.g. tok_visa)
    #[arg(long)]
    card: String,

    /// Cardholder name
    #[arg(long)]
    name: String,

    #[arg(long)]
    line1: String,

    #[arg(long)]
    line2: Option<String>,

    #[arg(long)]
    city: String,

    /// State or province
    #[arg(long)]
    state: String,

    #[arg(long)]
    postal_code: String,

    /// Two-letter country code
    #[arg(long)]
    country: String,
}

impl AddCardArgs {
    fn billing_details(&self) -> BillingDetails {
        BillingDetails {
            name: self.name.clone(),
            address: Address {
                line1: self.line1.clone(),
                line2: self.line2.clone(),
                city: self.city.clone(),
                state: self.state.clone(),
                postal_code: self.postal_code.clone(),
                country: self.country.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => BillingConfig::load(path).into_diagnostic()?,
        None => BillingConfig::default(),
    };

    let backend = InMemoryBillingBackend::new().with_latency(Duration::from_millis(cli.latency_ms));
    let file = File::open(&cli.accounts).into_diagnostic()?;
    for fixture in FixtureReader::new(file).accounts().into_diagnostic()? {
        backend
            .insert_account(fixture.account, fixture.period_ends_at)
            .await;
    }

    let backend = Arc::new(backend);
    let (sink, mut events) = ChannelEventSink::new();
    let sink: EventSinkRef = Arc::new(sink);
    let coordinator = PaymentMethodCoordinator::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        sink.clone(),
        config.clone(),
    );
    let manager = SubscriptionManager::new(backend.clone(), backend.clone(), sink, config);

    let account_id = match &cli.command {
        Command::Show { account } | Command::Cancel { account } => AccountId::new(account),
        Command::AddCard(args) => AccountId::new(&args.account),
    };
    if backend.account(&account_id).await.is_none() {
        return Err(BillingError::UnknownAccount(account_id)).into_diagnostic();
    }

    let mut added_payment_method = None;
    match &cli.command {
        Command::Show { .. } => {}
        Command::AddCard(args) => {
            let card = CardHandle::new(&args.card).into_diagnostic()?;
            let billing_details = args.billing_details();
            billing_details.validate().into_diagnostic()?;
            let method = coordinator
                .begin_provisioning(&account_id, card, billing_details)
                .await
                .into_diagnostic()?;
            added_payment_method = Some(method);
        }
        Command::Cancel { .. } => {
            manager.cancel(&account_id).await.into_diagnostic()?;
        }
    }

    let subscription = manager.refresh(&account_id).await.into_diagnostic()?;
    let mut published = Vec::new();
    while let Ok(event) = events.try_recv() {
        published.push(event);
    }

    let report = AccountReport {
        overview: manager.overview(&subscription),
        account_id,
        subscription,
        added_payment_method,
        events: published,
    };
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_report(&report).into_diagnostic()?;

    Ok(())
}
