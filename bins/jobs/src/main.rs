//! Folio scheduled jobs.
//!
//! Usage:
//!   folio-jobs generate-recurring --actor <uuid>
//!   folio-jobs post-documents --company <uuid> --actor <uuid>
//!   folio-jobs allocate-payment --payment <uuid> --actor <uuid>
//!   folio-jobs match-invoice --invoice <uuid> [--tolerance <percent>]
//!
//! Every job accepts `--as-of <rfc3339>` to replay a run at a fixed instant.
//! Batch jobs exit non-zero when any unit failed; the others still commit.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use folio_core::ledger::PostingContext;
use folio_core::matching::ThreeWayMatcher;
use folio_db::{AllocationRepository, DocumentRepository, MatchingRepository, RecurringRepository};
use folio_shared::types::{CompanyId, InvoiceId, PaymentId, UserId};
use folio_shared::{AppConfig, AppError};

#[derive(Parser)]
#[command(name = "folio-jobs")]
#[command(about = "Scheduled ledger jobs for Folio")]
struct Cli {
    /// Instant the run is considered to happen at (defaults to now).
    #[arg(long, global = true)]
    as_of: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a draft entry for every recurring template due today.
    GenerateRecurring {
        /// User recorded as creator of the generated entries.
        #[arg(long, env = "FOLIO_JOB_ACTOR")]
        actor: Uuid,
    },

    /// Post every unposted, postable document of a company.
    PostDocuments {
        /// Company whose documents are posted.
        #[arg(long)]
        company: Uuid,
        /// User recorded as poster.
        #[arg(long, env = "FOLIO_JOB_ACTOR")]
        actor: Uuid,
    },

    /// Allocate a payment's unallocated amount to its party's open invoices.
    AllocatePayment {
        /// Payment to allocate.
        #[arg(long)]
        payment: Uuid,
        /// User recorded on the allocations.
        #[arg(long, env = "FOLIO_JOB_ACTOR")]
        actor: Uuid,
    },

    /// Three-way match a supplier invoice and store the result.
    MatchInvoice {
        /// Supplier invoice to match.
        #[arg(long)]
        invoice: Uuid,
        /// Accepted variance percentage (defaults to the configured value).
        #[arg(long)]
        tolerance: Option<Decimal>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().map_err(AppError::from)?;
    let db = folio_db::connect_with(&config.database).await?;
    info!("Connected to database");

    let as_of = cli.as_of.unwrap_or_else(Utc::now);
    let prefix = config.engine.entry_number_prefix.clone();

    match cli.command {
        Command::GenerateRecurring { actor } => {
            let ctx = PostingContext::new(UserId::from(actor), as_of);
            let outcome = RecurringRepository::new(db)
                .with_entry_number_prefix(prefix)
                .generate_due(&ctx)
                .await
                .map_err(AppError::from)?;
            if !outcome.is_complete_success() {
                anyhow::bail!(
                    "{} of {} recurring templates failed",
                    outcome.failed.len(),
                    outcome.processed()
                );
            }
        }
        Command::PostDocuments { company, actor } => {
            let ctx = PostingContext::new(UserId::from(actor), as_of);
            let outcome = DocumentRepository::new(db)
                .with_entry_number_prefix(prefix)
                .post_outstanding_documents(CompanyId::from(company), &ctx)
                .await
                .map_err(AppError::from)?;
            if !outcome.is_complete_success() {
                anyhow::bail!(
                    "{} of {} documents failed to post",
                    outcome.failed.len(),
                    outcome.processed()
                );
            }
        }
        Command::AllocatePayment { payment, actor } => {
            let ctx = PostingContext::new(UserId::from(actor), as_of);
            let allocations = AllocationRepository::new(db)
                .allocate_automatic(PaymentId::from(payment), &ctx)
                .await
                .map_err(AppError::from)?;
            info!(payment_id = %payment, invoices = allocations.len(), "Allocation job finished");
        }
        Command::MatchInvoice { invoice, tolerance } => {
            let matcher = ThreeWayMatcher::new(config.engine.price_tolerance);
            let tolerance = tolerance.unwrap_or(config.engine.default_tolerance_percentage);
            let matching = MatchingRepository::new(db)
                .match_invoice(InvoiceId::from(invoice), tolerance, &matcher, as_of)
                .await
                .map_err(AppError::from)?;
            info!(
                invoice_id = %invoice,
                status = ?matching.matching_status,
                within_tolerance = matching.is_within_tolerance,
                "Matching job finished"
            );
        }
    }

    Ok(())
}
