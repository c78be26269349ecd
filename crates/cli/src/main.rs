use clap::{Parser, Subcommand};
use portal_core::config::{resolve_credentials_path, resolve_data_dir};
use portal_core::constants::DEFAULT_COUNTERS;
use portal_core::records::Role;
use portal_core::routines::{
    BillingService, DiagnosticsService, NewUser, SeedingService, UserService, UserState,
};
use portal_core::{AdminContext, AdminResult, CoreConfig, EmailAddress, NonEmptyText};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "portal-admin")]
#[command(about = "Administrative data operations for the patient portal")]
struct Cli {
    /// Service credential file
    #[arg(long, env = "PORTAL_CREDENTIALS", global = true)]
    credentials: Option<PathBuf>,
    /// Directory backing the document store and identity provider
    #[arg(long, env = "PORTAL_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an identity and its profile document
    CreateUser {
        email: String,
        password: String,
        /// Display name
        name: String,
        /// One of admin, facility_admin, doctor, nurse, user
        role: String,
    },
    /// Look up a user by email
    FindUser { email: String },
    /// Report whether identity and profile agree for an email
    CheckUser { email: String },
    /// Set a new password for a user
    ResetPassword { email: String, new_password: String },
    /// Delete a user's profile document, then their identity
    DeleteUser { email: String },
    /// List bills
    ListBills {
        /// Maximum number of bills to show
        limit: Option<usize>,
    },
    /// List visits for a patient
    ListVisits { patient_id: String },
    /// List facilities linked to a user
    ListFacilities { user_id: String },
    /// Count documents in every collection
    CheckCollections,
    /// Create a sample invoice against a bill
    CreateInvoice {
        bill_id: String,
        amount_due: Option<f64>,
    },
    /// Create a sample payment against a bill
    CreatePayment {
        bill_id: String,
        amount: Option<f64>,
        payment_method: Option<String>,
    },
    /// Open a sample dispute against a bill
    CreateDispute {
        bill_id: String,
        reason: Option<String>,
    },
    /// Create counters at zero, leaving existing ones untouched
    InitCounters {
        /// Counter names (default: supplierId purchaseOrderId)
        names: Vec<String>,
    },
    /// Add to a counter
    IncrementCounter {
        name: String,
        #[arg(allow_negative_numbers = true)]
        by: Option<i64>,
    },
    /// Append the audit log sentinel entry
    SeedAudit,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("error: failed to initialise logging: {e:#}");
        return ExitCode::from(1);
    }

    let cli = Cli::parse();

    match execute(cli) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error [{}]: {e}", e.kind());
            ExitCode::from(e.exit_code())
        }
    }
}

fn execute(cli: Cli) -> AdminResult<Vec<String>> {
    let cfg = build_config(cli.credentials, cli.data_dir)?;
    let ctx = AdminContext::new(Arc::new(cfg));
    run(&ctx, cli.command)
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("portal=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

fn build_config(
    credentials: Option<PathBuf>,
    data_dir: Option<PathBuf>,
) -> AdminResult<CoreConfig> {
    let cfg = CoreConfig::new(
        resolve_credentials_path(credentials),
        resolve_data_dir(data_dir)?,
    )?;
    tracing::debug!(
        credentials = %cfg.credentials_path().display(),
        data_dir = %cfg.data_dir().display(),
        "configuration resolved"
    );
    Ok(cfg)
}

/// Executes one command and returns the lines it reports.
fn run(ctx: &AdminContext, command: Commands) -> AdminResult<Vec<String>> {
    let mut out = Vec::new();
    match command {
        Commands::CreateUser {
            email,
            password,
            name,
            role,
        } => {
            let new_user = NewUser {
                email: EmailAddress::parse(&email)?,
                password,
                name: NonEmptyText::new(&name)?,
                role: role.parse::<Role>()?,
            };
            let profile = UserService::new(ctx.connect()?).create_user(new_user)?;
            out.push(format!(
                "Created user {} ({}) with uid {} and role {}",
                profile.name, profile.email, profile.uid, profile.role
            ));
        }
        Commands::FindUser { email } => {
            let email = EmailAddress::parse(&email)?;
            let identity = UserService::new(ctx.connect()?).find_user_by_email(&email)?;
            out.push(format!("UID: {}", identity.uid));
            out.push(format!("Email: {}", identity.email));
            if let Some(name) = &identity.display_name {
                out.push(format!("Name: {name}"));
            }
            out.push(format!("Created: {}", identity.created_at.to_rfc3339()));
            out.push(format!("Disabled: {}", identity.disabled));
        }
        Commands::CheckUser { email } => {
            let email = EmailAddress::parse(&email)?;
            match UserService::new(ctx.connect()?).check_user(&email)? {
                UserState::Consistent { identity, profile } => {
                    out.push(format!(
                        "OK: identity {} has a profile ({}, {})",
                        identity.uid, profile.name, profile.role
                    ));
                }
                UserState::ProfileMissing { identity } => {
                    out.push(format!(
                        "INCONSISTENT: identity {} has no profile document; run `delete-user {email}` to finish deleting it",
                        identity.uid
                    ));
                }
                UserState::OrphanedProfiles { profiles } => {
                    out.push(format!("INCONSISTENT: no identity for {email}, but profile documents exist:"));
                    for stored in profiles {
                        out.push(format!("  {} ({}, {})", stored.id, stored.record.name, stored.record.role));
                    }
                }
            }
        }
        Commands::ResetPassword {
            email,
            new_password,
        } => {
            let email = EmailAddress::parse(&email)?;
            let identity =
                UserService::new(ctx.connect()?).reset_password(&email, &new_password)?;
            out.push(format!("Password updated for {} ({})", identity.email, identity.uid));
        }
        Commands::DeleteUser { email } => {
            let email = EmailAddress::parse(&email)?;
            let deleted = UserService::new(ctx.connect()?).delete_user(&email)?;
            if !deleted.profile_existed {
                out.push(format!("No profile document was present for {}", deleted.uid));
            }
            out.push(format!("Deleted user {} ({})", deleted.email, deleted.uid));
        }
        Commands::ListBills { limit } => {
            let bills = BillingService::new(ctx.connect()?).list_bills(limit)?;
            if bills.is_empty() {
                out.push("No bills found.".to_string());
            }
            for stored in bills {
                let bill = stored.record;
                out.push(format!(
                    "ID: {}, Patient: {}, Amount: {}, Status: {}",
                    stored.id,
                    bill.patient_id.as_deref().unwrap_or("-"),
                    bill.amount.map_or_else(|| "-".to_string(), |a| format!("{a:.2}")),
                    bill.status.as_deref().unwrap_or("-"),
                ));
            }
        }
        Commands::ListVisits { patient_id } => {
            let visits = DiagnosticsService::new(ctx.connect()?).list_visits(&patient_id)?;
            if visits.is_empty() {
                out.push(format!("No visits found for patient {patient_id}."));
            }
            for stored in visits {
                let visit = stored.record;
                out.push(format!(
                    "ID: {}, Facility: {}, Date: {}, Reason: {}",
                    stored.id,
                    visit.facility_id.as_deref().unwrap_or("-"),
                    visit
                        .visit_date
                        .map_or_else(|| "-".to_string(), |d| d.to_rfc3339()),
                    visit.reason.as_deref().unwrap_or("-"),
                ));
            }
        }
        Commands::ListFacilities { user_id } => {
            let links = DiagnosticsService::new(ctx.connect()?).list_facilities(&user_id)?;
            if links.is_empty() {
                out.push(format!("No facilities found for user {user_id}."));
            }
            for stored in links {
                let role = stored
                    .record
                    .role
                    .map_or_else(|| "-".to_string(), |r| r.to_string());
                out.push(format!(
                    "ID: {}, Facility: {}, Role: {}",
                    stored.id, stored.record.facility_id, role
                ));
            }
        }
        Commands::CheckCollections => {
            let counts = DiagnosticsService::new(ctx.connect()?).check_collections()?;
            for count in counts {
                if count.is_empty() {
                    out.push(format!("{}: empty", count.collection));
                } else {
                    out.push(format!("{}: {} documents", count.collection, count.documents));
                }
            }
        }
        Commands::CreateInvoice {
            bill_id,
            amount_due,
        } => {
            let created =
                BillingService::new(ctx.connect()?).create_sample_invoice(&bill_id, amount_due)?;
            out.push(format!(
                "Created invoice {} ({}) for bill {}, due {}",
                created.id,
                created.record.invoice_number,
                created.record.bill_id,
                created.record.due_date.to_rfc3339()
            ));
        }
        Commands::CreatePayment {
            bill_id,
            amount,
            payment_method,
        } => {
            let created = BillingService::new(ctx.connect()?).create_sample_payment(
                &bill_id,
                amount,
                payment_method.as_deref(),
            )?;
            out.push(format!(
                "Created payment {} of {:.2} for bill {}",
                created.id, created.record.amount, created.record.bill_id
            ));
        }
        Commands::CreateDispute { bill_id, reason } => {
            let created = BillingService::new(ctx.connect()?)
                .create_sample_dispute(&bill_id, reason.as_deref())?;
            out.push(format!(
                "Created dispute {} for bill {}",
                created.id, created.record.bill_id
            ));
        }
        Commands::InitCounters { names } => {
            let names: Vec<String> = if names.is_empty() {
                DEFAULT_COUNTERS.iter().map(|n| n.to_string()).collect()
            } else {
                names
            };
            let seeded = SeedingService::new(ctx.connect()?).seed_counters(&names)?;
            for seed in seeded {
                if seed.created {
                    out.push(format!("{}: created at {}", seed.name, seed.value));
                } else {
                    out.push(format!("{}: already present at {}, unchanged", seed.name, seed.value));
                }
            }
        }
        Commands::IncrementCounter { name, by } => {
            let value = SeedingService::new(ctx.connect()?).increment_counter(&name, by.unwrap_or(1))?;
            out.push(format!("{name}: {value}"));
        }
        Commands::SeedAudit => {
            let entry = SeedingService::new(ctx.connect()?).seed_audit_sentinel()?;
            out.push(format!("Appended audit entry {}", entry.id));
        }
    }
    Ok(out)
}
