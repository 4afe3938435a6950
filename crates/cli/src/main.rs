use clap::{Parser, Subcommand};
use healthcure_core::config::token_ttl_from_env_value;
use healthcure_core::{AccountService, ClinicStore, CoreConfig, DoctorService};
use healthcure_types::PhoneNumber;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "healthcure")]
#[command(about = "HealthCure clinic administration CLI")]
struct Cli {
    /// Directory holding the service stores
    #[arg(long, env = "HEALTHCURE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
    /// Secret used to sign session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true, global = true)]
    jwt_secret: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a verified administrator account
    CreateAdmin {
        email: String,
        name: String,
        password: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// List all user accounts
    ListUsers,
    /// Load the default doctor roster into an empty store
    SeedDoctors,
    /// Print the normalised form of a phone number
    NormalisePhone { phone: String },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

fn run(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        writeln!(out, "Use 'healthcure --help' for commands")?;
        return Ok(());
    };

    if let Commands::NormalisePhone { phone } = &command {
        match PhoneNumber::normalise(phone) {
            Some(normalised) => writeln!(out, "{}", normalised)?,
            None => anyhow::bail!("'{}' contains no digits", phone),
        }
        return Ok(());
    }

    let cfg = Arc::new(config(cli.data_dir, cli.jwt_secret)?);
    match command {
        Commands::CreateAdmin {
            email,
            name,
            password,
            phone,
        } => {
            let accounts = AccountService::open(cfg)?;
            let admin = accounts.create_admin(&email, &name, &password, phone.as_deref())?;
            writeln!(out, "Created admin {} ({})", admin.email, admin.id)?;
        }
        Commands::ListUsers => {
            let users = AccountService::open(cfg)?.users()?;
            if users.is_empty() {
                writeln!(out, "No users found.")?;
            }
            for user in users {
                writeln!(
                    out,
                    "ID: {}, Email: {}, Role: {}, Verified: {}, Patient: {}",
                    user.id,
                    user.email,
                    user.role.as_str(),
                    user.is_verified,
                    user.patient_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".into()),
                )?;
            }
        }
        Commands::SeedDoctors => {
            let doctors = DoctorService::new(Arc::new(ClinicStore::open(&cfg)?));
            match doctors.seed_defaults()? {
                0 => writeln!(out, "Doctors already present, nothing seeded.")?,
                n => writeln!(out, "Seeded {} doctors.", n)?,
            }
        }
        Commands::NormalisePhone { .. } => {}
    }
    Ok(())
}

/// Store-backed configuration. The CLI never runs in memory.
fn config(data_dir: Option<PathBuf>, jwt_secret: Option<String>) -> anyhow::Result<CoreConfig> {
    let data_dir = data_dir.ok_or_else(|| anyhow::anyhow!("HEALTHCURE_DATA_DIR must be set"))?;
    let jwt_secret = jwt_secret.ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?;
    Ok(CoreConfig::new(
        Some(data_dir),
        jwt_secret,
        token_ttl_from_env_value(None)?,
        false,
    )?)
}
