// ============================
// crates/backend-bin/src/main.rs
// ============================
//! `gymtrack` operator CLI: password hashes for seeding, signing secrets and
//! token inspection.
use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gymtrack_backend::auth::{
    hasher_for, token_generator::generate_signing_secret_with_size, PasswordHasher as _,
    TokenIssuer,
};
use gymtrack_backend::clock::{Clock, SystemClock};
use gymtrack_backend::config::{PasswordAlgorithm, Settings, MIN_SECRET_BYTES};
use gymtrack_common::{AccountId, Role};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gymtrack", version, about = "GymTrack backend operator tools")]
struct Cli {
    /// Settings file; defaults to `config.toml` in the working directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a password from stdin and print its PHC hash
    HashPassword {
        #[arg(long, value_enum, default_value_t = Algorithm::Scrypt)]
        algorithm: Algorithm,
    },
    /// Print a random URL-safe token signing secret
    GenSecret {
        /// Random bytes before encoding
        #[arg(long, default_value_t = 48)]
        bytes: usize,
    },
    /// Mint a token with the configured secret and TTL
    IssueToken {
        #[arg(long)]
        subject: AccountId,
        #[arg(long, default_value = "user")]
        role: Role,
    },
    /// Check a token's signature and expiry and print its claims
    VerifyToken { token: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Algorithm {
    Scrypt,
    Argon2,
}

impl From<Algorithm> for PasswordAlgorithm {
    fn from(value: Algorithm) -> Self {
        match value {
            Algorithm::Scrypt => PasswordAlgorithm::Scrypt,
            Algorithm::Argon2 => PasswordAlgorithm::Argon2,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::HashPassword { algorithm } => {
            init_tracing("warn");
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read password from stdin")?;
            let secret = line.trim_end_matches(['\r', '\n']);
            if secret.is_empty() {
                bail!("password must not be empty");
            }
            let hash = hasher_for(algorithm.into()).hash(secret)?;
            println!("{hash}");
        },
        Command::GenSecret { bytes } => {
            init_tracing("warn");
            if bytes < MIN_SECRET_BYTES {
                bail!("a signing secret needs at least {MIN_SECRET_BYTES} bytes");
            }
            println!("{}", generate_signing_secret_with_size(bytes));
        },
        Command::IssueToken { subject, role } => {
            let settings = load_settings(cli.config.as_ref())?;
            init_tracing(&settings.log_level);
            let issuer = TokenIssuer::from_settings(&settings.auth)?;
            let token = issuer.issue(subject, role, SystemClock.now())?;
            info!(%subject, %role, ttl_secs = issuer.ttl().num_seconds(), "token issued");
            println!("{token}");
        },
        Command::VerifyToken { token } => {
            let settings = load_settings(cli.config.as_ref())?;
            init_tracing(&settings.log_level);
            let issuer = TokenIssuer::from_settings(&settings.auth)?;
            let claims = issuer.verify(&token, SystemClock.now())?;
            debug!(subject = %claims.sub, "token verified");
            println!("sub:  {}", claims.sub);
            println!("role: {}", claims.role);
            if let Some(issued) = claims.issued_at() {
                println!("iat:  {}", issued.to_rfc3339());
            }
            if let Some(expires) = claims.expires_at() {
                println!("exp:  {}", expires.to_rfc3339());
            }
        },
    }

    Ok(())
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Settings::load().context("failed to load settings"),
    }
}

/// `RUST_LOG` wins; otherwise `fallback`
fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
