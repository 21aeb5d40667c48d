use clap::{Parser, Subcommand};

use crate::database::models::Role;
use crate::database::{manager, schema};
use crate::services::account_service::NewAccount;
use crate::services::{AccountService, AuditService};

#[derive(Parser)]
#[command(name = "talent")]
#[command(about = "Talent CLI - bootstrap and maintenance for the talent archive")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create the database schema (idempotent)")]
    Init,

    #[command(about = "Account management")]
    Account {
        #[command(subcommand)]
        cmd: AccountCommands,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    #[command(about = "Provision an account with its role's default permissions")]
    Create {
        username: String,
        password: String,

        #[arg(long, default_value = "standard", value_parser = parse_role)]
        role: Role,

        #[arg(long, help = "Grant the super-admin bypass")]
        super_admin: bool,

        #[arg(long, help = "Link the account to a person record")]
        person: Option<i64>,
    },
}

fn parse_role(s: &str) -> Result<Role, String> {
    match s {
        "standard" => Ok(Role::Standard),
        "admin" => Ok(Role::Admin),
        "display" => Ok(Role::Display),
        other => Err(format!("unknown role: {} (standard | admin | display)", other)),
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let pool = manager::connect_from_env().await?;

    match cli.command {
        Commands::Init => {
            schema::ensure_schema(&pool).await?;
            println!("schema ready");
        }
        Commands::Account { cmd } => match cmd {
            AccountCommands::Create {
                username,
                password,
                role,
                super_admin,
                person,
            } => {
                schema::ensure_schema(&pool).await?;
                let accounts = AccountService::new(pool.clone(), AuditService::new(pool.clone()));
                let account = accounts
                    .provision(NewAccount {
                        username,
                        password,
                        role,
                        is_super_admin: super_admin,
                        linked_person_id: person,
                    })
                    .await?;
                println!("created account {} (id {})", account.username, account.id);
            }
        },
    }

    Ok(())
}
