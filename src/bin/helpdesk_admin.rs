use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use helpdesk_api::{
    auth::{AuthConfig, AuthService, Role},
    config::{self, AppConfig},
    db::{self, DbPool, TenantSchemas},
    services::tenants::{CreateTenantInput, TenantService},
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    match cli.command {
        Commands::Migrate => {
            let pool = connect(&cfg).await?;
            db::run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::CreateTenant(args) => create_tenant(&cfg, args, cli.json).await?,
        Commands::ProvisionTenant(args) => {
            let pool = connect(&cfg).await?;
            let schemas = TenantSchemas::new(Arc::new(pool));
            let schema = schemas
                .provision(args.tenant_id)
                .await
                .with_context(|| format!("failed to provision tenant {}", args.tenant_id))?;
            println!("Tenant {} provisioned in schema {}", args.tenant_id, schema);
        }
        Commands::IssueToken(args) => issue_token(&cfg, args)?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "helpdesk-admin",
    about = "Operational tasks for the helpdesk API: migrations, tenants and tokens",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the shared schema migrations
    Migrate,
    /// Register a tenant and provision its schema
    CreateTenant(CreateTenantArgs),
    /// Re-run tenant schema provisioning; safe to repeat
    ProvisionTenant(ProvisionTenantArgs),
    /// Mint a bearer token for local testing or automation
    IssueToken(IssueTokenArgs),
}

#[derive(Args)]
struct CreateTenantArgs {
    #[arg(long, help = "Display name of the company")]
    name: String,
    #[arg(long, help = "Lowercase subdomain, unique across the platform")]
    subdomain: String,
    #[arg(long, help = "Initial settings as a JSON object")]
    settings: Option<String>,
}

#[derive(Args)]
struct ProvisionTenantArgs {
    #[arg(long, help = "Tenant identifier")]
    tenant_id: Uuid,
}

#[derive(Args)]
struct IssueTokenArgs {
    #[arg(long, help = "saas_admin, tenant_admin, agent or customer")]
    role: Role,
    #[arg(long, help = "Tenant the token is scoped to; required for tenant roles")]
    tenant_id: Option<Uuid>,
    #[arg(long, help = "Subject user id; a random one is generated when absent")]
    user_id: Option<Uuid>,
    #[arg(long, help = "Email claim")]
    email: Option<String>,
}

#[derive(Serialize)]
struct TenantOutput {
    id: Uuid,
    name: String,
    subdomain: String,
    schema_name: String,
    is_active: bool,
}

async fn connect(cfg: &AppConfig) -> Result<DbPool> {
    debug!("connecting to database");
    db::establish_connection_from_app_config(cfg)
        .await
        .context("failed to connect to database")
}

async fn create_tenant(cfg: &AppConfig, args: CreateTenantArgs, json: bool) -> Result<()> {
    let settings = args
        .settings
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--settings must be valid JSON")?;

    let pool = connect(cfg).await?;
    let service = TenantService::new(Arc::new(TenantSchemas::new(Arc::new(pool))));
    let tenant = service
        .create_tenant(CreateTenantInput {
            name: args.name,
            subdomain: args.subdomain,
            settings,
        })
        .await
        .context("failed to create tenant")?;

    let output = TenantOutput {
        id: tenant.id,
        name: tenant.name,
        subdomain: tenant.subdomain,
        schema_name: tenant.schema_name,
        is_active: tenant.is_active,
    };

    if json {
        print_json(&output)?;
    } else {
        println!(
            "Tenant {} created (id {}, schema {})",
            output.subdomain, output.id, output.schema_name
        );
    }
    Ok(())
}

fn issue_token(cfg: &AppConfig, args: IssueTokenArgs) -> Result<()> {
    if args.role != Role::SaasAdmin && args.tenant_id.is_none() {
        return Err(anyhow!("--tenant-id is required for role {}", args.role));
    }

    let auth = AuthService::new(AuthConfig::from(cfg));
    let token = auth
        .issue_token(
            args.user_id.unwrap_or_else(Uuid::new_v4),
            args.tenant_id,
            args.email,
            args.role,
        )
        .context("failed to issue token")?;
    println!("{}", token);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
