//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

use crate::config::VENDOR_SCAN_PAGE_SIZE;

/// GPU Portal - self-service start/stop for rented GPU notebooks
#[derive(Parser, Debug)]
#[command(name = "gpu-portal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Create the seed administrator and optionally a demo user
    Seed(SeedArgs),

    /// Talk to the GPU provider directly
    Vendor(VendorArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host to bind to; overrides SERVER_HOST
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on; overrides SERVER_PORT
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Do not start the inactivity and daily shutdown jobs
    #[arg(long)]
    pub no_jobs: bool,
}

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Migration actions
#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

/// Arguments for the seed command
#[derive(Parser, Debug)]
pub struct SeedArgs {
    /// Also create the `demo` user under the seed administrator
    #[arg(long)]
    pub demo: bool,

    /// Password for the demo user
    #[arg(long, env = "DEMO_PASSWORD", requires = "demo")]
    pub demo_password: Option<String>,

    /// Registry ID of the instance to assign to the demo user
    #[arg(long, requires = "demo")]
    pub demo_instance: Option<i32>,
}

/// Arguments for the vendor command
#[derive(Parser, Debug)]
pub struct VendorArgs {
    /// Bearer token; defaults to VENDOR_BEARER_TOKEN
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub action: VendorAction,
}

/// Provider actions
#[derive(Subcommand, Debug)]
pub enum VendorAction {
    /// Print one page of the instance listing
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = VENDOR_SCAN_PAGE_SIZE)]
        page_size: u32,
        /// Provider status code (3 running, 5 stopped)
        #[arg(long)]
        status: Option<i32>,
        #[arg(long)]
        nick_name: Option<String>,
    },
    /// Print the status of one instance
    Status {
        #[arg(long)]
        instance_id: i64,
    },
    /// Start an instance
    Start {
        #[arg(long)]
        instance_id: i64,
        #[arg(long)]
        instance_uuid: String,
    },
    /// Stop an instance
    Stop {
        #[arg(long)]
        instance_id: i64,
        #[arg(long)]
        instance_uuid: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["gpu-portal", "serve", "--no-jobs"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert!(args.no_jobs);
                assert!(args.host.is_none() && args.port.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_vendor_stop_requires_uuid() {
        assert!(
            Cli::try_parse_from(["gpu-portal", "vendor", "stop", "--instance-id", "7764"]).is_err()
        );
        let cli = Cli::try_parse_from([
            "gpu-portal",
            "vendor",
            "stop",
            "--instance-id",
            "7764",
            "--instance-uuid",
            "gghcmwa6-emgm7485",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Vendor(VendorArgs {
                action: VendorAction::Stop {
                    instance_id: 7764,
                    ..
                },
                ..
            })
        ));
    }
}
