use anyhow::Result;
use clap::Parser;
use pkgmirror::commands::{
    self,
    config::{Config, ConfigOverrides},
    services::build_service,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// pkgmirror - private package registry mirror
///
/// Serves package documents from a local store and mirrors unknown packages
/// from an npm-compatible upstream registry.
///
/// If the PKGMIRROR_UPSTREAM_TOKEN environment variable is set, it is sent
/// to the upstream as a bearer token.
///
/// Examples:
///   pkgmirror sync pedding              # Mirror pedding and its dependencies
///   pkgmirror --sync-by-install show x  # Read x, syncing it on a miss
///   pkgmirror tag pedding beta 1.0.0    # Point the beta tag at 1.0.0
#[derive(Parser, Debug)]
#[command(author, version = env!("PKGMIRROR_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Store root directory (defaults to ~/.pkgmirror; also via PKGMIRROR_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "PKGMIRROR_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub root: Option<PathBuf>,

    /// Upstream registry URL (defaults to https://registry.npmjs.org)
    #[arg(
        long = "registry",
        env = "PKGMIRROR_REGISTRY",
        value_name = "URL",
        global = true
    )]
    pub registry: Option<String>,

    /// Sync unknown unscoped packages when they are read
    #[arg(long = "sync-by-install", env = "PKGMIRROR_SYNC_BY_INSTALL", global = true)]
    pub sync_by_install: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print a package document
    Show(ShowArgs),

    /// Sync a package from upstream now
    Sync(SyncArgs),

    /// Publish a version manifest as a local package
    Publish(PublishArgs),

    /// Point a dist-tag at an existing version
    Tag(TagArgs),

    /// Star a package on behalf of a user
    Star(StarArgs),

    /// Remove a user's star from a package
    Unstar(StarArgs),

    /// Add a maintainer that survives later syncs
    Owner(OwnerArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Package name, e.g. "pedding" or "@scope/name"
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Validator from a previous read; prints nothing if still current
    #[arg(long = "if-none-match", value_name = "ETAG")]
    pub if_none_match: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Do not sync the package's dependencies
    #[arg(long = "no-dep")]
    pub no_dep: bool,
}

#[derive(clap::Args, Debug)]
pub struct PublishArgs {
    /// JSON file with name, version, dist and optional dependencies/maintainers
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Dist-tag for the new version (defaults to "latest")
    #[arg(long = "tag", value_name = "TAG")]
    pub tag: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct TagArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
    #[arg(value_name = "TAG")]
    pub tag: String,
    #[arg(value_name = "VERSION")]
    pub version: String,
}

#[derive(clap::Args, Debug)]
pub struct StarArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
    #[arg(value_name = "USER")]
    pub user: String,
}

#[derive(clap::Args, Debug)]
pub struct OwnerArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
    #[arg(value_name = "USER")]
    pub user: String,
    #[arg(long = "email", value_name = "EMAIL", default_value = "")]
    pub email: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = pkgmirror::runtime::RealRuntime;

    let config = Config::load(
        &runtime,
        ConfigOverrides {
            root: cli.root,
            registry: cli.registry,
            sync_by_install: cli.sync_by_install,
        },
    )?;
    let service = build_service(runtime, &config)?;
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Show(args) => {
            let found = commands::show(&service, &args.name, args.if_none_match, &mut out).await?;
            if !found {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Sync(args) => {
            commands::sync(&service, &args.name, args.no_dep, &mut out).await?
        }
        Commands::Publish(args) => {
            commands::publish(&runtime, &service, &args.manifest, args.tag, &mut out).await?
        }
        Commands::Tag(args) => {
            commands::tag(&service, &args.name, &args.tag, &args.version, &mut out).await?
        }
        Commands::Star(args) => commands::star(&service, &args.name, &args.user, &mut out).await?,
        Commands::Unstar(args) => {
            commands::unstar(&service, &args.name, &args.user, &mut out).await?
        }
        Commands::Owner(args) => {
            commands::owner_add(&service, &args.name, &args.user, &args.email, &mut out).await?
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_show_parsing() {
        let cli = Cli::try_parse_from(["pkgmirror", "show", "@scope/name"]).unwrap();
        match cli.command {
            Commands::Show(args) => {
                assert_eq!(args.name, "@scope/name");
                assert_eq!(args.if_none_match, None);
            }
            _ => panic!("Expected Show command"),
        }
        assert_eq!(cli.root, None);
    }

    #[test]
    fn test_cli_sync_no_dep_parsing() {
        let cli = Cli::try_parse_from(["pkgmirror", "sync", "pedding", "--no-dep"]).unwrap();
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.name, "pedding");
                assert!(args.no_dep);
            }
            _ => panic!("Expected Sync command"),
        }
    }

    #[test]
    fn test_cli_global_options_parsing() {
        let cli = Cli::try_parse_from([
            "pkgmirror",
            "--root",
            "/tmp",
            "--registry",
            "http://localhost:7001",
            "--sync-by-install",
            "show",
            "pedding",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp")));
        assert_eq!(cli.registry.as_deref(), Some("http://localhost:7001"));
        assert!(cli.sync_by_install);
    }

    #[test]
    fn test_cli_tag_parsing() {
        let cli = Cli::try_parse_from(["pkgmirror", "tag", "pedding", "beta", "1.0.0"]).unwrap();
        match cli.command {
            Commands::Tag(args) => {
                assert_eq!(args.name, "pedding");
                assert_eq!(args.tag, "beta");
                assert_eq!(args.version, "1.0.0");
            }
            _ => panic!("Expected Tag command"),
        }
    }

    #[test]
    fn test_cli_owner_parsing() {
        let cli = Cli::try_parse_from([
            "pkgmirror",
            "owner",
            "pedding",
            "dead-horse",
            "--email",
            "dead_horse@qq.com",
        ])
        .unwrap();
        match cli.command {
            Commands::Owner(args) => {
                assert_eq!(args.name, "pedding");
                assert_eq!(args.user, "dead-horse");
                assert_eq!(args.email, "dead_horse@qq.com");
            }
            _ => panic!("Expected Owner command"),
        }
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["pkgmirror", "pedding"]).is_err());
    }
}
