//! Command-line definition.

use clap::{ArgGroup, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tessera")]
#[command(about = "Inspect tenant cache keys and policies, evict scopes, probe tiers")]
#[command(version)]
#[command(after_help = "\
Configuration is read from TESSERA_CACHE_CONFIG and TESSERA_CACHE_* variables;
Redis from TESSERA_REDIS_URL, TESSERA_REDIS_POOL_SIZE and TESSERA_REDIS_TIMEOUT_MS.")]
pub struct Cli {
    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show tenant, org and shard of encoded keys
    Inspect {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Show the resolved policy of namespaces
    Policy {
        #[arg(required = true)]
        namespaces: Vec<String>,
    },
    /// Show the shard index of encoded keys
    Shard {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Evict a namespace, or a whole tenant or org scope, from Redis
    Evict(EvictArgs),
    /// Probe the cache tiers
    Health,
}

#[derive(Debug, Clone, PartialEq, Eq, clap::Args)]
#[command(group(ArgGroup::new("target").required(true).args(["namespace", "all"])))]
pub struct EvictArgs {
    /// Tenant code
    #[arg(long)]
    pub tenant: String,
    /// Organization code
    #[arg(long)]
    pub org: Option<String>,
    /// Namespace to evict
    #[arg(long)]
    pub namespace: Option<String>,
    /// Evict every key under the tenant or org scope
    #[arg(long)]
    pub all: bool,
}

/// What an `evict` invocation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvictTarget {
    Namespace(String),
    Scope,
}

impl EvictArgs {
    pub fn target(&self) -> EvictTarget {
        match &self.namespace {
            Some(namespace) => EvictTarget::Namespace(namespace.clone()),
            None => EvictTarget::Scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("tessera").chain(args.iter().copied()))
    }

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_inspect_keys() {
        let cli = parse(&["--json-logs", "inspect", "tenant:acme:a:1", "tenant:b:c:2"]).unwrap();
        assert!(cli.json_logs);
        assert_eq!(
            cli.command,
            Command::Inspect {
                keys: vec!["tenant:acme:a:1".to_string(), "tenant:b:c:2".to_string()]
            }
        );
    }

    #[test]
    fn test_json_logs_after_subcommand() {
        let cli = parse(&["health", "--json-logs"]).unwrap();
        assert!(cli.json_logs);
        assert_eq!(cli.command, Command::Health);
    }

    #[test]
    fn test_operands_required() {
        for command in ["inspect", "policy", "shard"] {
            let err = parse(&[command]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument, "{}", command);
        }
    }

    #[test]
    fn test_evict_namespace() {
        let cli = parse(&[
            "evict",
            "--tenant",
            "acme",
            "--org",
            "org1",
            "--namespace",
            "sessions",
        ])
        .unwrap();
        let Command::Evict(args) = cli.command else {
            panic!("expected evict");
        };
        assert_eq!(args.tenant, "acme");
        assert_eq!(args.org.as_deref(), Some("org1"));
        assert_eq!(args.target(), EvictTarget::Namespace("sessions".to_string()));
    }

    #[test]
    fn test_evict_scope() {
        let cli = parse(&["evict", "--all", "--tenant", "acme"]).unwrap();
        let Command::Evict(args) = cli.command else {
            panic!("expected evict");
        };
        assert_eq!(args.org, None);
        assert_eq!(args.target(), EvictTarget::Scope);
    }

    #[test]
    fn test_evict_namespace_and_all_conflict() {
        let err = parse(&["evict", "--tenant", "acme", "--all", "--namespace", "sessions"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_evict_rejects_bad_combinations() {
        for args in [
            vec!["evict", "--namespace", "sessions"],
            vec!["evict", "--tenant", "acme"],
            vec!["evict", "--tenant"],
            vec!["evict", "--tenant", "acme", "--all", "--bogus"],
        ] {
            assert!(parse(&args).is_err(), "expected usage error for {:?}", args);
        }
    }

    #[test]
    fn test_unknown_command() {
        let err = parse(&["frobnicate"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }
}
