use std::path::PathBuf;

use clap::Parser;
use lotus_adapter::cli::commands::auth::AuthCommand;
use lotus_adapter::cli::commands::gateway::GatewayCommand;
use lotus_adapter::cli::commands::monitor::MonitorCommand;
use lotus_adapter::cli::{Cli, Commands};
use lotus_adapter::domain::models::Permission;

#[test]
fn test_parse_gateway_run_overrides() {
    let cli = Cli::try_parse_from([
        "lotus-adapter",
        "gateway",
        "run",
        "--listen",
        "127.0.0.1:1234",
        "--expiration",
        "15",
        "--interval",
        "120",
    ])
    .unwrap();

    match cli.command {
        Commands::Gateway(args) => match args.command {
            GatewayCommand::Run {
                listen,
                expiration,
                interval,
            } => {
                assert_eq!(listen.as_deref(), Some("127.0.0.1:1234"));
                assert_eq!(expiration, Some(15));
                assert_eq!(interval, Some(120));
            }
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_monitor_run_with_headers() {
    let cli = Cli::try_parse_from([
        "lotus-adapter",
        "monitor",
        "run",
        "--proxy",
        "http://collector.local/push",
        "--header",
        "X-Api-Key=secret",
        "--header",
        "X-Cluster=east",
        "--interval",
        "30",
    ])
    .unwrap();

    match cli.command {
        Commands::Monitor(args) => {
            assert_eq!(args.proxy.as_deref(), Some("http://collector.local/push"));
            assert_eq!(
                args.headers,
                vec![
                    ("X-Api-Key".to_string(), "secret".to_string()),
                    ("X-Cluster".to_string(), "east".to_string()),
                ]
            );
            match args.command {
                MonitorCommand::Run { interval, now } => {
                    assert_eq!(interval, Some(30));
                    assert!(!now);
                }
                MonitorCommand::Tick => panic!("Wrong monitor command"),
            }
        }
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_monitor_rejects_bad_header() {
    let result = Cli::try_parse_from(["lotus-adapter", "monitor", "tick", "--header", "novalue"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_snapshot_miners_and_globals() {
    let cli = Cli::try_parse_from([
        "lotus-adapter",
        "snapshot",
        "--miner",
        "f01000",
        "--miner",
        "f02000",
        "--json",
        "--config",
        "/etc/lotus-adapter.yaml",
    ])
    .unwrap();

    assert!(cli.json);
    assert_eq!(cli.config, Some(PathBuf::from("/etc/lotus-adapter.yaml")));
    match cli.command {
        Commands::Snapshot(args) => assert_eq!(args.miner, ["f01000", "f02000"]),
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_auth_create_token() {
    let cli = Cli::try_parse_from([
        "lotus-adapter",
        "auth",
        "create-token",
        "--perm",
        "write",
        "--expires-in",
        "3600",
    ])
    .unwrap();

    match cli.command {
        Commands::Auth(args) => match args.command {
            AuthCommand::CreateToken { perm, expires_in } => {
                assert_eq!(perm, Permission::Write);
                assert_eq!(expires_in, Some(3600));
            }
            AuthCommand::Verify { .. } => panic!("Wrong auth command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_auth_rejects_unknown_permission() {
    let result = Cli::try_parse_from(["lotus-adapter", "auth", "create-token", "--perm", "root"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_auth_verify() {
    let cli = Cli::try_parse_from(["lotus-adapter", "auth", "verify", "abc.def.ghi"]).unwrap();
    match cli.command {
        Commands::Auth(args) => match args.command {
            AuthCommand::Verify { token } => assert_eq!(token, "abc.def.ghi"),
            AuthCommand::CreateToken { .. } => panic!("Wrong auth command"),
        },
        _ => panic!("Wrong top-level command"),
    }
}
