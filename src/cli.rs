use std::env;
use std::path::PathBuf;

use crate::community::parse_member;

pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub preset: Option<String>,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Serve { bind: Option<String> },
    Wallet(WalletCommand),
    Profile { name: String, avatar: Option<PathBuf> },
    Activity {
        view: ActivityView,
        export_csv: Option<PathBuf>,
    },
    Market(MarketCommand),
    Community(CommunityCommand),
    Interest { principal: f64, apy: f64, days: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletCommand {
    Connect,
    Disconnect,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityView {
    Purchases,
    Sales,
    Recent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarketCommand {
    Offers,
    Ranking,
    Buy { offer_id: u32 },
    Sell { kwh: f64, price_per_kwh: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommunityCommand {
    Init {
        required_approvals: u32,
    },
    Members {
        approvers: Vec<String>,
        members: Vec<(String, u32)>,
    },
    Generate {
        kwh: f64,
    },
    Status,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    if args.is_empty() || (args.len() == 1 && (args[0] == "--help" || args[0] == "-h")) {
        print_usage();
        std::process::exit(if args.is_empty() { 2 } else { 0 });
    }
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut config = None;
    let mut preset = None;
    let mut command = None;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --config (expected a TOML file path)",
                )?;
                if config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name =
                    args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with('-') => return Err(format!("unknown argument: {other}")),
            name => {
                command = Some(parse_command(name, &args[i + 1..])?);
                break;
            }
        }
        i += 1;
    }

    if config.is_some() && preset.is_some() {
        return Err(
            "arguments `--config` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if config.is_none() && preset.is_none() {
        preset = Some("demo".to_string());
    }

    let command = command.ok_or_else(|| "missing command".to_string())?;

    Ok(CliOptions {
        config,
        preset,
        command,
    })
}

fn parse_command(name: &str, rest: &[String]) -> Result<Command, String> {
    match name {
        "serve" => {
            let mut bind = None;
            let mut i = 0usize;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--bind" => {
                        i += 1;
                        let addr = rest.next_or_err(
                            i,
                            "missing value for --bind (expected an address like 127.0.0.1:3000)",
                        )?;
                        if bind.replace(addr.to_string()).is_some() {
                            return Err("--bind provided more than once".to_string());
                        }
                    }
                    other => return Err(format!("unknown argument for serve: {other}")),
                }
                i += 1;
            }
            Ok(Command::Serve { bind })
        }
        "wallet" => {
            let sub = match single(rest, "wallet", "connect|disconnect|status")? {
                "connect" => WalletCommand::Connect,
                "disconnect" => WalletCommand::Disconnect,
                "status" => WalletCommand::Status,
                other => return Err(format!("unknown wallet command: {other}")),
            };
            Ok(Command::Wallet(sub))
        }
        "profile" => {
            if rest.first().map(String::as_str) != Some("set") {
                return Err("expected `profile set <name> [--avatar <path>]`".to_string());
            }
            let name = rest.next_or_err(1, "missing profile name")?.to_string();
            let mut avatar = None;
            let mut i = 2usize;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--avatar" => {
                        i += 1;
                        let path = rest.next_or_err(
                            i,
                            "missing value for --avatar (expected an image path)",
                        )?;
                        if avatar.replace(PathBuf::from(path)).is_some() {
                            return Err("--avatar provided more than once".to_string());
                        }
                    }
                    other => return Err(format!("unknown argument for profile: {other}")),
                }
                i += 1;
            }
            Ok(Command::Profile { name, avatar })
        }
        "activity" => {
            let view = match rest.first().map(String::as_str) {
                Some("purchases") => ActivityView::Purchases,
                Some("sales") => ActivityView::Sales,
                Some("recent") => ActivityView::Recent,
                Some(other) => return Err(format!("unknown activity view: {other}")),
                None => return Err("expected `activity purchases|sales|recent`".to_string()),
            };
            let mut export_csv = None;
            let mut i = 1usize;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--export-csv" => {
                        i += 1;
                        let path = rest.next_or_err(
                            i,
                            "missing value for --export-csv (expected a file path)",
                        )?;
                        if export_csv.replace(PathBuf::from(path)).is_some() {
                            return Err("--export-csv provided more than once".to_string());
                        }
                    }
                    other => return Err(format!("unknown argument for activity: {other}")),
                }
                i += 1;
            }
            Ok(Command::Activity { view, export_csv })
        }
        "market" => {
            let sub = match rest.first().map(String::as_str) {
                Some("offers") if rest.len() == 1 => MarketCommand::Offers,
                Some("ranking") if rest.len() == 1 => MarketCommand::Ranking,
                Some("buy") if rest.len() == 2 => MarketCommand::Buy {
                    offer_id: parse_number(&rest[1], "offer id")?,
                },
                Some("sell") if rest.len() == 3 => MarketCommand::Sell {
                    kwh: parse_number(&rest[1], "kWh amount")?,
                    price_per_kwh: parse_number(&rest[2], "price per kWh")?,
                },
                _ => {
                    return Err(
                        "expected `market offers|ranking|buy <id>|sell <kwh> <price>`".to_string(),
                    );
                }
            };
            Ok(Command::Market(sub))
        }
        "community" => parse_community(rest).map(Command::Community),
        "interest" => {
            if rest.len() != 3 {
                return Err("expected `interest <principal> <apy> <days>`".to_string());
            }
            Ok(Command::Interest {
                principal: parse_number(&rest[0], "principal")?,
                apy: parse_number(&rest[1], "apy")?,
                days: parse_number(&rest[2], "days")?,
            })
        }
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_community(rest: &[String]) -> Result<CommunityCommand, String> {
    const EXPECTED: &str = "expected `community init <approvals>|members [--approver <addr>]... <addr:percent>...|generate <kwh>|status`";
    match rest.first().map(String::as_str) {
        Some("init") if rest.len() == 2 => Ok(CommunityCommand::Init {
            required_approvals: parse_number(&rest[1], "approval count")?,
        }),
        Some("members") => {
            let mut approvers = Vec::new();
            let mut members = Vec::new();
            let mut i = 1usize;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--approver" => {
                        i += 1;
                        let addr = rest.next_or_err(
                            i,
                            "missing value for --approver (expected an address)",
                        )?;
                        approvers.push(addr.to_string());
                    }
                    other if other.starts_with('-') => {
                        return Err(format!("unknown argument for community members: {other}"));
                    }
                    member => members.push(parse_member(member)?),
                }
                i += 1;
            }
            if members.is_empty() {
                return Err("community members needs at least one <addr:percent>".to_string());
            }
            Ok(CommunityCommand::Members { approvers, members })
        }
        Some("generate") if rest.len() == 2 => Ok(CommunityCommand::Generate {
            kwh: parse_number(&rest[1], "kWh amount")?,
        }),
        Some("status") if rest.len() == 1 => Ok(CommunityCommand::Status),
        _ => Err(EXPECTED.to_string()),
    }
}

fn single<'a>(rest: &'a [String], command: &str, expected: &str) -> Result<&'a str, String> {
    match rest {
        [only] => Ok(only.as_str()),
        _ => Err(format!("expected `{command} {expected}`")),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {what}: \"{value}\""))
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  beenergy [--config <path> | --preset <name>] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  serve [--bind <addr>]                 run the DeFindex proxy");
    eprintln!("  wallet connect|disconnect|status      manage the wallet session");
    eprintln!("  profile set <name> [--avatar <path>]  save the user profile");
    eprintln!("  activity purchases|sales|recent [--export-csv <path>]");
    eprintln!("  market offers|ranking|buy <id>|sell <kwh> <price>");
    eprintln!("  community init <approvals>            create the community solar pool");
    eprintln!("  community members [--approver <addr>]... <addr:percent>...");
    eprintln!("  community generate <kwh>|status       split generation between members");
    eprintln!("  interest <principal> <apy> <days>     simple-interest projection");
    eprintln!();
    eprintln!("Presets: demo (default), testnet, mainnet");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions, String> {
        parse_args_from(args.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn defaults_to_demo_preset() {
        let opts = parse(&["wallet", "status"]).expect("parse should succeed");
        assert_eq!(opts.preset.as_deref(), Some("demo"));
        assert!(opts.config.is_none());
        assert_eq!(opts.command, Command::Wallet(WalletCommand::Status));
    }

    #[test]
    fn supports_config_cli() {
        let opts = parse(&["--config", "beenergy.toml", "serve"]).expect("parse should succeed");
        assert_eq!(
            opts.config.as_deref().and_then(|p| p.to_str()),
            Some("beenergy.toml")
        );
        assert!(opts.preset.is_none());
        assert_eq!(opts.command, Command::Serve { bind: None });
    }

    #[test]
    fn config_and_preset_are_exclusive() {
        let err = parse(&["--config", "a.toml", "--preset", "demo", "serve"]);
        assert!(err.is_err());
    }

    #[test]
    fn serve_with_bind() {
        let opts = parse(&["--preset", "testnet", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        assert_eq!(opts.preset.as_deref(), Some("testnet"));
        assert_eq!(
            opts.command,
            Command::Serve {
                bind: Some("0.0.0.0:8080".to_string())
            }
        );
    }

    #[test]
    fn profile_with_avatar() {
        let opts = parse(&["profile", "set", "Ana", "--avatar", "me.png"]).unwrap();
        assert_eq!(
            opts.command,
            Command::Profile {
                name: "Ana".to_string(),
                avatar: Some(PathBuf::from("me.png")),
            }
        );
    }

    #[test]
    fn activity_with_export() {
        let opts = parse(&["activity", "sales", "--export-csv", "out.csv"]).unwrap();
        assert_eq!(
            opts.command,
            Command::Activity {
                view: ActivityView::Sales,
                export_csv: Some(PathBuf::from("out.csv")),
            }
        );
    }

    #[test]
    fn market_commands() {
        assert_eq!(
            parse(&["market", "buy", "3"]).unwrap().command,
            Command::Market(MarketCommand::Buy { offer_id: 3 })
        );
        assert_eq!(
            parse(&["market", "sell", "12.5", "0.5"]).unwrap().command,
            Command::Market(MarketCommand::Sell {
                kwh: 12.5,
                price_per_kwh: 0.5
            })
        );
        assert!(parse(&["market", "buy", "three"]).is_err());
        assert!(parse(&["market", "sell", "1"]).is_err());
    }

    #[test]
    fn community_commands() {
        assert_eq!(
            parse(&["community", "init", "2"]).unwrap().command,
            Command::Community(CommunityCommand::Init {
                required_approvals: 2
            })
        );
        assert_eq!(
            parse(&[
                "community",
                "members",
                "--approver",
                "GA",
                "GA:40",
                "--approver",
                "GB",
                "GB:60",
            ])
            .unwrap()
            .command,
            Command::Community(CommunityCommand::Members {
                approvers: vec!["GA".to_string(), "GB".to_string()],
                members: vec![("GA".to_string(), 40), ("GB".to_string(), 60)],
            })
        );
        assert_eq!(
            parse(&["community", "generate", "12.5"]).unwrap().command,
            Command::Community(CommunityCommand::Generate { kwh: 12.5 })
        );
        assert!(parse(&["community", "members", "--approver", "GA"]).is_err());
        assert!(parse(&["community", "members", "GA"]).is_err());
        assert!(parse(&["community", "init"]).is_err());
    }

    #[test]
    fn interest_command() {
        let opts = parse(&["interest", "1000", "8.5", "30"]).unwrap();
        assert_eq!(
            opts.command,
            Command::Interest {
                principal: 1000.0,
                apy: 8.5,
                days: 30
            }
        );
        assert!(parse(&["interest", "1000", "8.5", "-1"]).is_err());
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(parse(&["--verbose", "serve"]).is_err());
        assert!(parse(&["teleport"]).is_err());
        assert!(parse(&["wallet"]).is_err());
        assert!(parse(&["--preset", "demo"]).is_err());
    }
}
