//! BeEnergy entry point: CLI wiring and config-driven command dispatch.

use std::net::SocketAddr;
use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use beenergy::activity::{Activity, DASHBOARD_RECENT, HISTORY_WINDOW_MONTHS, Transaction};
use beenergy::api::{self, AppState};
use beenergy::cli::{self, ActivityView, Command, CommunityCommand, MarketCommand, WalletCommand};
use beenergy::community::{CommunityError, CommunityPool};
use beenergy::config::AppConfig;
use beenergy::interest::calculate_interest;
use beenergy::io::export::export_csv;
use beenergy::market;
use beenergy::session::{
    FileStore, SessionManager, SimulatedWallet, UserProfile, View, load_avatar, short_address,
};
use beenergy::vault::{DefindexHttp, MockVaultClient, VaultClient, VaultService};

type Session = SessionManager<FileStore, SimulatedWallet>;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let opts = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(1);
        }
    };

    // Load config: --config takes priority, then --preset (demo by default)
    let loaded = match (&opts.config, &opts.preset) {
        (Some(path), _) => AppConfig::from_toml_file(path),
        (None, Some(name)) => AppConfig::from_preset(name),
        (None, None) => Ok(AppConfig::demo()),
    };
    let mut config = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };
    config.apply_env();

    // Validate
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("error: failed to create tokio runtime: {e}");
        process::exit(1);
    });
    if let Err(e) = rt.block_on(run(opts.command, &config)) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

async fn run(command: Command, config: &AppConfig) -> anyhow::Result<()> {
    match command {
        Command::Serve { bind } => serve(config, bind).await,
        Command::Wallet(cmd) => wallet(config, cmd).await,
        Command::Profile { name, avatar } => profile(config, &name, avatar.as_deref()),
        Command::Activity { view, export_csv } => activity(config, view, export_csv.as_deref()),
        Command::Market(cmd) => trade(config, cmd),
        Command::Community(cmd) => community(config, cmd),
        Command::Interest {
            principal,
            apy,
            days,
        } => {
            let earned = calculate_interest(principal, apy, days);
            println!("{principal:.2} at {apy:.2}% APY for {days} days earns {earned:.4}");
            Ok(())
        }
    }
}

async fn serve(config: &AppConfig, bind: Option<String>) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address \"{bind}\""))?;
    let network = config.defindex.network();

    if config.defindex.mode == "http" {
        let client = http_client(config)?;
        tracing::info!(base_url = client.base_url(), %network, "using DeFindex API");
        serve_with(client, network, addr).await
    } else {
        tracing::info!(%network, "using in-memory vault client");
        serve_with(MockVaultClient::new(), network, addr).await
    }
}

async fn serve_with<C: VaultClient>(
    client: C,
    network: beenergy::vault::Network,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        vault: VaultService::new(client, network),
    });
    api::serve(state, addr)
        .await
        .with_context(|| format!("proxy on {addr} failed"))
}

fn http_client(config: &AppConfig) -> anyhow::Result<DefindexHttp> {
    let d = &config.defindex;
    let key = d.api_key.as_deref().unwrap_or_default();
    Ok(DefindexHttp::new(&d.base_url, key, d.timeout())?)
}

fn open_session(config: &AppConfig) -> anyhow::Result<Session> {
    let store = FileStore::open(&config.storage.path)?;
    let w = &config.wallet;
    let seed = w.seed.unwrap_or_else(rand::random);
    let wallet = SimulatedWallet::new(&w.address, w.connect_delay(), w.failure_rate, seed);
    Ok(SessionManager::restore(store, wallet)?)
}

fn require_view(session: &Session, view: View) -> anyhow::Result<()> {
    if !session.can_view(view) {
        bail!("no wallet connected; run `beenergy wallet connect` first");
    }
    Ok(())
}

async fn wallet(config: &AppConfig, cmd: WalletCommand) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    match cmd {
        WalletCommand::Connect => {
            eprintln!("Connecting wallet...");
            let address = session.connect().await?.to_string();
            println!("Connected: {address}");
            if session.profile().is_none() {
                println!("Next: create a profile with `beenergy profile set <name>`");
            }
        }
        WalletCommand::Disconnect => {
            session.disconnect()?;
            println!("Disconnected.");
        }
        WalletCommand::Status => status(config, &session).await?,
    }
    Ok(())
}

/// Session summary plus the dashboard figures when connected.
async fn status(config: &AppConfig, session: &Session) -> anyhow::Result<()> {
    println!("State:   {}", session.state());
    let Some(address) = session.address() else {
        return Ok(());
    };
    println!("Address: {address}");
    if let Some(profile) = session.profile() {
        let avatar = if profile.avatar.is_some() { " (avatar set)" } else { "" };
        println!("Profile: {}{avatar}", profile.name);
    }

    if !session.can_view(View::Dashboard) {
        return Ok(());
    }
    let activity = Activity::load(session.store())?;
    println!("Stock:   {} kWh", activity.stock_kwh);
    print_transactions(activity.recent(DASHBOARD_RECENT));

    if let Some(vault) = &config.defindex.vault_address {
        let network = config.defindex.network();
        let stats = if config.defindex.mode == "http" {
            VaultService::new(http_client(config)?, network)
                .user_yield_stats(vault, address)
                .await
        } else {
            VaultService::new(MockVaultClient::new(), network)
                .user_yield_stats(vault, address)
                .await
        };
        match stats {
            Ok(stats) => println!("\n{stats}"),
            Err(e) => eprintln!("yield figures unavailable: {e}"),
        }
    }
    Ok(())
}

fn profile(config: &AppConfig, name: &str, avatar: Option<&Path>) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    let avatar = avatar.map(load_avatar).transpose()?;
    session.set_profile(UserProfile::new(name, avatar)?)?;
    println!("Profile saved for {name}.");
    Ok(())
}

fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions.");
    }
    for tx in transactions {
        println!("{tx}");
    }
}

fn activity(config: &AppConfig, view: ActivityView, export: Option<&Path>) -> anyhow::Result<()> {
    let session = open_session(config)?;
    require_view(&session, View::Activity)?;
    let activity = Activity::load(session.store())?;
    let now = Utc::now();

    let selected = match view {
        ActivityView::Purchases => activity.purchases(now),
        ActivityView::Sales => activity.sales(now),
        ActivityView::Recent => activity.recent(DASHBOARD_RECENT).to_vec(),
    };
    if matches!(view, ActivityView::Purchases | ActivityView::Sales) {
        eprintln!("Last {HISTORY_WINDOW_MONTHS} months:");
    }
    print_transactions(&selected);

    if let Some(path) = export {
        export_csv(&selected, path)
            .with_context(|| format!("failed to write CSV to \"{}\"", path.display()))?;
        eprintln!("History written to {}", path.display());
    }
    Ok(())
}

fn trade(config: &AppConfig, cmd: MarketCommand) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    require_view(&session, View::Marketplace)?;

    match cmd {
        MarketCommand::Offers => {
            for offer in market::offers() {
                println!("{offer}  {}", market::identicon_color(&offer.seller));
            }
        }
        MarketCommand::Ranking => {
            for (rank, entry) in market::ranking().iter().enumerate() {
                println!("{:>2}. {entry}", rank + 1);
            }
        }
        MarketCommand::Buy { offer_id } => {
            let offer = market::find_offer(offer_id)
                .with_context(|| format!("no offer with id {offer_id}"))?;
            let mut activity = Activity::load(session.store())?;
            let tx = market::buy(&mut activity, &offer, Utc::now())?.clone();
            activity.save(session.store_mut())?;
            println!("{tx}");
            println!("Stock: {} kWh", activity.stock_kwh);
        }
        MarketCommand::Sell { kwh, price_per_kwh } => {
            let mut activity = Activity::load(session.store())?;
            let tx = market::sell(&mut activity, kwh, price_per_kwh, Utc::now())?.clone();
            activity.save(session.store_mut())?;
            println!("{tx}");
            println!("Stock: {} kWh", activity.stock_kwh);
        }
    }
    Ok(())
}

fn load_pool(session: &Session) -> anyhow::Result<CommunityPool> {
    Ok(CommunityPool::load(session.store())?.ok_or(CommunityError::NotSetUp)?)
}

fn community(config: &AppConfig, cmd: CommunityCommand) -> anyhow::Result<()> {
    let mut session = open_session(config)?;
    match cmd {
        CommunityCommand::Init { required_approvals } => {
            CommunityPool::new(required_approvals).save(session.store_mut())?;
            println!("Community pool created; {required_approvals} approvals needed to set members.");
        }
        CommunityCommand::Members { approvers, members } => {
            let mut pool = load_pool(&session)?;
            let (addresses, percents): (Vec<String>, Vec<u32>) = members.into_iter().unzip();
            pool.set_members(&approvers, &addresses, &percents)?;
            pool.save(session.store_mut())?;
            println!("{} members registered.", pool.members.len());
        }
        CommunityCommand::Generate { kwh } => {
            let mut pool = load_pool(&session)?;
            let shares = pool.record_generation(kwh)?;
            pool.save(session.store_mut())?;
            for share in &shares {
                println!("{share}");
            }

            // The connected wallet's own share goes into its stock.
            let own = session
                .address()
                .and_then(|address| shares.iter().find(|s| s.address == address))
                .map(|s| s.kwh)
                .filter(|kwh| *kwh > 0.0);
            if let Some(kwh) = own {
                let mut activity = Activity::load(session.store())?;
                activity.credit_generation(kwh)?;
                activity.save(session.store_mut())?;
                println!("Stock: {} kWh", activity.stock_kwh);
            }
        }
        CommunityCommand::Status => {
            let pool = load_pool(&session)?;
            println!("Approvals: {}", pool.required_approvals);
            println!("Generated: {} kWh", pool.total_generated_kwh());
            for member in &pool.members {
                println!("{:<14} {:>3}%", short_address(&member.address), member.percent);
            }
        }
    }
    Ok(())
}
