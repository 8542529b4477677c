//! `agora` — command-line entry point to an Agora ledger.
//!
//! Every invocation opens the ledger in the data directory, submits or reads,
//! prints JSON to stdout and exits. Logs go to stderr.

mod cli;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use agora_governance::{ProposalAction, ProposalDraft, VoteSelection};
use agora_ledger::{Allocation, Command, Envelope};
use agora_node::{init_logging, AgoraNode, NodeConfig};
use agora_types::{AccountId, ProposalId, ProtocolParams, SystemClock, Timestamp};
use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::{Cli, Cmd, ModeArg};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Cmd::EncodeAction { json } = &cli.command {
        return encode_action(json);
    }

    let config = load_config(&cli)?;
    if is_read(&cli.command) {
        // Reads stay quiet unless asked otherwise.
        agora_utils::init_tracing(cli.log_level.as_deref().unwrap_or("warn"));
    } else {
        init_logging(config.log_format()?, &config.log_level)?;
    }

    match cli.command {
        Cmd::Init {
            admin,
            allocations,
            fast,
        } => init(config, admin, allocations, fast).await,
        Cmd::Serve => serve(config).await,
        command if is_read(&command) => read(config, command).await,
        command => {
            let caller = parse_account(
                cli.caller
                    .as_deref()
                    .context("write commands need a caller: pass --as or set AGORA_ACCOUNT")?,
            )?;
            let command = to_command(command)?;
            let node = AgoraNode::start(config, Arc::new(SystemClock)).await?;
            let result = node.execute(Envelope::new(caller, command)).await;
            node.shutdown().await?;
            print_json(&result?)
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = NodeConfig::from_toml_file(path)?;
            tracing::debug!(path = %path.display(), "loaded config file");
            config
        }
        None => NodeConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    if let Some(delay) = cli.confirmation_delay_ms {
        config.confirmation_delay_ms = delay;
    }
    config.validate()?;
    Ok(config)
}

fn is_read(command: &Cmd) -> bool {
    matches!(
        command,
        Cmd::Proposals
            | Cmd::Proposal { .. }
            | Cmd::Power { .. }
            | Cmd::Delegates
            | Cmd::Positions { .. }
            | Cmd::Rewards { .. }
    )
}

fn parse_account(raw: &str) -> anyhow::Result<AccountId> {
    AccountId::parse(raw).with_context(|| format!("invalid account {raw:?}"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Init ────────────────────────────────────────────────────────────────

async fn init(
    mut config: NodeConfig,
    admin: Option<String>,
    allocations: Vec<String>,
    fast: bool,
) -> anyhow::Result<()> {
    if ledger_exists(&config.data_dir) {
        bail!("a ledger already exists in {}", config.data_dir.display());
    }
    if let Some(admin) = admin {
        config.genesis.admin = Some(parse_account(&admin)?);
    }
    for raw in allocations {
        let (account, amount) = raw
            .split_once('=')
            .with_context(|| format!("allocation {raw:?} is not ACCOUNT=AMOUNT"))?;
        config.genesis.allocations.push(Allocation {
            account: parse_account(account)?,
            amount: amount
                .parse()
                .with_context(|| format!("invalid amount in {raw:?}"))?,
        });
    }
    if fast {
        config.genesis.params = ProtocolParams::fast();
    }
    config.validate()?;

    let node = AgoraNode::start(config, Arc::new(SystemClock)).await?;
    let summary = node
        .read(|s| {
            serde_json::json!({
                "sequence": s.sequence(),
                "accounts": s.balances().len(),
                "total_supply": s.total_supply(),
                "admin": s.governance().admin(),
                "params": &s.settings().params,
            })
        })
        .await;
    node.shutdown().await?;
    print_json(&summary)
}

fn ledger_exists(data_dir: &Path) -> bool {
    data_dir.join("data.mdb").exists()
}

// ── Writes ──────────────────────────────────────────────────────────────

fn encode_action(json: &str) -> anyhow::Result<()> {
    let action: ProposalAction = serde_json::from_str(json).context("invalid action JSON")?;
    action.validate(&ProtocolParams::standard())?;
    print_json(&serde_json::json!({
        "kind": action.kind().code(),
        "kind_name": action.kind().name(),
        "payload": hex::encode(action.encode()?),
        "description": action.to_string(),
    }))
}

fn to_command(cmd: Cmd) -> anyhow::Result<Command> {
    Ok(match cmd {
        Cmd::Propose {
            title,
            description,
            kind,
            payload,
            options,
        } => Command::CreateProposal {
            draft: ProposalDraft {
                title,
                description,
                kind,
                payload: hex::decode(payload.trim_start_matches("0x")).context("payload is not hex")?,
                extra_options: options,
            },
        },
        Cmd::Vote {
            proposal_id,
            mode,
            support,
            option,
            weight,
            allocation,
            ranking,
        } => Command::Vote {
            proposal_id: ProposalId::new(proposal_id),
            selection: selection(mode, support, option, weight, allocation, ranking)?,
        },
        Cmd::Queue { proposal_id } => Command::Queue {
            proposal_id: ProposalId::new(proposal_id),
        },
        Cmd::Execute { proposal_id } => Command::Execute {
            proposal_id: ProposalId::new(proposal_id),
        },
        Cmd::Cancel { proposal_id } => Command::CancelProposal {
            proposal_id: ProposalId::new(proposal_id),
        },
        Cmd::CancelQueued { proposal_id } => Command::CancelQueued {
            proposal_id: ProposalId::new(proposal_id),
        },
        Cmd::Delegate { delegate, amount } => Command::Delegate {
            delegate: parse_account(&delegate)?,
            amount,
        },
        Cmd::Undelegate => Command::Undelegate,
        Cmd::RegisterDelegate { name, description } => Command::RegisterDelegate { name, description },
        Cmd::Escrow { amount } => Command::Escrow { amount },
        Cmd::Release { index } => Command::Release { index },
        Cmd::Slash {
            owner,
            index,
            pct_bps,
        } => Command::Slash {
            owner: parse_account(&owner)?,
            index,
            pct_bps,
        },
        Cmd::ClaimRewards => Command::ClaimRewards,
        Cmd::Init { .. }
        | Cmd::EncodeAction { .. }
        | Cmd::Serve
        | Cmd::Proposals
        | Cmd::Proposal { .. }
        | Cmd::Power { .. }
        | Cmd::Delegates
        | Cmd::Positions { .. }
        | Cmd::Rewards { .. } => bail!("not a ledger write"),
    })
}

fn selection(
    mode: ModeArg,
    support: Option<bool>,
    option: Option<u16>,
    weight: Option<u128>,
    allocation: Vec<String>,
    ranking: Vec<u16>,
) -> anyhow::Result<VoteSelection> {
    Ok(match mode {
        ModeArg::Standard => VoteSelection::Standard {
            support: support.context("standard votes need --support true|false")?,
        },
        ModeArg::Quadratic => VoteSelection::Quadratic {
            option: option.context("quadratic votes need --option")?,
            weight: weight.context("quadratic votes need --weight")?,
        },
        ModeArg::Weighted => {
            let mut allocations = BTreeMap::new();
            for pair in allocation {
                let (option, weight) = pair
                    .split_once('=')
                    .with_context(|| format!("allocation {pair:?} is not OPTION=WEIGHT"))?;
                allocations.insert(
                    option.trim().parse::<u16>().context("invalid option")?,
                    weight.trim().parse::<u128>().context("invalid weight")?,
                );
            }
            VoteSelection::Weighted { allocations }
        }
        ModeArg::Ranked => VoteSelection::Ranked { ranking },
    })
}

// ── Reads ───────────────────────────────────────────────────────────────

async fn read(config: NodeConfig, cmd: Cmd) -> anyhow::Result<()> {
    let node = AgoraNode::start(config, Arc::new(SystemClock)).await?;
    let now = Timestamp::now();
    let output = match cmd {
        Cmd::Proposals => node.read(|s| serde_json::to_value(s.proposals(now))).await?,
        Cmd::Proposal { proposal_id } => {
            let id = ProposalId::new(proposal_id);
            node.read(|s| {
                s.proposal(id, now).map(|view| {
                    let ends_in = agora_utils::format_until(now, view.proposal.end_time);
                    let executable_in = view
                        .timelock
                        .as_ref()
                        .filter(|entry| entry.is_pending())
                        .map(|entry| agora_utils::format_until(now, entry.eta));
                    serde_json::json!({
                        "proposal": view,
                        "voting_ends_in": ends_in,
                        "executable_in": executable_in,
                        "votes": s.votes_for(id),
                    })
                })
            })
            .await
            .with_context(|| format!("proposal {id} not found"))?
        }
        Cmd::Power { account } => {
            let account = parse_account(&account)?;
            node.read(|s| {
                serde_json::json!({
                    "account": &account,
                    "balance": s.balance_of(&account),
                    "delegated_away": s.governance().delegated_away(&account),
                    "staked": s.escrow().active_stake(&account),
                    "voting_power": s.voting_power(&account),
                })
            })
            .await
        }
        Cmd::Delegates => node.read(|s| serde_json::to_value(s.delegates())).await?,
        Cmd::Positions { account } => {
            let account = parse_account(&account)?;
            node.read(|s| serde_json::to_value(s.positions(&account))).await?
        }
        Cmd::Rewards { account } => {
            let account = parse_account(&account)?;
            let rewards = node.read(|s| s.reward_account(&account, now)).await?;
            serde_json::to_value(rewards)?
        }
        _ => bail!("not a read command"),
    };
    node.shutdown().await?;
    print_json(&output)
}

// ── Serve ───────────────────────────────────────────────────────────────

async fn serve(config: NodeConfig) -> anyhow::Result<()> {
    let node = AgoraNode::start(config, Arc::new(SystemClock)).await?;
    let shutdown = agora_node::ShutdownController::new();
    let mut stop = shutdown.subscribe();
    let signals = shutdown.clone();
    tokio::spawn(async move { signals.wait_for_signal().await });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = stop.triggered() => break,
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };
        if line.trim().is_empty() {
            continue;
        }
        let output = match serde_json::from_str::<Envelope>(&line) {
            Ok(envelope) => match node.execute(envelope).await {
                Ok(receipt) => serde_json::json!({ "ok": receipt }),
                Err(e) => serde_json::json!({
                    "error": e.to_string(),
                    "kind": e.kind().map(|k| k.as_str()),
                    "retryable": e.is_retryable(),
                }),
            },
            Err(e) => serde_json::json!({ "error": format!("invalid envelope: {e}") }),
        };
        println!("{output}");
    }

    node.shutdown().await?;
    tracing::info!("agora serve exited cleanly");
    Ok(())
}
