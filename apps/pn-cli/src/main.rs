use clap::{Args, Parser, Subcommand};
use pn_core::{NodeId, PnError};
use pn_graph::{NodeKind, Topology};
use pn_project::{
    ProjectResult, StateFile, TopologyDef, build_network, load_json, load_state, load_yaml,
    reference, save_state, topology_fingerprint,
};
use pn_sim::{FaultAction, Network, NetworkView, RunOptions, run};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "pn-cli")]
#[command(about = "PowerNet CLI - spacecraft resource network harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a topology file and build its network
    Validate {
        #[command(flatten)]
        source: TopologySource,
    },
    /// Print nodes, wiring and evaluation order
    Show {
        #[command(flatten)]
        source: TopologySource,
    },
    /// Step a network and print load supplies
    Run {
        #[command(flatten)]
        source: TopologySource,
        /// Number of ticks to step
        #[arg(long, default_value_t = 1)]
        ticks: u64,
        /// Print supplies every N ticks (the last tick is always printed)
        #[arg(long)]
        every: Option<u64>,
        /// Saved state to restore before stepping
        #[arg(long)]
        state: Option<PathBuf>,
        /// Write the final state here
        #[arg(long)]
        save: Option<PathBuf>,
        /// Switch command applied before the first tick, e.g. `open:CB_1`,
        /// `engage:CROSS_TIE`, `select:EPS_INVERTER=2`
        #[arg(long = "command", value_parser = parse_switch)]
        commands: Vec<Switch>,
        /// Scripted fault `TICK:NODE:ACTION`, e.g. `3:BAT_1:deplete`
        #[arg(long = "fault", value_parser = parse_fault)]
        faults: Vec<Fault>,
    },
}

#[derive(Args)]
struct TopologySource {
    /// Topology file (.yaml, .yml or .json)
    #[arg(required_unless_present = "lm")]
    topology: Option<PathBuf>,
    /// Use the built-in lunar module grid
    #[arg(long, conflicts_with = "topology")]
    lm: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Throw {
    Open,
    Close,
    Engage,
    Disengage,
    Activate,
    Deactivate,
}

#[derive(Clone, Debug)]
enum Switch {
    Node { throw: Throw, name: String },
    Select { selector: String, position: String },
}

#[derive(Clone, Debug)]
struct Fault {
    tick: u64,
    node: String,
    action: FaultAction,
}

fn main() -> ProjectResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { source } => cmd_validate(&source),
        Commands::Show { source } => cmd_show(&source),
        Commands::Run {
            source,
            ticks,
            every,
            state,
            save,
            commands,
            faults,
        } => cmd_run(
            &source,
            ticks,
            every.unwrap_or(ticks),
            state.as_deref(),
            save.as_deref(),
            &commands,
            &faults,
        ),
    }
}

fn load_topology(source: &TopologySource) -> ProjectResult<TopologyDef> {
    if source.lm {
        return reference::lm_eps();
    }
    match &source.topology {
        None => reference::lm_eps(),
        Some(path) if path.extension().is_some_and(|e| e == "json") => load_json(path),
        Some(path) => load_yaml(path),
    }
}

fn cmd_validate(source: &TopologySource) -> ProjectResult<()> {
    let def = load_topology(source)?;
    println!("Validating topology: {}", def.name);
    let network = build_network(&def)?;
    let topology = network.topology();
    println!("✓ Topology is valid");
    println!("  Nodes: {}", topology.len());
    println!("  Ties: {}", topology.ties().len());
    println!("  Loads: {}", topology.loads().len());
    println!("  Selectors: {}", topology.selectors().len());
    println!("  Scheduled faults: {}", network.schedule().len());
    println!("  Fingerprint: {}", topology_fingerprint(&def));
    Ok(())
}

/// Loads downstream of `from` through ordinary wiring, in evaluation order.
fn wired_loads(topology: &Topology, from: NodeId) -> Vec<&str> {
    topology
        .reachable_from(from)
        .into_iter()
        .filter(|&id| topology.node(id).is_some_and(|n| n.kind.is_load()))
        .map(|id| topology.name_of(id))
        .collect()
}

fn cmd_show(source: &TopologySource) -> ProjectResult<()> {
    let def = load_topology(source)?;
    let network = build_network(&def)?;
    let topology = network.topology();

    println!("Topology '{}':", def.name);
    for node in topology.nodes() {
        let upstream: Vec<&str> = node.upstream.iter().map(|&u| topology.name_of(u)).collect();
        let detail = match node.kind {
            NodeKind::Source { nominal_level } => format!(" {nominal_level} V"),
            NodeKind::Breaker {
                capacity: Some(capacity),
            } => format!(" rated {capacity}"),
            NodeKind::Tie { sides: [a, b] } => {
                format!(" {} <-> {}", topology.name_of(a), topology.name_of(b))
            }
            NodeKind::Load { demand } => format!(" demand {demand}"),
            _ => String::new(),
        };
        if upstream.is_empty() {
            println!("  {} [{}]{}", node.name, node.kind.label(), detail);
        } else {
            println!(
                "  {} [{}]{} <- {}",
                node.name,
                node.kind.label(),
                detail,
                upstream.join(", ")
            );
        }
    }

    for selector in topology.selectors() {
        let positions: Vec<&str> = selector.positions.iter().map(|p| p.name.as_str()).collect();
        println!("\nSelector {}: {}", selector.name, positions.join(" | "));
    }

    println!("\nLoads wired below each source (ties open):");
    for node in topology.nodes().iter().filter(|n| n.kind.is_source()) {
        println!("  {}: {}", node.name, wired_loads(topology, node.id).join(", "));
    }

    let order: Vec<&str> = topology
        .eval_order()
        .iter()
        .map(|&id| topology.name_of(id))
        .collect();
    println!("\nEvaluation order: {}", order.join(" -> "));
    Ok(())
}

fn cmd_run(
    source: &TopologySource,
    ticks: u64,
    every: u64,
    state: Option<&Path>,
    save: Option<&Path>,
    commands: &[Switch],
    faults: &[Fault],
) -> ProjectResult<()> {
    let def = load_topology(source)?;
    let mut network = build_network(&def)?;

    if let Some(path) = state {
        let file = load_state(path)?;
        file.apply(&def, &mut network)?;
        println!(
            "Restored state from {} (tick {}, saved {})",
            path.display(),
            network.tick(),
            file.saved_at
        );
    }

    for switch in commands {
        apply_switch(&mut network, switch)?;
    }
    let start = network.tick();
    for fault in faults {
        let node = network.resolve(&fault.node)?;
        network.schedule_fault(start + fault.tick, node, fault.action)?;
    }

    tracing::debug!(
        ticks,
        every,
        commands = commands.len(),
        faults = network.schedule().len(),
        "starting run"
    );
    println!("Stepping '{}' for {} ticks", def.name, ticks);
    let timer = Instant::now();
    let record = run(
        &mut network,
        &RunOptions {
            ticks,
            record_every: every,
        },
    )?;
    let elapsed = timer.elapsed();

    for table in &record.samples {
        println!("\nTick {}:", table.tick());
        for &load in network.topology().loads() {
            let supply = table.query(load)?;
            let status = if supply.available { "powered" } else { "dark" };
            println!(
                "  {:<24} {:<8} {:>6.1}",
                network.topology().name_of(load),
                status,
                supply.effective_level()
            );
        }
    }

    if !record.trips.is_empty() {
        println!("\nBreaker trips:");
        for (tick, breaker) in &record.trips {
            println!("  tick {}: {}", tick, network.topology().name_of(*breaker));
        }
    }
    if record.commands_rejected > 0 {
        println!("\n{} buffered commands rejected", record.commands_rejected);
    }
    println!("\n✓ {} ticks in {:.3} ms", ticks, elapsed.as_secs_f64() * 1e3);

    if let Some(path) = save {
        save_state(path, &StateFile::capture(&def, &network))?;
        println!("✓ State saved to {}", path.display());
    }
    Ok(())
}

fn apply_switch(network: &mut Network, switch: &Switch) -> Result<(), PnError> {
    let (throw, name) = match switch {
        Switch::Select { selector, position } => return network.select_named(selector, position),
        Switch::Node { throw, name } => (*throw, name),
    };
    let id = network.resolve(name)?;
    match throw {
        Throw::Open => network.set_commanded_open(id, true),
        Throw::Close => network.set_commanded_open(id, false),
        Throw::Engage => network.set_engaged(id, true),
        Throw::Disengage => network.set_engaged(id, false),
        Throw::Activate => network.set_active(id, true),
        Throw::Deactivate => network.set_active(id, false),
    }
}

fn parse_switch(arg: &str) -> Result<Switch, String> {
    let (verb, target) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected VERB:TARGET, got '{arg}'"))?;
    let throw = match verb {
        "open" => Throw::Open,
        "close" => Throw::Close,
        "engage" => Throw::Engage,
        "disengage" => Throw::Disengage,
        "activate" => Throw::Activate,
        "deactivate" => Throw::Deactivate,
        "select" => {
            let (selector, position) = target
                .split_once('=')
                .ok_or_else(|| format!("expected select:SELECTOR=POSITION, got '{arg}'"))?;
            return Ok(Switch::Select {
                selector: selector.to_string(),
                position: position.to_string(),
            });
        }
        other => return Err(format!("unknown switch verb '{other}'")),
    };
    Ok(Switch::Node {
        throw,
        name: target.to_string(),
    })
}

fn parse_fault(arg: &str) -> Result<Fault, String> {
    let mut parts = arg.splitn(3, ':');
    let (Some(tick), Some(node), Some(action)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected TICK:NODE:ACTION, got '{arg}'"));
    };
    let tick = tick
        .parse()
        .map_err(|_| format!("invalid tick '{tick}'"))?;
    let action = match action {
        "fail_open" => FaultAction::FailOpen,
        "fail_closed" => FaultAction::FailClosed,
        "clear" => FaultAction::Clear,
        "deplete" => FaultAction::Deplete,
        "restore" => FaultAction::Restore,
        other => return Err(format!("unknown fault action '{other}'")),
    };
    Ok(Fault {
        tick,
        node: node.to_string(),
        action,
    })
}
