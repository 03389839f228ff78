use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

use astromule_core::{
    ConstellationData, Expedition, PlannedRoute, StarId, StepAction, StepRecord,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Visit as many stars as possible before death
    Maximize,
    /// Cheapest route: shortest path with --destination, conservative
    /// greedy walk without
    Cheapest,
}

#[derive(Debug, Parser)]
#[command(name = "astromule-tester", version = "0.1.0")]
#[command(about = "Exercise the Astromule planning and replay engine against a constellation file")]
struct Args {
    /// Path to the constellation description JSON
    #[arg(long)]
    data: PathBuf,

    /// Origin star id
    #[arg(long)]
    origin: StarId,

    /// Destination star id (cheapest mode only)
    #[arg(long)]
    destination: Option<StarId>,

    /// Planning algorithm
    #[arg(long, value_enum, default_value_t = Algorithm::Maximize)]
    algorithm: Algorithm,

    /// Replay the planned route step by step after planning
    #[arg(long)]
    simulate: bool,

    /// Passages to block before planning, as comma-separated "a-b"
    /// pairs (e.g. "3-7,7-9")
    #[arg(long)]
    block: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let raw = fs::read_to_string(&args.data)
        .with_context(|| format!("reading {}", args.data.display()))?;
    let description = ConstellationData::from_json(&raw)
        .with_context(|| format!("parsing {}", args.data.display()))?;

    let stats = description.statistics();
    println!("{}", "Loaded constellation description".bold());
    println!(
        "  {} constellations, {} stars, {} connections, {} hypergiants",
        stats.total_constellations,
        stats.total_stars,
        stats.total_connections,
        stats.hypergiant_stars
    );

    let expedition = Expedition::new(description);
    if let Some(spec) = args.block.as_deref() {
        for (a, b) in parse_blocked_pairs(spec)? {
            expedition.block(a, b);
            log::info!("blocked passage {a}-{b}");
        }
    }

    let plan = match args.algorithm {
        Algorithm::Maximize => expedition.plan_maximize(args.origin),
        Algorithm::Cheapest => expedition.plan_minimize_cost(args.origin, args.destination),
    };
    if plan.is_empty() {
        bail!("no viable route from star {}", args.origin);
    }
    print_plan(&expedition, &plan);

    if args.simulate {
        println!();
        println!("{}", "Replay".bold());
        let mut journey = expedition
            .start_journey(plan.route.clone())
            .context("starting journey")?;
        while let Some(step) = journey.advance() {
            print_step(&step);
        }
        let summary = journey.summary();
        println!(
            "  {} steps, {} stars visited, final energy {:.1}% ({}), {:.2} kg grass left",
            summary.total_steps,
            summary.stars_visited,
            summary.final_energy,
            summary.final_health,
            summary.remaining_grass
        );
    }
    Ok(())
}

fn parse_blocked_pairs(spec: &str) -> Result<Vec<(StarId, StarId)>> {
    spec.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (a, b) = part
                .trim()
                .split_once('-')
                .with_context(|| format!("expected a-b pair, got {part:?}"))?;
            Ok((a.trim().parse()?, b.trim().parse()?))
        })
        .collect()
}

fn star_label(expedition: &Expedition, id: StarId) -> String {
    expedition
        .graph()
        .borrow()
        .get_star(id)
        .map_or_else(|| format!("Star {id}"), |star| star.display_label())
}

fn print_plan(expedition: &Expedition, plan: &PlannedRoute) {
    let labels: Vec<String> = plan
        .route
        .iter()
        .map(|&id| star_label(expedition, id))
        .collect();
    println!();
    println!("{}", "Planned route".bold());
    println!("  {}", labels.join(" -> ").cyan());
    let stats = &plan.stats;
    println!(
        "  {} stars, {:.2} ly, {:.1}% energy and {:.2} kg grass consumed",
        stats.stars_visited,
        stats.total_distance,
        stats.total_energy_consumed,
        stats.total_grass_consumed
    );
    println!(
        "  final: {:.1}% energy, age {:.2} ly, {:.2} kg grass",
        stats.final_energy, stats.final_age, stats.final_grass
    );
    if let Some(reached) = stats.destination_reached {
        let text = if reached {
            "destination reached".green()
        } else {
            "destination not reached".yellow()
        };
        println!("  {text}");
    }
    if let Some(cause) = stats.cause_of_death {
        println!("  {}", format!("ends in death: {cause:?}").red());
    } else if stats.is_alive {
        println!("  {}", "traveler survives the planned route".green());
    }
}

fn print_step(step: &StepRecord) {
    let tag = step.action.as_str();
    let tag = match step.action {
        StepAction::Start => tag.green(),
        StepAction::HypergiantBoost => tag.yellow(),
        StepAction::RouteRecalculated => tag.cyan(),
        action if action.is_terminal() => tag.red(),
        _ => tag.normal(),
    };
    println!(
        "  [{:>2}] {:<24} {} (energy {:.1}%, age {:.2}, grass {:.2} kg)",
        step.step,
        format!("{} ({})", step.star_label, step.star),
        tag,
        step.state.energy,
        step.state.age,
        step.state.grass
    );
    log::debug!("{}", step.message);
}
