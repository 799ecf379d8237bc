mod aggregate;
mod classify;
mod config;
mod corpus;
mod dict;
mod extract;
mod gametime;
mod geocode;
mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use config::RunConfig;
use dict::TermDict;
use extract::Extractor;
use gametime::GameClock;
use geocode::{CachedGeocoder, Geocoder, TableGeocoder};
use types::{CasualtyRecord, MapEvent, MapEventKind, UnitSighting};

const OUTPUT_DIR: &str = "output";

#[derive(Parser)]
#[command(
    name = "warlog_extract",
    about = "Battle-log event extraction and temporal alignment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run full corpus extraction → output/*.json
    Extract {
        /// Path to the paragraph-dump corpus root
        #[arg(default_value = ".")]
        corpus: PathBuf,
        /// Run configuration (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print grouped casualty tables from cached output
    Report,
    /// Print per-faction force estimates from cached sightings
    Units,
    /// Geocode cached map events into points and unit paths
    Map {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Verify the game-clock speed against the configured anchors
    Drift {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Real-time activity histogram for one attacking faction
    Activity {
        faction: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Extract { corpus, config }) => run_extract(&corpus, config.as_deref()),
        Some(Command::Report) => run_report(),
        Some(Command::Units) => run_units(),
        Some(Command::Map { config }) => run_map(config.as_deref()),
        Some(Command::Drift { config }) => run_drift(config.as_deref()),
        Some(Command::Activity { faction, config }) => run_activity(&faction, config.as_deref()),
        // Default: extract from the current directory
        None => run_extract(Path::new("."), None),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  OUTPUT FILE HELPERS
// ═══════════════════════════════════════════════════════════════════════

fn output_path(name: &str) -> PathBuf {
    Path::new(OUTPUT_DIR).join(name)
}

fn write_json<T: serde::Serialize>(name: &str, data: &T) {
    let path = output_path(name);
    let json = serde_json::to_string_pretty(data).expect("JSON serialization failed");
    std::fs::write(&path, &json).unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
    eprintln!("  {} ({} bytes)", path.display(), json.len());
}

fn read_json<T: serde::de::DeserializeOwned>(name: &str) -> T {
    let path = output_path(name);
    let json = std::fs::read_to_string(&path).unwrap_or_else(|e| {
        eprintln!("Cannot read {}: {e}", path.display());
        eprintln!("Run extraction first to generate it.");
        std::process::exit(1);
    });
    serde_json::from_str(&json).unwrap_or_else(|e| {
        eprintln!("Cannot parse {}: {e}", path.display());
        eprintln!("The JSON may be from an older format. Re-run extraction.");
        std::process::exit(1);
    })
}

/// Configuration problems are fatal before any extraction begins.
fn load_config(path: Option<&Path>) -> RunConfig {
    RunConfig::load(path).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    })
}

fn build_extractor(config: &RunConfig) -> Extractor {
    let dict = TermDict::with_extra(&config.extra_terms);
    Extractor::new(
        dict,
        config.excluded_factions.clone(),
        config.target_factions.clone(),
    )
}

// ═══════════════════════════════════════════════════════════════════════
//  EXTRACT MODE: full corpus processing → output/*.json
// ═══════════════════════════════════════════════════════════════════════

fn run_extract(root: &Path, config_path: Option<&Path>) {
    let config = load_config(config_path);
    let extractor = build_extractor(&config);

    eprintln!("Scanning corpus at: {}", root.display());
    let dumps = corpus::scan_corpus(root);
    eprintln!("Found {} paragraph dumps", dumps.len());

    let mut casualties: Vec<CasualtyRecord> = Vec::new();
    let mut map_events: Vec<MapEvent> = Vec::new();
    let mut sightings: Vec<UnitSighting> = Vec::new();
    let mut paragraphs = 0usize;
    let mut unknown_times = 0usize;
    let mut failed: Vec<String> = Vec::new();

    for dump_file in &dumps {
        let Some(dump) = corpus::read_dump(&dump_file.path) else {
            failed.push(dump_file.path.display().to_string());
            continue;
        };

        for p in &dump.paragraphs {
            paragraphs += 1;
            if p.time_label.is_none() {
                unknown_times += 1;
            }

            // The predicates are independent: one paragraph can yield
            // both a casualty record and a map event.
            if let Some(rec) = extractor.extract_casualty(p) {
                casualties.push(rec);
            }
            if let Some(ev) = extractor.extract_map_event(p) {
                map_events.push(ev);
            }
            sightings.extend(extractor.extract_sightings(p));
        }
    }

    aggregate::sort_map_events(&mut map_events);

    eprintln!("\n══════════════════════════════════════════");
    eprintln!("  EXTRACTION STATISTICS");
    eprintln!("══════════════════════════════════════════");
    eprintln!("  Paragraphs scanned:   {paragraphs}");
    eprintln!("  Casualty records:     {}", casualties.len());
    let combats = map_events
        .iter()
        .filter(|e| e.kind == MapEventKind::Combat)
        .count();
    eprintln!(
        "  Map events:           {} ({} combat, {} occupation)",
        map_events.len(),
        combats,
        map_events.len() - combats
    );
    eprintln!("  Unit sightings:       {}", sightings.len());
    eprintln!("  Untimestamped:        {unknown_times}");

    if !failed.is_empty() {
        eprintln!("\n  Unreadable dumps ({}):", failed.len());
        for f in failed.iter().take(10) {
            eprintln!("    {f}");
        }
        if failed.len() > 10 {
            eprintln!("    ... and {} more", failed.len() - 10);
        }
    }

    eprintln!("\n══════════════════════════════════════════");
    eprintln!("  WRITING OUTPUT FILES");
    eprintln!("══════════════════════════════════════════\n");

    std::fs::create_dir_all(OUTPUT_DIR).expect("cannot create output/");
    write_json("casualties.json", &casualties);
    write_json("map_events.json", &map_events);
    write_json("sightings.json", &sightings);

    eprintln!("\nDone. Inspect with:");
    eprintln!("  cargo run -- report");
    eprintln!("  cargo run -- units");
    eprintln!("  cargo run -- drift --config run.json");
}

// ═══════════════════════════════════════════════════════════════════════
//  REPORT MODE: grouped casualty tables
// ═══════════════════════════════════════════════════════════════════════

fn run_report() {
    let casualties: Vec<CasualtyRecord> = read_json("casualties.json");
    if casualties.is_empty() {
        eprintln!("No casualty records in the cache.");
        return;
    }

    let report = aggregate::aggregate_casualties(&casualties);

    println!("[Losses by faction and unit type]");
    println!("{:<14} | {:<26} | {:>6}", "Faction", "Unit type", "Count");
    println!("{}", "-".repeat(52));
    for t in &report.unit_type_totals {
        println!("{:<14} | {:<26} | {:>6}", t.faction, t.unit_type, t.count);
    }

    println!("\n[Losses by faction and day]");
    println!(
        "{:<10} | {:<14} | {:<26} | {:>6}",
        "Day", "Faction", "Unit type", "Count"
    );
    println!("{}", "-".repeat(66));
    for g in &report.groups {
        println!(
            "{:<10} | {:<14} | {:<26} | {:>6}",
            g.day_label, g.faction, g.unit_type, g.count
        );
    }

    println!("\n[Total units lost per faction]");
    for (faction, total) in &report.faction_totals {
        println!("  {faction}: {total}");
    }

    eprintln!(
        "\n{} records, {} groups, {} factions",
        casualties.len(),
        report.groups.len(),
        report.faction_totals.len()
    );
}

// ═══════════════════════════════════════════════════════════════════════
//  UNITS MODE: force estimation from deduplicated sightings
// ═══════════════════════════════════════════════════════════════════════

fn run_units() {
    let sightings: Vec<UnitSighting> = read_json("sightings.json");
    if sightings.is_empty() {
        eprintln!("No unit sightings in the cache.");
        return;
    }

    let estimates = aggregate::estimate_forces(&sightings);

    println!("[Force estimates from unit numbering]");
    println!("Observed unit numbers per faction, most recent sighting each.");

    for est in &estimates {
        println!(
            "\n■ {} (observed: {}, max number: {})",
            est.faction, est.distinct_units, est.max_unit_number
        );
        println!("{:<6} | {:<28} | last seen", "No.", "unit type");
        println!("{}", "-".repeat(60));
        for s in &est.sightings {
            println!(
                "#{:<5} | {:<28} | {}",
                s.unit_number, s.unit_type, s.last_seen
            );
        }
    }

    eprintln!(
        "\n{} raw sightings collapsed into {} units across {} factions",
        sightings.len(),
        estimates.iter().map(|e| e.distinct_units).sum::<usize>(),
        estimates.len()
    );
}

// ═══════════════════════════════════════════════════════════════════════
//  MAP MODE: geocoded points + unit trajectories for the renderer
// ═══════════════════════════════════════════════════════════════════════

#[derive(serde::Serialize)]
struct MapPoint {
    lat: f64,
    lon: f64,
    location: String,
    time_display: String,
    description: String,
    faction: String,
    unit_name: String,
    kind: MapEventKind,
}

#[derive(serde::Serialize)]
struct UnitPath {
    /// "unit (faction)", the trajectory key
    unit_id: String,
    faction: String,
    coords: Vec<(f64, f64)>,
}

#[derive(serde::Serialize)]
struct MapData {
    points: Vec<MapPoint>,
    paths: Vec<UnitPath>,
}

fn run_map(config_path: Option<&Path>) {
    let config = load_config(config_path);
    let mut events: Vec<MapEvent> = read_json("map_events.json");
    aggregate::sort_map_events(&mut events);

    let geocoder = CachedGeocoder::new(TableGeocoder::new(config.locations.clone()));

    let mut points = Vec::new();
    let mut paths: Vec<UnitPath> = Vec::new();
    let mut path_index: HashMap<String, usize> = HashMap::new();
    let mut unresolved = 0usize;

    for e in &events {
        let Some((lat, lon)) = geocoder.resolve(&e.location) else {
            // Dropped from geography only; aggregation already has it.
            unresolved += 1;
            continue;
        };

        // Trajectories append in chronological order (events are sorted).
        let unit_id = format!("{} ({})", e.unit_name, e.faction);
        let idx = *path_index.entry(unit_id.clone()).or_insert_with(|| {
            paths.push(UnitPath {
                unit_id,
                faction: e.faction.clone(),
                coords: Vec::new(),
            });
            paths.len() - 1
        });
        paths[idx].coords.push((lat, lon));

        // Only combat events carry a marker; occupations only extend
        // the trajectory.
        if e.kind == MapEventKind::Combat {
            points.push(MapPoint {
                lat,
                lon,
                location: e.location.clone(),
                time_display: e.time_display.clone(),
                description: e.description.clone(),
                faction: e.faction.clone(),
                unit_name: e.unit_name.clone(),
                kind: e.kind,
            });
        }
    }

    eprintln!(
        "{} events: {} markers, {} unit paths, {} dropped (no coordinates)",
        events.len(),
        points.len(),
        paths.len(),
        unresolved
    );

    std::fs::create_dir_all(OUTPUT_DIR).expect("cannot create output/");
    write_json("map.json", &MapData { points, paths });
}

// ═══════════════════════════════════════════════════════════════════════
//  DRIFT MODE: clock-speed verification over the configured anchors
// ═══════════════════════════════════════════════════════════════════════

fn run_drift(config_path: Option<&Path>) {
    let config = load_config(config_path);
    let anchors = config.require_anchors(2).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });

    let observations: Vec<_> = anchors
        .iter()
        .map(|a| (a.real, types::GameTimestamp::from_game_seconds(a.game_second)))
        .collect();

    // require_anchors(2) guarantees enough observations.
    let Some(report) = gametime::estimate_drift(&observations, config.speed) else {
        eprintln!("Not enough observations for a drift estimate.");
        std::process::exit(1);
    };

    println!(
        "{:^6} | {:^12} | {:^14} | {:^8} | {:^10}",
        "int", "real", "game", "ratio", "drift"
    );
    println!("{}", "-".repeat(62));
    for iv in &report.intervals {
        let ratio = match iv.ratio {
            Some(r) => format!("{r:>7.2}x"),
            None => "  (0s)  ".to_string(),
        };
        println!(
            "#{:<5} | {:>8.1} min | {:>10.1} min | {} | {:>+8}s",
            iv.index,
            iv.real_delta_secs / 60.0,
            iv.game_delta_secs as f64 / 60.0,
            ratio,
            iv.drift_secs
        );
    }

    match report.empirical_speed {
        Some(speed) => {
            println!(
                "\nEmpirical speed: {speed:.4}x (target {:.1}x)",
                config.speed
            );
            if report.on_target() == Some(true) {
                println!("Verdict: clock is running at the target speed.");
            } else {
                println!(
                    "Verdict: off target by {:.4}x.",
                    (speed - config.speed).abs()
                );
            }
        }
        None => println!("\nNo usable interval (all observations share a real instant)."),
    }
    if report.excluded_intervals > 0 {
        println!(
            "{} zero-duration interval(s) excluded from the empirical sum.",
            report.excluded_intervals
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  ACTIVITY MODE: when (in real time) does a faction fight?
// ═══════════════════════════════════════════════════════════════════════

#[derive(serde::Serialize)]
struct ActivityOutput {
    faction: String,
    /// Combat-event counts per real-clock hour (index 0..24).
    histogram: Vec<usize>,
    total: usize,
}

fn run_activity(faction_arg: &str, config_path: Option<&Path>) {
    let config = load_config(config_path);
    let anchors = config.require_anchors(1).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    });
    let clock = GameClock {
        anchor: anchors[0],
        speed: config.speed,
    };

    // The cache stores normalized faction names; accept either spelling.
    let dict = TermDict::with_extra(&config.extra_terms);
    let normalized_arg = dict.translate(faction_arg);

    let events: Vec<MapEvent> = read_json("map_events.json");

    let mut histogram = [0usize; 24];
    let mut matched = 0usize;
    let mut skipped_untimed = 0usize;

    for e in &events {
        if e.kind != MapEventKind::Combat {
            continue;
        }
        if e.faction != faction_arg && e.faction != normalized_arg {
            continue;
        }
        // Farm kills against system factions say nothing about when
        // the player is actually online.
        if let Some(victim) = &e.victim_faction
            && config.excluded_factions.iter().any(|x| x == victim)
        {
            continue;
        }
        if e.game_second == 0 {
            skipped_untimed += 1;
            continue;
        }

        let real = clock.game_to_real(e.game_second);
        let hour = chrono::Timelike::hour(&real.time()) as usize;
        histogram[hour] += 1;
        matched += 1;
    }

    if matched == 0 {
        eprintln!("No combat events found for: {faction_arg}");
        return;
    }

    println!("[Real-time combat activity: {normalized_arg}]");
    let max = histogram.iter().copied().max().unwrap_or(1).max(1);
    for (hour, count) in histogram.iter().enumerate() {
        let bar = "#".repeat(count * 40 / max);
        println!("{hour:02}:00 | {count:>4} | {bar}");
    }

    eprintln!("\n{matched} combat events plotted ({skipped_untimed} without a usable timestamp)");

    std::fs::create_dir_all(OUTPUT_DIR).expect("cannot create output/");
    write_json(
        "activity.json",
        &ActivityOutput {
            faction: normalized_arg,
            histogram: histogram.to_vec(),
            total: matched,
        },
    );
}
