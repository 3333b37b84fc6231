use std::{
    io::Write,
    path::PathBuf,
    thread,
    time::Duration,
};

use clap::Parser;
use deckforge::{
    config::{
        self,
        ImportConfig,
    },
    core::{
        colors,
        pipeline::{
            ImportOutcome,
            ImportReport,
            Phase,
        },
        tasks::{
            ImportManager,
            ImportUpdate,
        },
        Deck,
        EnrichmentStatus,
    },
    synergy,
};

#[derive(Parser)]
#[command(name = "deckforge", version, about = "Import, enrich and score an MTG deck list")]
struct Args {
    /// Deck list CSV, requires name and quantity columns
    csv_path: PathBuf,

    /// Commander to take the color identity from, defaults to the first
    /// legendary card in the list
    #[arg(long)]
    commander: Option<String>,

    /// Target locale for oracle text
    #[arg(long)]
    locale: Option<String>,

    /// How many synergy pairs to show
    #[arg(long, default_value_t = 10)]
    top: usize,
}

fn main() {
    let args = Args::parse();

    let mut config = config::load_config();
    if let Some(locale) = args.locale.clone() {
        config.target_locale = locale;
    }

    match run_import(&args, config.clone()) {
        Some(outcome) => present(outcome, &args, &config),
        None => std::process::exit(1),
    }
}

/// Drives the import through the manager, mirroring progress to the terminal
/// the way the GUI progress bar would.
fn run_import(args: &Args, config: ImportConfig) -> Option<ImportOutcome> {
    let mut manager = ImportManager::new();
    let handle = manager.start_import(args.csv_path.clone(), config);

    loop {
        // Read liveness before draining: a worker that finished in between
        // has already queued its terminal update, which this drain will see.
        let worker_done = handle.is_finished();
        for update in manager.poll_updates() {
            match update {
                ImportUpdate::Progress(event) => {
                    let phase = match event.phase {
                        Phase::Loading => "loading",
                        Phase::Enriching => "enriching",
                    };
                    print!("\r{:>9} {:3}%", phase, event.percent);
                    let _ = std::io::stdout().flush();
                }
                ImportUpdate::Finished(Ok(outcome)) => {
                    println!();
                    return Some(outcome);
                }
                ImportUpdate::Finished(Err(message)) => {
                    println!();
                    eprintln!("Import failed: {}", message);
                    return None;
                }
                ImportUpdate::Cancelled => {
                    println!();
                    eprintln!("Import cancelled");
                    return None;
                }
            }
        }

        if worker_done {
            eprintln!("Import worker exited without a result");
            return None;
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn present(outcome: ImportOutcome, args: &Args, config: &ImportConfig) {
    let ImportOutcome { mut deck, report } = outcome;

    print_report(&report);

    deck.choose_commander(args.commander.as_deref());
    let commander = deck.commander().map(|c| (c.name.clone(), colors::identity(c)));
    match commander {
        Some((name, identity)) => {
            println!("Commander: {} [{}]", name, colors::color_letters(&identity));
            colors::annotate(&mut deck, &identity);
        }
        None => match &args.commander {
            Some(name) => eprintln!("Commander '{}' not found in the deck", name),
            None => println!("No legendary card to use as commander"),
        },
    }

    println!();
    for card in &deck.cards {
        let status = match card.enrichment_status {
            EnrichmentStatus::ResolvedById | EnrichmentStatus::ResolvedByName => "ok",
            EnrichmentStatus::Unresolved => "??",
            EnrichmentStatus::Error => "!!",
            EnrichmentStatus::Pending => "..",
        };
        let violation = if card.violates_identity { "  (outside identity)" } else { "" };
        println!(
            "{:>3}x [{:<5}] {} {}  {} {}{}",
            card.quantity,
            colors::color_letters(&card.colors),
            status,
            card.mana_cost,
            card.name,
            card.type_line,
            violation
        );
    }

    print_synergies(&deck, args, config);
}

fn print_report(report: &ImportReport) {
    if !report.skipped_rows.is_empty() {
        println!("Skipped rows:");
        for row in &report.skipped_rows {
            println!("  line {}: {}", row.line, row.reason);
        }
    }
    if !report.error_details.is_empty() {
        println!("Cards with errors:");
        for failure in &report.error_details {
            println!("  {}: {}", failure.name, failure.detail);
        }
    }
    println!(
        "Resolved {} by id, {} by name, {} unresolved, {} errors",
        report.resolved_by_id, report.resolved_by_name, report.unresolved, report.errors
    );
}

fn print_synergies(deck: &Deck, args: &Args, config: &ImportConfig) {
    let matrix = synergy::compute(deck, &config.synergy);
    if matrix.is_empty() {
        return;
    }

    println!();
    println!("Top synergies:");
    for (pair, score) in matrix.top(args.top) {
        println!("  {:.2}  {} + {}", score, pair.0, pair.1);
    }
}
