use std::fs::File;
use std::io::BufWriter;

use clap::Parser;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use serde_json::json;

use bffsoup::analytics;
use bffsoup::soup::Soup;
use bffsoup::vm::is_instruction;

/// Drives a soup of self-modifying programs through repeated random
/// pairwise interactions, reporting population-level metrics as it
/// goes. A thin wrapper over the library: all the interesting behavior
/// lives in `bffsoup::soup`.
#[derive(Parser)]
#[command(name = "bffsoup", about = "Digital abiogenesis: a BFF program soup")]
struct Cli {
    /// Number of programs in the population. Must be even.
    #[arg(long, default_value_t = 1024)]
    pop: usize,

    /// Number of epochs to run.
    #[arg(long, default_value_t = 10_000)]
    epochs: usize,

    /// Max VM steps per pairwise interaction.
    #[arg(long, default_value_t = 8192)]
    step_limit: usize,

    /// Per-byte mutation probability applied to each epoch's offspring
    /// (0 disables mutation).
    #[arg(long, default_value_t = 0.0)]
    mutate: f64,

    /// Random seed. Drawn from the OS if omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Print a metrics line every N epochs.
    #[arg(long, default_value_t = 100)]
    report_every: usize,

    /// Record and print per-epoch exact-replication event counts.
    #[arg(long)]
    log_events: bool,

    /// Write a gzip-compressed snapshot of the final population here.
    #[arg(long)]
    snapshot_out: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    if cli.pop < 2 || cli.pop % 2 != 0 {
        eprintln!("--pop must be even and at least 2, got {}", cli.pop);
        std::process::exit(1);
    }

    let seed = cli.seed.unwrap_or_else(|| SmallRng::from_entropy().next_u64());
    eprintln!("seed: {seed}");

    let mut soup = match Soup::new(cli.pop, seed) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to build soup: {e}");
            std::process::exit(1);
        }
    };

    println!("epoch,entropy_bits,compress_ratio,a_exact,b_exact,none");
    report(&soup, 0, &[]);

    for epoch in 1..=cli.epochs {
        let outcomes = match soup.epoch(cli.step_limit, cli.mutate, cli.log_events) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("epoch {epoch} failed: {e}");
                std::process::exit(1);
            }
        };

        if epoch % cli.report_every == 0 || epoch == cli.epochs {
            report(&soup, epoch, &outcomes);
        }

        if epoch % 1000 == 0 || epoch == cli.epochs {
            eprint!("\repoch {epoch}/{}", cli.epochs);
        }
    }
    eprintln!();

    if let Some(path) = cli.snapshot_out {
        let meta = json!({
            "seed": seed,
            "pop": cli.pop,
            "epochs": cli.epochs,
            "step_limit": cli.step_limit,
            "mutate": cli.mutate,
            "epoch_index": soup.epoch_index(),
        });
        match File::create(&path) {
            Ok(file) => {
                if let Err(e) = bffsoup::snapshot::save(BufWriter::new(file), soup.population(), meta) {
                    eprintln!("failed to write snapshot to {path}: {e}");
                    std::process::exit(1);
                }
                eprintln!("snapshot written to {path}");
            }
            Err(e) => {
                eprintln!("failed to create {path}: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn report(soup: &Soup, epoch: usize, outcomes: &[bffsoup::detector::PairOutcome]) {
    let pool = soup.population();
    let entropy = analytics::shannon_entropy_bits(pool);
    let ratio = analytics::compress_ratio(pool);

    let mut a_exact = 0u64;
    let mut b_exact = 0u64;
    let mut none = 0u64;
    for outcome in outcomes {
        match outcome.event.kind {
            bffsoup::detector::ReplicationKind::AExact => a_exact += 1,
            bffsoup::detector::ReplicationKind::BExact => b_exact += 1,
            bffsoup::detector::ReplicationKind::None => none += 1,
        }
    }

    println!("{epoch},{entropy:.6},{ratio:.6},{a_exact},{b_exact},{none}");

    if epoch % (10 * 100).max(1) == 0 {
        let hist = analytics::opcode_histogram(pool);
        let opcode_total: u64 = hist.iter().filter(|(&b, _)| is_instruction(b)).map(|(_, c)| c).sum();
        let total: u64 = hist.values().sum();
        eprintln!("  opcode bytes: {opcode_total}/{total} ({:.2}%)", 100.0 * opcode_total as f64 / total.max(1) as f64);
    }
}
