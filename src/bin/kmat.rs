use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use kmat::cli::counters::MergeCounters;
use kmat::cli::io::{load_abundance_file, load_hash_window, read_fof, RunDir};
use kmat::cli::opts::{CoreArgs, FilterArgs, Mode};
use kmat::cli::Count;
use kmat::matrix::merger::{AbundancePolicy, Merger};
use kmat::matrix::reader::SampleReader;
use kmat::matrix::transpose::transpose_matrix;
use kmat::matrix::write::{merge_to_ascii, merge_to_bf, merge_to_bin, merge_to_pa};
use std::fs::create_dir_all;
use std::path::Path;
use std::time::{Duration, Instant};

/// Command-line options for the partition matrix merger
#[derive(Parser)]
#[command(
    name = "kmat",
    about = "Merge per-sample k-mer count streams of one partition into a matrix",
    long_about = "Merge per-sample k-mer count streams of one partition into a matrix.


EXAMPLES:
    // Binary count matrix with a shared abundance threshold
    $ kmat --run-dir <path/to/run/> --part-id 0 --kmer-size 20 --abundance-min 2 --recurrence-min 2 --mode bin

    // Presence/absence matrix with per-sample thresholds and rescue
    $ kmat -r <path/to/run/> -p 3 -k 20 --abundance-min <path/to/thresholds.txt> --recurrence-min 3 --save-if 2 -m pa
    ",
    version = "0.1.0"
)]
struct Cli {
    #[clap(flatten)]
    core: CoreArgs,

    #[clap(flatten)]
    filter: FilterArgs,
}

fn main() {
    // Catch and handle errors
    // Ensures that tempfile has time to remove partial outputs
    if let Err(e) = run() {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
    std::process::exit(0);
}

fn run() -> Result<()> {
    let start_time = Instant::now();
    let opt = Cli::parse();
    let part_id = opt.core.part_id;
    let run = RunDir::new(&opt.core.run_dir);

    let window = load_hash_window(&run.hash_window_path(), part_id)
        .with_context(|| format!("loading hash window of partition {}", part_id))?;

    let policy = resolve_abundance(&opt.filter.abundance_min)?;

    let fof = run.partition_fof(part_id);
    let inputs = read_fof(&fof)?;

    println!("Fof:     {}", fof.display());
    println!("Mode:    {}", opt.core.mode.as_str());
    println!("A-min:   {}", policy);
    println!("R-min:   {}", opt.filter.recurrence_min);
    println!("Save-if: {}", opt.filter.save_if);

    let mut readers = Vec::with_capacity(inputs.len());
    for (sample, path) in inputs.iter().enumerate() {
        readers.push(SampleReader::open(path, sample, opt.core.header_size)?);
    }

    let mut merger = Merger::new(
        readers,
        policy,
        opt.filter.recurrence_min,
        opt.filter.save_if,
        opt.core.mode.needs_bits(),
        window,
    )
    .with_context(|| format!("configuring merge of partition {}", part_id))?;

    create_dir_all(run.matrix_dir(part_id)).context("Cannot create matrix output directory")?;

    println!("Start: Merging partition {}", part_id);
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("       {spinner} {msg} [{elapsed_precise}]")
            .unwrap(),
    );
    pb.set_message(format!("partition {}", part_id));
    pb.enable_steady_tick(Duration::from_millis(100));

    let k = opt.core.kmer_size;
    let result = match opt.core.mode {
        Mode::Ascii => merge_to_ascii(&mut merger, &run.ascii_matrix(part_id), k),
        Mode::Bin => merge_to_bin(&mut merger, &run.count_matrix(part_id), part_id, k),
        Mode::Pa => merge_to_pa(&mut merger, &run.pa_matrix(part_id), part_id, k),
        Mode::Bf => merge_to_bf(&mut merger, &run.bf_matrix(part_id), part_id, k, window),
        Mode::BfTrp => {
            // Both artifacts are kept; downstream indexing wants the
            // transposed one, the dense one stays addressable by hash
            let dense = run.bf_matrix(part_id);
            merge_to_bf(&mut merger, &dense, part_id, k, window)
                .and_then(|_| transpose_matrix(&dense, &run.bf_trp_matrix(part_id)))
        }
    };
    result.with_context(|| format!("merging partition {}", part_id))?;
    pb.finish_with_message("| Finished merge");

    report_counters(merger.counters());
    println!("Elapsed time: {:.2?}", start_time.elapsed());
    Ok(())
}

/// An existing path selects per-sample thresholds; anything else must
/// parse as the shared scalar threshold.
fn resolve_abundance(arg: &str) -> Result<AbundancePolicy> {
    let p = Path::new(arg);
    if p.is_file() {
        Ok(AbundancePolicy::PerSample(load_abundance_file(p)?))
    } else {
        let a: Count = arg.parse().with_context(|| {
            format!(
                "--abundance-min is neither an integer nor an existing file: {:?}",
                arg
            )
        })?;
        Ok(AbundancePolicy::Uniform(a))
    }
}

fn report_counters(c: &MergeCounters) {
    println!("Non-solid:     {}", c.non_solid);
    println!("Saved:         {}", c.saved);
    println!("Total:         {}", c.total);
    println!("Total w/saved: {}", c.total_w_saved);
}
