// src/main.rs
//
// The main entry point of the RNA fold screening tool.
// Usage examples:
//    cargo run -- sweep \
//      --sequence data/sequences/wt_p132.fasta \
//      --structure data/secondary-structures/wt_p132.dat \
//      --param-file data/parameters/rna_andronescu2007.par \
//      --alpha-steps 100 --tau-steps 100 \
//      --output-dir output
//
//    cargo run -- scan-window \
//      --sequence data/sequences/wt_p140.fasta \
//      --structure data/secondary-structures/wt_p140.dat \
//      --param-file data/parameters/rna_andronescu2007.par \
//      --window-start 119 --window-end 125 \
//      --output-dir output --render
//
//    cargo run -- mutate \
//      --sequence-dir data/sequences --structure-dir data/secondary-structures \
//      --param-file data/parameters/rna_andronescu2007.par \
//      --mutations 121:a_123:g \
//      --output-dir output/folded-mutations
//
//    cargo run -- svg2pdf --input-dir output

mod cli;
mod compare;
mod error;
mod fasta;
mod oracle;
mod render;
mod report;
mod screen;
mod svg_convert;
mod variants;

use env_logger::Env;
use log::error;

use crate::cli::{parse_cli, Command};
use crate::error::Result;
use crate::oracle::CoFoldOracle;

fn main() {
    // 1) Parse CLI
    let args = parse_cli();

    // 2) Initialize logging. If `--debug`, set RUST_LOG=debug, else default to info.
    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // 3) Dispatch; any error aborts the whole batch.
    if let Err(err) = run(&args.command) {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run(command: &Command) -> Result<()> {
    match command {
        Command::Sweep(args) => {
            let oracle = CoFoldOracle::new(args.oracle.fold_bin.as_str());
            screen::run_sweep(args, &oracle)
        }
        Command::ScanWindow(args) => {
            let oracle = CoFoldOracle::new(args.oracle.fold_bin.as_str());
            screen::run_window_scan(args, &oracle)
        }
        Command::ScanPriority(args) => {
            let oracle = CoFoldOracle::new(args.oracle.fold_bin.as_str());
            screen::run_priority_scan(args, &oracle)
        }
        Command::ScanDeletion(args) => {
            let oracle = CoFoldOracle::new(args.oracle.fold_bin.as_str());
            screen::run_deletion_scan(args, &oracle)
        }
        Command::Mutate(args) => {
            let oracle = CoFoldOracle::new(args.oracle.fold_bin.as_str());
            screen::run_mutate(args, &oracle)
        }
        Command::Iterative(args) => {
            let oracle = CoFoldOracle::new(args.oracle.fold_bin.as_str());
            screen::run_iterative(args, &oracle)
        }
        Command::Svg2Pdf(args) => {
            svg_convert::convert_tree(&args.input_dir, &args.converter).map(|_| ())
        }
    }
}
