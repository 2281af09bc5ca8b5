// src/screen.rs
//
// The screening drivers, one per subcommand. Every driver follows the same
// shape: load inputs, enumerate candidates, fold each candidate through the
// oracle, score it against the reference structure(s), record artifacts and
// a result row. Strictly sequential: one variant is fully processed before
// the next begins.

use std::fs;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;

use crate::cli::{
    IterativeArgs, MutateArgs, ProbeArgs, ScanDeletionArgs, ScanPriorityArgs, ScanWindowArgs,
    SweepArgs,
};
use crate::compare::{match_ratio, match_ratio_clamped, mutation_count};
use crate::error::{Result, ScreenError};
use crate::fasta::{family_path, read_fasta, read_raw_sequence, read_structure, FastaRecord};
use crate::oracle::{FoldParams, FoldingOracle};
use crate::render::DiagramRenderer;
use crate::report::{RunRecorder, ScreenRecord};
use crate::variants::{
    apply_complement, apply_deletion, apply_fragment, apply_mutations, default_priority_groups,
    param_grid, parse_mutations, priority_substitutions, window_substitutions, Window,
};

fn progress_bar(total: usize) -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new(total as u64);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} variants folded")
            .progress_chars("##-"),
    );
    pb
}

fn renderer_for(output: &crate::cli::OutputArgs) -> Option<DiagramRenderer> {
    output
        .render
        .then(|| DiagramRenderer::new(output.render_bin.clone()))
}

fn render_or_warn(
    renderer: &Option<DiagramRenderer>,
    record: &FastaRecord,
    structure: &str,
    path: &std::path::Path,
) {
    if let Some(r) = renderer {
        if let Err(err) = r.render(record, structure, path) {
            warn!("diagram {} skipped: {}", path.display(), err);
        }
    }
}

/// Whether any probe-window position of the prediction is paired.
fn probe_paired(structure: &str, probe: &ProbeArgs) -> Option<bool> {
    let start = probe.probe_start?;
    let end = probe.probe_end?;
    let bytes = structure.as_bytes();
    let end = end.min(bytes.len());
    if start >= end {
        return Some(false);
    }
    Some(bytes[start..end].iter().any(|&c| c != b'.'))
}

// ============ Parameter sweep ============

pub fn run_sweep(args: &SweepArgs, oracle: &dyn FoldingOracle) -> Result<()> {
    let record = read_fasta(&args.sequence)?;
    let reference = read_structure(&args.structure)?;

    let metadata = json!({
        "sequence": args.sequence.display().to_string(),
        "structure": args.structure.display().to_string(),
        "alpha_steps": args.alpha_steps,
        "tau_steps": args.tau_steps,
        "param_file": args.oracle.param_file.display().to_string(),
    });
    let mut recorder = RunRecorder::create(&args.output.output_dir, "sweep", metadata)?;
    let renderer = renderer_for(&args.output);

    let grid = param_grid(args.alpha_steps, args.tau_steps);
    info!("Sweeping {} parameter pairs", grid.len());
    let pb = progress_bar(grid.len());

    for (alpha, tau) in grid {
        let params = FoldParams {
            alpha,
            tau,
            param_file: args.oracle.param_file.clone(),
        };
        let prediction = oracle.fold(&record, &params)?;
        let ratio = match_ratio(&reference, &prediction.structure)?;
        debug!("{:.5}x{:.5} -> {:.5}", alpha, tau, ratio);

        render_or_warn(
            &renderer,
            &record,
            &prediction.structure,
            &recorder.diagram_path(&format!("{:.5}x{:.5}_{:.5}.svg", alpha, tau, ratio)),
        );
        recorder.push(ScreenRecord {
            variant: format!("{:.5}x{:.5}", alpha, tau),
            group: None,
            alpha,
            tau,
            match_ratio: ratio,
            mutations: 0,
            secondary_match_ratio: None,
            probe_paired: None,
            energy: prediction.energy,
        });
        pb.inc(1);
    }
    pb.finish();
    recorder.finish()?;
    Ok(())
}

// ============ Window substitution scan ============

pub fn run_window_scan(args: &ScanWindowArgs, oracle: &dyn FoldingOracle) -> Result<()> {
    let base = read_fasta(&args.sequence)?;
    let reference = read_structure(&args.structure)?;
    let window = Window::new(args.window_start, args.window_end);
    window.validate(base.residues.len())?;
    let baseline = base.residues[window.start..window.end].to_string();

    let metadata = json!({
        "sequence": args.sequence.display().to_string(),
        "structure": args.structure.display().to_string(),
        "window_start": args.window_start,
        "window_end": args.window_end,
        "comp_target": args.comp_target,
        "alpha": args.oracle.alpha,
        "tau": args.oracle.tau,
    });
    let mut recorder = RunRecorder::create(&args.output.output_dir, "window-scan", metadata)?;
    let renderer = renderer_for(&args.output);
    let params = args.oracle.fold_params();

    let fragments = window_substitutions(window.len());
    info!("Folding {} window substitutions", fragments.len());
    let pb = progress_bar(fragments.len());

    for (count, fragment) in fragments.iter().enumerate() {
        let mut residues = apply_fragment(&base.residues, window, fragment);
        if let Some(target) = args.comp_target {
            let source = Window::new(window.start + args.comp_source_offset, window.end);
            source.validate(residues.len())?;
            residues = apply_complement(&residues, source, target);
        }
        let variant = FastaRecord::new(base.header.clone(), residues);

        let prediction = oracle.fold(&variant, &params)?;
        let ratio = match_ratio(&reference, &prediction.structure)?;
        let mutations = mutation_count(&baseline, fragment)?;
        debug!("Iteration {}: {} -> {:.5}", count, fragment, ratio);

        render_or_warn(
            &renderer,
            &variant,
            &prediction.structure,
            &recorder.diagram_path(&format!("{:.5}_{}.svg", ratio, count)),
        );
        recorder.push(ScreenRecord {
            variant: fragment.clone(),
            group: None,
            alpha: params.alpha,
            tau: params.tau,
            match_ratio: ratio,
            mutations,
            secondary_match_ratio: None,
            probe_paired: probe_paired(&prediction.structure, &args.probe),
            energy: prediction.energy,
        });
        pb.inc(1);
    }
    pb.finish();
    recorder.finish()?;
    Ok(())
}

// ============ Priority-partitioned scan ============

pub fn run_priority_scan(args: &ScanPriorityArgs, oracle: &dyn FoldingOracle) -> Result<()> {
    let base = read_fasta(&args.sequence)?;
    let reference = read_structure(&args.structure)?;
    let secondary_reference = match &args.secondary_structure {
        Some(path) => Some(read_structure(path)?),
        None => None,
    };
    let window = Window::new(args.window_start, args.window_end);
    window.validate(base.residues.len())?;
    let baseline = base.residues[window.start..window.end].to_string();

    let groups = default_priority_groups();
    if window.len() != groups[0].len() {
        return Err(ScreenError::Config(format!(
            "priority groups cover a {}-base window, got {}..{}",
            groups[0].len(),
            args.window_start,
            args.window_end
        )));
    }

    let metadata = json!({
        "sequence": args.sequence.display().to_string(),
        "structure": args.structure.display().to_string(),
        "window_start": args.window_start,
        "window_end": args.window_end,
        "max_priority_subs": args.max_priority_subs,
        "truncate_tail": args.truncate_tail,
        "alpha": args.oracle.alpha,
        "tau": args.oracle.tau,
    });
    let mut recorder = RunRecorder::create(&args.output.output_dir, "priority-scan", metadata)?;
    let renderer = renderer_for(&args.output);
    let params = args.oracle.fold_params();

    let fragments = priority_substitutions(&groups, window.len(), args.max_priority_subs);
    info!("Folding {} priority-partitioned substitutions", fragments.len());
    let pb = progress_bar(fragments.len());

    for (count, generated) in fragments.iter().enumerate() {
        let (p1, p2, p3) = generated.proportion;
        let group_label = format!("p{}-p{}-p{}", p1, p2, p3);
        let residues = apply_fragment(&base.residues, window, &generated.fragment);
        let variant = FastaRecord::new(base.header.clone(), residues);

        let prediction = oracle.fold(&variant, &params)?;
        let ratio = match_ratio(&reference, &prediction.structure)?;
        let mutations = mutation_count(&baseline, &generated.fragment)?;
        debug!(
            "Iteration {}: {} [{}] -> {:.5}",
            count, generated.fragment, group_label, ratio
        );

        // Refold with the tail removed and score against the second
        // reference, when one was given.
        let secondary = match &secondary_reference {
            Some(sec_ref) => {
                let cut = variant
                    .residues
                    .len()
                    .saturating_sub(args.truncate_tail);
                let truncated =
                    FastaRecord::new(variant.header.clone(), variant.residues[..cut].to_string());
                let sec_prediction = oracle.fold(&truncated, &params)?;
                Some(match_ratio_clamped(sec_ref, &sec_prediction.structure))
            }
            None => None,
        };

        render_or_warn(
            &renderer,
            &variant,
            &prediction.structure,
            &recorder.diagram_path(&format!(
                "{}/{:.5}_{}.svg",
                group_label, ratio, generated.fragment
            )),
        );
        recorder.push(ScreenRecord {
            variant: generated.fragment.clone(),
            group: Some(group_label),
            alpha: params.alpha,
            tau: params.tau,
            match_ratio: ratio,
            mutations,
            secondary_match_ratio: secondary,
            probe_paired: probe_paired(&prediction.structure, &args.probe),
            energy: prediction.energy,
        });
        pb.inc(1);
    }
    pb.finish();
    recorder.finish()?;
    Ok(())
}

// ============ Deletion scan ============

pub fn run_deletion_scan(args: &ScanDeletionArgs, oracle: &dyn FoldingOracle) -> Result<()> {
    let mut family = Vec::with_capacity(args.lengths.len());
    for &length in &args.lengths {
        let record = read_fasta(&family_path(&args.sequence_dir, &args.prefix, length, "fasta"))?;
        let reference =
            read_structure(&family_path(&args.structure_dir, &args.prefix, length, "dat"))?;
        family.push((length, record, reference));
    }

    let metadata = json!({
        "sequence_dir": args.sequence_dir.display().to_string(),
        "structure_dir": args.structure_dir.display().to_string(),
        "lengths": args.lengths,
        "window_start": args.window_start,
        "window_end": args.window_end,
        "comp_offset": args.comp_offset,
        "alpha": args.oracle.alpha,
        "tau": args.oracle.tau,
    });
    let mut recorder = RunRecorder::create(&args.output.output_dir, "deletion-scan", metadata)?;
    let renderer = renderer_for(&args.output);
    let params = args.oracle.fold_params();

    let positions: Vec<usize> = (args.window_start..args.window_end).collect();
    let deleted_bases = if args.comp_offset.is_some() { 2 } else { 1 };
    info!(
        "Folding {} deletion variants across {} family members",
        positions.len(),
        family.len()
    );
    let pb = progress_bar(positions.len() * family.len());

    for &idx in &positions {
        for (length, record, reference) in &family {
            let residues = apply_deletion(&record.residues, idx, args.comp_offset);
            let variant = FastaRecord::new(record.header.clone(), residues);

            let prediction = oracle.fold(&variant, &params)?;
            // Deletions shorten the sequence, so the prediction can never
            // cover the full reference; the clamped ratio makes that policy
            // explicit.
            let ratio = match_ratio_clamped(reference, &prediction.structure);
            debug!("{}_{} -> {:.5}", idx, length, ratio);

            render_or_warn(
                &renderer,
                &variant,
                &prediction.structure,
                &recorder.diagram_path(&format!("{}/{}_{:.5}.svg", idx, length, ratio)),
            );
            recorder.push(ScreenRecord {
                variant: idx.to_string(),
                group: Some(format!("p{}", length)),
                alpha: params.alpha,
                tau: params.tau,
                match_ratio: ratio,
                mutations: deleted_bases,
                secondary_match_ratio: None,
                probe_paired: None,
                energy: prediction.energy,
            });
            pb.inc(1);
        }
    }
    pb.finish();
    recorder.finish()?;
    Ok(())
}

// ============ Explicit mutations ============

pub fn run_mutate(args: &MutateArgs, oracle: &dyn FoldingOracle) -> Result<()> {
    let mutations = parse_mutations(&args.mutations)?;

    let metadata = json!({
        "sequence_dir": args.sequence_dir.display().to_string(),
        "structure_dir": args.structure_dir.display().to_string(),
        "lengths": args.lengths,
        "mutations": args.mutations,
        "alpha": args.oracle.alpha,
        "tau": args.oracle.tau,
    });
    let mut recorder = RunRecorder::create(&args.output.output_dir, &args.mutations, metadata)?;
    let renderer = renderer_for(&args.output);
    let params = args.oracle.fold_params();

    let pb = progress_bar(args.lengths.len());
    let mut reports = serde_json::Map::new();

    for &length in &args.lengths {
        let record = read_fasta(&family_path(&args.sequence_dir, &args.prefix, length, "fasta"))?;
        let reference =
            read_structure(&family_path(&args.structure_dir, &args.prefix, length, "dat"))?;
        let folded_reference = match &args.folded_structure_dir {
            Some(dir) => Some(read_structure(&family_path(dir, &args.prefix, length, "dat"))?),
            None => None,
        };

        let (mutated, report) = apply_mutations(&record.residues, &mutations);
        let variant = FastaRecord::new(format!(">{}_p{}", args.mutations, length), mutated);

        let prediction = oracle.fold(&variant, &params)?;
        let ratio = match_ratio(&reference, &prediction.structure)?;
        let secondary = match folded_reference.as_deref() {
            Some(folded) => Some(match_ratio(folded, &prediction.structure)?),
            None => None,
        };
        debug!("{}_p{} -> {:.5}", args.mutations, length, ratio);

        recorder.write_sequence(&format!("p{}.fasta", length), &variant)?;
        recorder.write_structure(&format!("p{}.dat", length), &prediction.structure)?;
        let diagram_name = match secondary {
            Some(sec) => format!("{}_{:.5}_{:.5}.svg", length, ratio, sec),
            None => format!("{}_{:.5}.svg", length, ratio),
        };
        render_or_warn(
            &renderer,
            &variant,
            &prediction.structure,
            &recorder.diagram_path(&diagram_name),
        );

        let differing: usize = report.iter().map(|r| r.differing).sum();
        recorder.push(ScreenRecord {
            variant: args.mutations.clone(),
            group: Some(format!("p{}", length)),
            alpha: params.alpha,
            tau: params.tau,
            match_ratio: ratio,
            mutations: differing,
            secondary_match_ratio: secondary,
            probe_paired: None,
            energy: prediction.energy,
        });
        reports.insert(format!("p{}", length), serde_json::to_value(&report)?);
        pb.inc(1);
    }
    pb.finish();
    recorder.write_json("mutation-report.json", &serde_json::Value::Object(reports))?;
    recorder.finish()?;
    Ok(())
}

// ============ Iterative prefix folding ============

#[derive(Debug, Serialize)]
pub struct IterationRecord {
    pub start: usize,
    pub end: usize,
    pub energy: Option<f64>,
    pub structure: String,
}

pub fn run_iterative(args: &IterativeArgs, oracle: &dyn FoldingOracle) -> Result<()> {
    if args.window == 0 || args.fixation == 0 {
        return Err(ScreenError::Config(
            "window and fixation must be positive".into(),
        ));
    }
    let residues = read_raw_sequence(&args.sequence)?;
    let len = residues.len();

    let metadata = json!({
        "sequence": args.sequence.display().to_string(),
        "window": args.window,
        "fixation": args.fixation,
        "alpha": args.oracle.alpha,
        "tau": args.oracle.tau,
    });
    let recorder = RunRecorder::create_timestamped(&args.output.output_dir, metadata)?;
    let renderer = renderer_for(&args.output);
    let params = args.oracle.fold_params();

    let mut rows = Vec::new();
    let mut start = 0usize;
    let mut end = args.window.min(len);

    while start < len {
        let record = FastaRecord::new(format!(">prefix_0-{}", end), residues[..end].to_string());
        let prediction = oracle.fold(&record, &params)?;
        let energy = prediction.energy.unwrap_or(0.0);

        let iteration_dir = recorder.dir().join(start.to_string());
        fs::create_dir_all(&iteration_dir)?;
        fs::write(
            iteration_dir.join(format!("{:.2}.dat", energy)),
            &prediction.structure,
        )?;
        render_or_warn(
            &renderer,
            &record,
            &prediction.structure,
            &iteration_dir.join(format!("{:.2}.svg", energy)),
        );
        info!("-->{}:{} - {:.2}", start, end, energy);

        rows.push(IterationRecord {
            start,
            end,
            energy: prediction.energy,
            structure: prediction.structure,
        });
        start += args.fixation;
        end = (start + args.window).min(len);
    }
    recorder.finish_with(&rows)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{OracleArgs, OutputArgs};
    use crate::oracle::Prediction;
    use std::path::{Path, PathBuf};

    /// Oracle returning the same structure for every candidate.
    struct FixedOracle(String);

    impl FoldingOracle for FixedOracle {
        fn fold(&self, _record: &FastaRecord, _params: &FoldParams) -> Result<Prediction> {
            Ok(Prediction {
                structure: self.0.clone(),
                energy: Some(-1.0),
            })
        }
    }

    fn oracle_args() -> OracleArgs {
        OracleArgs {
            param_file: PathBuf::from("params.par"),
            alpha: 0.5,
            tau: 640.0,
            fold_bin: "CoFold".into(),
        }
    }

    fn output_args(dir: &Path) -> OutputArgs {
        OutputArgs {
            output_dir: dir.to_path_buf(),
            render: false,
            render_bin: "RNAplot".into(),
        }
    }

    fn no_probe() -> ProbeArgs {
        ProbeArgs {
            probe_start: None,
            probe_end: None,
        }
    }

    #[test]
    fn window_scan_folds_every_substitution() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let sequence = input.path().join("wt.fasta");
        let structure = input.path().join("wt.dat");
        fs::write(&sequence, ">wt\nAAAAAAAA\n").unwrap();
        fs::write(&structure, "........\n").unwrap();

        let args = ScanWindowArgs {
            sequence,
            structure,
            window_start: 2,
            window_end: 4,
            comp_target: None,
            comp_source_offset: 0,
            probe: no_probe(),
            oracle: oracle_args(),
            output: output_args(output.path()),
        };
        run_window_scan(&args, &FixedOracle("........".into())).unwrap();

        let run_dir = output.path().join("0_window-scan");
        let csv = fs::read_to_string(run_dir.join("results.csv")).unwrap();
        // metadata comment + header + 4^2 rows
        assert_eq!(csv.lines().count(), 2 + 16);
        assert!(csv.contains("AA,")); // the identity fragment appears
    }

    #[test]
    fn sweep_records_the_whole_grid() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let sequence = input.path().join("wt.fasta");
        let structure = input.path().join("wt.dat");
        fs::write(&sequence, ">wt\nACGU\n").unwrap();
        fs::write(&structure, "....\n").unwrap();

        let args = SweepArgs {
            sequence,
            structure,
            alpha_steps: 2,
            tau_steps: 2,
            oracle: oracle_args(),
            output: output_args(output.path()),
        };
        run_sweep(&args, &FixedOracle("....".into())).unwrap();

        let csv = fs::read_to_string(output.path().join("0_sweep/results.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2 + 4);
    }

    #[test]
    fn mutate_writes_artifacts_and_report() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("wt_p8.fasta"), ">wt\nATGCATGC\n").unwrap();
        fs::write(input.path().join("wt_p8.dat"), "........\n").unwrap();

        let args = MutateArgs {
            sequence_dir: input.path().to_path_buf(),
            structure_dir: input.path().to_path_buf(),
            folded_structure_dir: None,
            prefix: "wt_p".into(),
            lengths: vec![8],
            mutations: "1:TT".into(),
            oracle: oracle_args(),
            output: output_args(output.path()),
        };
        run_mutate(&args, &FixedOracle("........".into())).unwrap();

        let run_dir = output.path().join("0_1:TT");
        assert!(run_dir.join("sequences/p8.fasta").is_file());
        assert!(run_dir.join("dot-bracket-structures/p8.dat").is_file());
        assert!(run_dir.join("mutation-report.json").is_file());

        let mutated = fs::read_to_string(run_dir.join("sequences/p8.fasta")).unwrap();
        assert!(mutated.contains("ATTCATGC"));
        let csv = fs::read_to_string(run_dir.join("results.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2 + 1);
    }

    #[test]
    fn deletion_scan_uses_clamped_comparison() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("wt_p8.fasta"), ">wt\nATGCATGC\n").unwrap();
        fs::write(input.path().join("wt_p8.dat"), "........\n").unwrap();

        let args = ScanDeletionArgs {
            sequence_dir: input.path().to_path_buf(),
            structure_dir: input.path().to_path_buf(),
            prefix: "wt_p".into(),
            lengths: vec![8],
            window_start: 2,
            window_end: 4,
            comp_offset: None,
            oracle: oracle_args(),
            output: output_args(output.path()),
        };
        // deletion variants are 7 bases long; the fixed prediction matches
        run_deletion_scan(&args, &FixedOracle(".......".into())).unwrap();

        let csv = fs::read_to_string(output.path().join("0_deletion-scan/results.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2 + 2);
        // 7 matching positions over an 8-base reference
        assert!(csv.contains("0.875"));
    }

    #[test]
    fn iterative_folds_growing_prefixes() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let sequence = input.path().join("wt.seq");
        fs::write(&sequence, "ATGCATGCAT\n").unwrap();

        let args = IterativeArgs {
            sequence,
            window: 4,
            fixation: 4,
            oracle: oracle_args(),
            output: output_args(output.path()),
        };
        run_iterative(&args, &FixedOracle("....".into())).unwrap();

        let run_dir = fs::read_dir(output.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        // prefixes 0..4, 0..8, 0..10
        for iteration in ["0", "4", "8"] {
            assert!(run_dir.join(iteration).join("-1.00.dat").is_file());
        }
        let csv = fs::read_to_string(run_dir.join("results.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2 + 3);
    }

    #[test]
    fn probe_window_detects_pairing() {
        let probe = ProbeArgs {
            probe_start: Some(2),
            probe_end: Some(4),
        };
        assert_eq!(probe_paired("..()..", &probe), Some(true));
        assert_eq!(probe_paired("......", &probe), Some(false));
        assert_eq!(probe_paired("..", &probe), Some(false));
        assert_eq!(probe_paired("....", &no_probe()), None);
    }
}
