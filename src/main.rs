// mdcigar: Reconcile CIGAR strings and MD tags of SAM alignment records.
//
// Copyright 2025 Tommi Mäklin [tommi@maklin.fi].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//
use std::fs::File;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use clap::CommandFactory;
use clap::Parser;
use log::error;
use log::info;

use mdcigar::genome::FastaGenome;
use mdcigar::junction::JunctionClassifier;
use mdcigar::junction::MotifCodeClassifier;
use mdcigar::junction::ReferenceMotifClassifier;
use mdcigar::CheckSummary;
use mdcigar::Format;

mod cli;

type E = Box<dyn std::error::Error>;

/// Initializes the logger with verbosity given in `log_max_level`.
fn init_log(log_max_level: usize) {
    stderrlog::new()
    .module(module_path!())
    .quiet(false)
    .verbosity(log_max_level)
    .timestamp(stderrlog::Timestamp::Off)
    .init()
    .unwrap();
}

/// Opens `path` for reading, decompressing it if the name ends in `.gz`.
fn open_input(
    path: &Path,
) -> Result<Box<dyn Read>, E> {
    let f = File::open(path)?;
    if path.extension().is_some_and(|x| x == "gz") {
        Ok(Box::new(flate2::read::MultiGzDecoder::new(f)))
    } else {
        Ok(Box::new(f))
    }
}

/// Opens `path` for writing or stdout if `path` is None.
fn open_output(
    path: &Option<PathBuf>,
) -> Result<Box<dyn Write>, E> {
    match path {
        Some(file) => Ok(Box::new(BufWriter::new(File::create(file)?))),
        None => Ok(Box::new(BufWriter::new(std::io::stdout()))),
    }
}

/// Opens all input files or stdin if there are none.
fn open_inputs(
    input_files: &[PathBuf],
) -> Result<Vec<(String, Box<dyn Read>)>, E> {
    if input_files.is_empty() {
        return Ok(vec![("stdin".to_string(), Box::new(std::io::stdin()) as Box<dyn Read>)])
    }
    input_files.iter().map(|file| {
        Ok((file.to_string_lossy().to_string(), open_input(file)?))
    }).collect()
}

fn convert<C: JunctionClassifier>(
    input_files: &[PathBuf],
    genome_file: &Path,
    out_file: &Option<PathBuf>,
    format: Format,
    classifier: &C,
) -> Result<(), E> {
    let genome = FastaGenome::from_path(genome_file)?;
    let mut conn_out = open_output(out_file)?;

    // Only the header of the first input is written
    for (i, (name, mut conn_in)) in open_inputs(input_files)?.into_iter().enumerate() {
        let n_rejected = mdcigar::convert_from_read_to_write(&genome, classifier, format.clone(), i == 0, &mut conn_in, &mut conn_out)?;
        if n_rejected > 0 {
            info!("Skipped {} records from {}", n_rejected, name);
        }
    }
    conn_out.flush()?;

    Ok(())
}

fn check<C: JunctionClassifier>(
    input_files: &[PathBuf],
    genome_file: &Path,
    out_file: &Option<PathBuf>,
    classifier: &C,
) -> Result<CheckSummary, E> {
    let genome = FastaGenome::from_path(genome_file)?;
    let mut conn_out = open_output(out_file)?;

    let mut total = CheckSummary::default();
    for (_, mut conn_in) in open_inputs(input_files)? {
        let summary = mdcigar::check_from_read_to_write(&genome, classifier, &mut conn_in, &mut conn_out)?;
        total.checked += summary.checked;
        total.inconsistent += summary.inconsistent;
        total.rejected += summary.rejected;
    }
    conn_out.flush()?;

    Ok(total)
}

fn main() {
    let cli = cli::Cli::parse();

    // Subcommands:
    let res = match &cli.command {
        // Refresh
        Some(cli::Commands::Refresh {
            input_files,
            genome_file,
            out_file,
            trust_motifs,
            verbose,
        }) => {
            init_log(if *verbose { 2 } else { 1 });
            if *trust_motifs {
                convert(input_files, genome_file, out_file, Format::SAM, &MotifCodeClassifier)
            } else {
                convert(input_files, genome_file, out_file, Format::SAM, &ReferenceMotifClassifier)
            }
        },

        // Fasta
        Some(cli::Commands::Fasta {
            input_files,
            genome_file,
            out_file,
            verbose,
        }) => {
            init_log(if *verbose { 2 } else { 1 });
            convert(input_files, genome_file, out_file, Format::FASTA, &MotifCodeClassifier)
        },

        // Check
        Some(cli::Commands::Check {
            input_files,
            genome_file,
            out_file,
            trust_motifs,
            verbose,
        }) => {
            init_log(if *verbose { 2 } else { 1 });
            let summary = if *trust_motifs {
                check(input_files, genome_file, out_file, &MotifCodeClassifier)
            } else {
                check(input_files, genome_file, out_file, &ReferenceMotifClassifier)
            };
            summary.map(|summary| {
                info!("{} records checked: {} inconsistent, {} rejected", summary.checked, summary.inconsistent, summary.rejected);
            })
        },

        None => {
            cli::Cli::command().print_help().map_err(E::from)
        },
    };

    if let Err(e) = res {
        error!("{}", e);
        std::process::exit(1);
    }
}
