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
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // Recompute NM/MD/jM/jI tags and write SAM
    Refresh {
        // Input SAM file(s), read from stdin if none are given
        #[arg(group = "input", required = false, help = "Input SAM file(s)")]
        input_files: Vec<PathBuf>,

        // Reference genome
        #[arg(short = 'g', long = "genome", required = true, help = "Reference genome in FASTA format")]
        genome_file: PathBuf,

        // Output file path
        #[arg(short = 'o', long = "output", required = false)]
        out_file: Option<PathBuf>,

        // Keep jM motif codes instead of reading them from the genome
        #[arg(long = "trust-motifs", default_value_t = false, help = "Keep the jM motif codes of the input")]
        trust_motifs: bool,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },

    // Write the read sequences in FASTA format
    Fasta {
        // Input SAM file(s), read from stdin if none are given
        #[arg(group = "input", required = false, help = "Input SAM file(s)")]
        input_files: Vec<PathBuf>,

        // Reference genome, needed for records without MD
        #[arg(short = 'g', long = "genome", required = true, help = "Reference genome in FASTA format")]
        genome_file: PathBuf,

        // Output file path
        #[arg(short = 'o', long = "output", required = false)]
        out_file: Option<PathBuf>,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },

    // Report records whose NM/MD disagree with the CIGAR or the reference
    Check {
        // Input SAM file(s), read from stdin if none are given
        #[arg(group = "input", required = false, help = "Input SAM file(s)")]
        input_files: Vec<PathBuf>,

        // Reference genome
        #[arg(short = 'g', long = "genome", required = true, help = "Reference genome in FASTA format")]
        genome_file: PathBuf,

        // Output file path
        #[arg(short = 'o', long = "output", required = false)]
        out_file: Option<PathBuf>,

        // Keep jM motif codes instead of reading them from the genome
        #[arg(long = "trust-motifs", default_value_t = false, help = "Keep the jM motif codes of the input")]
        trust_motifs: bool,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },
}
