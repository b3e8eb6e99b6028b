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

//! Access to reference sequences.
//!
//! Records only need the reference through [Genome::sequence]. [FastaGenome]
//! is an implementation that keeps every contig of a FASTA file in memory.
//!
//! ## Usage
//!
//! ```rust
//! use mdcigar::genome::{FastaGenome, Genome};
//! use std::io::Cursor;
//!
//! let fasta = b">chr1 assembled\nACGTAC\nGTAC\n>chrM\nTTTT\n".to_vec();
//! let genome = FastaGenome::from_reader(Cursor::new(fasta)).unwrap();
//!
//! assert_eq!(genome.sequence("chr1", 5, 8).unwrap(), "ACGT");
//! assert!(genome.sequence("chrM", 3, 5).is_err());
//! ```
//!

use std::io::Read;
use std::path::Path;

use bstr::ByteSlice;
use indexmap::map::IndexMap;
use log::info;

type E = Box<dyn std::error::Error>;

/// Reference sequence lookup.
pub trait Genome {
    /// Bases `start..=end` (1-based, closed) of `contig` in reference orientation.
    fn sequence(
        &self,
        contig: &str,
        start: usize,
        end: usize,
    ) -> Result<String, E>;
}

#[derive(Debug, Clone)]
pub struct UnknownContig {
    pub contig: String,
}

impl std::fmt::Display for UnknownContig {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "contig '{}' is not in the reference", self.contig)
    }
}

impl std::error::Error for UnknownContig {}

#[derive(Debug, Clone)]
pub struct IntervalOutOfBounds {
    pub contig: String,
    pub contig_len: usize,
    pub start: usize,
    pub end: usize,
}

impl std::fmt::Display for IntervalOutOfBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "interval {}-{} is outside of '{}' (length {})", self.start, self.end, self.contig, self.contig_len)
    }
}

impl std::error::Error for IntervalOutOfBounds {}

/// Reference genome held in memory.
///
/// Contigs are named by the first word of their FASTA header and kept in
/// input order.
#[derive(Clone, Debug, Default)]
pub struct FastaGenome {
    contigs: IndexMap<String, Vec<u8>>,
}

impl FastaGenome {
    pub fn new() -> Self {
        FastaGenome { contigs: IndexMap::new() }
    }

    /// Read all contigs from a FASTA file, optionally gzipped.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Self, E> {
        let mut reader = needletail::parse_fastx_file(path)?;
        let mut genome = FastaGenome::new();
        while let Some(record) = reader.next() {
            let record = record?;
            genome.add_contig(&contig_name(record.id()), &record.seq());
        }
        info!("Read {} reference contigs", genome.len());
        Ok(genome)
    }

    /// Read all contigs from FASTA data in [Read].
    pub fn from_reader<R: Read + Send + 'static>(
        conn: R,
    ) -> Result<Self, E> {
        let mut reader = needletail::parse_fastx_reader(conn)?;
        let mut genome = FastaGenome::new();
        while let Some(record) = reader.next() {
            let record = record?;
            genome.add_contig(&contig_name(record.id()), &record.seq());
        }
        Ok(genome)
    }

    /// Add or replace a contig.
    pub fn add_contig(
        &mut self,
        name: &str,
        bases: &[u8],
    ) {
        self.contigs.insert(name.to_string(), bases.to_vec());
    }

    pub fn contig_len(
        &self,
        name: &str,
    ) -> Option<usize> {
        self.contigs.get(name).map(|bases| bases.len())
    }

    pub fn contig_names(
        &self,
    ) -> impl Iterator<Item = &String> {
        self.contigs.keys()
    }

    pub fn len(
        &self,
    ) -> usize {
        self.contigs.len()
    }

    pub fn is_empty(
        &self,
    ) -> bool {
        self.contigs.is_empty()
    }
}

fn contig_name(
    id: &[u8],
) -> String {
    id.fields().next().unwrap_or_default().to_str_lossy().to_string()
}

impl Genome for FastaGenome {
    fn sequence(
        &self,
        contig: &str,
        start: usize,
        end: usize,
    ) -> Result<String, E> {
        let bases = self.contigs.get(contig).ok_or_else(|| UnknownContig { contig: contig.to_string() })?;

        if start == 0 || start > end || end > bases.len() {
            return Err(Box::new(IntervalOutOfBounds { contig: contig.to_string(), contig_len: bases.len(), start, end }))
        }

        Ok(bases[(start - 1)..end].to_str_lossy().to_string())
    }
}
