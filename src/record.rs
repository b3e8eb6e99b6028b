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

//! A single SAM alignment record.
//!
//! [AlignmentRecord] keeps the mandatory SAM columns, the NM and MD tags,
//! the splice junctions of the alignment, and any other optional fields in
//! input order. A record always has NM and MD: if MD is missing from the
//! input both are computed from the reference when the record is created.
//!
//! ## Usage
//!
//! ```rust
//! use mdcigar::genome::FastaGenome;
//! use mdcigar::junction::MotifCodeClassifier;
//! use mdcigar::record::AlignmentRecord;
//! use mdcigar::Strand;
//!
//! let mut genome = FastaGenome::new();
//! genome.add_contig("chr1", b"ACGTACGTAC");
//!
//! let line = "r1\t16\tchr1\t1\t60\t10M\t*\t0\t0\tACGTTCGTAC\tIIIIIIIIII\tAS:i:8";
//! let record = AlignmentRecord::from_line(line, &genome, &MotifCodeClassifier).unwrap();
//!
//! assert_eq!(record.strand(), Strand::Reverse);
//! assert_eq!(record.nm(), 1);
//! assert_eq!(record.md(), "MD:Z:4A5");
//! assert_eq!(record.reference_end(), 10);
//! ```
//!

use log::debug;
use noodles_sam as sam;
use noodles_sam::alignment::record::Flags;

use crate::cigar::decode_cigar;
use crate::cigar::encode_cigar;
use crate::genome::Genome;
use crate::junction::classify_junctions;
use crate::junction::JunctionClassifier;
use crate::junction::SpliceJunction;
use crate::md::decode_md;
use crate::merge::edit_distance;
use crate::merge::merge;
use crate::recompute::nm_md_from_reference;
use crate::tags::OptionalField;
use crate::AlignmentError;
use crate::Run;
use crate::Strand;

/// Number of mandatory SAM columns.
pub const MANDATORY_FIELDS: usize = 11;

/// Largest POS allowed in SAM.
pub const MAX_POSITION: usize = (1 << 31) - 1;

fn malformed(
    field: &str,
    value: &str,
) -> AlignmentError {
    AlignmentError::MalformedInput { field: field.to_string(), value: value.to_string() }
}

fn parse_position(
    pos: &str,
) -> Result<usize, AlignmentError> {
    pos.parse::<usize>().ok()
        .filter(|x| *x > 0 && *x <= MAX_POSITION)
        .ok_or_else(|| malformed("POS", pos))
}

/// Merge the CIGAR with a stored MD field.
///
/// Inconsistencies report `md` as it was stored.
fn merge_stored_md(
    cigar: &[Run],
    md: &str,
) -> Result<Vec<Run>, AlignmentError> {
    merge(cigar, &decode_md(md)?).map_err(|e| match e {
        AlignmentError::AlignmentInconsistency { cigar, .. } => AlignmentError::AlignmentInconsistency { cigar, md: md.to_string() },
        e => e,
    })
}

/// Convert jI positions to 1-based intron bounds.
fn intron_bounds_from_tag(
    bounds: &[i64],
) -> Result<Vec<usize>, AlignmentError> {
    bounds.iter().map(|x| {
        usize::try_from(*x).ok().filter(|x| *x > 0).ok_or_else(|| {
            malformed("jI", &bounds.iter().map(|x| x.to_string()).collect::<Vec<String>>().join(","))
        })
    }).collect()
}

/// An aligned read.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentRecord {
    query_name: String,
    flags: Flags,
    contig: String,
    position: usize,
    mapq: String,
    cigar: Vec<Run>,
    mate_contig: String,
    mate_position: String,
    template_len: String,
    sequence: String,
    quality: String,

    nm: usize,
    md: String,

    junctions: Vec<SpliceJunction>,
    // jM/jI fields of records without junctions, written back as is
    junction_sentinels: Vec<OptionalField>,

    other_fields: Vec<OptionalField>,
}

/// Stored NM and MD of a record compared against the CIGAR and the reference.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagCheck {
    pub query_name: String,
    /// CIGAR merged with the stored MD.
    pub unified: Vec<Run>,
    pub stored_nm: usize,
    pub stored_md: String,
    /// Edit distance of `unified`.
    pub merged_nm: usize,
    pub reference_nm: usize,
    pub reference_md: String,
}

impl TagCheck {
    /// True if the stored tags, the merge and the reference all agree.
    pub fn is_consistent(
        &self,
    ) -> bool {
        self.stored_nm == self.merged_nm
            && self.merged_nm == self.reference_nm
            && self.stored_md.eq_ignore_ascii_case(&self.reference_md)
    }
}

impl std::fmt::Display for TagCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}\tNM:i:{}\tmerged:{}\treference:{}\t{}\t{}",
               self.query_name, self.stored_nm, self.merged_nm, self.reference_nm, self.stored_md, self.reference_md)
    }
}

impl AlignmentRecord {
    /// Parse a tab-separated SAM line.
    ///
    /// NM and MD are computed from `genome` if MD is missing, and NM is
    /// computed by merging the CIGAR with MD if only NM is missing. Splice
    /// junctions in the jM and jI tags are classified with `classifier`.
    ///
    /// ## Errors
    ///
    /// [AlignmentError::MalformedInput] if a mandatory column or a NM, MD, jM
    /// or jI tag does not parse, or if the read is unmapped or has no stored
    /// sequence. [AlignmentError::AlignmentInconsistency] if NM has to be
    /// computed and the CIGAR and MD disagree. [AlignmentError::LookupFailure]
    /// if `genome` or `classifier` fail.
    ///
    pub fn from_line<G: Genome + ?Sized, C: JunctionClassifier>(
        line: &str,
        genome: &G,
        classifier: &C,
    ) -> Result<Self, AlignmentError> {
        let sam_record = sam::Record::try_from(line.as_bytes()).map_err(|_| malformed("record", line))?;
        let flags = sam_record.flags().map_err(|_| malformed("FLAG", line))?;

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MANDATORY_FIELDS {
            return Err(malformed("record", line))
        }
        if flags.is_unmapped() {
            return Err(malformed("FLAG", fields[1]))
        }

        let position = parse_position(fields[3])?;
        let cigar = decode_cigar(fields[5])?;
        if fields[9] == "*" {
            return Err(malformed("SEQ", fields[9]))
        }

        let mut nm: Option<usize> = None;
        let mut md: Option<String> = None;
        let mut motifs: Option<OptionalField> = None;
        let mut bounds: Option<OptionalField> = None;
        let mut other_fields: Vec<OptionalField> = Vec::new();

        for raw in fields[MANDATORY_FIELDS..].iter().filter(|x| !x.is_empty()) {
            match OptionalField::parse(raw)? {
                OptionalField::EditDistance(x) => nm = Some(x),
                OptionalField::MismatchDescriptor(x) => md = Some(x),
                field @ OptionalField::JunctionMotifs(_) => motifs = Some(field),
                field @ OptionalField::IntronBounds(_) => bounds = Some(field),
                field => other_fields.push(field),
            }
        }

        let mut record = AlignmentRecord {
            query_name: fields[0].to_string(),
            flags,
            contig: fields[2].to_string(),
            position,
            mapq: fields[4].to_string(),
            cigar,
            mate_contig: fields[6].to_string(),
            mate_position: fields[7].to_string(),
            template_len: fields[8].to_string(),
            sequence: fields[9].to_string(),
            quality: fields[10].to_string(),
            nm: 0,
            md: String::new(),
            junctions: Vec::new(),
            junction_sentinels: Vec::new(),
            other_fields,
        };

        let (nm, md) = match (nm, md) {
            (Some(nm), Some(md)) => (nm, md),
            (None, Some(md)) => {
                let unified = merge_stored_md(&record.cigar, &md)?;
                (edit_distance(&unified), md)
            },
            (_, None) => {
                debug!("Computing NM and MD for {}", record.query_name);
                record.refreshed_tags(genome)?
            },
        };
        record.nm = nm;
        record.md = md;

        let junction_motifs = match &motifs {
            Some(field) if field.is_junction_sentinel() => None,
            Some(OptionalField::JunctionMotifs(codes)) => Some(codes.clone()),
            _ => None,
        };
        match junction_motifs {
            Some(codes) => {
                let flat = match &bounds {
                    Some(OptionalField::IntronBounds(x)) => intron_bounds_from_tag(x)?,
                    _ => return Err(malformed("jI", "")),
                };
                record.set_junctions(&codes, &flat, genome, classifier)?;
            },
            None => {
                record.junction_sentinels = motifs.into_iter().chain(bounds).collect();
            },
        }

        Ok(record)
    }

    pub fn query_name(
        &self,
    ) -> &str {
        &self.query_name
    }

    pub fn flags(
        &self,
    ) -> Flags {
        self.flags
    }

    pub fn contig(
        &self,
    ) -> &str {
        &self.contig
    }

    /// 1-based leftmost reference position.
    pub fn position(
        &self,
    ) -> usize {
        self.position
    }

    pub fn mapq(
        &self,
    ) -> &str {
        &self.mapq
    }

    /// CIGAR string of the current alignment.
    pub fn cigar(
        &self,
    ) -> String {
        encode_cigar(&self.cigar)
    }

    pub fn cigar_runs(
        &self,
    ) -> &[Run] {
        &self.cigar
    }

    pub fn mate_contig(
        &self,
    ) -> &str {
        &self.mate_contig
    }

    pub fn mate_position(
        &self,
    ) -> &str {
        &self.mate_position
    }

    pub fn template_len(
        &self,
    ) -> &str {
        &self.template_len
    }

    pub fn sequence(
        &self,
    ) -> &str {
        &self.sequence
    }

    pub fn quality(
        &self,
    ) -> &str {
        &self.quality
    }

    /// Edit distance stored in or computed for the record.
    pub fn nm(
        &self,
    ) -> usize {
        self.nm
    }

    /// MD field including the `MD:Z:` prefix.
    pub fn md(
        &self,
    ) -> &str {
        &self.md
    }

    /// Optional fields other than NM, MD, jM and jI in input order.
    pub fn other_fields(
        &self,
    ) -> &[OptionalField] {
        &self.other_fields
    }

    pub fn strand(
        &self,
    ) -> Strand {
        if self.flags.is_reverse_complemented() {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    pub fn junctions(
        &self,
    ) -> &[SpliceJunction] {
        &self.junctions
    }

    /// True if every splice junction is canonical.
    ///
    /// Records without junctions are canonical.
    pub fn is_canonical(
        &self,
    ) -> bool {
        self.junctions.iter().all(|junction| junction.canonical)
    }

    /// Start and end of each intron, flattened.
    pub fn intron_bounds(
        &self,
    ) -> Vec<usize> {
        self.junctions.iter().flat_map(|junction| [junction.start, junction.end]).collect()
    }

    pub fn junction_motifs(
        &self,
    ) -> Vec<i32> {
        self.junctions.iter().map(|junction| junction.motif).collect()
    }

    /// jM and jI fields describing the current junctions.
    ///
    /// Records without junctions return the jM and jI fields they were
    /// created with, if any.
    pub fn junction_fields(
        &self,
    ) -> Vec<OptionalField> {
        if self.junctions.is_empty() {
            return self.junction_sentinels.clone()
        }
        vec![
            OptionalField::JunctionMotifs(self.junction_motifs()),
            OptionalField::IntronBounds(self.intron_bounds().iter().map(|x| *x as i64).collect()),
        ]
    }

    /// Last reference base covered by the alignment (1-based).
    pub fn reference_end(
        &self,
    ) -> usize {
        self.position + crate::cigar::reference_len(&self.cigar) - 1
    }

    /// NM and MD for the current alignment, computed from the reference.
    pub fn refreshed_tags<G: Genome + ?Sized>(
        &self,
        genome: &G,
    ) -> Result<(usize, String), AlignmentError> {
        nm_md_from_reference(&self.cigar, &self.sequence, &self.contig, self.position, genome)
    }

    /// Replace the alignment and recompute NM and MD.
    ///
    /// The record is left unchanged if the new alignment is rejected.
    pub fn set_alignment<G: Genome + ?Sized>(
        &mut self,
        position: usize,
        cigar: &str,
        sequence: &str,
        quality: &str,
        genome: &G,
    ) -> Result<(), AlignmentError> {
        if position == 0 || position > MAX_POSITION {
            return Err(malformed("POS", &position.to_string()))
        }
        let runs = decode_cigar(cigar)?;
        let (nm, md) = nm_md_from_reference(&runs, sequence, &self.contig, position, genome)?;

        self.position = position;
        self.cigar = runs;
        self.sequence = sequence.to_string();
        self.quality = quality.to_string();
        self.nm = nm;
        self.md = md;

        Ok(())
    }

    /// Replace the CIGAR and recompute NM and MD.
    pub fn set_cigar<G: Genome + ?Sized>(
        &mut self,
        cigar: &str,
        genome: &G,
    ) -> Result<(), AlignmentError> {
        let sequence = self.sequence.clone();
        let quality = self.quality.clone();
        self.set_alignment(self.position, cigar, &sequence, &quality, genome)
    }

    /// Replace the read sequence and recompute NM and MD.
    pub fn set_sequence<G: Genome + ?Sized>(
        &mut self,
        sequence: &str,
        quality: &str,
        genome: &G,
    ) -> Result<(), AlignmentError> {
        let cigar = self.cigar();
        self.set_alignment(self.position, &cigar, sequence, quality, genome)
    }

    /// Replace the splice junctions.
    ///
    /// `bounds` holds the start and end of each intron in the order of
    /// `motifs`. The junctions are classified again with `classifier`.
    pub fn set_junctions<G: Genome + ?Sized, C: JunctionClassifier>(
        &mut self,
        motifs: &[i32],
        bounds: &[usize],
        genome: &G,
        classifier: &C,
    ) -> Result<(), AlignmentError> {
        let junctions = classify_junctions(&self.query_name, &self.contig, self.strand(), motifs, bounds, genome, classifier)?;
        self.junctions = junctions;
        self.junction_sentinels.clear();
        Ok(())
    }

    /// Compare the stored NM and MD against the CIGAR and the reference.
    ///
    /// ## Errors
    ///
    /// [AlignmentError::AlignmentInconsistency] if the stored MD cannot be
    /// merged with the CIGAR. [AlignmentError::LookupFailure] if the
    /// reference lookup fails.
    ///
    pub fn check_tags<G: Genome + ?Sized>(
        &self,
        genome: &G,
    ) -> Result<TagCheck, AlignmentError> {
        let unified = merge_stored_md(&self.cigar, &self.md)?;
        let merged_nm = edit_distance(&unified);
        let (reference_nm, reference_md) = self.refreshed_tags(genome)?;

        Ok(TagCheck {
            query_name: self.query_name.clone(),
            unified,
            stored_nm: self.nm,
            stored_md: self.md.clone(),
            merged_nm,
            reference_nm,
            reference_md,
        })
    }
}
