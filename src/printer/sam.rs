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
use std::io::Write;

use crate::genome::Genome;
use crate::record::AlignmentRecord;
use crate::tags::OptionalField;

type E = Box<dyn std::error::Error>;

/// Format a single record in SAM format
///
/// Writes bytes containing the formatted line containing the contents of
/// `record` to `conn`. NM and MD are recomputed from `genome` and jM and jI
/// from the junctions of `record`. Other optional fields are written in
/// their original order before NM.
///
/// Terminates with an [AlignmentError](crate::AlignmentError) if NM and MD
/// cannot be recomputed.
///
pub fn format_sam_line<W: Write, G: Genome + ?Sized>(
    record: &AlignmentRecord,
    genome: &G,
    conn: &mut W,
) -> Result<(), E> {
    let (nm, md) = record.refreshed_tags(genome)?;

    let mut fields: Vec<String> = vec![
        record.query_name().to_string(),
        record.flags().bits().to_string(),
        record.contig().to_string(),
        record.position().to_string(),
        record.mapq().to_string(),
        record.cigar(),
        record.mate_contig().to_string(),
        record.mate_position().to_string(),
        record.template_len().to_string(),
        record.sequence().to_string(),
        record.quality().to_string(),
    ];
    fields.extend(record.other_fields().iter().map(|field| field.to_string()));
    fields.push(OptionalField::EditDistance(nm).to_string());
    fields.push(OptionalField::MismatchDescriptor(md).to_string());
    fields.extend(record.junction_fields().iter().map(|field| field.to_string()));

    conn.write_all(fields.join("\t").as_bytes())?;
    conn.write_all(b"\n")?;

    Ok(())
}
