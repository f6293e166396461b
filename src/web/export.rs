//! Output formats for a [Web].
//!
//! None of these mutate the web. The GEXF export recomputes a snapshot on every call.

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use super::{snapshot::SnapshotConfig, Web};
use crate::{error::NsndError, properties::SizeBasis};

/// Printed under a node with nothing to list.
pub const NONE_MARKER: &str = "(none)";

const INDENT: &str = "    ";

/// Which way adjacency is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Adjacency {
    /// Each scanned track followed by the titles it references.
    #[default]
    Forward,
    /// Each title followed by the tracks that reference it.
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GexfOptions {
    pub size_basis: SizeBasis,
    /// Point every edge from the referenced title back to the referrer.
    pub reverse_edges: bool,
    pub snapshot: SnapshotConfig,
}

impl GexfOptions {
    pub fn forward(snapshot: SnapshotConfig) -> Self {
        GexfOptions {
            size_basis: SizeBasis::InDegree,
            reverse_edges: false,
            snapshot,
        }
    }

    /// Sized by how much a track references, edges pointing at the referrers.
    pub fn reverse(snapshot: SnapshotConfig) -> Self {
        GexfOptions {
            size_basis: SizeBasis::OutDegree,
            reverse_edges: true,
            snapshot,
        }
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[tracing::instrument(skip_all)]
pub fn write_gexf<W: Write>(
    web: &Web,
    out: &mut W,
    options: &GexfOptions,
) -> Result<(), NsndError> {
    let snapshot = web.snapshot(options.size_basis, &options.snapshot);
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<gexf xmlns="http://www.gexf.net/1.2draft" xmlns:viz="http://www.gexf.net/1.2draft/viz" version="1.2">"#
    )?;
    writeln!(out, "    <meta>")?;
    writeln!(out, "        <creator>nsndswap</creator>")?;
    writeln!(
        out,
        "        <description>References (remixes, arrangements, samples, etc.) in Homestuck music.</description>"
    )?;
    writeln!(out, "    </meta>")?;
    writeln!(out, r#"    <graph mode="static" defaultedgetype="directed">"#)?;
    writeln!(out, "        <nodes>")?;
    for node in snapshot.iter() {
        writeln!(
            out,
            r#"            <node id="{}" label="{}">"#,
            node.index,
            xml_escape(&node.title)
        )?;
        writeln!(out, r#"                <viz:size value="{:.3}"/>"#, node.size)?;
        writeln!(
            out,
            r#"                <viz:position x="{:.3}" y="{:.3}" z="0.0"/>"#,
            node.position.0, node.position.1
        )?;
        writeln!(
            out,
            r#"                <viz:color r="{}" g="{}" b="{}"/>"#,
            node.color.0, node.color.1, node.color.2
        )?;
        writeln!(out, "            </node>")?;
    }
    writeln!(out, "        </nodes>")?;
    writeln!(out, "        <edges>")?;
    let tint = options.snapshot.edge_color;
    for (id, (source, target)) in web.edges().enumerate() {
        let (source, target) = if options.reverse_edges {
            (target, source)
        } else {
            (source, target)
        };
        writeln!(
            out,
            r#"            <edge id="{id}" source="{source}" target="{target}">"#
        )?;
        writeln!(
            out,
            r#"                <viz:color r="{}" g="{}" b="{}"/>"#,
            tint.0, tint.1, tint.2
        )?;
        writeln!(out, "            </edge>")?;
    }
    writeln!(out, "        </edges>")?;
    writeln!(out, "    </graph>")?;
    writeln!(out, "</gexf>")?;
    Ok(())
}

/// One title per line, in index order.
pub fn write_titles<W: Write>(web: &Web, out: &mut W) -> Result<(), NsndError> {
    for title in web.titles() {
        writeln!(out, "{title}")?;
    }
    Ok(())
}

/// Titles that were referenced but never scanned themselves.
pub fn write_unknown<W: Write>(web: &Web, out: &mut W) -> Result<(), NsndError> {
    for index in web.unknown() {
        if let Some(title) = web.title(index) {
            writeln!(out, "{title}")?;
        }
    }
    Ok(())
}

/// Titles containing anything outside ASCII, which tend to be the ones in need of fixing.
pub fn write_unicode_titles<W: Write>(web: &Web, out: &mut W) -> Result<(), NsndError> {
    for title in web.titles().filter(|title| !title.is_ascii()) {
        writeln!(out, "{title}")?;
    }
    Ok(())
}

/// Forward adjacency lists only scanned tracks. Reverse adjacency lists every node, since any of
/// them can be referenced.
pub fn write_adjacency<W: Write>(
    web: &Web,
    out: &mut W,
    direction: Adjacency,
) -> Result<(), NsndError> {
    for (index, title) in web.titles().enumerate() {
        let neighbors = match direction {
            Adjacency::Forward if !web.is_discovered(index) => continue,
            Adjacency::Forward => web.references(index),
            Adjacency::Reverse => web.referrers(index),
        };
        writeln!(out, "{title}")?;
        if neighbors.is_empty() {
            writeln!(out, "{INDENT}{NONE_MARKER}")?;
        }
        for neighbor in neighbors {
            if let Some(name) = web.title(neighbor) {
                writeln!(out, "{INDENT}{name}")?;
            }
        }
    }
    Ok(())
}

pub fn write_json<W: Write>(web: &Web, out: &mut W) -> Result<(), NsndError> {
    serde_json::to_writer_pretty(out, web)?;
    Ok(())
}

pub fn read_json<R: Read>(input: R) -> Result<Web, NsndError> {
    Ok(serde_json::from_reader(input)?)
}

/// Writes the full set of exports for `web` into `dir`, named after `name`. Returns the paths
/// written.
#[tracing::instrument(skip(web, snapshot))]
pub fn export_all(
    web: &Web,
    dir: &Path,
    name: &str,
    snapshot: &SnapshotConfig,
) -> Result<Vec<PathBuf>, NsndError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let mut emit = |suffix: &str,
                    write: &dyn Fn(&mut BufWriter<File>) -> Result<(), NsndError>|
     -> Result<(), NsndError> {
        let path = dir.join(format!("{name}.{suffix}"));
        let mut out = BufWriter::new(File::create(&path)?);
        write(&mut out)?;
        out.flush()?;
        tracing::debug!("Wrote {}", path.display());
        written.push(path);
        Ok(())
    };
    emit("gexf", &|out| write_gexf(web, out, &GexfOptions::forward(*snapshot)))?;
    emit("reverse.gexf", &|out| {
        write_gexf(web, out, &GexfOptions::reverse(*snapshot))
    })?;
    emit("titles.txt", &|out| write_titles(web, out))?;
    emit("txt", &|out| write_adjacency(web, out, Adjacency::Forward))?;
    emit("reverse.txt", &|out| write_adjacency(web, out, Adjacency::Reverse))?;
    emit("unknown.txt", &|out| write_unknown(web, out))?;
    emit("unicode.txt", &|out| write_unicode_titles(web, out))?;
    emit("json", &|out| write_json(web, out))?;
    tracing::info!("Dumped \"{}\" to {}", name, dir.display());
    Ok(written)
}
