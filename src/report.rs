// Flat text reports for the two classification buckets

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::bgptools::AsnNames;
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    PotentialPeers,
    OtherAsns,
}

impl ReportKind {
    fn file_tag(self) -> &'static str {
        match self {
            ReportKind::PotentialPeers => "potential_peers",
            ReportKind::OtherAsns => "other_asns",
        }
    }

    fn header(self, target: u32, generated: &DateTime<Local>) -> String {
        let generated = generated.format("%Y-%m-%d %H:%M:%S");
        match self {
            ReportKind::PotentialPeers => format!(
                "# BGP.Tools Potential Peers Analysis - {}\n\
                 # ASNs that might peer with AS{}\n\
                 # NOTE: This is based on heuristic analysis, not actual peering data\n\n\
                 === POTENTIAL PEERS ===\n",
                generated, target
            ),
            ReportKind::OtherAsns => format!(
                "# BGP.Tools Other ASNs Analysis - {}\n\
                 # ASNs in similar IP space as AS{}\n\
                 # NOTE: This is based on heuristic analysis, not actual peering data\n\n\
                 === OTHER ASNs ===\n",
                generated, target
            ),
        }
    }
}

/// Paths of the files produced by one run
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub potential_peers: PathBuf,
    pub other_asns: PathBuf,
}

pub fn whois_link(asn: u32) -> String {
    format!("https://bgp.tools/as/{}#whois", asn)
}

pub fn display_name(names: &AsnNames, asn: u32) -> String {
    names
        .get(&asn)
        .cloned()
        .unwrap_or_else(|| format!("AS{}", asn))
}

pub fn report_file_name(kind: ReportKind, target: u32, generated: &DateTime<Local>) -> String {
    format!(
        "AS{}_{}_{}.txt",
        target,
        kind.file_tag(),
        generated.format("%Y%m%d_%H%M%S")
    )
}

/// Render one report. `asns` is iterated in ascending order.
pub fn render_report(
    kind: ReportKind,
    target: u32,
    asns: &BTreeSet<u32>,
    names: &AsnNames,
    generated: &DateTime<Local>,
) -> String {
    let mut out = kind.header(target, generated);
    out.push_str(&format!("Total: {}\n\n", asns.len()));

    for asn in asns {
        out.push_str(&format!("AS{} - {}\n", asn, display_name(names, *asn)));
        out.push_str(&format!("  BGP.Tools: {}\n\n", whois_link(*asn)));
    }

    out
}

pub struct ReportWriter {
    directory: PathBuf,
    target: u32,
}

impl ReportWriter {
    pub fn new(directory: impl AsRef<Path>, target: u32) -> Self {
        ReportWriter {
            directory: directory.as_ref().to_path_buf(),
            target,
        }
    }

    /// Write both reports, stamped with the current local time
    pub fn write(
        &self,
        potential_peers: &BTreeSet<u32>,
        other: &BTreeSet<u32>,
        names: &AsnNames,
    ) -> AppResult<ReportPaths> {
        self.write_at(potential_peers, other, names, &Local::now())
    }

    pub fn write_at(
        &self,
        potential_peers: &BTreeSet<u32>,
        other: &BTreeSet<u32>,
        names: &AsnNames,
        generated: &DateTime<Local>,
    ) -> AppResult<ReportPaths> {
        fs::create_dir_all(&self.directory)?;

        let potential_peers =
            self.write_one(ReportKind::PotentialPeers, potential_peers, names, generated)?;
        let other_asns = self.write_one(ReportKind::OtherAsns, other, names, generated)?;

        tracing::info!("Results written to:");
        tracing::info!("  Potential peers: {}", potential_peers.display());
        tracing::info!("  Other ASNs: {}", other_asns.display());

        Ok(ReportPaths {
            potential_peers,
            other_asns,
        })
    }

    fn write_one(
        &self,
        kind: ReportKind,
        asns: &BTreeSet<u32>,
        names: &AsnNames,
        generated: &DateTime<Local>,
    ) -> AppResult<PathBuf> {
        let path = self
            .directory
            .join(report_file_name(kind, self.target, generated));
        fs::write(&path, render_report(kind, self.target, asns, names, generated))?;
        Ok(path)
    }
}
