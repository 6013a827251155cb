// Analysis module - the end-to-end peering estimate for one target ASN

pub mod batch;
pub mod heuristic;

use std::collections::BTreeSet;
use std::path::PathBuf;

use batch::BatchPolicy;
use heuristic::{Classification, DigitLengthClassifier, PeerClassifier};

use crate::bgptools::parser::parse_whois_records;
use crate::bgptools::{BgpDataSource, WhoisRecord};
use crate::config::Verbosity;
use crate::error::AppResult;
use crate::report::{ReportPaths, ReportWriter};

const SEPARATOR_WIDTH: usize = 80;

// Pipeline events are gated on the analyzer's own verbosity in addition to
// the global subscriber filter
macro_rules! info_at {
    ($analyzer:expr, $($arg:tt)+) => {
        if $analyzer.verbosity.allows(tracing::Level::INFO) {
            tracing::info!($($arg)+);
        }
    };
}

macro_rules! debug_at {
    ($analyzer:expr, $($arg:tt)+) => {
        if $analyzer.verbosity.allows(tracing::Level::DEBUG) {
            tracing::debug!($($arg)+);
        }
    };
}

macro_rules! trace_at {
    ($analyzer:expr, $($arg:tt)+) => {
        if $analyzer.verbosity.allows(tracing::Level::TRACE) {
            tracing::trace!($($arg)+);
        }
    };
}

/// What a finished run produced
#[derive(Debug)]
pub enum AnalysisOutcome {
    /// Nothing shares address space with the target; no reports written
    NoRelatedAsns,
    Completed(AnalysisSummary),
}

#[derive(Debug)]
pub struct AnalysisSummary {
    pub target_name: String,
    pub related: usize,
    pub classification: Classification,
    pub reports: ReportPaths,
}

pub struct Analyzer<S: BgpDataSource> {
    source: S,
    target_asn: u32,
    user_agent: String,
    output_dir: PathBuf,
    verbosity: Verbosity,
    batch_policy: BatchPolicy,
    classifier: Box<dyn PeerClassifier>,
}

impl<S: BgpDataSource> Analyzer<S> {
    pub fn new(
        source: S,
        target_asn: u32,
        user_agent: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        verbosity: Verbosity,
    ) -> Self {
        Analyzer {
            source,
            target_asn,
            user_agent: user_agent.into(),
            output_dir: output_dir.into(),
            verbosity,
            batch_policy: BatchPolicy::default(),
            classifier: Box::new(DigitLengthClassifier::new(target_asn)),
        }
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.batch_policy = policy;
        self
    }

    pub fn with_classifier(mut self, classifier: Box<dyn PeerClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    /// Run the whole pipeline
    pub fn run(&self) -> AppResult<AnalysisOutcome> {
        self.separator("BGP.TOOLS PEERING ANALYSIS");
        info_at!(self, "Analysis started at: {}", chrono::Local::now());
        info_at!(self, "Target ASN: AS{}", self.target_asn);
        info_at!(self, "User Agent: {}", self.user_agent);
        info_at!(self, "Debug level: {}", self.verbosity.value());
        info_at!(self, "Classifier: {}", self.classifier.name());

        info_at!(self, "STEP 1: Getting ASN information");
        let target_name = self.target_name();

        info_at!(self, "STEP 2: Downloading ASN names");
        let asn_names = self.source.asn_names();

        info_at!(self, "STEP 3: Finding related ASNs");
        let related = self.related_asns();
        if related.is_empty() {
            info_at!(self, "No related ASNs found");
            return Ok(AnalysisOutcome::NoRelatedAsns);
        }

        info_at!(self, "STEP 4: Analyzing ASN relationships");
        let classification = self.classify(&related);
        if !classification.unknown.is_empty() {
            info_at!(
                self,
                "{} ASNs could not be classified and are left out of the reports",
                classification.unknown.len()
            );
        }

        info_at!(self, "STEP 5: Writing results");
        let reports = ReportWriter::new(&self.output_dir, self.target_asn).write(
            &classification.potential_peers,
            &classification.other,
            &asn_names,
        )?;

        self.separator("FINAL SUMMARY");
        info_at!(self, "Target ASN: AS{} - {}", self.target_asn, target_name);
        info_at!(self, "Related ASNs found: {}", related.len());
        info_at!(self, "Potential peers: {}", classification.potential_peers.len());
        info_at!(self, "Other ASNs: {}", classification.other.len());
        info_at!(self, "Analysis completed successfully!");
        info_at!(self, "NOTE: This analysis is based on heuristics and BGP table data.");
        info_at!(self, "For accurate peering information, use PeeringDB or direct BGP data.");

        Ok(AnalysisOutcome::Completed(AnalysisSummary {
            target_name,
            related: related.len(),
            classification,
            reports,
        }))
    }

    /// Display name of the target from its own whois record, or "AS<n>"
    pub fn target_name(&self) -> String {
        debug_at!(self, "Getting ASN information for AS{}", self.target_asn);

        let response = self.source.whois(&whois_query(self.target_asn));
        match parse_whois_records(&response)
            .into_iter()
            .find(|record| record.asn == self.target_asn)
        {
            Some(record) => {
                info_at!(self, "ASN Name: {}", record.name);
                record.name
            }
            None => format!("AS{}", self.target_asn),
        }
    }

    /// ASNs announcing space in the same coarse buckets as the target
    pub fn related_asns(&self) -> BTreeSet<u32> {
        debug_at!(self, "Finding ASNs related to AS{}", self.target_asn);

        let table = self.source.route_table();
        if table.is_empty() {
            return BTreeSet::new();
        }

        let ours = heuristic::prefixes_of(&table, self.target_asn);
        info_at!(self, "AS{} originates {} prefixes", self.target_asn, ours.len());

        let keys = heuristic::group_keys(ours);
        let mut groups: Vec<&str> = keys.iter().map(heuristic::PrefixGroupKey::as_str).collect();
        groups.sort_unstable();
        trace_at!(self, "Prefix groups: {}", groups.join(", "));

        let related = heuristic::related_asns(&table, self.target_asn, &keys);
        debug_at!(self, "Found {} potentially related ASNs", related.len());
        related
    }

    /// Fetch whois data for `related` in batches and bucket the answers
    pub fn classify(&self, related: &BTreeSet<u32>) -> Classification {
        debug_at!(self, "Analyzing relationships for {} ASNs", related.len());

        let queries: Vec<String> = related.iter().map(|asn| whois_query(*asn)).collect();
        let total = self.batch_policy.batch_count(queries.len());
        let mut done = 0;
        let records: Vec<WhoisRecord> = self
            .batch_policy
            .run(&queries, |batch| {
                done += 1;
                debug_at!(self, "Processing batch {} of {}", done, total);
                self.source.bulk_whois(batch)
            })
            .iter()
            .filter(|response| !response.is_empty())
            .flat_map(|response| parse_whois_records(response))
            .collect();

        heuristic::classify_records(&records, related, self.target_asn, self.classifier.as_ref())
    }

    fn separator(&self, title: &str) {
        let line = "=".repeat(SEPARATOR_WIDTH);
        info_at!(self, "{}", line);
        info_at!(self, "{:^width$}", title, width = SEPARATOR_WIDTH);
        info_at!(self, "{}", line);
    }
}

fn whois_query(asn: u32) -> String {
    format!("as{}", asn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bgptools::{AsnNames, RouteTable};
    use std::cell::RefCell;
    use std::time::Duration;

    /// In-memory bgp.tools double that answers bulk whois from a fixed table
    #[derive(Default)]
    struct FakeSource {
        table: RouteTable,
        names: AsnNames,
        whois: Vec<(u32, &'static str)>,
        bulk_calls: RefCell<Vec<Vec<String>>>,
    }

    impl FakeSource {
        fn line(asn: u32, name: &str) -> String {
            format!("{} | {} | 0.0.0.0/0 | ARIN | US | 2000-01-01 | {}\n", asn, asn, name)
        }
    }

    impl BgpDataSource for FakeSource {
        fn whois(&self, query: &str) -> String {
            self.whois
                .iter()
                .filter(|(asn, _)| query == format!("as{}", asn))
                .map(|(asn, name)| Self::line(*asn, name))
                .collect()
        }

        fn bulk_whois(&self, queries: &[String]) -> String {
            self.bulk_calls.borrow_mut().push(queries.to_vec());
            queries.iter().map(|q| self.whois(q)).collect()
        }

        fn route_table(&self) -> RouteTable {
            self.table.clone()
        }

        fn asn_names(&self) -> AsnNames {
            self.names.clone()
        }
    }

    fn analyzer(source: FakeSource, dir: &std::path::Path) -> Analyzer<FakeSource> {
        Analyzer::new(source, 6939, "Test - ops@example.net", dir, Verbosity::DEBUG)
            .with_batch_policy(BatchPolicy {
                size: 2,
                delay: Duration::ZERO,
            })
    }

    #[test]
    fn test_empty_table_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = analyzer(FakeSource::default(), dir.path()).run().unwrap();

        assert!(matches!(outcome, AnalysisOutcome::NoRelatedAsns));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_no_shared_space_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource {
            table: [("1.2.0.0/16".to_string(), 6939), ("9.9.0.0/16".to_string(), 1299)]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let outcome = analyzer(source, dir.path()).run().unwrap();

        assert!(matches!(outcome, AnalysisOutcome::NoRelatedAsns));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_full_run() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource {
            table: [
                ("1.2.3.0/24", 6939),
                ("1.2.4.0/24", 6939),
                ("1.2.5.0/24", 1299),
                ("1.2.6.0/24", 13335),
                ("1.2.7.0/24", 3356),
                ("1.2.8.0/24", 42),
                ("8.8.8.0/24", 15169),
            ]
            .into_iter()
            .map(|(p, a)| (p.to_string(), a))
            .collect(),
            names: [(1299, "Arelion".to_string())].into_iter().collect(),
            whois: vec![
                (6939, "Hurricane Electric LLC"),
                (1299, "Arelion Sweden AB"),
                (13335, "Cloudflare, Inc."),
                (3356, "Level 3 Parent, LLC"),
            ],
            ..Default::default()
        };

        let analyzer = analyzer(source, dir.path());
        let outcome = analyzer.run().unwrap();

        let AnalysisOutcome::Completed(summary) = outcome else {
            panic!("expected a completed run");
        };
        assert_eq!(summary.target_name, "Hurricane Electric LLC");
        assert_eq!(summary.related, 4);
        assert_eq!(summary.classification.potential_peers, BTreeSet::from([1299, 3356]));
        // 42 has no whois answer and is dropped
        assert_eq!(summary.classification.other, BTreeSet::from([13335]));

        // related = {42, 1299, 3356, 13335} in batches of two
        let calls = analyzer.source.bulk_calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], vec!["as42".to_string(), "as1299".to_string()]);

        let peers = std::fs::read_to_string(&summary.reports.potential_peers).unwrap();
        assert!(peers.contains("AS1299 - Arelion\n"));
        assert!(peers.contains("AS3356 - AS3356\n"));
        assert!(peers.find("AS1299").unwrap() < peers.find("AS3356").unwrap());
    }

    #[test]
    fn test_target_name_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = analyzer(FakeSource::default(), dir.path());
        assert_eq!(analyzer.target_name(), "AS6939");
    }

    #[test]
    fn test_set_verbosity() {
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = analyzer(FakeSource::default(), dir.path());
        assert_eq!(analyzer.verbosity(), Verbosity::DEBUG);
        analyzer.set_verbosity(Verbosity::MINIMAL);
        assert_eq!(analyzer.verbosity(), Verbosity::MINIMAL);
    }

    struct EverythingPeers;

    impl PeerClassifier for EverythingPeers {
        fn name(&self) -> &'static str {
            "everything"
        }

        fn classify(&self, _asn: u32, _record: &WhoisRecord) -> heuristic::Verdict {
            heuristic::Verdict::Peer
        }
    }

    #[test]
    fn test_custom_classifier() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource {
            table: [("1.2.3.0/24".to_string(), 6939), ("1.2.9.0/24".to_string(), 42)]
                .into_iter()
                .collect(),
            whois: vec![(42, "Answer Networks")],
            ..Default::default()
        };
        let analyzer = analyzer(source, dir.path()).with_classifier(Box::new(EverythingPeers));

        let related = analyzer.related_asns();
        let result = analyzer.classify(&related);
        assert_eq!(result.potential_peers, BTreeSet::from([42]));
        assert!(result.other.is_empty());
    }

    #[test]
    fn test_report_write_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let source = FakeSource {
            table: [("1.2.3.0/24".to_string(), 6939), ("1.2.9.0/24".to_string(), 1299)]
                .into_iter()
                .collect(),
            whois: vec![(1299, "Arelion")],
            ..Default::default()
        };
        assert!(analyzer(source, &blocker).run().is_err());
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    // Runs under a subscriber that lets everything through, so only the
    // analyzer's own verbosity decides what gets out
    fn run_logged(analyzer: &Analyzer<FakeSource>) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let outcome = tracing::subscriber::with_default(subscriber, || analyzer.run()).unwrap();
        assert!(matches!(outcome, AnalysisOutcome::NoRelatedAsns));
        captured.text()
    }

    #[test]
    fn test_no_related_notice_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = analyzer(FakeSource::default(), dir.path());
        analyzer.set_verbosity(Verbosity::NORMAL);

        let output = run_logged(&analyzer);
        assert!(output.contains("STEP 1: Getting ASN information"));
        assert!(output.contains("No related ASNs found"));
        assert!(!output.contains("Finding ASNs related to AS6939"));
    }

    #[test]
    fn test_minimal_verbosity_silences_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let mut analyzer = analyzer(FakeSource::default(), dir.path());
        analyzer.set_verbosity(Verbosity::MINIMAL);

        let output = run_logged(&analyzer);
        assert!(output.is_empty(), "unexpected output: {}", output);
    }
}
