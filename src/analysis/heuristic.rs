// Prefix co-location heuristic and peer classification
//
// None of this carries real peering semantics: ASNs are "related" when they
// announce space in the same coarse bucket as the target, and the default
// classifier only compares the number of decimal digits.

use std::collections::{BTreeSet, HashSet};

use crate::bgptools::{RouteTable, WhoisRecord};

/// First two octets of an IPv4 address ("1.2") or first two hextets of an
/// IPv6 address ("2001:db8"), taken textually from a CIDR string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefixGroupKey(String);

impl PrefixGroupKey {
    /// `None` for strings without a '/' or with too few address fields
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        let (address, _) = prefix.split_once('/')?;

        let separator = if address.contains('.') {
            '.'
        } else if address.contains(':') {
            ':'
        } else {
            return None;
        };

        let mut fields = address.split(separator);
        let first = fields.next()?;
        let second = fields.next()?;
        Some(PrefixGroupKey(format!("{}{}{}", first, separator, second)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Prefixes announced by `target`
pub fn prefixes_of(table: &RouteTable, target: u32) -> Vec<&str> {
    table
        .iter()
        .filter(|(_, asn)| **asn == target)
        .map(|(prefix, _)| prefix.as_str())
        .collect()
}

pub fn group_keys<'a>(prefixes: impl IntoIterator<Item = &'a str>) -> HashSet<PrefixGroupKey> {
    prefixes
        .into_iter()
        .filter_map(PrefixGroupKey::from_prefix)
        .collect()
}

/// Every other origin ASN announcing a prefix in one of `keys`.
/// The target itself is never part of the result.
pub fn related_asns(
    table: &RouteTable,
    target: u32,
    keys: &HashSet<PrefixGroupKey>,
) -> BTreeSet<u32> {
    if keys.is_empty() {
        return BTreeSet::new();
    }

    table
        .iter()
        .filter(|(_, asn)| **asn != target)
        .filter(|(prefix, _)| {
            PrefixGroupKey::from_prefix(prefix).is_some_and(|key| keys.contains(&key))
        })
        .map(|(_, asn)| *asn)
        .collect()
}

/// Outcome of a classification strategy for one ASN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Peer,
    NotPeer,
    Unknown,
}

/// Decides whether a related ASN could peer with the target
pub trait PeerClassifier {
    fn name(&self) -> &'static str;
    fn classify(&self, asn: u32, record: &WhoisRecord) -> Verdict;
}

/// Placeholder strategy: same number of decimal digits as the target
pub struct DigitLengthClassifier {
    target_digits: usize,
}

impl DigitLengthClassifier {
    pub fn new(target: u32) -> Self {
        DigitLengthClassifier {
            target_digits: digit_count(target),
        }
    }
}

impl PeerClassifier for DigitLengthClassifier {
    fn name(&self) -> &'static str {
        "digit-length"
    }

    fn classify(&self, asn: u32, _record: &WhoisRecord) -> Verdict {
        if digit_count(asn) == self.target_digits {
            Verdict::Peer
        } else {
            Verdict::NotPeer
        }
    }
}

fn digit_count(asn: u32) -> usize {
    asn.to_string().len()
}

/// Disjoint buckets produced by [`classify_records`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Classification {
    pub potential_peers: BTreeSet<u32>,
    pub other: BTreeSet<u32>,
    pub unknown: BTreeSet<u32>,
}

impl Classification {
    fn contains(&self, asn: u32) -> bool {
        self.potential_peers.contains(&asn) || self.other.contains(&asn) || self.unknown.contains(&asn)
    }
}

/// Sort whois records of related ASNs into buckets. Records for ASNs outside
/// `related`, for the target, or for an ASN already seen are ignored, so each
/// ASN lands in exactly one bucket.
pub fn classify_records<'a>(
    records: impl IntoIterator<Item = &'a WhoisRecord>,
    related: &BTreeSet<u32>,
    target: u32,
    classifier: &dyn PeerClassifier,
) -> Classification {
    let mut result = Classification::default();

    for record in records {
        let asn = record.asn;
        if asn == target || !related.contains(&asn) || result.contains(asn) {
            continue;
        }

        let verdict = classifier.classify(asn, record);
        tracing::trace!("AS{} ({}, {}): {:?}", asn, record.name, record.country, verdict);

        match verdict {
            Verdict::Peer => result.potential_peers.insert(asn),
            Verdict::NotPeer => result.other.insert(asn),
            Verdict::Unknown => result.unknown.insert(asn),
        };
    }

    result
}
