//! Heuristic peer estimation for an ASN using bgp.tools data.
//!
//! The pipeline downloads the bgp.tools route table and ASN name directory,
//! finds ASNs announcing address space in the same coarse prefix buckets as
//! the target, looks them up over whois, and writes two text reports. The
//! result is a rough exploratory aid; it does not reflect real peering
//! sessions or AS paths.

pub mod analysis;
pub mod bgptools;
pub mod config;
pub mod error;
pub mod input;
pub mod report;
