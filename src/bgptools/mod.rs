// bgp.tools module - whois and bulk export access

pub mod download;
pub mod parser;
pub mod whois;

use std::collections::HashMap;

use download::Downloader;
use whois::WhoisClient;

/// Announced prefix (CIDR string) -> origin ASN
pub type RouteTable = HashMap<String, u32>;

/// ASN -> display name
pub type AsnNames = HashMap<u32, String>;

/// One pipe-delimited line of a verbose whois answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoisRecord {
    pub asn: u32,
    pub country: String,
    pub name: String,
}

/// Everything the analysis needs from bgp.tools.
///
/// All methods fail soft: errors are logged by the implementation and come
/// back as an empty string or empty map.
pub trait BgpDataSource {
    fn whois(&self, query: &str) -> String;
    fn bulk_whois(&self, queries: &[String]) -> String;
    fn route_table(&self) -> RouteTable;
    fn asn_names(&self) -> AsnNames;
}

/// The live service: whois over TCP plus HTTPS exports
pub struct BgpToolsClient {
    whois: WhoisClient,
    downloader: Downloader,
}

impl BgpToolsClient {
    pub fn new(whois: WhoisClient, downloader: Downloader) -> Self {
        BgpToolsClient { whois, downloader }
    }
}

impl BgpDataSource for BgpToolsClient {
    fn whois(&self, query: &str) -> String {
        self.whois.single_query(query)
    }

    fn bulk_whois(&self, queries: &[String]) -> String {
        self.whois.bulk_query(queries)
    }

    fn route_table(&self) -> RouteTable {
        self.downloader.download_route_table()
    }

    fn asn_names(&self) -> AsnNames {
        self.downloader.download_asn_names()
    }
}
