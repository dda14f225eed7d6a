//! Indicator extraction from case IOCs and assets
//!
//! Correlation is best-effort: when one of the two sources cannot be
//! fetched it contributes nothing and the other source is still used.

use std::collections::BTreeSet;

use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::models::{EntityData, Record};

/// IOC record field holding the indicator value
const IOC_VALUE_FIELD: &str = "ioc_value";
/// IOC record field holding the indicator type tag
const IOC_TYPE_FIELD: &str = "ioc_type";
/// Asset record fields contributing indicators
const ASSET_IP_FIELD: &str = "asset_ip";
const ASSET_DOMAIN_FIELD: &str = "asset_domain";

/// Deduplicated indicators derived from one case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndicatorSet {
    pub ips: BTreeSet<String>,
    pub hostnames: BTreeSet<String>,
    pub asns: BTreeSet<i64>,
}

/// Sizes of an indicator set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndicatorCounts {
    pub ips: usize,
    pub hostnames: usize,
    pub asns: usize,
}

impl IndicatorSet {
    pub fn is_empty(&self) -> bool {
        self.ips.is_empty() && self.hostnames.is_empty() && self.asns.is_empty()
    }

    pub fn counts(&self) -> IndicatorCounts {
        IndicatorCounts {
            ips: self.ips.len(),
            hostnames: self.hostnames.len(),
            asns: self.asns.len(),
        }
    }

    /// Classify one IOC value (and optional type tag) into the set.
    ///
    /// Returns false when the value fits no indicator class.
    pub fn add_ioc(&mut self, value: &str, type_tag: Option<&str>) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }

        if is_ipv4(value) || is_ipv6_like(value) {
            self.ips.insert(value.to_string());
            return true;
        }

        if is_hostname(value) {
            self.hostnames.insert(value.to_lowercase());
            return true;
        }

        let tagged_asn = type_tag.is_some_and(is_asn_tag);
        if tagged_asn || has_as_prefix(value) {
            // unparseable ASNs are dropped
            if let Some(asn) = parse_asn(value) {
                self.asns.insert(asn);
                return true;
            }
        }

        false
    }

    /// Add the address and domain of one asset record
    pub fn add_asset(&mut self, record: &Record) {
        if let Some(ip) = non_empty_str(record.get(ASSET_IP_FIELD)) {
            self.ips.insert(ip.to_string());
        }
        if let Some(domain) = non_empty_str(record.get(ASSET_DOMAIN_FIELD)) {
            self.hostnames.insert(domain.to_lowercase());
        }
    }
}

/// Outcome of fetching one correlation source
#[derive(Debug)]
pub enum Contribution {
    Records(Vec<Record>),
    Unavailable(String),
}

impl Contribution {
    /// Wrap a fetch result; a failure becomes an empty contribution.
    pub fn from_fetch<D: AsRef<EntityData>>(
        source: &'static str,
        fetched: Result<D, Error>,
    ) -> Self {
        match fetched {
            Ok(data) => Contribution::Records(data.as_ref().records().to_vec()),
            Err(err) => {
                warn!("Correlation source '{}' unavailable: {}", source, err);
                Contribution::Unavailable(err.to_string())
            }
        }
    }

    /// Records to index; none when the source was unavailable
    pub fn records(&self) -> &[Record] {
        match self {
            Contribution::Records(records) => records,
            Contribution::Unavailable(_) => &[],
        }
    }

    /// `"ok"` or `"unavailable: <reason>"`
    pub fn status(&self) -> String {
        match self {
            Contribution::Records(_) => "ok".to_string(),
            Contribution::Unavailable(reason) => format!("unavailable: {}", reason),
        }
    }
}

/// Derive the indicator set of a case from its IOC and asset records.
pub fn index(iocs: &Contribution, assets: &Contribution) -> IndicatorSet {
    let mut set = IndicatorSet::default();

    for ioc in iocs.records() {
        let Some(value) = ioc_value(ioc) else {
            continue;
        };
        let tag = ioc_type_tag(ioc);
        set.add_ioc(&value, tag.as_deref());
    }

    for asset in assets.records() {
        set.add_asset(asset);
    }

    set
}

fn ioc_value(record: &Record) -> Option<String> {
    match record.get(IOC_VALUE_FIELD)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The type tag is either a plain string or an object carrying `type_name`.
fn ioc_type_tag(record: &Record) -> Option<String> {
    match record.get(IOC_TYPE_FIELD)? {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj
            .get("type_name")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn is_ipv4(value: &str) -> bool {
    let tokens: Vec<&str> = value.split('.').collect();
    tokens.len() == 4 && tokens.iter().all(|t| is_octet(t))
}

fn is_octet(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) && token.parse::<u8>().is_ok()
}

fn is_ipv6_like(value: &str) -> bool {
    value.contains(':') && value.chars().all(|c| c.is_ascii_hexdigit() || c == ':')
}

/// Dotted digits are address-shaped even when not a valid IPv4 address
fn is_ip_like(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn is_hostname(value: &str) -> bool {
    value.contains('.')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        && !is_ip_like(value)
}

fn is_asn_tag(tag: &str) -> bool {
    let tag = tag.trim().to_ascii_lowercase();
    tag == "as" || tag == "asn" || tag.contains("autonomous")
}

fn has_as_prefix(value: &str) -> bool {
    value
        .strip_prefix("AS")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

fn parse_asn(value: &str) -> Option<i64> {
    let digits = value
        .strip_prefix("AS")
        .or_else(|| value.strip_prefix("as"))
        .unwrap_or(value);
    digits.trim().parse::<u32>().ok().map(i64::from)
}
