//! Aggregate statistics over stored entries.

use crate::entry::{Entry, EntryKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Aggregated view of the store, computed fresh on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Total number of entries
    pub total: usize,

    /// Number of request entries
    pub requests: usize,

    /// Number of exception entries
    pub exceptions: usize,

    /// Mean response time over request entries, rounded to whole milliseconds
    pub average_response_time: u64,

    /// Distinct client IPs across request entries
    #[serde(rename = "uniqueIPs")]
    pub unique_ips: usize,

    /// Distinct user agents across request entries
    pub unique_user_agents: usize,

    /// Request entries per response status code
    pub status_codes: BTreeMap<u16, usize>,

    /// Request entries per HTTP method
    pub methods: BTreeMap<String, usize>,
}

impl Stats {
    /// Calculate statistics from a collection of entries.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let mut stats = Self::default();
        let mut response_time_sum: u64 = 0;
        let mut ips = HashSet::new();
        let mut user_agents = HashSet::new();

        for entry in entries {
            stats.total += 1;

            match entry.kind {
                EntryKind::Exception => {
                    stats.exceptions += 1;
                    continue;
                }
                EntryKind::Request => stats.requests += 1,
            }

            if let Some(response) = &entry.response {
                response_time_sum = response_time_sum.saturating_add(response.response_time);
                *stats.status_codes.entry(response.status_code).or_insert(0) += 1;
            }

            if let Some(request) = &entry.request {
                *stats.methods.entry(request.method.clone()).or_insert(0) += 1;

                if let Some(ip) = request.ip.as_deref().filter(|ip| !ip.is_empty()) {
                    ips.insert(ip);
                }
                if let Some(ua) = request.user_agent.as_deref().filter(|ua| !ua.is_empty()) {
                    user_agents.insert(ua);
                }
            }
        }

        stats.average_response_time = rounded_mean(response_time_sum, stats.requests as u64);
        stats.unique_ips = ips.len();
        stats.unique_user_agents = user_agents.len();
        stats
    }
}

/// `sum / count` rounded half up, 0 for an empty set.
fn rounded_mean(sum: u64, count: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    let quotient = sum / count;
    let remainder = sum % count;
    if remainder * 2 >= count {
        quotient + 1
    } else {
        quotient
    }
}
