//! Login-node hostname candidates for ETX command jobs.
//!
//! GPU work runs on `login05`..`login10`, CPU work on `login01`..`login04`.
//! The candidate list and its default depend only on the GPU flag.

/// Hostname prefix shared by every login node.
pub const LOGIN_PREFIX: &str = "login";

const GPU_NODES: std::ops::RangeInclusive<u8> = 5..=10;
const CPU_NODES: std::ops::RangeInclusive<u8> = 1..=4;

fn login_name(n: u8) -> String {
    format!("{LOGIN_PREFIX}{n:02}")
}

/// Candidate hostnames for the given GPU/CPU selection, in display order.
pub fn hostname_candidates(is_gpu: bool) -> Vec<String> {
    let range = if is_gpu { GPU_NODES } else { CPU_NODES };
    range.map(login_name).collect()
}

/// The preselected hostname: the last candidate of the list.
pub fn default_hostname(is_gpu: bool) -> String {
    let range = if is_gpu { GPU_NODES } else { CPU_NODES };
    login_name(*range.end())
}
