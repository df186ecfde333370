//! Step traces for the classroom algorithms.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SearchStep {
    pub lo: usize,
    pub hi: usize,
    pub mid: usize,
    pub value: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchTrace {
    pub steps: Vec<SearchStep>,
    pub index: Option<usize>,
}

/// Binary search over an ascending slice, recording every probe.
/// `lo`/`hi` are the inclusive bounds at the time of the probe.
pub fn binary_search_trace(sorted: &[i64], target: i64) -> SearchTrace {
    let mut trace = SearchTrace::default();
    if sorted.is_empty() {
        return trace;
    }
    let mut lo = 0usize;
    let mut hi = sorted.len() - 1;
    loop {
        let mid = lo + (hi - lo) / 2;
        let value = sorted[mid];
        trace.steps.push(SearchStep { lo, hi, mid, value });
        if value == target {
            trace.index = Some(mid);
            break;
        }
        if value < target {
            lo = mid + 1;
        } else if mid == 0 {
            break;
        } else {
            hi = mid - 1;
        }
        if lo > hi {
            break;
        }
    }
    trace
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GcdStep {
    pub a: u64,
    pub b: u64,
    pub q: u64,
    pub r: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GcdTrace {
    pub steps: Vec<GcdStep>,
    pub result: u64,
}

/// Euclid's algorithm, one step per division: a = q*b + r.
pub fn gcd_trace(a: u64, b: u64) -> GcdTrace {
    let mut trace = GcdTrace::default();
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let (q, r) = (a / b, a % b);
        trace.steps.push(GcdStep { a, b, q, r });
        a = b;
        b = r;
    }
    trace.result = a;
    trace
}
