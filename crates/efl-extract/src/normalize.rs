//! Text normalization
//!
//! Providers print the same value with different surrounding tokens
//! ("per kWh", "/kWh", "cents per kilowatt-hour"). Normalization rewrites the
//! text into one canonical, lower-cased form so the rule table only has to
//! describe each phrasing once:
//!
//! - whitespace collapsed to single spaces
//! - dashes unified to `-`, footnote markers removed
//! - thousands separators removed (`1,000` -> `1000`)
//! - `cents`/`cent` -> `¢`, `percent` -> `%`
//! - `per kWh`, `/ kWh`, `per kilowatt hour` -> `/kwh`
//! - `per month`, `per billing cycle`, `/mo` -> `/month`

use regex::Regex;
use std::sync::LazyLock;

static THOUSANDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d),(\d{3})\b").expect("valid thousands pattern"));

static REWRITES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\[\d{1,2}\]", ""),
        (r"kilowatt[\s-]*hours?", "kwh"),
        (r"\bpercent\b", "%"),
        (r"\bcents?\b", "¢"),
        (r"\s*(?:\bper\s+|/\s*)kwh\b", "/kwh"),
        (
            r"\s*(?:\bper\s+(?:month|billing cycle|billing period)\b|/\s*(?:month|mo)\b)",
            "/month",
        ),
        (r"\$\s+", "$"),
        (r"(\d)\s+([¢%])", "${1}${2}"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("valid normalization pattern"),
            replacement,
        )
    })
    .collect()
});

/// Rewrite document text into canonical form
pub fn normalize(text: &str) -> String {
    let mapped: String = text.chars().filter_map(canonical_char).collect();
    let lowered = mapped.to_lowercase();
    let mut text = lowered.split_whitespace().collect::<Vec<_>>().join(" ");

    // Each pass joins one separator per group; "1,000,000" needs two.
    loop {
        let joined = THOUSANDS.replace_all(&text, "${1}${2}").into_owned();
        if joined == text {
            break;
        }
        text = joined;
    }

    for (pattern, replacement) in REWRITES.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }

    text.trim().to_string()
}

fn canonical_char(c: char) -> Option<char> {
    match c {
        '\u{00a0}' | '\u{2007}' | '\u{202f}' => Some(' '),
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => Some('-'),
        '\u{ff04}' => Some('$'),
        '\u{00a2}' => Some('¢'),
        '*' | '\u{2020}' | '\u{2021}' => None,
        '\u{00b9}' | '\u{00b2}' | '\u{00b3}' | '\u{2070}'..='\u{2079}' => None,
        other => Some(other),
    }
}
