use std::sync::LazyLock;

use regex::Regex;

/// Credit labels as they appear across both site generations.
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:contributor\(s\)|contributors?|photographer\(s\)|photographers?)\s*:|(?:contributed by|submitted by|photography by|photographs? by|images? courtesy of)\b\s*:?)",
    )
    .unwrap()
});
static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^categor(?:y\(ies\)|ies|y)\s*:\s*(.+)$").unwrap());
static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[;,&]|\band\b").unwrap());
static CREDENTIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:m\.?d|ph\.?d|d\.?o|o\.?d|m\.?s|b\.?s|b\.?a|mph|mba|mbbs|rn|cra|coa|cot|comt|ocs|oct-c|crc|frcsc?|frcophth|facs)\.?$")
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    Contributor,
    Photographer,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Credits {
    pub contributors: Vec<String>,
    pub photographers: Vec<String>,
}

/// Collect contributor and photographer names from text lines. Only lines
/// that open with a credit label count; a line may carry several labels.
pub fn extract_credits(lines: &[String]) -> Credits {
    let mut credits = Credits::default();
    for line in lines {
        let labels: Vec<_> = LABEL_RE.find_iter(line).collect();
        match labels.first() {
            Some(first) if line[..first.start()].trim().is_empty() => {}
            _ => continue,
        }
        for (i, m) in labels.iter().enumerate() {
            let end = labels.get(i + 1).map(|n| n.start()).unwrap_or(line.len());
            let target = match label_kind(m.as_str()) {
                CreditKind::Contributor => &mut credits.contributors,
                CreditKind::Photographer => &mut credits.photographers,
            };
            for name in split_names(&line[m.end()..end]) {
                if !target.contains(&name) {
                    target.push(name);
                }
            }
        }
    }
    credits
}

fn label_kind(label: &str) -> CreditKind {
    let lower = label.to_lowercase();
    if lower.contains("photo") || lower.contains("image") {
        CreditKind::Photographer
    } else {
        CreditKind::Contributor
    }
}

/// "A. Smith; B. Jones (fig. 1)" -> ["A. Smith", "B. Jones"]. Parenthetical
/// notes and trailing credentials ("MD", "CRA") are dropped.
pub fn split_names(raw: &str) -> Vec<String> {
    let cleaned = PAREN_RE.replace_all(raw, " ");
    SEPARATOR_RE
        .split(&cleaned)
        .map(|part| {
            part.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .trim_matches(|c: char| c == ':' || c == '-' || c == '\u{2013}')
                .trim()
                .to_string()
        })
        .filter(|n| !n.is_empty() && !CREDENTIAL_RE.is_match(n))
        .collect()
}

/// Text of the page's "Category:" / "Categories:" line, cut before any
/// credit label sharing the line.
pub fn category_line(lines: &[String]) -> Option<String> {
    lines.iter().find_map(|line| {
        let caps = CATEGORY_RE.captures(line)?;
        let value = &caps[1];
        let value = match LABEL_RE.find(value) {
            Some(m) => &value[..m.start()],
            None => value,
        };
        Some(value.trim().to_string()).filter(|v| !v.is_empty())
    })
}

/// True for lines that are credit or category labels rather than prose.
pub fn is_label_line(line: &str) -> bool {
    CATEGORY_RE.is_match(line)
        || LABEL_RE
            .find(line)
            .is_some_and(|m| line[..m.start()].trim().is_empty())
}
