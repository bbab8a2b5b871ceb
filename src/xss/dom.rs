// src/xss/dom.rs
//! Static DOM-XSS pattern detection over inline scripts.
//!
//! Detection is presence-based per line: a line is reported when it mentions
//! a known taint source, a known dangerous sink, or a variable that an
//! earlier line of the same script assigned from a source. No data flow
//! between statements is verified.

use regex::Regex;
use std::collections::BTreeSet;

const SOURCE_MARK: (&str, &str) = ("«", "»");
const SINK_MARK: (&str, &str) = ("‹", "›");

/// One flagged line inside an inline script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomFinding {
    /// 1-based line number within its script block
    pub line: usize,
    /// Line text with sources wrapped in «» and sinks in ‹›
    pub annotated: String,
    pub sources: Vec<String>,
    pub sinks: Vec<String>,
    /// Previously source-assigned variables referenced on this line
    pub tainted: Vec<String>,
}

pub struct DomAnalyzer {
    script_block: Regex,
    sources: Regex,
    sinks: Regex,
    assignment: Regex,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Source,
    Sink,
}

impl Default for DomAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl DomAnalyzer {
    pub fn new() -> Self {
        Self {
            script_block: Regex::new(r"(?is)<script[^>]*>(.*?)</script>")
                .expect("script block pattern"),
            sources: Regex::new(
                r"\b(?:document\.(?:cookie|referrer|URL(?:Unencoded)?|documentURI|baseURI)|location\.(?:href|search|hash|pathname)|window\.name|history\.(?:pushState|replaceState)|(?:local|session)Storage)\b",
            )
            .expect("source pattern"),
            sinks: Regex::new(
                r"\b(?:eval|Function|set(?:Timeout|Interval|Immediate)|execScript|document\.(?:writeln|write)|crypto\.generateCRMFRequest)\b|\.(?:innerHTML|outerHTML|textContent|src|createContextualFragment)\b",
            )
            .expect("sink pattern"),
            assignment: Regex::new(r"\b(?:var|let|const)\s+([A-Za-z_$][\w$]*)")
                .expect("assignment pattern"),
        }
    }

    /// Flagged lines across all inline scripts, in document order
    pub fn find(&self, html: &str) -> Vec<DomFinding> {
        let mut findings = Vec::new();

        for block in self.script_block.captures_iter(html) {
            let Some(script) = block.get(1) else {
                continue;
            };
            // Tracked variables are scoped to one script block
            let mut tracked: Vec<(String, Regex)> = Vec::new();

            for (idx, raw_line) in script.as_str().lines().enumerate() {
                let line = raw_line.trim_end();
                let mut spans: Vec<(usize, usize, Mark)> = Vec::new();

                let sources: Vec<String> = self
                    .sources
                    .find_iter(line)
                    .map(|m| {
                        spans.push((m.start(), m.end(), Mark::Source));
                        m.as_str().to_string()
                    })
                    .collect();

                if !sources.is_empty() {
                    if let Some(var) = self.assignment.captures(line).and_then(|c| c.get(1)) {
                        let name = var.as_str().to_string();
                        if !tracked.iter().any(|(n, _)| *n == name) {
                            // `\b` cannot sit before `$`, so the left boundary is matched
                            // explicitly and the right one checked per hit
                            let pattern = format!(r"(?:^|[^\w$])({})", regex::escape(&name));
                            if let Ok(re) = Regex::new(&pattern) {
                                tracked.push((name, re));
                            }
                        }
                    }
                }

                let mut tainted = Vec::new();
                for (name, re) in &tracked {
                    let mut hit = false;
                    for caps in re.captures_iter(line) {
                        let Some(m) = caps.get(1) else {
                            continue;
                        };
                        if line[m.end()..].chars().next().is_some_and(is_ident_char) {
                            continue;
                        }
                        spans.push((m.start(), m.end(), Mark::Source));
                        hit = true;
                    }
                    if hit {
                        tainted.push(name.clone());
                    }
                }

                let sinks: Vec<String> = self
                    .sinks
                    .find_iter(line)
                    .map(|m| {
                        spans.push((m.start(), m.end(), Mark::Sink));
                        m.as_str().to_string()
                    })
                    .collect();

                if sources.is_empty() && sinks.is_empty() && tainted.is_empty() {
                    continue;
                }

                findings.push(DomFinding {
                    line: idx + 1,
                    annotated: annotate(line, spans),
                    sources,
                    sinks,
                    tainted,
                });
            }
        }

        findings
    }

    pub fn is_vulnerable(&self, html: &str) -> bool {
        !self.find(html).is_empty()
    }

    /// Human summary; an empty result is reported explicitly
    pub fn report(&self, html: &str) -> String {
        let findings = self.find(html);
        if findings.is_empty() {
            return "[DOM XSS] No issues found.".to_string();
        }

        let mut out = String::from("[DOM XSS] Potential risky code segments detected:");
        for finding in &findings {
            out.push('\n');
            out.push_str(&format!("{:>3}: {}", finding.line, finding.annotated));
        }
        out
    }

    /// Distinct source names mentioned anywhere in inline scripts
    pub fn sources_in(&self, html: &str) -> BTreeSet<String> {
        self.find(html)
            .into_iter()
            .flat_map(|f| f.sources.into_iter())
            .collect()
    }
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Wrap non-overlapping spans with their markers; earlier spans win
fn annotate(line: &str, mut spans: Vec<(usize, usize, Mark)>) -> String {
    spans.sort_by_key(|(start, end, _)| (*start, std::cmp::Reverse(*end)));

    let mut out = String::with_capacity(line.len() + spans.len() * 4);
    let mut cursor = 0;
    for (start, end, mark) in spans {
        if start < cursor {
            continue;
        }
        let (open, close) = match mark {
            Mark::Source => SOURCE_MARK,
            Mark::Sink => SINK_MARK,
        };
        out.push_str(&line[cursor..start]);
        out.push_str(open);
        out.push_str(&line[start..end]);
        out.push_str(close);
        cursor = end;
    }
    out.push_str(&line[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
<script src="/app.js"></script>
<script>
var q = location.hash.slice(1);
console.log("loaded");
document.getElementById("out").innerHTML = q;
</script>
</body></html>"#;

    #[test]
    fn test_source_sink_and_tracked_variable() {
        let analyzer = DomAnalyzer::new();
        let findings = analyzer.find(PAGE);

        assert_eq!(findings.len(), 2);

        assert_eq!(findings[0].line, 2);
        assert_eq!(findings[0].sources, vec!["location.hash"]);
        assert_eq!(findings[0].tainted, vec!["q"]);

        assert_eq!(findings[1].line, 4);
        assert_eq!(findings[1].tainted, vec!["q"]);
        assert!(findings[1].sinks.iter().any(|s| s.ends_with(".innerHTML")));
        assert!(findings[1].annotated.contains("«q»"));
        assert!(findings[1].annotated.contains("‹"));
    }

    #[test]
    fn test_annotation_wraps_source() {
        let findings = DomAnalyzer::new().find("<script>var a = document.cookie;</script>");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].annotated, "var «a» = «document.cookie»;");
    }

    #[test]
    fn test_dollar_prefixed_variable_tracked() {
        let html = "<script>\nvar $h = location.hash;\nfoo($h);\nbar($hx, a$h);\n</script>";
        let findings = DomAnalyzer::new().find(html);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].annotated, "var «$h» = «location.hash»;");
        assert_eq!(findings[1].line, 3);
        assert_eq!(findings[1].tainted, vec!["$h"]);
        assert_eq!(findings[1].annotated, "foo(«$h»);");
    }

    #[test]
    fn test_tracked_variable_repeated_on_one_line() {
        let html = "<script>\nlet u = document.URL;\nsend(u,u);\n</script>";
        let findings = DomAnalyzer::new().find(html);
        assert_eq!(findings[1].annotated, "send(«u»,«u»);");
    }

    #[test]
    fn test_storage_and_history_are_sources() {
        let html = "<script>\nlocalStorage.getItem('x');\nhistory.pushState({}, '', '/');\n</script>";
        let sources = DomAnalyzer::new().sources_in(html);
        assert!(sources.contains("localStorage"));
        assert!(sources.contains("history.pushState"));
    }

    #[test]
    fn test_sinks_detected_without_sources() {
        let html = "<script>setTimeout(run, 10);\ndocument.write('hi');</script>";
        let findings = DomAnalyzer::new().find(html);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].sinks, vec!["setTimeout"]);
        assert_eq!(findings[1].sinks, vec!["document.write"]);
    }

    #[test]
    fn test_tracking_is_scoped_per_script() {
        let html = "<script>var t = window.name;</script><script>alert(t);</script>";
        let findings = DomAnalyzer::new().find(html);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_scripts_outside_tags_ignored() {
        let html = "<p>document.write(location.hash)</p>";
        assert!(!DomAnalyzer::new().is_vulnerable(html));
    }

    #[test]
    fn test_report_no_findings_is_explicit() {
        let report = DomAnalyzer::new().report("<html><script>let x = 1;</script></html>");
        assert_eq!(report, "[DOM XSS] No issues found.");
    }

    #[test]
    fn test_report_lists_findings() {
        let report = DomAnalyzer::new().report(PAGE);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "[DOM XSS] Potential risky code segments detected:");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("  2: "));
    }
}
