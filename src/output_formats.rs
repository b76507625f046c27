use crate::search::MatchResult;
use clap::ValueEnum;
use colored::*;
use serde_json::json;

/// Output format types
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
    /// Bare values, one per line
    Values,
}

/// Output formatter for downloaded results
pub struct OutputFormatter {
    format: OutputFormat,
    include_metadata: bool,
    color: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            include_metadata: true,
            color: false,
        }
    }

    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Format search results
    pub fn format_results(&self, matches: &[MatchResult], query: &str) -> String {
        match self.format {
            OutputFormat::Text => self.format_text(matches, query),
            OutputFormat::Json => self.format_json(matches, query),
            OutputFormat::Markdown => self.format_markdown(matches, query),
            OutputFormat::Values => format_values(matches),
        }
    }

    /// Format as JSON
    fn format_json(&self, matches: &[MatchResult], query: &str) -> String {
        let result = if self.include_metadata {
            json!({
                "query": query,
                "total_matches": matches.len(),
                "matches": matches,
            })
        } else {
            json!(matches)
        };

        serde_json::to_string_pretty(&result).unwrap_or_default()
    }

    /// Format as plain text (default)
    fn format_text(&self, matches: &[MatchResult], query: &str) -> String {
        let mut output = String::new();

        if self.include_metadata {
            output.push_str(&format!("Query: {query}\n"));
            output.push_str(&format!("Total matches: {}\n\n", matches.len()));
        }

        for m in matches {
            let location = format!(
                "#{} {} [{}..{}]",
                m.request_id, m.source, m.start_index, m.end_index
            );
            if self.color {
                output.push_str(&format!("{} {}\n", location.dimmed(), m.value.yellow().bold()));
            } else {
                output.push_str(&format!("{location} {}\n", m.value));
            }
        }

        output
    }

    /// Format as Markdown
    fn format_markdown(&self, matches: &[MatchResult], query: &str) -> String {
        let mut output = String::new();

        output.push_str("# httpgrep Results\n\n");

        if self.include_metadata {
            output.push_str(&format!("**Query:** `{query}`\n"));
            output.push_str(&format!("**Total Matches:** {}\n\n", matches.len()));
        }

        output.push_str("| Request | Source | Start | End | Value |\n");
        output.push_str("|---|---|---|---|---|\n");
        for m in matches {
            output.push_str(&format!(
                "| {} | {} | {} | {} | `{}` |\n",
                m.request_id,
                m.source,
                m.start_index,
                m.end_index,
                escape_markdown_cell(&m.value)
            ));
        }

        output
    }
}

fn format_values(matches: &[MatchResult]) -> String {
    let mut output = matches
        .iter()
        .map(|m| m.value.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    if !output.is_empty() {
        output.push('\n');
    }
    output
}

/// Escape characters that would break a Markdown table cell
fn escape_markdown_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('`', "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::MatchSource;

    fn matches() -> Vec<MatchResult> {
        vec![
            MatchResult {
                value: "example.com".into(),
                request_id: "3".into(),
                source: MatchSource::Request,
                start_index: 20,
                end_index: 31,
            },
            MatchResult {
                value: "a|b".into(),
                request_id: "4".into(),
                source: MatchSource::Response,
                start_index: 0,
                end_index: 3,
            },
        ]
    }

    #[test]
    fn test_text() {
        let out = OutputFormatter::new(OutputFormat::Text).format_results(&matches(), "q");
        assert!(out.contains("Total matches: 2"));
        assert!(out.contains("#3 request [20..31] example.com"));
        assert!(out.contains("#4 response [0..3] a|b"));
    }

    #[test]
    fn test_json() {
        let out = OutputFormatter::new(OutputFormat::Json).format_results(&matches(), "q");
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["total_matches"], 2);
        assert_eq!(value["matches"][0]["request_id"], "3");
        assert_eq!(value["matches"][1]["source"], "Response");

        let out = OutputFormatter::new(OutputFormat::Json)
            .with_metadata(false)
            .format_results(&matches(), "q");
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let out = OutputFormatter::new(OutputFormat::Markdown).format_results(&matches(), "q");
        assert!(out.contains("| 4 | response | 0 | 3 | `a\\|b` |"));
    }

    #[test]
    fn test_values() {
        let out = OutputFormatter::new(OutputFormat::Values).format_results(&matches(), "q");
        assert_eq!(out, "example.com\na|b\n");
        assert_eq!(
            OutputFormatter::new(OutputFormat::Values).format_results(&[], "q"),
            ""
        );
    }
}
