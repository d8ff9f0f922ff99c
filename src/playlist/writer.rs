// src/playlist/writer.rs
// =============================================================================
// This module renders ranked categories back into the text list format.
//
// Output per category:
//   <label>,#genre#
//   <name>,<url>        (one line per ranked entry)
//   <blank line>
//
// This is the same format the parser reads, so the output can be fed back in.
// =============================================================================

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;

use super::parser::{SECTION_MARKER, SEPARATOR};
use crate::rank::RankedCategory;

// Builds the output text for all categories, in the order given
pub fn render_playlist(categories: &[RankedCategory]) -> String {
    let mut out = String::new();

    for category in categories {
        // Writing into a String can't fail, so the results are ignored
        let _ = writeln!(out, "{}{}", category.label, SECTION_MARKER);
        for result in &category.results {
            let _ = writeln!(out, "{}{}{}", result.entry.name, SEPARATOR, result.entry.url);
        }
        out.push('\n');
    }

    out
}

// Replaces the output file with the rendered text
pub async fn write_playlist(path: &Path, text: &str) -> Result<()> {
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("failed to write output file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::CategoryKind;
    use crate::playlist::{parse_lines, Entry};
    use crate::probe::ProbeResult;

    fn result(name: &str, url: &str, position: usize) -> ProbeResult {
        ProbeResult {
            entry: Entry {
                name: name.to_string(),
                url: url.to_string(),
                section: None,
                position,
            },
            reachable: true,
            latency_secs: 0.1,
            throughput_kbps: 100.0,
            failure: None,
        }
    }

    fn sample() -> Vec<RankedCategory> {
        vec![
            RankedCategory {
                label: "央视频道".to_string(),
                kind: CategoryKind::Broadcaster,
                results: vec![result("CCTV-1综合", "http://a", 0)],
            },
            RankedCategory {
                label: "北京频道".to_string(),
                kind: CategoryKind::Province,
                results: vec![
                    result("北京新闻", "http://c", 2),
                    result("北京新闻", "http://c2?x=1,y=2", 3),
                ],
            },
            RankedCategory {
                label: "其他频道".to_string(),
                kind: CategoryKind::Fallback,
                results: vec![],
            },
        ]
    }

    #[test]
    fn test_render_format() {
        let text = render_playlist(&sample());
        let expected = "央视频道,#genre#\nCCTV-1综合,http://a\n\n\
                        北京频道,#genre#\n北京新闻,http://c\n北京新闻,http://c2?x=1,y=2\n\n\
                        其他频道,#genre#\n\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_output_parses_back() {
        let categories = sample();
        let text = render_playlist(&categories);
        let reparsed = parse_lines(text.lines());

        // Every entry comes back under the section it was written in
        let pairs: Vec<(String, String, String)> = reparsed
            .into_iter()
            .map(|e| (e.section.unwrap_or_default(), e.name, e.url))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("央视频道".into(), "CCTV-1综合".into(), "http://a".into()),
                ("北京频道".into(), "北京新闻".into(), "http://c".into()),
                ("北京频道".into(), "北京新闻".into(), "http://c2?x=1,y=2".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_write_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmlive.txt");
        write_playlist(&path, "a,#genre#\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,#genre#\n");
    }
}
