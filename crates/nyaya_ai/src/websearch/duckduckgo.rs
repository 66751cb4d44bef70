use std::time::Duration;

use super::WebSearchProvider;
use crate::error::{SearchFailure, SearchFailureKind};

const DUCKDUCKGO_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const NAME: &str = "duckduckgo";

/// Credential-free secondary backend scraping the HTML results page. Only
/// result titles are returned.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    max_results: usize,
    timeout: Duration,
}

impl DuckDuckGoSearch {
    pub fn new(max_results: usize, timeout: Duration) -> Self {
        Self { max_results, timeout }
    }
}

impl WebSearchProvider for DuckDuckGoSearch {
    fn name(&self) -> &str {
        NAME
    }

    fn search(&self, query: &str) -> Result<String, SearchFailure> {
        let resp = ureq::get(DUCKDUCKGO_ENDPOINT)
            .timeout(self.timeout)
            .set("User-Agent", "Mozilla/5.0")
            .query("q", query)
            .call();

        match resp {
            Ok(r) => {
                let html = r
                    .into_string()
                    .map_err(|e| {
                        SearchFailure::new(NAME, SearchFailureKind::BadResponse, e.to_string())
                    })?;
                Ok(extract_result_titles(&html, self.max_results).join("\n"))
            }
            Err(ureq::Error::Status(code, _)) => Err(SearchFailure::new(
                NAME,
                SearchFailureKind::BadResponse,
                format!("status={code}"),
            )),
            Err(e) => Err(SearchFailure::new(NAME, SearchFailureKind::Transport, e.to_string())),
        }
    }
}

/// Text of `<a class="result__a" ...>` anchors, in page order.
pub fn extract_result_titles(html: &str, max_results: usize) -> Vec<String> {
    const MARKER: &str = "result__a";
    let mut out = Vec::new();
    let mut cursor = 0usize;

    while out.len() < max_results {
        let Some(rel) = html[cursor..].find(MARKER) else {
            break;
        };
        let hit = cursor + rel;
        cursor = hit + MARKER.len();

        // Reject longer class names such as `result__a-icon`.
        let next = html[cursor..].chars().next();
        if !matches!(next, Some('"') | Some('\'') | Some(' ')) {
            continue;
        }
        let Some(tag_start) = html[..hit].rfind('<') else {
            continue;
        };
        if !html[tag_start..].starts_with("<a") {
            continue;
        }
        let Some(open_end) = html[cursor..].find('>').map(|i| cursor + i + 1) else {
            break;
        };
        let Some(close) = html[open_end..].find("</a>").map(|i| open_end + i) else {
            break;
        };

        let text = collapse_whitespace(&decode_entities(&strip_tags(&html[open_end..close])));
        if !text.is_empty() {
            out.push(text);
        }
        cursor = close + "</a>".len();
    }
    out
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Decodes named entities common in result titles and any numeric
/// `&#NNN;` / `&#xHH;` reference. Unknown entities are left as-is.
fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&after[..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
<div class="result">
  <a rel="nofollow" class="result__a" href="https://a.example">Karnataka <b>Land</b> Reforms Act</a>
  <a class="result__a-icon" href="#">icon</a>
</div>
<div class="result">
  <a class="result__a" href="https://b.example">Bhoomi &amp; RTC records</a>
  <span class="result__snippet">snippet</span>
</div>
<div class="result"><a class="result__a" href="https://c.example">Third</a></div>
"##;

    #[test]
    fn extracts_anchor_text_in_order() {
        assert_eq!(
            extract_result_titles(PAGE, 5),
            vec![
                "Karnataka Land Reforms Act".to_string(),
                "Bhoomi & RTC records".to_string(),
                "Third".to_string(),
            ]
        );
    }

    #[test]
    fn respects_max_results() {
        assert_eq!(extract_result_titles(PAGE, 1).len(), 1);
        assert!(extract_result_titles("<html>no results</html>", 5).is_empty());
    }

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(
            decode_entities("Owner&#8217;s rights &amp; RTC &#x2014; &lt;Bhoomi&gt; &#39;x&#39;"),
            "Owner\u{2019}s rights & RTC \u{2014} <Bhoomi> 'x'"
        );
        assert_eq!(decode_entities("AT&T &bogus; &#xZZ;"), "AT&T &bogus; &#xZZ;");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }
}
