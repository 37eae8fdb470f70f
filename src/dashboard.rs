//! Dashboard renderer
//!
//! Pure function from a history snapshot to a self-refreshing HTML
//! document. The renderer never touches the ledger; it only formats
//! whatever snapshot it is handed.

use crate::models::{DetectionEvent, Verdict};

/// Seconds between client-side reloads.
const REFRESH_SECS: u32 = 10;

const MALICIOUS_COLOR: &str = "#ff4444";
const BENIGN_COLOR: &str = "#00d4ff";

/// Section markers the forensic prompt demands; each becomes a styled
/// sub-head inside the card.
const SECTION_MARKERS: [&str; 3] = [
    "🔍 ANALYSIS SUMMARY",
    "🚨 RISK LEVEL",
    "🛡️ TECHNICAL REMEDIATION",
];

/// Render the full status board, newest event first.
pub fn render(events: &[DetectionEvent]) -> String {
    let feed = if events.is_empty() {
        "<p class=\"placeholder\">Monitoring network interface... No active threats.</p>".to_string()
    } else {
        events.iter().map(render_card).collect()
    };

    format!(
        r#"<html>
<head>
    <meta http-equiv="refresh" content="{REFRESH_SECS}">
    <link href="https://fonts.googleapis.com/css2?family=Inter:wght@400;500;700&family=JetBrains+Mono&display=swap" rel="stylesheet">
    <style>
        :root {{
            --bg: #0b0f1a;
            --card: #161b2a;
            --accent: #38bdf8;
            --text: #f1f5f9;
        }}
        body {{ background: var(--bg); color: var(--text); font-family: 'Inter', sans-serif; padding: 50px; margin: 0; }}
        h1 {{ font-weight: 700; font-size: 1.8rem; letter-spacing: -1px; margin-bottom: 5px; color: var(--accent); }}
        .node-status {{ color: #64748b; font-size: 0.85rem; margin-bottom: 40px; text-transform: uppercase; letter-spacing: 1px; }}
        .placeholder {{ color: #475569; }}

        .incident-card {{
            background: var(--card);
            border-radius: 12px;
            padding: 30px;
            margin-bottom: 30px;
            box-shadow: 0 10px 15px -3px rgba(0, 0, 0, 0.4);
        }}
        .card-header {{
            display: flex;
            align-items: center;
            gap: 15px;
            margin-bottom: 20px;
            font-family: 'JetBrains Mono', monospace;
            font-size: 0.8rem;
        }}
        .timestamp {{ color: #94a3b8; }}
        .source-tag {{ background: #1e293b; padding: 4px 10px; border-radius: 4px; color: var(--accent); }}
        .verdict-tag {{ padding: 4px 12px; border-radius: 20px; font-weight: 600; font-size: 0.75rem; letter-spacing: 0.5px; }}

        .forensic-report {{ font-size: 0.95rem; line-height: 1.8; color: #cbd5e1; }}
        .report-head {{
            display: block;
            margin-top: 20px;
            margin-bottom: 8px;
            font-weight: 700;
            color: var(--accent);
            font-size: 0.9rem;
            text-transform: uppercase;
        }}
        .report-head:first-child {{ margin-top: 0; }}
    </style>
</head>
<body>
    <h1>[🐝] Aegis Hive | Elite Security Terminal</h1>
    <div class="node-status">Live Detection Feed | Behavioral Analysis Online</div>
    <div class="feed">
{feed}    </div>
</body>
</html>
"#
    )
}

fn render_card(event: &DetectionEvent) -> String {
    let color = verdict_color(event.verdict);
    let report = event
        .report
        .as_deref()
        .map(format_report)
        .unwrap_or_default();

    format!(
        r#"        <div class="incident-card" style="border-left: 4px solid {color};">
            <div class="card-header">
                <span class="timestamp">{timestamp}</span>
                <span class="source-tag">{source}</span>
                <span class="verdict-tag" style="background: {color}22; color: {color};">&#9679; {verdict}</span>
            </div>
            <div class="forensic-report">
                {report}
            </div>
        </div>
"#,
        timestamp = event.timestamp.format("%H:%M:%S"),
        source = html_escape(&event.source),
        verdict = event.verdict.as_str(),
    )
}

fn verdict_color(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Malicious => MALICIOUS_COLOR,
        Verdict::Benign => BENIGN_COLOR,
    }
}

/// Light sanitation for the generated brief: escape markup, strip markdown
/// emphasis and conversational filler, mark up the fixed sections, keep
/// line breaks.
fn format_report(report: &str) -> String {
    let mut text = html_escape(report);
    text = text.replace("**", "");
    text = text.replace("Okay, ", "").replace("I will analyze ", "");

    for marker in SECTION_MARKERS {
        text = text.replace(
            marker,
            &format!("<span class=\"report-head\">{marker}</span>"),
        );
    }

    text.replace('\n', "<br>")
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Detection, DetectionEvent, SOURCE_REMOTE, SOURCE_WATCHER};

    fn event(source: &str, report: &str) -> DetectionEvent {
        DetectionEvent::new(
            source,
            Detection {
                verdict: Verdict::Malicious,
                probability: 0.8,
            },
            Some(report.to_string()),
        )
    }

    #[test]
    fn empty_history_renders_placeholder_only() {
        let html = render(&[]);
        assert!(html.contains("No active threats"));
        assert!(!html.contains(r#"<div class="incident-card""#));
    }

    #[test]
    fn one_card_per_event_in_snapshot_order() {
        let events = vec![
            event(SOURCE_REMOTE, "newest"),
            event(SOURCE_WATCHER, "oldest"),
        ];
        let html = render(&events);

        assert_eq!(html.matches(r#"<div class="incident-card""#).count(), 2);
        let newest = html.find("newest").unwrap();
        let oldest = html.find("oldest").unwrap();
        assert!(newest < oldest);
        assert!(html.contains("remote-host"));
        assert!(html.contains("local-watcher"));
    }

    #[test]
    fn client_refresh_is_ten_seconds() {
        let html = render(&[]);
        assert!(html.contains(r#"<meta http-equiv="refresh" content="10">"#));
    }

    #[test]
    fn report_markup_is_sanitized() {
        let formatted = format_report("Okay, **bad** <script>alert(1)</script>");
        assert!(!formatted.contains("**"));
        assert!(!formatted.contains("Okay, "));
        assert!(!formatted.contains("<script>"));
        assert!(formatted.contains("&lt;script&gt;"));
    }

    #[test]
    fn section_markers_become_subheads() {
        let formatted = format_report("🔍 ANALYSIS SUMMARY\nBurst pattern.\n🚨 RISK LEVEL\n8");
        assert_eq!(formatted.matches("report-head").count(), 2);
        assert!(formatted.contains("<br>"));
    }

    #[test]
    fn verdict_badge_color_is_keyed() {
        assert_eq!(verdict_color(Verdict::Malicious), "#ff4444");
        assert_eq!(verdict_color(Verdict::Benign), "#00d4ff");
    }
}
