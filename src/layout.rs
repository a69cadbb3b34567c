use crate::{
    error::{OverprintError, OverprintResult},
    options::{OverlayOptions, TextAlign},
};

/// Average glyph width as a fraction of the font size.
///
/// An approximation, not true text measurement. Stored overlay positions were
/// tuned against this constant; changing it reflows saved captions.
const AVG_CHAR_WIDTH_RATIO: f64 = 0.55;
const LINE_HEIGHT_RATIO: f64 = 1.3;

const SHADOW_OFFSET: f64 = 2.0;
const SHADOW_BLUR: f64 = 3.0;
const SHADOW_OPACITY: f64 = 0.6;

/// Greedy word-wrap against a character budget. Never splits a word: a single
/// word longer than `max_chars` gets its own over-long line.
pub fn wrap_caption(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Escape the five XML-sensitive characters for embedding in SVG text nodes.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a caption as an SVG document sized exactly `width` x `height` so it
/// composites pixel-aligned over the raster it was laid out for.
///
/// `options.y` is the vertical center of the whole text block (not the first
/// baseline); stored overlay positions encode this convention. `fill` is the
/// already-resolved text color as a hex string. Values are used as given:
/// range clamping is the caller's responsibility.
pub fn render_caption_overlay(
    text: &str,
    width: u32,
    height: u32,
    options: &OverlayOptions,
    fill: &str,
) -> OverprintResult<String> {
    if text.trim().is_empty() {
        return Err(OverprintError::validation("caption text is empty"));
    }
    if width == 0 || height == 0 {
        return Err(OverprintError::validation("overlay dimensions must be > 0"));
    }
    if !options.font_size.is_finite() || options.font_size <= 0.0 {
        return Err(OverprintError::validation("font_size must be > 0"));
    }

    let w = f64::from(width);
    let h = f64::from(height);
    let font_size = options.font_size;

    let box_width = w * (options.width / 100.0);
    let max_chars = ((box_width / (font_size * AVG_CHAR_WIDTH_RATIO)).floor() as usize).max(1);
    let lines = wrap_caption(text, max_chars);

    let line_height = font_size * LINE_HEIGHT_RATIO;
    let block_height = lines.len() as f64 * line_height;

    let box_center = w * (options.x / 100.0);
    let (anchor_x, text_anchor) = match options.text_align {
        TextAlign::Left => (box_center - box_width / 2.0, "start"),
        TextAlign::Center => (box_center, "middle"),
        TextAlign::Right => (box_center + box_width / 2.0, "end"),
    };

    let first_baseline = h * (options.y / 100.0) - block_height / 2.0 + font_size;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
         viewBox=\"0 0 {width} {height}\">\n"
    ));
    svg.push_str(&format!(
        "  <defs>\n    <filter id=\"caption-shadow\" x=\"-50%\" y=\"-50%\" width=\"200%\" \
         height=\"200%\">\n      <feDropShadow dx=\"{SHADOW_OFFSET}\" dy=\"{SHADOW_OFFSET}\" \
         stdDeviation=\"{SHADOW_BLUR}\" flood-color=\"#000000\" \
         flood-opacity=\"{SHADOW_OPACITY}\"/>\n    </filter>\n  </defs>\n"
    ));

    for (i, line) in lines.iter().enumerate() {
        let baseline = first_baseline + i as f64 * line_height;
        svg.push_str(&format!(
            "  <text x=\"{anchor_x:.1}\" y=\"{baseline:.1}\" font-family=\"sans-serif\" \
             font-size=\"{font_size:.1}\" font-weight=\"700\" font-style=\"italic\" \
             fill=\"{fill}\" text-anchor=\"{text_anchor}\" \
             filter=\"url(#caption-shadow)\">{}</text>\n",
            escape_xml(line)
        ));
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_packs_greedily_within_budget() {
        let lines = wrap_caption("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
        for line in &lines {
            assert!(line.chars().count() <= 10);
        }
    }

    #[test]
    fn wrap_never_splits_a_word() {
        let text = "tiny supercalifragilisticexpialidocious end";
        for max in 1..30 {
            for line in wrap_caption(text, max) {
                for word in line.split_whitespace() {
                    assert!(text.split_whitespace().any(|w| w == word));
                }
            }
        }
        // A single over-long word still comes through whole.
        let lines = wrap_caption("supercalifragilisticexpialidocious", 5);
        assert_eq!(lines, vec!["supercalifragilisticexpialidocious"]);
    }

    #[test]
    fn wrap_collapses_whitespace_runs() {
        assert_eq!(wrap_caption("a   b\t\nc", 20), vec!["a b c"]);
        assert!(wrap_caption("   ", 20).is_empty());
    }

    #[test]
    fn escape_covers_all_five_specials() {
        assert_eq!(escape_xml(r#"&<>"'"#), "&amp;&lt;&gt;&quot;&apos;");
        assert_eq!(escape_xml("plain"), "plain");
    }

    #[test]
    fn escaping_survives_into_the_document() {
        let opts = OverlayOptions::default();
        let svg = render_caption_overlay("5 < 6 & \"fun\"", 800, 1000, &opts, "#ffffff").unwrap();
        assert!(svg.contains("5 &lt; 6 &amp; &quot;fun&quot;"));
        assert!(!svg.contains("5 < 6"));
    }

    #[test]
    fn single_line_center_geometry() {
        let opts = OverlayOptions {
            x: 50.0,
            y: 80.0,
            font_size: 34.0,
            width: 80.0,
            ..OverlayOptions::default()
        };
        let svg = render_caption_overlay("me after that run", 800, 1000, &opts, "#ffffff").unwrap();
        // One text element, anchored mid-box.
        assert_eq!(svg.matches("<text").count(), 1);
        assert!(svg.contains("text-anchor=\"middle\""));
        assert!(svg.contains("x=\"400.0\""));
        // y is the block center: baseline = 800 - (34*1.3)/2 + 34 = 811.9.
        assert!(svg.contains("y=\"811.9\""));
        assert!(svg.contains("width=\"800\" height=\"1000\""));
        assert!(svg.contains("font-weight=\"700\""));
        assert!(svg.contains("font-style=\"italic\""));
        assert!(svg.contains("feDropShadow"));
    }

    #[test]
    fn alignment_moves_anchor_to_box_edges() {
        let base = OverlayOptions {
            x: 50.0,
            width: 80.0,
            ..OverlayOptions::default()
        };

        let left = OverlayOptions {
            text_align: TextAlign::Left,
            ..base.clone()
        };
        let svg = render_caption_overlay("hi", 800, 1000, &left, "#ffffff").unwrap();
        assert!(svg.contains("text-anchor=\"start\""));
        assert!(svg.contains("x=\"80.0\"")); // 400 - 640/2

        let right = OverlayOptions {
            text_align: TextAlign::Right,
            ..base
        };
        let svg = render_caption_overlay("hi", 800, 1000, &right, "#ffffff").unwrap();
        assert!(svg.contains("text-anchor=\"end\""));
        assert!(svg.contains("x=\"720.0\"")); // 400 + 640/2
    }

    #[test]
    fn multi_line_baselines_step_by_line_height() {
        let opts = OverlayOptions {
            x: 50.0,
            y: 50.0,
            font_size: 20.0,
            width: 30.0,
            ..OverlayOptions::default()
        };
        // box = 300px, max_chars = floor(300 / 11) = 27; force several lines.
        let svg = render_caption_overlay(
            "one two three four five six seven eight nine ten eleven twelve",
            1000,
            1000,
            &opts,
            "#000000",
        )
        .unwrap();
        let count = svg.matches("<text").count();
        assert!(count >= 2, "expected a wrapped block, got {count} line(s)");

        let ys: Vec<f64> = svg
            .lines()
            .filter(|l| l.trim_start().starts_with("<text"))
            .map(|l| {
                let s = l.split("y=\"").nth(1).unwrap();
                s[..s.find('"').unwrap()].parse().unwrap()
            })
            .collect();
        for pair in ys.windows(2) {
            assert!((pair[1] - pair[0] - 26.0).abs() < 0.11); // 20 * 1.3
        }
        // Block is centered on y: first baseline = 500 - block/2 + 20.
        let block = count as f64 * 26.0;
        assert!((ys[0] - (500.0 - block / 2.0 + 20.0)).abs() < 0.11);
    }

    #[test]
    fn empty_or_invalid_input_is_rejected() {
        let opts = OverlayOptions::default();
        assert!(render_caption_overlay("", 800, 1000, &opts, "#fff").is_err());
        assert!(render_caption_overlay("  \t ", 800, 1000, &opts, "#fff").is_err());
        assert!(render_caption_overlay("hi", 0, 1000, &opts, "#fff").is_err());

        let bad = OverlayOptions {
            font_size: -3.0,
            ..OverlayOptions::default()
        };
        assert!(render_caption_overlay("hi", 800, 1000, &bad, "#fff").is_err());
    }

    #[test]
    fn tiny_box_still_produces_output() {
        let opts = OverlayOptions {
            width: 20.0,
            font_size: 500.0,
            ..OverlayOptions::default()
        };
        // max_chars floors to 1; every word lands on its own line.
        let svg = render_caption_overlay("a b c", 100, 100, &opts, "#ffffff").unwrap();
        assert_eq!(svg.matches("<text").count(), 3);
    }
}
