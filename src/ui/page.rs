//! Embedded meter page

use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "static/"]
struct Assets;

const INDEX: &str = "index.html";

/// Render the meter page with the footer credits filled in
pub fn render_index(author: &str, credit: &str) -> crate::Result<String> {
    let file = Assets::get(INDEX)
        .ok_or_else(|| crate::Error::Config(format!("embedded asset {} missing", INDEX)))?;
    let template = std::str::from_utf8(&file.data)
        .map_err(|e| crate::Error::Config(format!("{} is not UTF-8: {}", INDEX, e)))?;

    Ok(template
        .replace("{{AUTHOR}}", &escape_html(author))
        .replace("{{CREDIT}}", &escape_html(credit)))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_credits() {
        let page = render_index("Edson Pereira, PY2SDR", "Code Assistant: Gemini").unwrap();
        assert!(page.contains("Edson Pereira, PY2SDR"));
        assert!(page.contains("Code Assistant: Gemini"));
        assert!(page.contains("new EventSource('/events')"));
        assert!(!page.contains("{{AUTHOR}}"));
    }

    #[test]
    fn test_credits_are_escaped() {
        let page = render_index("<b>me</b>", "A & B").unwrap();
        assert!(page.contains("&lt;b&gt;me&lt;/b&gt;"));
        assert!(page.contains("A &amp; B"));
    }
}
