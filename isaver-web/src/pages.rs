//! Server-rendered pages for the download UI.
//!
//! One form, rendered in three flavors: empty, with resolution choices after
//! a probe, and with an error panel when a stage failed. Failed requests
//! keep the submitted URL and any known metadata so the user can retry a
//! different resolution without re-entering anything.

use axum::response::Html;

/// Everything the form page needs to re-render itself.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub url: String,
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
    pub resolutions: Vec<u32>,
}

/// Escapes user-influenced text for HTML text and attribute positions.
fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Wraps page content in the base document.
fn render_page(content: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Isaver</title>
</head>
<body class="bg-gray-900 text-gray-100">
    <main class="max-w-2xl mx-auto py-12 px-4">
        <h1 class="text-3xl font-bold mb-8">Isaver</h1>
        {content}
    </main>
</body>
</html>"#
    ))
}

fn preview_section(state: &FormState) -> String {
    let Some(title) = &state.title else {
        return String::new();
    };

    let thumbnail = state
        .thumbnail_url
        .as_deref()
        .map(|url| {
            format!(
                r#"<img src="{}" alt="Video thumbnail" class="rounded mb-4 max-w-full">"#,
                escape(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div class="mb-6">
            {thumbnail}
            <h2 class="text-xl font-semibold">{}</h2>
        </div>"#,
        escape(title)
    )
}

fn resolution_select(resolutions: &[u32]) -> String {
    if resolutions.is_empty() {
        return r#"<p class="text-gray-400">No downloadable video streams found for this source.</p>"#.to_string();
    }

    let options: String = resolutions
        .iter()
        .map(|height| format!(r#"<option value="{height}p">{height}p</option>"#))
        .collect();

    format!(
        r#"<label class="block mb-2" for="resolution">Resolution</label>
        <select name="resolution" id="resolution" class="rounded bg-gray-800 p-2 mb-4">{options}</select>
        <button type="submit" class="bg-blue-600 rounded px-4 py-2">Download</button>"#
    )
}

/// The URL form, optionally extended with preview and resolution choices.
pub fn form_page(state: &FormState, error: Option<&str>) -> Html<String> {
    let error_panel = error
        .map(|message| {
            format!(
                r#"<div class="bg-red-900 border border-red-600 rounded p-4 mb-6">{}</div>"#,
                escape(message)
            )
        })
        .unwrap_or_default();

    let choice_section = if state.title.is_some() {
        format!(
            r#"{}
            <form method="post" action="/">
                <input type="hidden" name="url" value="{}">
                {}
            </form>"#,
            preview_section(state),
            escape(&state.url),
            resolution_select(&state.resolutions)
        )
    } else {
        String::new()
    };

    let content = format!(
        r#"{error_panel}
        <form method="post" action="/" class="mb-8">
            <label class="block mb-2" for="url">Video URL</label>
            <input type="url" name="url" id="url" value="{}" required
                   class="w-full rounded bg-gray-800 p-2 mb-4" placeholder="https://...">
            <button type="submit" class="bg-blue-600 rounded px-4 py-2">Look up</button>
        </form>
        {choice_section}"#,
        escape(&state.url)
    );

    render_page(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape(r#"<script>"x"&'y'</script>"#),
            "&lt;script&gt;&quot;x&quot;&amp;&#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn error_page_preserves_form_state() {
        let state = FormState {
            url: "https://example.com/watch?v=abc".to_string(),
            title: Some("A Video".to_string()),
            thumbnail_url: Some("https://example.com/t.jpg".to_string()),
            resolutions: vec![1080, 720],
        };

        let Html(page) = form_page(&state, Some("1080p is not available"));
        assert!(page.contains("1080p is not available"));
        assert!(page.contains("https://example.com/watch?v=abc"));
        assert!(page.contains("A Video"));
        assert!(page.contains(r#"<option value="720p">720p</option>"#));
    }

    #[test]
    fn empty_state_renders_only_the_url_form() {
        let Html(page) = form_page(&FormState::default(), None);
        assert!(page.contains(r#"name="url""#));
        assert!(!page.contains(r#"name="resolution""#));
    }
}
