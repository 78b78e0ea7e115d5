//! Display page
//!
//! The first frame is rendered on the server; a small script then listens on
//! the SSE stream and re-renders from `/api/v1/player/status` whenever the
//! player changes.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use totem_common::{MediaKind, PlayerState, PlayerView};

use super::AppState;

/// GET /
pub async fn display_page(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.engine.view().await;
    Html(render_page(&view))
}

/// Markup for one frame of the display
///
/// Each non-playing state gets its own placeholder class so "broken" and
/// "nothing assigned" never look alike.
pub fn render_frame(view: &PlayerView) -> String {
    match (view.state, &view.current_item) {
        (PlayerState::Playing, Some(item)) => {
            let src = escape_html(&item.source_url);
            let alt = escape_html(item.name.as_deref().unwrap_or(""));
            match item.kind {
                MediaKind::Image => {
                    format!(r#"<img class="media" src="{}" alt="{}">"#, src, alt)
                }
                MediaKind::Video => format!(
                    r#"<video class="media" src="{}" autoplay muted loop playsinline></video>"#,
                    src
                ),
            }
        }
        (PlayerState::Loading, _) => placeholder("loading", "Loading playlist..."),
        (PlayerState::Failed, _) => {
            let reason = view.reason.as_deref().unwrap_or("unknown error");
            placeholder("failed", &format!("Error: {}", reason))
        }
        (PlayerState::Idle, _) => placeholder("idle", "Player stopped"),
        (PlayerState::Empty, _) | (PlayerState::Playing, None) => {
            placeholder("empty", "No content assigned")
        }
    }
}

fn placeholder(class: &str, text: &str) -> String {
    format!(
        r#"<div class="placeholder {}">{}</div>"#,
        class,
        escape_html(text)
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

fn render_page(view: &PlayerView) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>totem-player</title>
    <style>
        html, body {{
            margin: 0;
            height: 100%;
            background: #000;
            overflow: hidden;
        }}
        #frame {{
            width: 100vw;
            height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
        }}
        .media {{
            max-width: 100%;
            max-height: 100%;
            object-fit: contain;
        }}
        .placeholder {{
            font-family: system-ui, -apple-system, sans-serif;
            font-size: 2.5vw;
            padding: 2vw 4vw;
            border-radius: 8px;
        }}
        .placeholder.loading {{ color: #ccc; }}
        .placeholder.idle {{ color: #888; }}
        .placeholder.empty {{ color: #fff; border: 2px dashed #666; }}
        .placeholder.failed {{ color: #fff; background: #a31515; }}
    </style>
</head>
<body>
    <div id="frame">{frame}</div>
    <script>
        const frame = document.getElementById('frame');

        function escapeHtml(text) {{
            const div = document.createElement('div');
            div.textContent = text;
            return div.innerHTML;
        }}

        function placeholder(cls, text) {{
            return '<div class="placeholder ' + cls + '">' + escapeHtml(text) + '</div>';
        }}

        function render(view) {{
            const item = view.current_item;
            if (view.state === 'playing' && item) {{
                const src = escapeHtml(item.source_url).replace(/"/g, '&quot;');
                if (item.kind === 'video') {{
                    return '<video class="media" src="' + src + '" autoplay muted loop playsinline></video>';
                }}
                const alt = escapeHtml(item.name || '').replace(/"/g, '&quot;');
                return '<img class="media" src="' + src + '" alt="' + alt + '">';
            }}
            switch (view.state) {{
                case 'loading': return placeholder('loading', 'Loading playlist...');
                case 'failed': return placeholder('failed', 'Error: ' + (view.reason || 'unknown error'));
                case 'idle': return placeholder('idle', 'Player stopped');
                default: return placeholder('empty', 'No content assigned');
            }}
        }}

        let shown = frame.innerHTML;
        async function refresh() {{
            try {{
                const response = await fetch('/api/v1/player/status');
                if (!response.ok) return;
                const html = render(await response.json());
                if (html !== shown) {{
                    frame.innerHTML = html;
                    shown = frame.innerHTML;
                }}
            }} catch (err) {{
                console.warn('Status refresh failed', err);
            }}
        }}

        const events = new EventSource('/api/v1/events');
        ['StateChanged', 'SnapshotLoaded', 'ItemChanged'].forEach(name =>
            events.addEventListener(name, refresh));
        events.onopen = refresh;
    </script>
</body>
</html>
"#,
        frame = render_frame(view)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use totem_common::MediaItem;

    fn view(state: PlayerState) -> PlayerView {
        PlayerView {
            state,
            ..PlayerView::idle()
        }
    }

    #[test]
    fn test_placeholders_are_distinct() {
        let loading = render_frame(&view(PlayerState::Loading));
        let empty = render_frame(&view(PlayerState::Empty));
        let idle = render_frame(&view(PlayerState::Idle));
        let failed = render_frame(&PlayerView {
            reason: Some("device not found: lobby".to_string()),
            ..view(PlayerState::Failed)
        });

        assert!(loading.contains("Loading playlist..."));
        assert!(empty.contains("No content assigned"));
        assert!(idle.contains("Player stopped"));
        assert!(failed.contains("Error: device not found: lobby"));
        assert!(failed.contains("placeholder failed"));
        assert!(empty.contains("placeholder empty"));
    }

    #[test]
    fn test_playing_renders_media() {
        let image = PlayerView {
            current_item: Some(MediaItem::new(MediaKind::Image, "http://cdn/a.png", 5.0)),
            item_count: 1,
            ..view(PlayerState::Playing)
        };
        assert_eq!(
            render_frame(&image),
            r#"<img class="media" src="http://cdn/a.png" alt="">"#
        );

        let video = PlayerView {
            current_item: Some(MediaItem::new(MediaKind::Video, "http://cdn/b.mp4", 5.0)),
            ..image
        };
        assert!(render_frame(&video).starts_with(r#"<video class="media" src="http://cdn/b.mp4""#));
    }

    #[test]
    fn test_image_alt_uses_item_name() {
        let mut item = MediaItem::new(MediaKind::Image, "http://cdn/a.png", 5.0);
        item.name = Some("Spring \"Sale\" & more".to_string());
        let view = PlayerView {
            current_item: Some(item),
            item_count: 1,
            ..view(PlayerState::Playing)
        };
        assert_eq!(
            render_frame(&view),
            r#"<img class="media" src="http://cdn/a.png" alt="Spring &quot;Sale&quot; &amp; more">"#
        );
    }

    #[test]
    fn test_reason_is_escaped() {
        let failed = PlayerView {
            reason: Some("<script>alert(1)</script>".to_string()),
            ..view(PlayerState::Failed)
        };
        let html = render_frame(&failed);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_page_embeds_frame() {
        let page = render_page(&view(PlayerState::Empty));
        assert!(page.contains(r#"<div id="frame"><div class="placeholder empty">"#));
        assert!(page.contains("/api/v1/events"));
    }
}
