const INDEX_TEMPLATE: &str = include_str!("index.html");
const BOARD_STREAM_TOKEN: &str = "{{board_stream_url}}";
const INITIAL_SCRIPT_TOKEN: &str = "{{initial_script}}";
const CACHE_BUST_TOKEN: &str = "{{cache_bust}}";

pub fn render_index(
    board_stream_url: &str,
    cache_bust: &str,
    initial_frame: Option<&str>,
) -> String {
    let initial_script = initial_frame
        .map(|frame| {
            format!(
                r#"    <script id="initial-frame" type="application/json">{}</script>"#,
                frame
            )
        })
        .unwrap_or_default();

    INDEX_TEMPLATE
        .replace(BOARD_STREAM_TOKEN, board_stream_url)
        .replace(CACHE_BUST_TOKEN, cache_bust)
        .replace(INITIAL_SCRIPT_TOKEN, &initial_script)
}
