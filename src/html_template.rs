use anyhow::{Context, Result};
use rust_embed::RustEmbed;

use crate::context::PageBootstrap;

#[derive(RustEmbed)]
#[folder = "frontend/"]
struct Asset;

pub fn asset(name: &str) -> Option<Vec<u8>> {
    Asset::get(name).map(|file| file.data.into_owned())
}

fn asset_text(name: &str) -> Result<String> {
    let bytes = asset(name).with_context(|| format!("Missing embedded asset {name}"))?;
    String::from_utf8(bytes).with_context(|| format!("Embedded asset {name} is not UTF-8"))
}

pub enum PageMode {
    /// Assets and data come from the local server.
    Served,
    /// Everything inlined into one file.
    Standalone(Box<PageBootstrap>),
}

pub fn render_page(mode: &PageMode) -> Result<String> {
    let (styles, scripts) = match mode {
        PageMode::Served => (
            r#"<link rel="stylesheet" href="/style.css" />"#.to_string(),
            r#"<script src="/script.js"></script>"#.to_string(),
        ),
        PageMode::Standalone(bootstrap) => {
            let data = serde_json::to_string(bootstrap).context("Failed to serialize map data")?;
            (
                format!("<style>\n{}\n</style>", asset_text("style.css")?),
                format!(
                    "<script>window.QUAKEMAP_BOOTSTRAP = {};</script>\n<script>\n{}\n</script>",
                    escape_script(&data),
                    asset_text("script.js")?
                ),
            )
        }
    };

    Ok(MAP_HTML
        .replace("<!-- STYLES_PLACEHOLDER -->", &styles)
        .replace("<!-- SCRIPTS_PLACEHOLDER -->", &scripts))
}

// Keeps popup markup inside JSON strings from closing the script tag
fn escape_script(json: &str) -> String {
    json.replace("</", "<\\/").replace("<!--", "<\\!--")
}

// HTML template for the map page
const MAP_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>QuakeMap - Earthquakes of the Past Week</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <!-- STYLES_PLACEHOLDER -->
</head>
<body>
    <div id="map"></div>
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <!-- SCRIPTS_PLACEHOLDER -->
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppContext;
    use crate::settings::Settings;

    #[test]
    fn served_page_links_local_assets() {
        let html = render_page(&PageMode::Served).unwrap();
        assert!(html.contains(r#"<div id="map"></div>"#));
        assert!(html.contains(r#"href="/style.css""#));
        assert!(html.contains(r#"src="/script.js""#));
        assert!(!html.contains("PLACEHOLDER"));
    }

    #[tokio::test]
    async fn standalone_page_inlines_everything() {
        let ctx = AppContext::from_settings(&Settings::default()).unwrap();
        let bootstrap = ctx.bootstrap().await;
        let html = render_page(&PageMode::Standalone(Box::new(bootstrap))).unwrap();

        assert!(html.contains("window.QUAKEMAP_BOOTSTRAP = {"));
        assert!(html.contains("\"active_basemap\":\"Default\""));
        assert!(!html.contains(r#"src="/script.js""#));
        // legend markup is inlined without terminating the script element
        assert!(html.contains("90+<\\/i>"));
    }

    #[test]
    fn embedded_assets_are_present() {
        assert!(asset("script.js").is_some());
        assert!(asset("style.css").is_some());
        assert!(asset("missing.js").is_none());
    }
}
