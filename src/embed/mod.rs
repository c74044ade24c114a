//! Embedded static resources.
//!
//! The live-reload client is minified by `build.rs` and its WebSocket port is
//! filled in at serve time through [`TemplateVars`].
//!
//! ```ignore
//! use embed::serve::{LIVERELOAD_JS, LivereloadVars};
//!
//! let js = LIVERELOAD_JS.render(&LivereloadVars { ws_port: 35729 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// URL path the dev server answers with the live-reload client.
    pub const LIVERELOAD_PATH: &str = "/__assetflow/livereload.js";

    /// Variables for livereload.js.
    pub struct LivereloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for LivereloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__ASSETFLOW_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Live-reload client with WebSocket port injection.
    pub const LIVERELOAD_JS: Template<LivereloadVars> =
        Template::new(include_str!(concat!(env!("OUT_DIR"), "/livereload.min.js")));

    /// `<script>` tag inserted into served HTML pages.
    pub fn script_tag() -> String {
        format!(r#"<script src="{LIVERELOAD_PATH}"></script>"#)
    }
}
