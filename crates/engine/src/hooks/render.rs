//! Nushell source rendering
//!
//! All shell syntax hooksmith emits lives here: string quoting, the
//! load directives written to primary artifacts, `onLoad` wrappers and
//! error stubs.

use super::spec::LoadStrategy;
use std::path::Path;

/// Quote a string as a Nushell double-quoted literal
#[must_use]
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Primary artifact content for a module-based hook
///
/// Returns `None` for inline hooks, whose primary artifact is the output itself.
/// Lazy modules get an empty primary artifact; users `use` the module file
/// when they need it.
#[must_use]
pub fn directive(name: &str, strategy: LoadStrategy, module_path: &Path) -> Option<String> {
    let path = quote(&module_path.to_string_lossy());
    match strategy {
        LoadStrategy::Inline => None,
        LoadStrategy::Module => Some(format!("use {path} *\n")),
        LoadStrategy::Lazy => Some(String::new()),
        LoadStrategy::Overlay => Some(format!(
            "alias {name}-load = overlay use {path} as {name}\n\
             alias {name}-unload = overlay hide {name}\n"
        )),
    }
}

/// Append an `onLoad` closure so it runs when the artifact is loaded
#[must_use]
pub fn with_on_load(mut text: String, closure: &str) -> String {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str("export-env { do --env ");
    text.push_str(closure.trim());
    text.push_str(" }\n");
    text
}

/// Artifact content that raises a visible error when the shell loads it
#[must_use]
pub fn error_stub(name: &str, error: &str) -> String {
    let msg = format!(
        "hooksmith: hook '{name}' failed to generate: {error}. \
         Fix the cause, then run `hooksmith regenerate {name}`"
    );
    format!("error make --unspanned {{ msg: {} }}\n", quote(&msg))
}
