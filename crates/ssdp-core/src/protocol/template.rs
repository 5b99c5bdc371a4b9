//! Message templates and the renderer that fills them in.
//!
//! Every outbound SSDP message is rendered from a named template: a handful of
//! HTTP-style header lines containing `${NAME}` placeholder tokens, e.g.
//!
//! ```text
//! NOTIFY * HTTP/1.1
//! HOST: 239.255.255.250:1900
//! NT: ${NT}
//! NTS: ssdp:byebye
//! USN: ${USN}
//! ```
//!
//! The three built-in templates (`notify-available`, `notify-unavailable`,
//! `notify-response`) are compiled into the binary.  A template directory can
//! override them: a file with the template's name in that directory wins over
//! the built-in text.
//!
//! # Caching
//!
//! A template is read and parsed the first time it is requested and then kept
//! for the life of the [`TemplateRenderer`].  Parsed templates are immutable,
//! so the cache can be shared by concurrent callers; the lock is only held
//! for the map lookup or insert, never while rendering.
//!
//! # Framing
//!
//! After substitution every line is terminated with CRLF and one extra CRLF
//! closes the header block, regardless of the line endings used in the
//! template file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::debug;

use crate::protocol::environment::MessageEnvironment;

const PLACEHOLDER_OPEN: &str = "${";
const PLACEHOLDER_CLOSE: char = '}';

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "notify-available",
        include_str!("../../templates/notify-available"),
    ),
    (
        "notify-unavailable",
        include_str!("../../templates/notify-unavailable"),
    ),
    (
        "notify-response",
        include_str!("../../templates/notify-response"),
    ),
];

/// Errors produced while loading or rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template exists under the requested name.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// The template references a placeholder the environment does not define.
    #[error("template {template} references undefined placeholder {placeholder}")]
    MissingPlaceholder {
        template: String,
        placeholder: String,
    },

    /// A substituted value contains a line break, which would end its
    /// header line early.
    #[error("template {template}: value for {placeholder} contains a line break")]
    LineBreakInValue {
        template: String,
        placeholder: String,
    },

    /// A `${` token is not closed on the same line.
    #[error("template {template} has an unterminated placeholder at byte {offset}")]
    Malformed { template: String, offset: usize },

    /// The template file exists but could not be read.
    #[error("I/O error reading template at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where template text comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateSource {
    /// Only the templates compiled into the binary.
    #[default]
    Builtin,
    /// Files in this directory, falling back to the built-in templates.
    Directory(PathBuf),
}

impl TemplateSource {
    fn load(&self, name: &str) -> Result<String, TemplateError> {
        if !is_valid_name(name) {
            return Err(TemplateError::UnknownTemplate(name.to_string()));
        }
        if let TemplateSource::Directory(dir) = self {
            if let Some(text) = read_template_file(dir, name)? {
                return Ok(text);
            }
        }
        builtin_template(name)
            .map(str::to_string)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
    }
}

/// Template names are bare file names: no separators, no leading dot.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\'])
}

fn builtin_template(name: &str) -> Option<&'static str> {
    BUILTIN_TEMPLATES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, text)| *text)
}

/// Reads `<dir>/<name>`; `Ok(None)` when the file does not exist.
fn read_template_file(dir: &Path, name: &str) -> Result<Option<String>, TemplateError> {
    let path = dir.join(name);
    match std::fs::read_to_string(&path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(TemplateError::Io { path, source }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Splits `text` into literal runs and `${NAME}` placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Malformed`] if a `${` is not closed before the
    /// end of its line.
    pub fn parse(name: &str, text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = text;
        let mut offset = 0;

        while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after_open = &rest[start + PLACEHOLDER_OPEN.len()..];
            let line_end = after_open.find(['\r', '\n']).unwrap_or(after_open.len());
            let close = after_open[..line_end]
                .find(PLACEHOLDER_CLOSE)
                .ok_or_else(|| TemplateError::Malformed {
                    template: name.to_string(),
                    offset: offset + start,
                })?;
            segments.push(Segment::Placeholder(after_open[..close].trim().to_string()));

            let consumed = start + PLACEHOLDER_OPEN.len() + close + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            segments,
        })
    }

    /// Names of every placeholder referenced, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(p) => Some(p.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitutes `env` into the template and frames the result.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingPlaceholder`] for the first placeholder
    /// `env` does not define, and [`TemplateError::LineBreakInValue`] for a
    /// value containing CR or LF.
    pub fn render(&self, env: &MessageEnvironment) -> Result<Vec<u8>, TemplateError> {
        let mut filled = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => filled.push_str(text),
                Segment::Placeholder(placeholder) => {
                    let value =
                        env.get(placeholder)
                            .ok_or_else(|| TemplateError::MissingPlaceholder {
                                template: self.name.clone(),
                                placeholder: placeholder.clone(),
                            })?;
                    if value.contains(['\r', '\n']) {
                        return Err(TemplateError::LineBreakInValue {
                            template: self.name.clone(),
                            placeholder: placeholder.clone(),
                        });
                    }
                    filled.push_str(value);
                }
            }
        }

        let mut framed = String::with_capacity(filled.len() + 16);
        for line in filled.lines() {
            framed.push_str(line);
            framed.push_str("\r\n");
        }
        framed.push_str("\r\n");
        Ok(framed.into_bytes())
    }
}

/// Renders named templates, loading each one at most once.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    source: TemplateSource,
    cache: RwLock<HashMap<String, Arc<Template>>>,
}

impl TemplateRenderer {
    pub fn new(source: TemplateSource) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// A renderer over the built-in templates only.
    pub fn builtin() -> Self {
        Self::new(TemplateSource::Builtin)
    }

    /// Renders template `name` with `env`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnknownTemplate`] if `name` does not exist,
    /// [`TemplateError::MissingPlaceholder`] if `env` lacks a referenced
    /// value, and [`TemplateError::Malformed`] / [`TemplateError::Io`] for a
    /// broken template file.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ssdp_core::protocol::environment::{fields, MessageEnvironment};
    /// use ssdp_core::protocol::template::TemplateRenderer;
    ///
    /// let renderer = TemplateRenderer::builtin();
    /// let env = MessageEnvironment::new()
    ///     .with(fields::NT, "upnp:rootdevice")
    ///     .with(fields::USN, "uuid:1234::upnp:rootdevice")
    ///     .with(fields::BOOTID, 1)
    ///     .with(fields::CONFIGID, 1);
    ///
    /// let bytes = renderer.render("notify-unavailable", &env).unwrap();
    /// assert!(bytes.starts_with(b"NOTIFY * HTTP/1.1\r\n"));
    /// assert!(bytes.ends_with(b"\r\n\r\n"));
    /// ```
    pub fn render(&self, name: &str, env: &MessageEnvironment) -> Result<Vec<u8>, TemplateError> {
        self.template(name)?.render(env)
    }

    /// Returns the cached template, loading and parsing it on first use.
    pub fn template(&self, name: &str) -> Result<Arc<Template>, TemplateError> {
        if let Some(template) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(template));
        }

        let text = self.source.load(name)?;
        let parsed = Arc::new(Template::parse(name, &text)?);
        debug!("loaded template {name}");

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(name.to_string()).or_insert(parsed)))
    }

    #[cfg(test)]
    fn cached_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::environment::fields;

    fn full_env() -> MessageEnvironment {
        MessageEnvironment::new()
            .with(fields::NT, "upnp:rootdevice")
            .with(fields::USN, "uuid:abcd::upnp:rootdevice")
            .with(fields::CACHE_CONTROL, 1800)
            .with(fields::CONFIGID, 3)
            .with(fields::DATE, "Sun, 06 Mar 2011 09:05:07 GMT")
            .with(fields::LOCATION, "http://10.0.0.2:8080/abcd/description.xml")
            .with(fields::BOOTID, 1_299_402_307u64)
            .with(fields::SERVER, "Linux/6.1 UPnP/1.1 test/1.0")
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_collects_placeholders_in_order() {
        // Arrange / Act
        let template = Template::parse("t", "NT: ${NT}\nUSN: ${USN}\n").unwrap();

        // Assert
        let names: Vec<&str> = template.placeholders().collect();
        assert_eq!(names, vec!["NT", "USN"]);
    }

    #[test]
    fn test_parse_rejects_unterminated_placeholder() {
        let result = Template::parse("broken", "NT: ${NT\nUSN: ${USN}\n");
        assert!(matches!(
            result,
            Err(TemplateError::Malformed { offset: 4, .. })
        ));
    }

    #[test]
    fn test_parse_allows_literal_dollar_signs() {
        let template = Template::parse("t", "X-COST: $5\n").unwrap();
        assert_eq!(template.placeholders().count(), 0);
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    #[test]
    fn test_render_terminates_every_line_with_crlf() {
        // Arrange
        let template = Template::parse("t", "A: ${NT}\nB: x\n").unwrap();

        // Act
        let bytes = template.render(&full_env()).unwrap();

        // Assert
        assert_eq!(bytes, b"A: upnp:rootdevice\r\nB: x\r\n\r\n".to_vec());
    }

    #[test]
    fn test_render_normalises_crlf_template_files() {
        let template = Template::parse("t", "A: 1\r\nB: 2\r\n").unwrap();
        let bytes = template.render(&MessageEnvironment::new()).unwrap();
        assert_eq!(bytes, b"A: 1\r\nB: 2\r\n\r\n".to_vec());
    }

    #[test]
    fn test_render_reports_missing_placeholder() {
        // Arrange
        let template = Template::parse("t", "NT: ${NT}\nUSN: ${USN}\n").unwrap();
        let env = MessageEnvironment::new().with(fields::NT, "x");

        // Act
        let result = template.render(&env);

        // Assert
        match result {
            Err(TemplateError::MissingPlaceholder {
                template,
                placeholder,
            }) => {
                assert_eq!(template, "t");
                assert_eq!(placeholder, "USN");
            }
            other => panic!("expected MissingPlaceholder, got {other:?}"),
        }
    }

    #[test]
    fn test_render_rejects_line_break_in_value() {
        // Arrange: a device type carrying an extra header
        let env = full_env().with(fields::NT, "urn:schemas-upnp-org:device:X:1\r\nEVIL: 1");

        // Act
        let result = TemplateRenderer::builtin().render("notify-unavailable", &env);

        // Assert
        match result {
            Err(TemplateError::LineBreakInValue {
                template,
                placeholder,
            }) => {
                assert_eq!(template, "notify-unavailable");
                assert_eq!(placeholder, "NT");
            }
            other => panic!("expected LineBreakInValue, got {other:?}"),
        }
    }

    #[test]
    fn test_render_rejects_bare_newline_in_value() {
        let template = Template::parse("t", "USN: ${USN}\n").unwrap();
        let env = MessageEnvironment::new().with(fields::USN, "uuid:abcd\nEVIL: 1");

        assert!(matches!(
            template.render(&env),
            Err(TemplateError::LineBreakInValue { .. })
        ));
    }

    #[test]
    fn test_render_is_deterministic_for_identical_input() {
        // Arrange
        let renderer = TemplateRenderer::builtin();
        let env = full_env();

        // Act
        let first = renderer.render("notify-available", &env).unwrap();
        let second = renderer.render("notify-available", &env.clone()).unwrap();

        // Assert
        assert_eq!(first, second);
    }

    // ── Built-in templates ────────────────────────────────────────────────────

    #[test]
    fn test_builtin_available_contains_alive_headers() {
        let renderer = TemplateRenderer::builtin();
        let text =
            String::from_utf8(renderer.render("notify-available", &full_env()).unwrap()).unwrap();

        assert!(text.starts_with("NOTIFY * HTTP/1.1\r\n"));
        assert!(text.contains("HOST: 239.255.255.250:1900\r\n"));
        assert!(text.contains("CACHE-CONTROL: max-age=1800\r\n"));
        assert!(text.contains("LOCATION: http://10.0.0.2:8080/abcd/description.xml\r\n"));
        assert!(text.contains("NTS: ssdp:alive\r\n"));
        assert!(text.contains("BOOTID.UPNP.ORG: 1299402307\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_builtin_unavailable_needs_no_cache_control_or_location() {
        // Arrange: only the byebye fields
        let env = MessageEnvironment::new()
            .with(fields::NT, "upnp:rootdevice")
            .with(fields::USN, "uuid:abcd::upnp:rootdevice")
            .with(fields::BOOTID, 1)
            .with(fields::CONFIGID, 1);

        // Act
        let text = String::from_utf8(
            TemplateRenderer::builtin()
                .render("notify-unavailable", &env)
                .unwrap(),
        )
        .unwrap();

        // Assert
        assert!(text.contains("NTS: ssdp:byebye\r\n"));
        assert!(!text.contains("LOCATION"));
        assert!(!text.contains("CACHE-CONTROL"));
    }

    #[test]
    fn test_builtin_response_is_http_ok_with_date_and_st() {
        let text = String::from_utf8(
            TemplateRenderer::builtin()
                .render("notify-response", &full_env())
                .unwrap(),
        )
        .unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("DATE: Sun, 06 Mar 2011 09:05:07 GMT\r\n"));
        assert!(text.contains("ST: upnp:rootdevice\r\n"));
        assert!(text.contains("EXT:\r\n"));
    }

    #[test]
    fn test_render_unknown_template_fails() {
        let result = TemplateRenderer::builtin().render("notify-sideways", &full_env());
        assert!(matches!(result, Err(TemplateError::UnknownTemplate(n)) if n == "notify-sideways"));
    }

    #[test]
    fn test_render_rejects_path_like_names() {
        let result = TemplateRenderer::builtin().render("../notify-available", &full_env());
        assert!(matches!(result, Err(TemplateError::UnknownTemplate(_))));
    }

    // ── Cache ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_template_is_loaded_once_and_reused() {
        // Arrange
        let renderer = TemplateRenderer::builtin();

        // Act
        let a = renderer.template("notify-response").unwrap();
        let b = renderer.template("notify-response").unwrap();

        // Assert
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(renderer.cached_count(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let renderer = TemplateRenderer::builtin();
        let _ = renderer.template("missing");
        assert_eq!(renderer.cached_count(), 0);
    }

    // ── Template directory ────────────────────────────────────────────────────

    #[test]
    fn test_directory_template_overrides_builtin() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notify-unavailable"), "BYE ${USN}\n").unwrap();
        let renderer = TemplateRenderer::new(TemplateSource::Directory(dir.path().to_path_buf()));

        // Act
        let bytes = renderer.render("notify-unavailable", &full_env()).unwrap();

        // Assert
        assert_eq!(bytes, b"BYE uuid:abcd::upnp:rootdevice\r\n\r\n".to_vec());
    }

    #[test]
    fn test_directory_falls_back_to_builtin_when_file_absent() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let renderer = TemplateRenderer::new(TemplateSource::Directory(dir.path().to_path_buf()));

        // Act
        let bytes = renderer.render("notify-response", &full_env()).unwrap();

        // Assert
        assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn test_directory_template_may_define_new_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notify-custom"), "X: ${NT}\n").unwrap();
        let renderer = TemplateRenderer::new(TemplateSource::Directory(dir.path().to_path_buf()));

        let bytes = renderer.render("notify-custom", &full_env()).unwrap();

        assert_eq!(bytes, b"X: upnp:rootdevice\r\n\r\n".to_vec());
    }
}
