//! `DEBUG`-namespace gating (`spec.md` §6.3), layered on top of the `log` facade.
//!
//! `DEBUG=smol:*` enables every `smol:`-prefixed namespace, `DEBUG=-smol:vfs`
//! disables just that one namespace while leaving others on, and `DEBUG=1` or
//! `DEBUG=true` enables everything regardless of namespace.

use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
enum Pattern {
    All,
    Enable(String),
    Disable(String),
}

fn patterns() -> &'static Vec<Pattern> {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| match env::var("DEBUG") {
        Ok(raw) => parse(&raw),
        Err(_) => Vec::new(),
    })
}

fn parse(raw: &str) -> Vec<Pattern> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("1") || trimmed.eq_ignore_ascii_case("true") {
        return vec![Pattern::All];
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if let Some(rest) = s.strip_prefix('-') {
                Pattern::Disable(rest.to_string())
            } else {
                Pattern::Enable(s.to_string())
            }
        })
        .collect()
}

fn matches(pattern: &str, namespace: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => namespace.starts_with(prefix),
        None => pattern == namespace,
    }
}

/// Whether verbose diagnostics for `namespace` (e.g. `"smol:macho"`) are enabled.
pub fn debug_enabled(namespace: &str) -> bool {
    let mut enabled = false;
    for pattern in patterns() {
        match pattern {
            Pattern::All => enabled = true,
            Pattern::Enable(p) if matches(p, namespace) => enabled = true,
            Pattern::Disable(p) if matches(p, namespace) => enabled = false,
            _ => {}
        }
    }
    enabled
}
