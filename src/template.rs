// src/template.rs

//! Variable substitution for distro template files
//!
//! Templates use `%(name)s` placeholders. The context is assembled once
//! from the derived launch parameters, the tool configuration and any
//! `--define` overrides, then passed by value into the rendering calls so
//! there is no hidden shared templating state between extraction steps.

use std::collections::BTreeMap;

/// Immutable set of template variables for one invocation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    vars: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, replacing any previous value for the same name
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Look up a variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Substitute every `%(name)s` placeholder with its value
    ///
    /// Unknown placeholders are left in place so a half-rendered template
    /// is visible in the build context rather than silently truncated.
    pub fn render(&self, template: &str) -> String {
        let mut result = template.to_string();
        for (name, value) in &self.vars {
            result = result.replace(&format!("%({name})s"), value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_variables() {
        let mut ctx = TemplateContext::new();
        ctx.set("binary", "/usr/bin/python3");
        ctx.set("app_user", "root");

        let rendered = ctx.render("ENTRYPOINT %(binary)s\nUSER %(app_user)s\n");
        assert_eq!(rendered, "ENTRYPOINT /usr/bin/python3\nUSER root\n");
    }

    #[test]
    fn test_render_repeated_placeholder() {
        let mut ctx = TemplateContext::new();
        ctx.set("name", "app");
        assert_eq!(ctx.render("%(name)s-%(name)s"), "app-app");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let ctx = TemplateContext::new();
        assert_eq!(ctx.render("%(unknown)s"), "%(unknown)s");
    }

    #[test]
    fn test_set_overwrites() {
        let mut ctx = TemplateContext::new();
        ctx.set("distro", "ubuntu:22.04");
        ctx.set("distro", "debian:12");
        assert_eq!(ctx.get("distro"), Some("debian:12"));
    }
}
