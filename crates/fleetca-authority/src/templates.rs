//! SSH configuration templates
//!
//! Clients bootstrap their ssh config from the authority: the server
//! holds one template set per certificate type and renders each template
//! against the opaque data map supplied in the request. Rendering here is
//! placeholder substitution only; anything richer belongs to the tooling
//! that authored the templates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Where a rendered output is meant to land on the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// A standalone file, written as-is
    File,
    /// A snippet appended to an existing config file
    Snippet,
}

/// A configured template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshTemplate {
    /// Template name, echoed in the output
    pub name: String,
    /// Output kind
    pub kind: TemplateKind,
    /// Path the client should write the output to
    pub path: String,
    /// Comment prefix for the target file format
    #[serde(default)]
    pub comment: String,
    /// Template body with `{{key}}` placeholders
    pub content: String,
}

impl SshTemplate {
    /// Render the template against a data map.
    ///
    /// Placeholders with no corresponding key are left intact so the
    /// omission is visible in the written file rather than silently
    /// blanked.
    pub fn render(&self, data: &HashMap<String, String>) -> Output {
        let mut content = self.content.clone();
        for (key, value) in data {
            content = content.replace(&format!("{{{{{key}}}}}"), value);
        }
        Output {
            name: self.name.clone(),
            kind: self.kind,
            comment: self.comment.clone(),
            path: self.path.clone(),
            content,
        }
    }
}

/// A rendered template, ready to be written by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    /// Template name
    pub name: String,
    /// Output kind
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    /// Comment prefix
    pub comment: String,
    /// Target path
    pub path: String,
    /// Rendered content
    pub content: String,
}

/// The authority's configured template sets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SshTemplates {
    /// Templates rendered for user-type requests
    #[serde(default)]
    pub user: Vec<SshTemplate>,
    /// Templates rendered for host-type requests
    #[serde(default)]
    pub host: Vec<SshTemplate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> SshTemplate {
        SshTemplate {
            name: "config".into(),
            kind: TemplateKind::File,
            path: "~/.ssh/config".into(),
            comment: "#".into(),
            content: "Host *.{{Domain}}\n\tUser {{User}}\n".into(),
        }
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let data = HashMap::from([
            ("Domain".to_string(), "fleet.internal".to_string()),
            ("User".to_string(), "alice".to_string()),
        ]);
        let out = template().render(&data);
        assert_eq!(out.content, "Host *.fleet.internal\n\tUser alice\n");
        assert_eq!(out.path, "~/.ssh/config");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let data = HashMap::from([("Domain".to_string(), "fleet.internal".to_string())]);
        let out = template().render(&data);
        assert!(out.content.contains("{{User}}"));
    }
}
