//! Operation prompt rendering from a constrained, typed context.
//!
//! Templates may reference only the declared context: the intent prompt
//! and response, this brand's rank, the detected competitor list, and the
//! outputs of operations named in `depends_on`. Anything else is a
//! configuration error caught before execution — there is no free-form
//! interpolation.

use std::collections::HashMap;

use aivo_core::{ConfigError, OperationSpec};

/// The full set of values an operation template may reference.
pub struct OpContext<'a> {
    pub intent_prompt: &'a str,
    pub intent_response: &'a str,
    pub my_rank: Option<u32>,
    pub competitors: &'a [String],
    /// Outputs of this operation's declared dependencies only.
    pub dep_outputs: &'a HashMap<String, String>,
}

const FIXED_PLACEHOLDERS: &[&str] = &[
    "intent_prompt",
    "intent_response",
    "my_rank",
    "competitors",
];

/// Checks that every `{placeholder}` in the template resolves to the
/// declared context.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownPlaceholder`] for a placeholder outside
/// the fixed set, or a `{dep:<id>}` whose id is not in `depends_on`.
pub fn validate_template(intent_id: &str, spec: &OperationSpec) -> Result<(), ConfigError> {
    for placeholder in placeholders(&spec.prompt_template) {
        if FIXED_PLACEHOLDERS.contains(&placeholder.as_str()) {
            continue;
        }
        if let Some(dep) = placeholder.strip_prefix("dep:") {
            if spec.depends_on.iter().any(|d| d == dep) {
                continue;
            }
        }
        return Err(ConfigError::UnknownPlaceholder {
            intent_id: intent_id.to_owned(),
            operation_id: spec.id.clone(),
            placeholder,
        });
    }
    Ok(())
}

/// Renders a validated template against the context.
///
/// `my_rank = None` renders as `unranked`; the competitor list renders
/// comma-separated. A `{dep:<id>}` with no recorded output (possible only
/// if validation was skipped) renders empty.
#[must_use]
pub fn render_template(template: &str, context: &OpContext<'_>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        match after_open.find('}') {
            None => {
                rendered.push_str(&rest[open..]);
                rest = "";
                break;
            }
            Some(close) => {
                let placeholder = &after_open[..close];
                rendered.push_str(&resolve(placeholder, context));
                rest = &after_open[close + 1..];
            }
        }
    }
    rendered.push_str(rest);
    rendered
}

fn resolve(placeholder: &str, context: &OpContext<'_>) -> String {
    match placeholder {
        "intent_prompt" => context.intent_prompt.to_owned(),
        "intent_response" => context.intent_response.to_owned(),
        "my_rank" => context
            .my_rank
            .map_or_else(|| "unranked".to_owned(), |r| r.to_string()),
        "competitors" => context.competitors.join(", "),
        other => match other.strip_prefix("dep:") {
            Some(dep) => context.dep_outputs.get(dep).cloned().unwrap_or_default(),
            None => format!("{{{other}}}"),
        },
    }
}

fn placeholders(template: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('}') else {
            break;
        };
        found.push(after_open[..close].to_owned());
        rest = &after_open[close + 1..];
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(template: &str, deps: &[&str]) -> OperationSpec {
        OperationSpec {
            id: "op".to_string(),
            prompt_template: template.to_string(),
            model: None,
            depends_on: deps.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    fn context<'a>(dep_outputs: &'a HashMap<String, String>) -> OpContext<'a> {
        OpContext {
            intent_prompt: "best CRM tools",
            intent_response: "1. HubSpot",
            my_rank: Some(1),
            competitors: &[],
            dep_outputs,
        }
    }

    #[test]
    fn fixed_placeholders_validate() {
        let s = spec(
            "Given {intent_prompt} and {intent_response}, rank {my_rank} vs {competitors}",
            &[],
        );
        assert!(validate_template("crm", &s).is_ok());
    }

    #[test]
    fn declared_dep_placeholder_validates() {
        let s = spec("Build on {dep:gaps}", &["gaps"]);
        assert!(validate_template("crm", &s).is_ok());
    }

    #[test]
    fn undeclared_dep_placeholder_is_rejected() {
        let s = spec("Build on {dep:gaps}", &[]);
        let err = validate_template("crm", &s).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlaceholder { .. }));
    }

    #[test]
    fn arbitrary_placeholder_is_rejected() {
        let s = spec("Use {secret_state}", &[]);
        assert!(validate_template("crm", &s).is_err());
    }

    #[test]
    fn renders_all_fixed_values() {
        let deps = HashMap::new();
        let competitors = vec!["Salesforce".to_string(), "Pipedrive".to_string()];
        let ctx = OpContext {
            competitors: &competitors,
            ..context(&deps)
        };
        let out = render_template("{intent_prompt}: rank {my_rank}, vs {competitors}", &ctx);
        assert_eq!(out, "best CRM tools: rank 1, vs Salesforce, Pipedrive");
    }

    #[test]
    fn missing_rank_renders_unranked() {
        let deps = HashMap::new();
        let mut ctx = context(&deps);
        ctx.my_rank = None;
        assert_eq!(render_template("rank: {my_rank}", &ctx), "rank: unranked");
    }

    #[test]
    fn dep_output_renders() {
        let mut deps = HashMap::new();
        deps.insert("gaps".to_string(), "pricing gap".to_string());
        let ctx = context(&deps);
        assert_eq!(
            render_template("Found: {dep:gaps}", &ctx),
            "Found: pricing gap"
        );
    }

    #[test]
    fn unmatched_brace_passes_through() {
        let deps = HashMap::new();
        let ctx = context(&deps);
        assert_eq!(render_template("open { brace", &ctx), "open { brace");
    }
}
