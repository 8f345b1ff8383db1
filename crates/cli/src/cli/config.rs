use std::collections::BTreeMap;
use std::fmt::Write as _;

use gd_domain::config::{Config, ConfigError, ConfigSeverity};

/// Validate the config and print the issues grouped by section.
///
/// Returns `false` when errors are found (warnings alone pass).
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();
    print!("{}", report(&issues, config_path));
    issues.iter().all(|i| i.severity != ConfigSeverity::Error)
}

/// Render validation issues under a `[section]` heading per top-level
/// table, errors before warnings within a section.
fn report(issues: &[ConfigError], config_path: &str) -> String {
    if issues.is_empty() {
        return format!("Config OK ({config_path})\n");
    }

    let mut sections: BTreeMap<&str, Vec<&ConfigError>> = BTreeMap::new();
    for issue in issues {
        let section = issue.field.split_once('.').map_or("", |(s, _)| s);
        sections.entry(section).or_default().push(issue);
    }

    let mut out = String::new();
    for (section, mut entries) in sections {
        entries.sort_by_key(|i| i.severity != ConfigSeverity::Error);
        let _ = writeln!(out, "[{section}]");
        for issue in entries {
            let key = issue
                .field
                .split_once('.')
                .map_or(issue.field.as_str(), |(_, k)| k);
            let tag = match issue.severity {
                ConfigSeverity::Error => "ERROR",
                ConfigSeverity::Warning => "WARN",
            };
            let _ = writeln!(out, "  {tag:<5} {key}: {}", issue.message);
        }
    }

    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    let _ = writeln!(
        out,
        "\n{errors} error(s), {} warning(s) in {config_path}",
        issues.len() - errors
    );
    out
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)?;
    print!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_config_reports_ok() {
        let issues = Config::default().validate();
        assert_eq!(report(&issues, "guardian.toml"), "Config OK (guardian.toml)\n");
    }

    #[test]
    fn issues_are_grouped_by_section() {
        let mut config = Config::default();
        config.lifecycle.cookie_secure = false;
        config.lifecycle.idle_timeout_secs = 0;
        config.store.op_timeout_ms = 0;

        let out = report(&config.validate(), "guardian.toml");
        let lifecycle = out.find("[lifecycle]").unwrap();
        let store = out.find("[store]").unwrap();
        assert!(lifecycle < store);

        // Errors lead within a section.
        let error = out.find("ERROR idle_timeout_secs").unwrap();
        let warning = out.find("WARN  cookie_secure").unwrap();
        assert!(error < warning);

        assert!(out.contains("  ERROR op_timeout_ms: backend timeout must be greater than 0"));
        assert!(out.ends_with("2 error(s), 2 warning(s) in guardian.toml\n"));
    }
}
