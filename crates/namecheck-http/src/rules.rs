// # Name Rules
//
// Structural name rules per namespace. A name that fails these can never be
// registered there, so the orchestrator skips it without a request.

use namecheck_core::types::CheckType;

/// Whether `name` is structurally valid for `check_type`
pub fn supports(check_type: CheckType, name: &str) -> bool {
    match check_type {
        CheckType::Domain => domain(name),
        CheckType::Npm => npm(name),
        CheckType::Pypi => pypi(name),
        CheckType::Cargo => cargo(name),
        CheckType::Github => github(name),
        CheckType::Gem | CheckType::Gitlab | CheckType::Twitter | CheckType::Reddit => {
            generic(name)
        }
    }
}

/// `<label>.<tld>`, each label 1-63 of `[a-z0-9-]` with no edge hyphens
fn domain(name: &str) -> bool {
    if name.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = name.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            (1..=63).contains(&label.len())
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Unscoped npm package: lowercase, URL-safe, not starting with `.` or `_`
fn npm(name: &str) -> bool {
    (1..=214).contains(&name.len())
        && !name.starts_with('.')
        && !name.starts_with('_')
        && name.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_' | '~')
        })
}

/// PEP 508 project name
fn pypi(name: &str) -> bool {
    let edges_ok = name
        .chars()
        .next()
        .zip(name.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());

    edges_ok
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// crates.io: up to 64 of `[A-Za-z0-9_-]`, starting with a letter
fn cargo(name: &str) -> bool {
    (1..=64).contains(&name.len())
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

/// GitHub login: up to 39 alphanumerics or single inner hyphens
fn github(name: &str) -> bool {
    (1..=39).contains(&name.len())
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn generic(name: &str) -> bool {
    (1..=64).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
