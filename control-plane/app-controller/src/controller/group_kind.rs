//! Canonical `(group, kind)` form for component descriptors.
//!
//! Users commonly write `apps/v1` as the group or `v1/Service` as the kind.
//! Both are reduced to the bare pair the API server's discovery is keyed on.

use crate::crd::GroupKind;

/// `v<digits>` optionally followed by `alpha<digits>` or `beta<digits>`.
fn is_version(s: &str) -> bool {
    let Some(rest) = s.strip_prefix('v') else {
        return false;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    let rest = &rest[digits..];
    if rest.is_empty() {
        return true;
    }
    let Some(num) = rest
        .strip_prefix("alpha")
        .or_else(|| rest.strip_prefix("beta"))
    else {
        return false;
    };
    !num.is_empty() && num.bytes().all(|b| b.is_ascii_digit())
}

/// Group part of `"<g>/<version>"`, if `s` has exactly that shape.
fn strip_version(s: &str) -> Option<&str> {
    let (group, version) = s.rsplit_once('/')?;
    (!group.contains('/') && is_version(version)).then_some(group)
}

/// Group named by a kind prefix such as `v1`, `/v1`, `apps/v1` or `apps`.
fn prefix_group(prefix: &str) -> Option<&str> {
    if is_version(prefix) {
        Some("")
    } else if let Some(group) = strip_version(prefix) {
        Some(group)
    } else if !prefix.contains('/') {
        Some(prefix)
    } else {
        None
    }
}

pub fn normalize(gk: &GroupKind) -> GroupKind {
    let group = strip_version(&gk.group).unwrap_or(&gk.group);
    match gk.kind.rsplit_once('/') {
        None => GroupKind::new(group, gk.kind.as_str()),
        Some((_, kind)) if kind.is_empty() => gk.clone(),
        Some((prefix, kind)) => match prefix_group(prefix) {
            Some(from_kind) if group.is_empty() => GroupKind::new(from_kind, kind),
            Some(_) => GroupKind::new(group, kind),
            None => gk.clone(),
        },
    }
}

/// Normalizes every descriptor, keeping the first occurrence of each pair.
pub fn normalize_all<'a>(descriptors: impl IntoIterator<Item = &'a GroupKind>) -> Vec<GroupKind> {
    let mut out: Vec<GroupKind> = Vec::new();
    for gk in descriptors {
        let n = normalize(gk);
        if !out.contains(&n) {
            out.push(n);
        }
    }
    out
}
