use std::collections::HashSet;

/// Drop duplicate permission strings, keeping first-seen order.
pub fn normalize_permissions<I, S>(permissions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for permission in permissions {
        let permission = permission.into();
        if seen.insert(permission.clone()) {
            out.push(permission);
        }
    }
    out
}
