use std::collections::BTreeSet;

/// Capability check supplied by the hosting framework.
pub trait Capabilities {
    fn has(&self, permission: &str) -> bool;
}

impl<F> Capabilities for F
where
    F: Fn(&str) -> bool,
{
    fn has(&self, permission: &str) -> bool {
        self(permission)
    }
}

/// Exact-match permission set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    granted: BTreeSet<String>,
}

impl PermissionSet {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granted: permissions
                .into_iter()
                .map(|permission| {
                    let permission: String = permission.into();
                    permission.trim().to_string()
                })
                .filter(|permission| !permission.is_empty())
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.granted.iter().map(String::as_str)
    }
}

impl Capabilities for PermissionSet {
    fn has(&self, permission: &str) -> bool {
        self.granted.contains(permission)
    }
}
