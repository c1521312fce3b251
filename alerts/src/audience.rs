/// The person polling for alerts, as established by the request layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewer {
    pub user_id: Option<String>,
    pub roles: Vec<String>,
}

impl Viewer {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            roles: Vec::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_user(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }

    /// Role names compare case-insensitively.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        self.roles
            .iter()
            .any(|held| roles.iter().any(|wanted| held.eq_ignore_ascii_case(wanted)))
    }
}

/// Decides which viewers an update is meant for.
pub trait Audience {
    fn is_visible_to(&self, viewer: &Viewer) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_matches_its_own_user_id_only() {
        let viewer = Viewer::user("u-1");
        assert!(viewer.is_user("u-1"));
        assert!(!viewer.is_user("u-2"));
        assert!(!Viewer::default().is_user(""));
    }

    #[test]
    fn test_role_match_ignores_case() {
        let viewer = Viewer::user("u-1").with_roles(["admin", "Booker"]);
        assert!(viewer.has_any_role(&["Admin"]));
        assert!(viewer.has_any_role(&["customer", "BOOKER"]));
        assert!(!viewer.has_any_role(&["Customer"]));
    }
}
