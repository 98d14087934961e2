use serde::Serialize;
use std::fmt;

/// One HTTP call of the journey. Used to tag request metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Health,
    Register,
    Login,
    List,
    Create,
    Read,
    Update,
    Patch,
    Delete,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Health => "health",
            Step::Register => "register",
            Step::Login => "login",
            Step::List => "list",
            Step::Create => "create",
            Step::Read => "read",
            Step::Update => "update",
            Step::Patch => "patch",
            Step::Delete => "delete",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
