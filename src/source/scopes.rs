//! Key-scope catalog.
//!
//! Each remote selection requires a named scope on the API key. When the
//! remote rejects a call with an authorization error, the catalog turns
//! the bare code into a message that tells the user which permission
//! their key is missing and why it matters.

/// One selection's scope requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeRequirement {
    /// Scope name as the key-issuing page spells it.
    pub scope: &'static str,
    /// Whether the dashboard is unusable without it.
    pub required: bool,
    /// User-facing description of what the scope unlocks.
    pub description: &'static str,
}

const CATALOG: &[ScopeRequirement] = &[
    ScopeRequirement {
        scope: "basic",
        required: true,
        description: "basic faction information, required for authentication",
    },
    ScopeRequirement {
        scope: "members",
        required: true,
        description: "faction member roster, required for member stats",
    },
    ScopeRequirement {
        scope: "crimes",
        required: true,
        description: "organized crime history, required for crime tracking",
    },
    ScopeRequirement {
        scope: "items",
        required: true,
        description: "item catalog, required for displaying rewards",
    },
    ScopeRequirement {
        scope: "armorynews",
        required: false,
        description: "armory transfer logs, optional, enables the armory page",
    },
    ScopeRequirement {
        scope: "fundsnews",
        required: false,
        description: "fund transfer logs, optional, enables the funds page",
    },
];

/// Look up the scope a selection needs. Selections are named after their
/// scope, so this is a direct match.
#[must_use]
pub fn for_selection(selection: &str) -> Option<&'static ScopeRequirement> {
    CATALOG.iter().find(|req| req.scope == selection)
}

/// Scopes the dashboard cannot run without.
pub fn required() -> impl Iterator<Item = &'static ScopeRequirement> {
    CATALOG.iter().filter(|req| req.required)
}

/// Scopes that only unlock optional pages.
pub fn optional() -> impl Iterator<Item = &'static ScopeRequirement> {
    CATALOG.iter().filter(|req| !req.required)
}
