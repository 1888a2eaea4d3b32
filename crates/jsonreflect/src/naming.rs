//! Definition naming.
//!
//! A definition name is composed from the declaring module's last segment
//! (the qualifier), the declared type name and, for generic instantiations,
//! the names of the type arguments: `JsonschemaGoTestAPIResponse[JsonschemaGoTestHelloOutput]`.
//! Configured prefixes are stripped from every segment independently.
//!
//! Resolution is a pure function of the identity and the table of names
//! already handed out, so collision handling can be exercised without a walk.

use std::collections::BTreeMap;

use jsonreflect_core::TypeIdentity;
use tracing::debug;

use crate::error::{ReflectError, Result};

/// Name used for anonymous types appearing as generic arguments
const ANONYMOUS_SEGMENT: &str = "Anonymous";

/// Upper bound on numeric suffixes tried for one colliding name
const MAX_SUFFIX: usize = 10_000;

#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    /// Sorted longest first so the longest matching prefix wins
    prefixes: Vec<String>,
    qualify: bool,
}

impl NameResolver {
    #[must_use]
    pub fn new<I, S>(prefixes: I, qualify: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefixes: Vec<String> = prefixes
            .into_iter()
            .map(Into::into)
            .filter(|p| !p.is_empty())
            .collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        prefixes.dedup();
        Self { prefixes, qualify }
    }

    /// Remove the longest configured prefix from `segment`, once. A segment
    /// that would become empty is kept whole.
    #[must_use]
    pub fn strip<'a>(&self, segment: &'a str) -> &'a str {
        self.prefixes
            .iter()
            .find_map(|prefix| segment.strip_prefix(prefix.as_str()))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(segment)
    }

    /// Natural, unqualified-beyond-default name of `identity`
    #[must_use]
    pub fn base_name(&self, identity: &TypeIdentity) -> String {
        self.compose(identity, 0)
    }

    /// Name with `extra` additional module segments in the qualifier
    fn compose(&self, identity: &TypeIdentity, extra: usize) -> String {
        let TypeIdentity::Named { module, name, args } = identity else {
            return ANONYMOUS_SEGMENT.to_string();
        };

        let mut segment = String::new();
        let modules: Vec<&str> = module
            .as_deref()
            .map(|m| m.split("::").filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        let take = (usize::from(self.qualify) + extra).min(modules.len());
        for part in &modules[modules.len() - take..] {
            segment.push_str(&pascal_case(part));
        }
        if modules.is_empty() {
            segment.push_str(name);
        } else {
            segment.push_str(&capitalize(name));
        }

        let mut out = self.strip(&segment).to_string();
        if !args.is_empty() {
            let args: Vec<String> = args.iter().map(|arg| self.base_name(arg)).collect();
            out.push('[');
            out.push_str(&args.join(","));
            out.push(']');
        }
        out
    }

    /// Candidate names in preference order: the natural name, then names
    /// qualified with more of the module path, then numeric suffixes.
    pub fn candidates(&self, identity: &TypeIdentity) -> impl Iterator<Item = String> + '_ {
        let depth = identity
            .module()
            .map_or(0, |m| m.split("::").filter(|s| !s.is_empty()).count());
        let mut qualified: Vec<String> = Vec::new();
        for extra in 0..=depth {
            let name = self.compose(identity, extra);
            if !qualified.contains(&name) {
                qualified.push(name);
            }
        }
        let base = qualified.first().cloned().unwrap_or_default();
        qualified
            .into_iter()
            .chain((2..MAX_SUFFIX).map(move |n| format!("{base}{n}")))
    }

    /// First candidate not taken by a different identity
    pub fn resolve(
        &self,
        identity: &TypeIdentity,
        assigned: &BTreeMap<String, TypeIdentity>,
    ) -> Result<String> {
        let base = self.base_name(identity);
        for candidate in self.candidates(identity) {
            match assigned.get(&candidate) {
                Some(owner) if owner != identity => {}
                _ => {
                    if candidate != base {
                        debug!(%identity, base = %base, name = %candidate, "qualified colliding definition name");
                    }
                    return Ok(candidate);
                }
            }
        }
        Err(ReflectError::NameCollisionUnresolvable {
            taken_by: assigned
                .get(&base)
                .map(ToString::to_string)
                .unwrap_or_default(),
            name: base,
            identity: identity.to_string(),
        })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// `jsonschema_go_test` -> `JsonschemaGoTest`
fn pascal_case(s: &str) -> String {
    s.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect()
}
