//! Canonical type identity keys

use std::fmt;

/// Canonical, hashable key identifying a reflected type.
///
/// Named identities carry the declaring module, the declared type name and the
/// resolved generic arguments, so `Page<User>` and `Page<Order>` are distinct.
/// Anonymous composite types are keyed by a structural fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeIdentity {
    /// A declared type, possibly a generic instantiation
    Named {
        /// Declaring module path (e.g. `crate::models`), if any
        module: Option<String>,
        /// Declared type name without generic arguments
        name: String,
        /// Ordered, resolved generic arguments
        args: Vec<TypeIdentity>,
    },
    /// An anonymous composite identified by its shape
    Structural(String),
}

impl TypeIdentity {
    /// Create a named identity
    #[must_use]
    pub fn named(module: Option<&str>, name: &str, args: Vec<TypeIdentity>) -> Self {
        Self::Named {
            module: module.map(str::to_string),
            name: name.to_string(),
            args,
        }
    }

    /// Create a structural identity from a fingerprint
    #[must_use]
    pub fn structural(fingerprint: impl Into<String>) -> Self {
        Self::Structural(fingerprint.into())
    }

    #[must_use]
    pub const fn is_named(&self) -> bool {
        matches!(self, Self::Named { .. })
    }

    /// Declared type name, or `None` for structural identities
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            Self::Structural(_) => None,
        }
    }

    #[must_use]
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Named { module, .. } => module.as_deref(),
            Self::Structural(_) => None,
        }
    }

    #[must_use]
    pub fn args(&self) -> &[TypeIdentity] {
        match self {
            Self::Named { args, .. } => args,
            Self::Structural(_) => &[],
        }
    }

    /// Stable string key, identical to the `Display` form
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { module, name, args } => {
                if let Some(module) = module {
                    write!(f, "{module}::")?;
                }
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Self::Structural(fingerprint) => f.write_str(fingerprint),
        }
    }
}
