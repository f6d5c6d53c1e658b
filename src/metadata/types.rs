//! Type and member definitions registered by the host.
//!
//! A [`TypeDef`] describes a type the host program exposes for patching; every
//! callable it owns is a [`MemberDef`]. Members are added through a
//! [`MemberSpec`], which names its parameter and return types as strings and is
//! resolved against the universe on insertion.

use std::{fmt, sync::Arc};

use bitflags::bitflags;
use strum::{AsRefStr, Display};

use crate::{
    metadata::{kind::ValueKind, token::Token},
    runtime::HostValue,
};

/// A reference-counted pointer to a [`TypeDef`]
pub type TypeRc = Arc<TypeDef>;

/// A reference-counted pointer to a [`MemberDef`]
pub type MemberRc = Arc<MemberDef>;

/// Parse rule of a reference type: turns a mutation literal into a value of the type.
pub type LiteralParser =
    Arc<dyn Fn(&str) -> std::result::Result<HostValue, String> + Send + Sync>;

bitflags! {
    /// Attributes of a member relevant to interception.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MemberFlags: u32 {
        /// Member has no `this`
        const STATIC = 0x0001;
        /// Member has no body and cannot be intercepted
        const ABSTRACT = 0x0002;
        /// Member is dispatched virtually
        const VIRTUAL = 0x0004;
    }
}

/// The callable shape of a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum MemberKind {
    /// Ordinary method
    Method,
    /// Instance constructor, named `.ctor`
    Constructor,
    /// Property read accessor, named `get_<Property>`
    Getter,
    /// Property write accessor, named `set_<Property>`
    Setter,
}

/// A type registered in the universe.
///
/// # Examples
///
/// ```rust
/// use dynpatch::metadata::{TypeDef, TypeUniverse};
/// use dynpatch::runtime::HostValue;
///
/// let universe = TypeUniverse::new();
/// let color = universe.insert_type(
///     TypeDef::new("Game", "Color", "Game")
///         .with_parser(|text| Ok(HostValue::String(text.to_uppercase()))),
/// );
/// assert_eq!(color.full_name(), "Game.Color");
/// assert!(color.parser().is_some());
/// ```
pub struct TypeDef {
    /// Token assigned on insertion
    pub token: Token,
    /// Namespace, may be empty
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// Name of the assembly defining the type
    pub assembly: String,
    /// Full name of the base type, if any
    pub base: Option<String>,
    /// Members in registration order
    pub members: boxcar::Vec<MemberRc>,
    parser: Option<LiteralParser>,
}

impl TypeDef {
    /// Creates an unregistered type definition.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        assembly: impl Into<String>,
    ) -> Self {
        Self {
            token: Token(0),
            namespace: namespace.into(),
            name: name.into(),
            assembly: assembly.into(),
            base: None,
            members: boxcar::Vec::new(),
            parser: None,
        }
    }

    /// Sets the base type by full name. Member lookups walk into the base.
    #[must_use]
    pub fn with_base(mut self, base_full_name: impl Into<String>) -> Self {
        self.base = Some(base_full_name.into());
        self
    }

    /// Sets the literal parse rule used when a mutation assigns to a result of this type.
    #[must_use]
    pub fn with_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<HostValue, String> + Send + Sync + 'static,
    {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Namespace-qualified name.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// The type's literal parse rule, if it has one.
    #[must_use]
    pub fn parser(&self) -> Option<&LiteralParser> {
        self.parser.as_ref()
    }

    /// Iterates the members declared directly on this type.
    pub fn members(&self) -> impl Iterator<Item = &MemberRc> {
        self.members.iter().map(|(_, member)| member)
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("token", &self.token)
            .field("full_name", &self.full_name())
            .field("assembly", &self.assembly)
            .field("base", &self.base)
            .field("member_count", &self.members.count())
            .field("has_parser", &self.parser.is_some())
            .finish()
    }
}

/// A parameter of a registered member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamDef {
    /// Parameter name
    pub name: String,
    /// Token of the parameter's type
    pub type_token: Token,
    /// Full name of the parameter's type
    pub type_name: String,
}

/// A callable member registered in the universe.
#[derive(Clone, Debug)]
pub struct MemberDef {
    /// Token of this member
    pub token: Token,
    /// Token of the declaring type
    pub declaring_type: Token,
    /// Full name of the declaring type
    pub declaring_name: String,
    /// Assembly of the declaring type
    pub assembly: String,
    /// Member name (`.ctor`, `get_X`, `set_X` or the method name)
    pub name: String,
    /// Callable shape
    pub kind: MemberKind,
    /// Parameters in declaration order, excluding `this`
    pub params: Vec<ParamDef>,
    /// Token of the return type (`System.Void` for void members)
    pub return_type: Token,
    /// Representation of the return value
    pub return_kind: ValueKind,
    /// Interception-relevant attributes
    pub flags: MemberFlags,
}

impl MemberDef {
    /// `Type.Member` form used in logs.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.declaring_name, self.name)
    }

    /// Returns `true` if the member returns a value.
    #[must_use]
    pub fn has_return(&self) -> bool {
        !self.return_kind.is_void()
    }

    /// Returns `true` if the member's parameter types are exactly `types`.
    #[must_use]
    pub fn signature_matches(&self, types: &[Token]) -> bool {
        self.params.len() == types.len()
            && self
                .params
                .iter()
                .zip(types)
                .all(|(param, token)| param.type_token == *token)
    }

    /// Property name for accessors.
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        match self.kind {
            MemberKind::Getter => self.name.strip_prefix("get_"),
            MemberKind::Setter => self.name.strip_prefix("set_"),
            MemberKind::Method | MemberKind::Constructor => None,
        }
    }
}

impl fmt::Display for MemberDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.params.iter().map(|p| p.type_name.as_str()).collect();
        write!(
            f,
            "{} {}::{}({}), {}",
            self.return_kind,
            self.declaring_name,
            self.name,
            params.join(", "),
            self.assembly
        )
    }
}

/// Unresolved description of a member, resolved by
/// [`TypeUniverse::add_member`](crate::metadata::TypeUniverse::add_member).
///
/// Type names may be full names or the aliases in
/// [`PRIMITIVE_ALIASES`](crate::metadata::PRIMITIVE_ALIASES).
///
/// # Examples
///
/// ```rust
/// use dynpatch::metadata::{MemberFlags, MemberSpec};
///
/// let spec = MemberSpec::method("getFriendshipHeartLevelForNPC")
///     .param("name", "string")
///     .returns("int")
///     .flags(MemberFlags::VIRTUAL);
/// assert_eq!(spec.name(), "getFriendshipHeartLevelForNPC");
/// ```
#[derive(Clone, Debug)]
pub struct MemberSpec {
    pub(crate) name: String,
    pub(crate) kind: MemberKind,
    pub(crate) params: Vec<(String, String)>,
    pub(crate) returns: String,
    pub(crate) flags: MemberFlags,
}

impl MemberSpec {
    fn with_kind(name: String, kind: MemberKind) -> Self {
        Self {
            name,
            kind,
            params: Vec::new(),
            returns: "System.Void".to_string(),
            flags: MemberFlags::empty(),
        }
    }

    /// An ordinary method.
    #[must_use]
    pub fn method(name: impl Into<String>) -> Self {
        Self::with_kind(name.into(), MemberKind::Method)
    }

    /// An instance constructor.
    #[must_use]
    pub fn constructor() -> Self {
        Self::with_kind(".ctor".to_string(), MemberKind::Constructor)
    }

    /// The read accessor of `property`.
    #[must_use]
    pub fn getter(property: &str) -> Self {
        Self::with_kind(format!("get_{property}"), MemberKind::Getter)
    }

    /// The write accessor of `property`.
    #[must_use]
    pub fn setter(property: &str) -> Self {
        Self::with_kind(format!("set_{property}"), MemberKind::Setter)
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.params.push((name.into(), type_name.into()));
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, type_name: impl Into<String>) -> Self {
        self.returns = type_name.into();
        self
    }

    /// Sets the member flags.
    #[must_use]
    pub fn flags(mut self, flags: MemberFlags) -> Self {
        self.flags = flags;
        self
    }

    /// The member name this spec will register.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessor_names() {
        assert_eq!(MemberSpec::getter("Stamina").name(), "get_Stamina");
        assert_eq!(MemberSpec::setter("Stamina").name(), "set_Stamina");
        assert_eq!(MemberSpec::constructor().name(), ".ctor");
    }

    #[test]
    fn test_full_name_without_namespace() {
        let def = TypeDef::new("", "Global", "Asm");
        assert_eq!(def.full_name(), "Global");
        let def = TypeDef::new("A.B", "C", "Asm");
        assert_eq!(def.full_name(), "A.B.C");
    }

    #[test]
    fn test_member_kind_display() {
        assert_eq!(MemberKind::Getter.to_string(), "Getter");
        assert_eq!(MemberKind::Constructor.as_ref(), "Constructor");
    }
}
