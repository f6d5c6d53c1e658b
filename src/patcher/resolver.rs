//! Resolution of target descriptors to registered members.
//!
//! Resolution order:
//!
//! 1. A blank type name is rejected.
//! 2. Parameter type names are resolved through the primitive aliases, then by
//!    full name. An unknown parameter type matches no signature.
//! 3. Without a member name, a constructor with exactly those parameter types
//!    is looked up on the type itself. If none matches, the method lookup below
//!    still runs with the blank name, and the constructor failure is reported
//!    if it finds nothing either.
//! 4. With the getter or setter flag (getter wins), the `get_`/`set_` accessor
//!    of the named property is looked up.
//! 5. Otherwise a method is looked up by name: the first one declared under
//!    that name when no parameters are given, else the one whose parameter
//!    types match exactly.
//!
//! Member lookups in steps 4 and 5 walk the base-type chain, nearest type
//! first. The assembly name only breaks ties between same-named types.

use crate::{
    metadata::{MemberKind, MemberRc, Token, TypeRc, TypeUniverse},
    patch::TargetDescriptor,
    Error, Result,
};

/// Resolves [`TargetDescriptor`]s against a [`TypeUniverse`].
///
/// # Examples
///
/// ```rust
/// use dynpatch::metadata::{MemberSpec, TypeDef, TypeUniverse};
/// use dynpatch::patch::TargetDescriptor;
/// use dynpatch::patcher::MethodResolver;
///
/// let universe = TypeUniverse::new();
/// let farmer = universe.insert_type(TypeDef::new("Game", "Farmer", "Game"));
/// universe.add_member(farmer.token, MemberSpec::getter("Stamina").returns("float"))?;
///
/// let resolver = MethodResolver::new(&universe);
/// let member = resolver.resolve(&TargetDescriptor::getter("Game.Farmer", "Stamina"))?;
/// assert_eq!(member.name, "get_Stamina");
/// # Ok::<(), dynpatch::Error>(())
/// ```
pub struct MethodResolver<'a> {
    universe: &'a TypeUniverse,
}

impl<'a> MethodResolver<'a> {
    /// Creates a resolver over `universe`.
    #[must_use]
    pub fn new(universe: &'a TypeUniverse) -> Self {
        Self { universe }
    }

    /// Resolves `target` to a member.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetResolution`] naming the attempted type, member,
    /// assembly and parameter list when no member matches.
    pub fn resolve(&self, target: &TargetDescriptor) -> Result<MemberRc> {
        self.lookup(target).map_err(|cause| Error::TargetResolution {
            target: target.to_string(),
            cause,
        })
    }

    fn lookup(&self, target: &TargetDescriptor) -> std::result::Result<MemberRc, String> {
        if target.type_name.trim().is_empty() {
            return Err("the type name can't be empty".to_string());
        }

        let assembly = target.assembly.as_deref().unwrap_or_default();
        let params = self.param_tokens(&target.parameters);
        let owner = self
            .universe
            .type_by_name(&target.type_name, target.assembly.as_deref());

        let mut ctor_failure = None;
        if target.is_constructor() {
            let Some(owner) = &owner else {
                return Err(format!(
                    "could not find type '{}' in assembly '{assembly}'",
                    target.type_name
                ));
            };
            if let Some(ctor) = Self::find_constructor(owner, params.as_deref()) {
                return Ok(ctor);
            }
            ctor_failure = Some(format!(
                "could not find constructor for type '{}' with the specified parameters ({}) in assembly '{assembly}'",
                target.type_name,
                target.parameters.join(", ")
            ));
        }

        let method = target.method.as_deref().unwrap_or_default();
        let found = match &owner {
            Some(owner) => self.find_member(owner, target, method, params.as_deref())?,
            None => None,
        };
        if let Some(member) = found {
            return Ok(member);
        }

        if let Some(failure) = ctor_failure {
            return Err(failure);
        }
        if owner.is_none() {
            return Err(format!(
                "could not find type '{}' in assembly '{assembly}'",
                target.type_name
            ));
        }
        Err(if target.parameters.is_empty() {
            format!(
                "could not find method '{method}' with no parameters on type '{}' in assembly '{assembly}'",
                target.type_name
            )
        } else {
            format!(
                "could not find method '{method}' with the specified parameters ({}) on type '{}' in assembly '{assembly}'",
                target.parameters.join(", "),
                target.type_name
            )
        })
    }

    /// Parameter type tokens, `None` if any name is unknown.
    fn param_tokens(&self, names: &[String]) -> Option<Vec<Token>> {
        names
            .iter()
            .map(|name| self.universe.resolve_type_name(name.trim()).map(|t| t.token))
            .collect()
    }

    fn find_constructor(owner: &TypeRc, params: Option<&[Token]>) -> Option<MemberRc> {
        let params = params?;
        owner
            .members()
            .find(|m| m.kind == MemberKind::Constructor && m.signature_matches(params))
            .cloned()
    }

    fn find_member(
        &self,
        owner: &TypeRc,
        target: &TargetDescriptor,
        method: &str,
        params: Option<&[Token]>,
    ) -> std::result::Result<Option<MemberRc>, String> {
        let chain = self
            .universe
            .base_chain(owner)
            .map_err(|e| e.to_string())?;

        let accessor = if target.is_getter {
            Some(MemberKind::Getter)
        } else if target.is_setter {
            Some(MemberKind::Setter)
        } else {
            None
        };

        let found = match accessor {
            Some(kind) => {
                let name = format!("{}{method}", target.accessor_prefix());
                chain.iter().find_map(|ty| {
                    ty.members()
                        .find(|m| m.kind == kind && m.name == name)
                        .cloned()
                })
            }
            None if target.parameters.is_empty() => chain.iter().find_map(|ty| {
                ty.members()
                    .find(|m| m.kind != MemberKind::Constructor && m.name == method)
                    .cloned()
            }),
            None => params.and_then(|params| {
                chain.iter().find_map(|ty| {
                    ty.members()
                        .find(|m| {
                            m.kind != MemberKind::Constructor
                                && m.name == method
                                && m.signature_matches(params)
                        })
                        .cloned()
                })
            }),
        };
        Ok(found)
    }
}
