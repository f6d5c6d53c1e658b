//! Registration table of the host program's patchable types and members.
//!
//! The [`TypeUniverse`] stands in for runtime reflection: the host registers
//! every type and member it wants to expose ahead of time, and the resolver
//! looks them up by name. It is safe to populate and query concurrently.
//!
//! # Registry Architecture
//!
//! - **Token-based lookup**: primary storage in `SkipMap`s keyed by [`Token`]
//! - **Name-based lookup**: a `DashMap` from full name to every type registered
//!   under it (types from different assemblies may share a full name)
//! - **Primitive types**: pre-registered under the `0xF0` table on construction
//!
//! # Examples
//!
//! ```rust
//! use dynpatch::metadata::{MemberSpec, TypeDef, TypeUniverse, ValueKind};
//!
//! let universe = TypeUniverse::new();
//! let farmer = universe.insert_type(TypeDef::new("StardewValley", "Farmer", "Stardew Valley"));
//! let member = universe.add_member(
//!     farmer.token,
//!     MemberSpec::method("getFriendshipHeartLevelForNPC")
//!         .param("name", "string")
//!         .returns("int"),
//! )?;
//!
//! assert_eq!(member.return_kind, ValueKind::I32);
//! assert!(universe.type_by_name("StardewValley.Farmer", None).is_some());
//! # Ok::<(), dynpatch::Error>(())
//! ```

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::{
    metadata::{
        kind::{resolve_alias, ValueKind},
        token::Token,
        types::{LiteralParser, MemberDef, MemberRc, MemberSpec, ParamDef, TypeDef, TypeRc},
    },
    Error, Result,
};

/// Maximum number of base types followed when searching members.
const MAX_BASE_DEPTH: usize = 64;

/// Assembly name the built-in primitives are registered under.
pub const CORE_ASSEMBLY: &str = "System.Private.CoreLib";

/// Primitive types registered by [`TypeUniverse::new`], in token order.
const PRIMITIVES: [&str; 15] = [
    "Void", "Boolean", "Char", "SByte", "Byte", "Int16", "UInt16", "Int32", "UInt32", "Int64",
    "UInt64", "Single", "Double", "String", "Object",
];

/// Central registry of patchable types and members.
///
/// See the module documentation for the overall design.
pub struct TypeUniverse {
    types: SkipMap<Token, TypeRc>,
    members: SkipMap<Token, MemberRc>,
    types_by_fullname: DashMap<String, Vec<Token>>,
    next_type_row: AtomicU32,
    next_member_row: AtomicU32,
}

impl TypeUniverse {
    /// Creates a universe containing only the primitive types.
    #[must_use]
    pub fn new() -> Self {
        let universe = TypeUniverse {
            types: SkipMap::new(),
            members: SkipMap::new(),
            types_by_fullname: DashMap::new(),
            next_type_row: AtomicU32::new(1),
            next_member_row: AtomicU32::new(1),
        };

        for (index, name) in PRIMITIVES.iter().enumerate() {
            let mut def = TypeDef::new("System", *name, CORE_ASSEMBLY);
            def.token = Token::from_parts(Token::PRIMITIVE_TABLE, index as u32 + 1);
            universe.index(Arc::new(def));
        }

        universe
    }

    fn index(&self, def: TypeRc) -> TypeRc {
        self.types_by_fullname
            .entry(def.full_name())
            .or_default()
            .push(def.token);
        self.types.insert(def.token, def.clone());
        def
    }

    /// Registers a type and returns it with its assigned token.
    pub fn insert_type(&self, mut def: TypeDef) -> TypeRc {
        let row = self.next_type_row.fetch_add(1, Ordering::Relaxed);
        def.token = Token::from_parts(Token::TYPE_TABLE, row);
        self.index(Arc::new(def))
    }

    /// Registers a member on the type identified by `declaring`.
    ///
    /// Parameter and return type names are resolved through
    /// [`TypeUniverse::resolve_type_name`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if the declaring type or any named type
    /// is not registered.
    pub fn add_member(&self, declaring: Token, spec: MemberSpec) -> Result<MemberRc> {
        let owner = self
            .get_type(declaring)
            .ok_or_else(|| Error::UnknownType(declaring.to_string()))?;

        let params = spec
            .params
            .iter()
            .map(|(name, type_name)| {
                let ty = self
                    .resolve_type_name(type_name)
                    .ok_or_else(|| Error::UnknownType(type_name.clone()))?;
                Ok(ParamDef {
                    name: name.clone(),
                    type_token: ty.token,
                    type_name: ty.full_name(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let return_type = self
            .resolve_type_name(&spec.returns)
            .ok_or_else(|| Error::UnknownType(spec.returns.clone()))?;

        let row = self.next_member_row.fetch_add(1, Ordering::Relaxed);
        let member = Arc::new(MemberDef {
            token: Token::from_parts(Token::MEMBER_TABLE, row),
            declaring_type: owner.token,
            declaring_name: owner.full_name(),
            assembly: owner.assembly.clone(),
            name: spec.name,
            kind: spec.kind,
            params,
            return_type: return_type.token,
            return_kind: self.value_kind_of(&return_type),
            flags: spec.flags,
        });

        owner.members.push(member.clone());
        self.members.insert(member.token, member.clone());
        Ok(member)
    }

    /// Looks up a type by token.
    #[must_use]
    pub fn get_type(&self, token: Token) -> Option<TypeRc> {
        if !token.is_type() {
            return None;
        }
        self.types.get(&token).map(|entry| entry.value().clone())
    }

    /// Looks up a member by token.
    #[must_use]
    pub fn get_member(&self, token: Token) -> Option<MemberRc> {
        if !token.is_member() {
            return None;
        }
        self.members.get(&token).map(|entry| entry.value().clone())
    }

    /// Looks up a type by full name.
    ///
    /// When `assembly` is given, a type from that assembly is preferred;
    /// otherwise, or if none matches, the first type registered under the name
    /// is returned.
    #[must_use]
    pub fn type_by_name(&self, full_name: &str, assembly: Option<&str>) -> Option<TypeRc> {
        let tokens = self.types_by_fullname.get(full_name)?;
        let candidates: Vec<TypeRc> = tokens.iter().filter_map(|t| self.get_type(*t)).collect();

        assembly
            .and_then(|asm| candidates.iter().find(|t| t.assembly == asm).cloned())
            .or_else(|| candidates.into_iter().next())
    }

    /// Resolves a descriptor-style type name: a primitive alias such as `int`,
    /// or a full name.
    #[must_use]
    pub fn resolve_type_name(&self, name: &str) -> Option<TypeRc> {
        let full_name = resolve_alias(name).unwrap_or(name);
        self.type_by_name(full_name, None)
    }

    /// Value representation of a type.
    #[must_use]
    pub fn value_kind_of(&self, def: &TypeDef) -> ValueKind {
        if def.token.table() == Token::PRIMITIVE_TABLE {
            if let Some(kind) = ValueKind::from_primitive_name(&def.full_name()) {
                return kind;
            }
        }
        ValueKind::Reference(def.token)
    }

    /// Literal parser registered for a reference type.
    #[must_use]
    pub fn parser_for(&self, type_token: Token) -> Option<LiteralParser> {
        self.get_type(type_token)
            .and_then(|def| def.parser().cloned())
    }

    /// Returns `def` followed by its base types, nearest first.
    ///
    /// A base name that is not registered ends the chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecursionLimit`] if the chain is deeper than the limit,
    /// which in practice means it is cyclic.
    pub fn base_chain(&self, def: &TypeRc) -> Result<Vec<TypeRc>> {
        let mut chain = vec![def.clone()];
        let mut current = def.clone();
        while let Some(base_name) = &current.base {
            if chain.len() > MAX_BASE_DEPTH {
                return Err(Error::RecursionLimit(MAX_BASE_DEPTH));
            }
            let Some(base) = self.type_by_name(base_name, None) else {
                break;
            };
            chain.push(base.clone());
            current = base;
        }
        Ok(chain)
    }

    /// Number of registered types, primitives included.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of registered members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeUniverse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeUniverse")
            .field("type_count", &self.types.len())
            .field("member_count", &self.members.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MemberFlags, MemberKind};

    #[test]
    fn test_primitives_are_preregistered() {
        let universe = TypeUniverse::new();
        assert_eq!(universe.type_count(), PRIMITIVES.len());

        let int = universe.resolve_type_name("int").unwrap();
        assert_eq!(int.full_name(), "System.Int32");
        assert_eq!(int.token.table(), Token::PRIMITIVE_TABLE);
        assert_eq!(universe.value_kind_of(&int), ValueKind::I32);

        let object = universe.type_by_name("System.Object", None).unwrap();
        assert_eq!(
            universe.value_kind_of(&object),
            ValueKind::Reference(object.token)
        );
    }

    #[test]
    fn test_insert_and_lookup() {
        let universe = TypeUniverse::new();
        let item = universe.insert_type(TypeDef::new("Game", "Item", "Game"));
        assert_eq!(item.token.table(), Token::TYPE_TABLE);
        assert_eq!(item.token.row(), 1);
        assert!(universe.get_type(item.token).is_some());
        assert!(universe.type_by_name("Game.Item", None).is_some());
        assert!(universe.type_by_name("Game.Missing", None).is_none());
    }

    #[test]
    fn test_assembly_preference() {
        let universe = TypeUniverse::new();
        let a = universe.insert_type(TypeDef::new("Shared", "Thing", "A"));
        let b = universe.insert_type(TypeDef::new("Shared", "Thing", "B"));

        assert_eq!(universe.type_by_name("Shared.Thing", Some("B")).unwrap().token, b.token);
        assert_eq!(universe.type_by_name("Shared.Thing", Some("C")).unwrap().token, a.token);
        assert_eq!(universe.type_by_name("Shared.Thing", None).unwrap().token, a.token);
    }

    #[test]
    fn test_add_member_resolves_types() {
        let universe = TypeUniverse::new();
        let item = universe.insert_type(TypeDef::new("Game", "Item", "Game"));
        let member = universe
            .add_member(
                item.token,
                MemberSpec::method("Combine")
                    .param("other", "Game.Item")
                    .param("count", "int")
                    .returns("Game.Item")
                    .flags(MemberFlags::VIRTUAL),
            )
            .unwrap();

        assert_eq!(member.kind, MemberKind::Method);
        assert_eq!(member.params.len(), 2);
        assert_eq!(member.params[0].type_token, item.token);
        assert_eq!(member.params[1].type_name, "System.Int32");
        assert_eq!(member.return_kind, ValueKind::Reference(item.token));
        assert_eq!(member.declaring_name, "Game.Item");
        assert_eq!(item.members().count(), 1);
        assert_eq!(universe.get_member(member.token).unwrap().name, "Combine");
        assert!(universe.get_member(item.token).is_none());
        assert!(universe.get_type(member.token).is_none());
    }

    #[test]
    fn test_add_member_unknown_type() {
        let universe = TypeUniverse::new();
        let item = universe.insert_type(TypeDef::new("Game", "Item", "Game"));
        let err = universe
            .add_member(item.token, MemberSpec::method("X").param("a", "Game.Nope"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownType(name) if name == "Game.Nope"));
        assert_eq!(universe.member_count(), 0);
    }

    #[test]
    fn test_base_chain() {
        let universe = TypeUniverse::new();
        let base = universe.insert_type(TypeDef::new("Game", "Character", "Game"));
        let derived =
            universe.insert_type(TypeDef::new("Game", "NPC", "Game").with_base("Game.Character"));
        let chain = universe.base_chain(&derived).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].token, base.token);
    }

    #[test]
    fn test_cyclic_base_chain_is_an_error() {
        let universe = TypeUniverse::new();
        universe.insert_type(TypeDef::new("Game", "A", "Game").with_base("Game.B"));
        let b = universe.insert_type(TypeDef::new("Game", "B", "Game").with_base("Game.A"));
        assert!(matches!(
            universe.base_chain(&b),
            Err(Error::RecursionLimit(_))
        ));
    }
}
