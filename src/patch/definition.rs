//! Patch definition records.
//!
//! These are the engine's input contract. The serde shape follows the
//! PascalCase records patch authors already write:
//!
//! ```json
//! {
//!   "Id": "Example.MoreHearts",
//!   "Target": {
//!     "Type": "StardewValley.Farmer",
//!     "Method": "getFriendshipHeartLevelForNPC",
//!     "Assembly": "Stardew Valley",
//!     "Parameters": ["string"]
//!   },
//!   "PatchType": "Postfix",
//!   "Condition": "PLAYER_HAS_QUEST Current 12",
//!   "ChangeResult": { "Operation": "Add", "Value": "2" },
//!   "Actions": ["AddMail Current HeartsMail"]
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Whether a patch runs before or after the original call.
///
/// Parsing is lenient: `Prefix` or `Before` (any case) is [`PatchPhase::Before`];
/// every other string is [`PatchPhase::After`].
///
/// # Examples
///
/// ```rust
/// use dynpatch::patch::PatchPhase;
///
/// assert_eq!(PatchPhase::parse_lenient("prefix"), PatchPhase::Before);
/// assert_eq!(PatchPhase::parse_lenient("Postfix"), PatchPhase::After);
/// assert_eq!(PatchPhase::parse_lenient("whatever"), PatchPhase::After);
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum PatchPhase {
    /// Prefix: runs before the original body
    #[strum(to_string = "Before", serialize = "Prefix")]
    Before,
    /// Postfix: runs after the original body and may rewrite its result
    #[default]
    #[strum(to_string = "After", serialize = "Postfix")]
    After,
}

impl PatchPhase {
    /// Parses a phase name, falling back to [`PatchPhase::After`].
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        value.trim().parse().unwrap_or(PatchPhase::After)
    }
}

impl From<String> for PatchPhase {
    fn from(value: String) -> Self {
        PatchPhase::parse_lenient(&value)
    }
}

impl From<PatchPhase> for String {
    fn from(value: PatchPhase) -> Self {
        value.to_string()
    }
}

/// Operation applied to the return slot.
///
/// Parsing is case-insensitive; unknown operations fall back to
/// [`MutationOp::Add`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum MutationOp {
    /// Replace the return value with the literal
    #[default]
    Assign,
    /// `current + literal` (concatenation for strings)
    Add,
    /// `current - literal`
    Subtract,
    /// `current * literal`
    Multiply,
    /// `current / literal`
    Divide,
}

impl MutationOp {
    /// Parses an operation name, falling back to [`MutationOp::Add`].
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        value.trim().parse().unwrap_or(MutationOp::Add)
    }
}

impl From<String> for MutationOp {
    fn from(value: String) -> Self {
        MutationOp::parse_lenient(&value)
    }
}

impl From<MutationOp> for String {
    fn from(value: MutationOp) -> Self {
        value.to_string()
    }
}

/// Rewrite of an intercepted call's return value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultMutation {
    /// Operation to apply
    #[serde(default)]
    pub operation: MutationOp,
    /// Literal operand, parsed into the member's return type
    pub value: String,
}

impl ResultMutation {
    /// Creates a mutation.
    #[must_use]
    pub fn new(operation: MutationOp, value: impl Into<String>) -> Self {
        Self {
            operation,
            value: value.into(),
        }
    }
}

/// Textual description of the member a patch targets.
///
/// A descriptor without a member name targets a constructor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TargetDescriptor {
    /// Full name of the owning type
    #[serde(rename = "Type")]
    pub type_name: String,
    /// Member name; for accessors, the property name
    pub method: Option<String>,
    /// Assembly name, informational
    pub assembly: Option<String>,
    /// Target the property's read accessor
    pub is_getter: bool,
    /// Target the property's write accessor
    pub is_setter: bool,
    /// Parameter type names, aliases allowed
    pub parameters: Vec<String>,
}

impl TargetDescriptor {
    /// Targets a method by name.
    #[must_use]
    pub fn method(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            method: Some(method.into()),
            ..Self::default()
        }
    }

    /// Targets a constructor.
    #[must_use]
    pub fn constructor(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Targets a property's read accessor.
    #[must_use]
    pub fn getter(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            is_getter: true,
            ..Self::method(type_name, property)
        }
    }

    /// Targets a property's write accessor.
    #[must_use]
    pub fn setter(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            is_setter: true,
            ..Self::method(type_name, property)
        }
    }

    /// Sets the assembly name.
    #[must_use]
    pub fn with_assembly(mut self, assembly: impl Into<String>) -> Self {
        self.assembly = Some(assembly.into());
        self
    }

    /// Sets the parameter type names.
    #[must_use]
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = params.into_iter().map(Into::into).collect();
        self
    }

    /// The member name, if present and not blank.
    #[must_use]
    pub fn member_name(&self) -> Option<&str> {
        self.method.as_deref().filter(|m| !m.trim().is_empty())
    }

    /// Returns `true` if the descriptor names no member.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.member_name().is_none()
    }

    /// Accessor prefix implied by the getter/setter flags; the getter flag wins.
    #[must_use]
    pub fn accessor_prefix(&self) -> &'static str {
        if self.is_getter {
            "get_"
        } else if self.is_setter {
            "set_"
        } else {
            ""
        }
    }

    /// The canonical bucket key: type, member-or-constructor marker, accessor
    /// marker and assembly. Parameter types are not part of the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dynpatch::patch::TargetDescriptor;
    ///
    /// let target = TargetDescriptor::getter("Game.Farmer", "Stamina").with_assembly("Game");
    /// assert_eq!(target.bucket_key(), "Game.Farmer.get_Stamina, Game");
    ///
    /// let ctor = TargetDescriptor::constructor("Game.Farmer").with_assembly("Game");
    /// assert_eq!(ctor.bucket_key(), "Game.Farmer..ctor, Game");
    /// ```
    #[must_use]
    pub fn bucket_key(&self) -> String {
        let assembly = self.assembly.as_deref().unwrap_or_default();
        match self.member_name() {
            Some(member) => format!(
                "{}.{}{}, {}",
                self.type_name,
                self.accessor_prefix(),
                member,
                assembly
            ),
            None => format!("{}..ctor, {}", self.type_name, assembly),
        }
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let member = match self.member_name() {
            Some(member) => format!("{}{}", self.accessor_prefix(), member),
            None => ".ctor".to_string(),
        };
        write!(
            f,
            "{}.{}({})",
            self.type_name,
            member,
            self.parameters.join(", ")
        )?;
        if let Some(assembly) = &self.assembly {
            write!(f, ", {assembly}")?;
        }
        Ok(())
    }
}

/// A declarative patch.
///
/// A definition with no action, no action list and no result mutation is
/// inert; the registry drops it.
///
/// # Examples
///
/// ```rust
/// use dynpatch::patch::{MutationOp, PatchDefinition, PatchPhase, TargetDescriptor};
///
/// let patch = PatchDefinition::new(
///     "double-price",
///     TargetDescriptor::getter("Game.Item", "Price"),
///     PatchPhase::After,
/// )
/// .with_mutation(MutationOp::Multiply, "2");
///
/// assert!(!patch.is_inert());
/// assert_eq!(patch.condition_or("TRUE"), "TRUE");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatchDefinition {
    /// Unique, stable identifier used in diagnostics
    pub id: String,
    /// Member to patch
    pub target: TargetDescriptor,
    /// Before or after the original call
    #[serde(rename = "PatchType", default)]
    pub phase: PatchPhase,
    /// Condition expression; always true when absent
    #[serde(default)]
    pub condition: Option<String>,
    /// Single action, fired before the action list
    #[serde(default)]
    pub action: Option<String>,
    /// Action list
    #[serde(default)]
    pub actions: Option<Vec<String>>,
    /// Return-value rewrite
    #[serde(rename = "ChangeResult", default)]
    pub change_result: Option<ResultMutation>,
}

impl PatchDefinition {
    /// Creates a definition with no condition and no effects.
    #[must_use]
    pub fn new(id: impl Into<String>, target: TargetDescriptor, phase: PatchPhase) -> Self {
        Self {
            id: id.into(),
            target,
            phase,
            condition: None,
            action: None,
            actions: None,
            change_result: None,
        }
    }

    /// Sets the condition.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Sets the single action.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Sets the action list.
    #[must_use]
    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the result mutation.
    #[must_use]
    pub fn with_mutation(mut self, operation: MutationOp, value: impl Into<String>) -> Self {
        self.change_result = Some(ResultMutation::new(operation, value));
        self
    }

    /// Returns `true` if the definition has no effect to apply.
    ///
    /// An empty action list still counts as present.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.action.is_none() && self.actions.is_none() && self.change_result.is_none()
    }

    /// The single action followed by every entry of the action list.
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.action
            .iter()
            .chain(self.actions.iter().flatten())
            .map(String::as_str)
    }

    /// The condition, or `default` when none was given.
    #[must_use]
    pub fn condition_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.condition.as_deref().unwrap_or(default)
    }
}
