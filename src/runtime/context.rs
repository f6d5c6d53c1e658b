//! Call-site information handed to thunks and condition evaluators.

use crate::{metadata::MemberDef, runtime::HostValue};

/// Context of an intercepted call.
///
/// Borrows everything from the caller and is only valid for the duration of
/// the interception. Thunks pass it to the condition evaluator unchanged.
///
/// # Examples
///
/// ```rust,ignore
/// use dynpatch::runtime::{HostValue, InvocationContext};
///
/// let args = [HostValue::from("Abigail")];
/// let ctx = InvocationContext::new(&member)
///     .with_args(&args)
///     .with_actor(Some(&player));
/// assert_eq!(ctx.args.len(), 1);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct InvocationContext<'a> {
    /// The member being called.
    pub member: &'a MemberDef,

    /// The `this` reference for instance members.
    pub this: Option<&'a HostValue>,

    /// Arguments, excluding `this`, in declaration order.
    pub args: &'a [HostValue],

    /// The acting entity at the call site (e.g. the current player), if any.
    pub actor: Option<&'a HostValue>,

    /// Further contextual objects available at the call site.
    pub objects: &'a [HostValue],
}

impl<'a> InvocationContext<'a> {
    /// Creates a context with no receiver, arguments or ambient objects.
    #[must_use]
    pub fn new(member: &'a MemberDef) -> Self {
        Self {
            member,
            this: None,
            args: &[],
            actor: None,
            objects: &[],
        }
    }

    /// Sets the `this` reference.
    #[must_use]
    pub fn with_this(mut self, this: Option<&'a HostValue>) -> Self {
        self.this = this;
        self
    }

    /// Sets the arguments.
    #[must_use]
    pub fn with_args(mut self, args: &'a [HostValue]) -> Self {
        self.args = args;
        self
    }

    /// Sets the acting entity.
    #[must_use]
    pub fn with_actor(mut self, actor: Option<&'a HostValue>) -> Self {
        self.actor = actor;
        self
    }

    /// Sets the contextual objects.
    #[must_use]
    pub fn with_objects(mut self, objects: &'a [HostValue]) -> Self {
        self.objects = objects;
        self
    }

    /// Returns `true` if the argument count matches the member's parameter list.
    #[must_use]
    pub fn arity_matches(&self) -> bool {
        self.args.len() == self.member.params.len()
    }
}
