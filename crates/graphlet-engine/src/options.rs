//! Per-call options.

use graphlet_common::types::NamespaceId;
use graphlet_common::utils::context::CallContext;

/// Options of one database call.
///
/// ```
/// use graphlet_engine::Options;
/// use graphlet_common::types::NamespaceId;
///
/// let opts = Options::default().with_namespace(NamespaceId::new(3));
/// assert_eq!(opts.namespace, Some(NamespaceId::new(3)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Target namespace; the default namespace when `None`.
    pub namespace: Option<NamespaceId>,
    /// Cancellation and deadline scope.
    pub context: CallContext,
}

impl Options {
    /// Options targeting `namespace`.
    #[must_use]
    pub fn namespace(namespace: NamespaceId) -> Self {
        Self::default().with_namespace(namespace)
    }

    /// Sets the target namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: NamespaceId) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Sets the call context.
    #[must_use]
    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = context;
        self
    }
}

impl From<NamespaceId> for Options {
    fn from(namespace: NamespaceId) -> Self {
        Self::namespace(namespace)
    }
}
