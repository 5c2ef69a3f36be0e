use crate::kernel::error::KernelError;
use crate::kernel::expr::ExprKind;

#[derive(Debug)]
pub enum HashError {
  /// A leaf kind reached the compound-node dispatch.
  InvariantViolation {
    kind: ExprKind,
  },
  /// A classifier described more parameters than there are arguments.
  ParamCountMismatch {
    reported: usize,
    nargs: usize,
  },
  /// A collaborator failed; propagated unchanged.
  Kernel(KernelError),
}

impl std::fmt::Display for HashError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      HashError::InvariantViolation { kind } => {
        write!(f, "invariant violation: {kind} node reached compound hashing")
      },
      HashError::ParamCountMismatch { reported, nargs } => write!(
        f,
        "classifier reported {reported} parameters for {nargs} arguments"
      ),
      HashError::Kernel(err) => write!(f, "{err}"),
    }
  }
}

impl std::error::Error for HashError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      HashError::Kernel(err) => Some(err),
      HashError::InvariantViolation { .. }
      | HashError::ParamCountMismatch { .. } => None,
    }
  }
}

impl From<KernelError> for HashError {
  fn from(err: KernelError) -> Self {
    HashError::Kernel(err)
  }
}
