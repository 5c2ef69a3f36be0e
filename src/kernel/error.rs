use crate::kernel::expr::Name;

/// Failures raised by the kernel collaborators the hasher consults.
#[derive(Debug)]
pub enum KernelError {
  UnknownConst { name: Name },
  UnknownLocal { name: Name },
  /// Failure of a third-party parameter classifier.
  External(anyhow::Error),
}

impl std::fmt::Display for KernelError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      KernelError::UnknownConst { name } => {
        write!(f, "unknown constant: {}", name.pretty())
      },
      KernelError::UnknownLocal { name } => {
        write!(f, "unknown local: {}", name.pretty())
      },
      KernelError::External(err) => write!(f, "{err}"),
    }
  }
}

impl std::error::Error for KernelError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      KernelError::External(err) => Some(&**err),
      _ => None,
    }
  }
}

impl From<anyhow::Error> for KernelError {
  fn from(err: anyhow::Error) -> Self {
    KernelError::External(err)
  }
}
