//! Error handling
//!
//! Every primitive reports failure through [`Error`]. None of these conditions are retried: they
//! indicate a broken precondition (wrong lifecycle stage, a peer the transport cannot reach, a
//! payload of the wrong shape) and the caller decides whether the whole computation aborts.

use std::string::FromUtf8Error;

use thiserror::Error;

use crate::datatype::Datatype;
use crate::environment::Stage;
use crate::{Rank, Tag};

#[cfg(feature = "mpi")]
pub use self::native::ErrorKind;

/// Result type of all communication primitives
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures signaled by the environment, the transports and the payload descriptors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A primitive was invoked outside the running stage of the environment.
    #[error("lifecycle violation: stage is {current} rather than {expected}")]
    NotRunning {
        /// Stage the environment is in
        current: Stage,
        /// Stage the primitive requires
        expected: Stage,
    },

    /// The environment was asked to move back to an earlier stage.
    #[error("attempted to regress environment stage from {from} to {to}")]
    Regression {
        /// Stage the environment is in
        from: Stage,
        /// Stage that was requested
        to: Stage,
    },

    /// The transport was initialized by someone other than this environment.
    #[error("the transport has already been initialized outside of this universe")]
    AlreadyInitialized,

    /// The mock transport was asked to talk to a rank other than its only one.
    #[error("cannot {operation} with rank {peer}: the mock universe only contains rank {rank}")]
    Addressing {
        /// Primitive that was invoked
        operation: &'static str,
        /// Requested peer
        peer: Rank,
        /// The only rank that exists
        rank: Rank,
    },

    /// A peer outside of `[0, size)` was named.
    #[error("rank {peer} is out of range for a communicator of size {size}")]
    RankOutOfRange {
        /// Requested peer
        peer: Rank,
        /// Size of the communicator
        size: Rank,
    },

    /// A fixed-size payload cannot hold the incoming elements.
    #[error("payload holds at most {capacity} elements but {required} are required")]
    Capacity {
        /// Number of incoming elements
        required: usize,
        /// Number of elements the payload can hold
        capacity: usize,
    },

    /// A fixed-size payload would keep stale trailing elements after a broadcast.
    #[error("payload holds {length} elements but the broadcast carries {expected}")]
    Length {
        /// Number of elements held by the payload
        length: usize,
        /// Number of elements sent by the root
        expected: usize,
    },

    /// The mock transport has no pending message for a tag.
    #[error("no pending message for tag {tag}")]
    NoMessage {
        /// Requested tag
        tag: Tag,
    },

    /// A message was received into a payload of a different element type.
    #[error("message with tag {tag} contains {found} elements, but {expected} were requested")]
    TypeMismatch {
        /// Tag of the message
        tag: Tag,
        /// Element type of the receiving payload
        expected: Datatype,
        /// Element type of the buffered message
        found: Datatype,
    },

    /// Gather contributions differ in length between ranks.
    #[error("rank {rank} contributes {count} elements to gather, but {expected} were expected")]
    CountMismatch {
        /// First rank whose contribution differs
        rank: Rank,
        /// Its element count
        count: usize,
        /// Element count of the root
        expected: usize,
    },

    /// An element count does not fit into the count type of the transport.
    #[error("element count {0} cannot be expressed as a transport count")]
    CountOverflow(usize),

    /// Received text is not valid UTF-8.
    #[error("received text is not valid UTF-8")]
    InvalidText(#[from] FromUtf8Error),

    /// Writing a section of distributed output failed.
    #[error("writing distributed output failed")]
    Io(#[from] std::io::Error),

    /// An MPI call returned an error code.
    #[cfg(feature = "mpi")]
    #[error("MPI call failed with error class {kind:?} (code {code})")]
    Native {
        /// Error class of the code
        kind: ErrorKind,
        /// Raw return code
        code: std::os::raw::c_int,
    },
}

#[cfg(feature = "mpi")]
mod native {
    use std::os::raw::c_int;

    use mpi_sys as ffi;

    use super::Error;

    /// `MPI_SUCCESS` as a `c_int` for easier checking of MPI return values
    pub(crate) const MPI_SUCCESS: c_int = ffi::MPI_SUCCESS as c_int;

    macro_rules! build_error_kind {
        {
            $(#[$doc:meta])*
            pub enum $name:ident {
                $(
                     #[$err_doc:meta]
                     #[err($mpi_err:ident)]
                     $rust_err:ident,
                )*
            }
        } => {
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub enum $name {
                $(
                #[$err_doc]
                $rust_err,
                )*
            }

            impl $name {
                /// Classify a raw MPI return code.
                pub(crate) fn from_raw(err: c_int) -> $name {
                    let mut class: c_int = 0;
                    let res = unsafe { ffi::MPI_Error_class(err, &mut class) };
                    if res != MPI_SUCCESS {
                        return $name::Unknown;
                    }
                    $(
                    if class == ffi::$mpi_err as c_int {
                        return $name::$rust_err;
                    }
                    )*
                    $name::Unknown
                }
            }
        }
    }

    build_error_kind! {
        /// Error classes the primitives of this crate can raise.
        pub enum ErrorKind {
            /// Invalid argument of some other kind
            #[err(MPI_ERR_ARG)]
            Arg,
            /// Invalid buffer pointer argument
            #[err(MPI_ERR_BUFFER)]
            Buffer,
            /// Invalid communicator argument
            #[err(MPI_ERR_COMM)]
            Comm,
            /// Invalid count argument
            #[err(MPI_ERR_COUNT)]
            Count,
            /// Internal MPI (implementation) error
            #[err(MPI_ERR_INTERN)]
            Intern,
            /// Known error not in this list
            #[err(MPI_ERR_OTHER)]
            Other,
            /// Invalid rank argument
            #[err(MPI_ERR_RANK)]
            Rank,
            /// Invalid root argument
            #[err(MPI_ERR_ROOT)]
            Root,
            /// Invalid tag argument
            #[err(MPI_ERR_TAG)]
            Tag,
            /// Message truncated on receive
            #[err(MPI_ERR_TRUNCATE)]
            Truncate,
            /// Invalid datatype argument
            #[err(MPI_ERR_TYPE)]
            Type,
            /// Unknown error
            #[err(MPI_ERR_UNKNOWN)]
            Unknown,
        }
    }

    /// Turn an MPI return code into a `Result`.
    pub(crate) fn check(code: c_int) -> Result<(), Error> {
        if code == MPI_SUCCESS {
            Ok(())
        } else {
            Err(Error::Native {
                kind: ErrorKind::from_raw(code),
                code,
            })
        }
    }
}

#[cfg(feature = "mpi")]
pub(crate) use self::native::check;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_message_names_both_stages() {
        let err = Error::NotRunning {
            current: Stage::Finished,
            expected: Stage::Running,
        };
        assert_eq!(
            err.to_string(),
            "lifecycle violation: stage is finished rather than running"
        );
    }

    #[test]
    fn type_mismatch_names_element_types() {
        let err = Error::TypeMismatch {
            tag: 7,
            expected: Datatype::F64,
            found: Datatype::I32,
        };
        assert_eq!(
            err.to_string(),
            "message with tag 7 contains i32 elements, but f64 were requested"
        );
    }

    #[test]
    fn length_message_names_both_lengths() {
        let err = Error::Length {
            length: 4,
            expected: 3,
        };
        assert_eq!(
            err.to_string(),
            "payload holds 4 elements but the broadcast carries 3"
        );
    }

    #[test]
    fn invalid_text_converts_from_utf8_error() {
        let utf8 = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        let err: Error = utf8.into();
        assert!(matches!(err, Error::InvalidText(_)));
    }
}
