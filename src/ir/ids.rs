//! Newtype IDs for the records of a COCO document.
//!
//! Image, annotation, category and license ids all serialize as bare
//! integers, but they are distinct types in Rust so an annotation id can
//! never be passed where an image id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[inline]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }

            /// Returns the id `offset` positions after this one, or `None` if
            /// it would not fit in a `u64`.
            #[inline]
            pub fn checked_offset(&self, offset: usize) -> Option<Self> {
                let offset = u64::try_from(offset).ok()?;
                self.0.checked_add(offset).map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of an image record.
    ImageId
);
define_id!(
    /// Identifier of an annotation record.
    AnnotationId
);
define_id!(
    /// Identifier of a category record.
    CategoryId
);
define_id!(
    /// Identifier of a license record.
    LicenseId
);
