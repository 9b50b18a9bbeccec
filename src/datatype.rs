//! Describing data
//!
//! The core function of a message passing layer is getting data from one rank to another. This
//! module describes that data uniformly, so that the primitives never need payload specific code.
//!
//! Element types are restricted to an allow-list of primitive types, expressed by the sealed
//! `Equivalence` trait. Each of them maps to a [`Datatype`] tag which the transports use to
//! pick the native datatype or to type-check buffered messages.
//!
//! A `Payload` is a contiguous run of elements of one such type: a single scalar, an array, a
//! slice, a `Vec` or a string. A `PayloadMut` can additionally be written to, and knows how to make
//! room for an incoming message via `ensure_capacity()`: vectors are resized, fixed-size payloads
//! reject element counts they cannot hold.
//!
//! Shapes that are not contiguous, or element types outside the allow-list, do not implement these
//! traits and are therefore rejected at compile time.

use std::fmt;
use std::os::raw::c_void;
use std::slice;

use crate::error::{Error, Result};

/// Datatype traits
pub mod traits {
    pub use super::{Equivalence, Payload, PayloadMut};
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! equivalent_system_datatype {
    ($($rstype:ty => $variant:ident),* $(,)?) => {
        /// Transport-level identifier of an element type
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum Datatype {
            $(
            #[doc = concat!("`", stringify!($rstype), "`")]
            $variant,
            )*
        }

        impl fmt::Display for Datatype {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Datatype::$variant => f.write_str(stringify!($rstype)),)*
                }
            }
        }

        /// An owned copy of a run of elements, tagged with their type.
        ///
        /// Used wherever a message has to outlive the payload it was taken from. Elements can only
        /// be read back as the type they were stored with.
        #[derive(Clone, Debug, PartialEq)]
        pub enum Elements {
            $(
            #[doc = concat!("`", stringify!($rstype), "` elements")]
            $variant(Vec<$rstype>),
            )*
        }

        impl Elements {
            /// Element type of the stored elements
            pub fn datatype(&self) -> Datatype {
                match self {
                    $(Elements::$variant(_) => Datatype::$variant,)*
                }
            }

            /// Number of stored elements
            pub fn len(&self) -> usize {
                match self {
                    $(Elements::$variant(v) => v.len(),)*
                }
            }
        }

        $(
        impl sealed::Sealed for $rstype {}

        impl Equivalence for $rstype {
            const DATATYPE: Datatype = Datatype::$variant;

            fn pack(elements: &[Self]) -> Elements {
                Elements::$variant(elements.to_vec())
            }

            fn unpack(elements: &Elements) -> Option<&[Self]> {
                match elements {
                    Elements::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
        )*
    }
}

/// An element type that can be transported directly.
///
/// This trait is sealed: the set of element types is fixed to `bool`, the fixed width integers,
/// `isize`, `usize`, `f32` and `f64`.
pub trait Equivalence: sealed::Sealed + Copy + Default + PartialEq + fmt::Debug + 'static {
    /// The tag identifying this element type
    const DATATYPE: Datatype;

    /// Copy `elements` into a type-tagged owned buffer.
    fn pack(elements: &[Self]) -> Elements;

    /// View `elements` as `Self`, if that is the type they were stored with.
    fn unpack(elements: &Elements) -> Option<&[Self]>;
}

equivalent_system_datatype! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
}

impl Elements {
    /// Returns `true` if no elements are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A contiguous run of elements that can be read by a transport.
pub trait Payload {
    /// The element type
    type Element: Equivalence;

    /// The elements, in transmission order
    fn elements(&self) -> &[Self::Element];

    /// How many elements are described
    fn count(&self) -> usize {
        self.elements().len()
    }

    /// Tag of the element type
    fn datatype(&self) -> Datatype {
        <Self::Element as Equivalence>::DATATYPE
    }

    /// Address of the first element
    fn pointer(&self) -> *const c_void {
        self.elements().as_ptr().cast()
    }
}

/// A contiguous run of elements that a transport can write to.
pub trait PayloadMut: Payload {
    /// The elements, in transmission order
    fn elements_mut(&mut self) -> &mut [Self::Element];

    /// Make sure the payload can hold `count` elements.
    ///
    /// Resizable payloads are resized to exactly `count` elements. Fixed-size payloads are left
    /// untouched if `count` fits and fail with `Error::Capacity` otherwise.
    fn ensure_capacity(&mut self, count: usize) -> Result<()>;

    /// Address of the first element
    fn pointer_mut(&mut self) -> *mut c_void {
        self.elements_mut().as_mut_ptr().cast()
    }

    /// Overwrite the leading elements with `source`, resizing first if the payload allows it.
    fn fill_from(&mut self, source: &[Self::Element]) -> Result<()> {
        self.ensure_capacity(source.len())?;
        self.elements_mut()[..source.len()].copy_from_slice(source);
        Ok(())
    }
}

/// Where the incoming elements of a collective are written.
///
/// A process whose payload cannot take the incoming elements still has to take part in the
/// collective, or every other process blocks forever. It receives into a scratch buffer instead
/// and reports the shortfall once the collective has completed.
#[cfg_attr(not(feature = "mpi"), allow(dead_code))]
#[derive(Debug)]
pub(crate) enum Landing<E> {
    /// The payload itself
    InPlace,
    /// A discarded buffer of the incoming length
    Scratch { buffer: Vec<E>, shortfall: Error },
}

#[cfg_attr(not(feature = "mpi"), allow(dead_code))]
impl<E: Equivalence> Landing<E> {
    /// Make room for `count` elements in `payload`, or fall back to scratch.
    pub(crate) fn at_least<P>(payload: &mut P, count: usize) -> Self
    where
        P: PayloadMut<Element = E> + ?Sized,
    {
        match payload.ensure_capacity(count) {
            Ok(()) => Landing::InPlace,
            Err(shortfall) => Landing::scratch(count, shortfall),
        }
    }

    /// Like `at_least`, but `payload` must end up holding exactly `count` elements.
    pub(crate) fn exactly<P>(payload: &mut P, count: usize) -> Self
    where
        P: PayloadMut<Element = E> + ?Sized,
    {
        match payload.ensure_capacity(count) {
            Ok(()) if payload.count() == count => Landing::InPlace,
            Ok(()) => Landing::scratch(
                count,
                Error::Length {
                    length: payload.count(),
                    expected: count,
                },
            ),
            Err(shortfall) => Landing::scratch(count, shortfall),
        }
    }

    fn scratch(count: usize, shortfall: Error) -> Self {
        Landing::Scratch {
            buffer: vec![E::default(); count],
            shortfall,
        }
    }

    /// Address the transport writes to
    pub(crate) fn pointer_mut<P>(&mut self, payload: &mut P) -> *mut c_void
    where
        P: PayloadMut<Element = E> + ?Sized,
    {
        match self {
            Landing::InPlace => payload.pointer_mut(),
            Landing::Scratch { buffer, .. } => buffer.pointer_mut(),
        }
    }

    /// The outcome to report after the collective has completed
    pub(crate) fn finish(self) -> Result<()> {
        match self {
            Landing::InPlace => Ok(()),
            Landing::Scratch { shortfall, .. } => Err(shortfall),
        }
    }
}

fn check_capacity(required: usize, capacity: usize) -> Result<()> {
    if required > capacity {
        Err(Error::Capacity { required, capacity })
    } else {
        Ok(())
    }
}

impl<T: Equivalence> Payload for T {
    type Element = T;

    fn elements(&self) -> &[T] {
        slice::from_ref(self)
    }
}

impl<T: Equivalence> PayloadMut for T {
    fn elements_mut(&mut self) -> &mut [T] {
        slice::from_mut(self)
    }

    fn ensure_capacity(&mut self, count: usize) -> Result<()> {
        check_capacity(count, 1)
    }
}

impl<T: Equivalence> Payload for [T] {
    type Element = T;

    fn elements(&self) -> &[T] {
        self
    }
}

impl<T: Equivalence> PayloadMut for [T] {
    fn elements_mut(&mut self) -> &mut [T] {
        self
    }

    fn ensure_capacity(&mut self, count: usize) -> Result<()> {
        check_capacity(count, self.len())
    }
}

impl<T: Equivalence, const N: usize> Payload for [T; N] {
    type Element = T;

    fn elements(&self) -> &[T] {
        self
    }
}

impl<T: Equivalence, const N: usize> PayloadMut for [T; N] {
    fn elements_mut(&mut self) -> &mut [T] {
        self
    }

    fn ensure_capacity(&mut self, count: usize) -> Result<()> {
        check_capacity(count, N)
    }
}

impl<T: Equivalence> Payload for Vec<T> {
    type Element = T;

    fn elements(&self) -> &[T] {
        self
    }
}

impl<T: Equivalence> PayloadMut for Vec<T> {
    fn elements_mut(&mut self) -> &mut [T] {
        self
    }

    fn ensure_capacity(&mut self, count: usize) -> Result<()> {
        self.resize(count, T::default());
        Ok(())
    }
}

impl Payload for str {
    type Element = u8;

    fn elements(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Payload for String {
    type Element = u8;

    fn elements(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_is_a_single_element() {
        let x = 3.5f64;
        assert_eq!(x.count(), 1);
        assert_eq!(x.datatype(), Datatype::F64);
        let address: *const f64 = &x;
        assert_eq!(x.pointer(), address.cast::<c_void>());
    }

    #[test]
    fn text_is_described_as_bytes() {
        let s = String::from("héllo");
        assert_eq!(s.count(), 6);
        assert_eq!(s.datatype(), Datatype::U8);
        assert_eq!("abc".elements(), b"abc");
    }

    #[test]
    fn vec_resizes_to_exact_count() {
        let mut v = vec![1u16, 2, 3, 4];
        v.ensure_capacity(2).unwrap();
        assert_eq!(v, [1, 2]);
        v.fill_from(&[7, 8, 9]).unwrap();
        assert_eq!(v, [7, 8, 9]);
    }

    #[test]
    fn array_accepts_counts_that_fit() {
        let mut a = [0i32; 4];
        a.fill_from(&[5, 6]).unwrap();
        assert_eq!(a, [5, 6, 0, 0]);
    }

    #[test]
    fn array_rejects_counts_that_do_not_fit() {
        let mut a = [0u8; 2];
        match a.ensure_capacity(3) {
            Err(Error::Capacity { required, capacity }) => {
                assert_eq!((required, capacity), (3, 2));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(a, [0, 0]);
    }

    #[test]
    fn scalar_holds_one_element() {
        let mut x = false;
        assert!(x.ensure_capacity(0).is_ok());
        assert!(x.ensure_capacity(2).is_err());
        x.fill_from(&[true]).unwrap();
        assert!(x);
    }

    #[test]
    fn slices_are_fixed_size() {
        let mut backing = [1.0f32; 3];
        let s: &mut [f32] = &mut backing[..];
        assert!(s.ensure_capacity(3).is_ok());
        assert!(s.ensure_capacity(4).is_err());
    }

    #[test]
    fn elements_only_unpack_as_their_own_type() {
        let packed = u32::pack(&[1, 2, 3]);
        assert_eq!(packed.datatype(), Datatype::U32);
        assert_eq!(packed.len(), 3);
        assert_eq!(u32::unpack(&packed), Some(&[1u32, 2, 3][..]));
        assert_eq!(i32::unpack(&packed), None);
        assert_eq!(usize::unpack(&usize::pack(&[])).map(<[usize]>::len), Some(0));
    }

    #[test]
    fn roomy_payloads_land_in_place() {
        let mut v = vec![0u8; 1];
        let mut landing = Landing::exactly(&mut v, 3);
        assert!(matches!(landing, Landing::InPlace));
        assert_eq!(landing.pointer_mut(&mut v), v.as_mut_ptr().cast::<c_void>());
        assert!(landing.finish().is_ok());
        assert_eq!(v, [0, 0, 0]);

        let mut a = [0i32; 4];
        assert!(matches!(Landing::at_least(&mut a, 4), Landing::InPlace));
    }

    #[test]
    fn short_payloads_land_in_scratch() {
        let mut a = [7u8; 2];
        let mut landing = Landing::at_least(&mut a, 3);
        let address = landing.pointer_mut(&mut a);
        assert_ne!(address, a.as_mut_ptr().cast::<c_void>());
        match &landing {
            Landing::Scratch { buffer, .. } => {
                assert_eq!(buffer.len(), 3);
                assert_eq!(address.cast_const(), buffer.as_ptr().cast::<c_void>());
            }
            Landing::InPlace => panic!("fixed payload cannot hold 3 elements"),
        }
        match landing.finish() {
            Err(Error::Capacity { required, capacity }) => {
                assert_eq!((required, capacity), (3, 2));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(a, [7, 7]);
    }

    #[test]
    fn long_fixed_payloads_land_in_scratch_for_exact_counts() {
        let mut a = [1.0f64; 4];
        let landing = Landing::exactly(&mut a[..], 3);
        assert!(matches!(
            landing.finish(),
            Err(Error::Length {
                length: 4,
                expected: 3
            })
        ));
        assert!(matches!(Landing::at_least(&mut a, 3), Landing::InPlace));
        assert_eq!(a, [1.0; 4]);
    }

    #[test]
    fn datatypes_display_as_rust_types() {
        assert_eq!(Datatype::Usize.to_string(), "usize");
        assert_eq!(Datatype::Bool.to_string(), "bool");
    }
}
