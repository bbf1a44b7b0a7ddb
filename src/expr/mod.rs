//! All the nftables expressions that can be added to [`Rule`]s to build up
//! how they match against packets.
//!
//! [`Rule`]: crate::Rule

use std::borrow::Cow;
use std::net::Ipv4Addr;

mod bitwise;
pub use self::bitwise::*;

mod builder;
pub use self::builder::ExprBuilder;

mod cmp;
pub use self::cmp::*;

mod counter;
pub use self::counter::*;

mod ct;
pub use self::ct::*;

mod immediate;
pub use self::immediate::*;

mod log;
pub use self::log::*;

mod lookup;
pub use self::lookup::*;

mod masquerade;
pub use self::masquerade::*;

mod meta;
pub use self::meta::*;

mod nat;
pub use self::nat::*;

mod payload;
pub use self::payload::*;

mod register;
pub use self::register::Register;

mod verdict;
pub use self::verdict::*;

/// Trait for every expression this crate can place in a rule.
pub trait Expression {
    /// Returns the name used by nftables to identify the expression kind.
    fn get_name() -> &'static str;
}

macro_rules! create_expr_variant {
    ($enum:ident, [$($name:ident),+ $(,)?]) => {
        /// A sum over every expression kind, letting a rule hold a
        /// heterogeneous ordered expression list.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum $enum {
            $( $name($name), )+
        }

        $(
            impl From<$name> for $enum {
                fn from(expr: $name) -> Self {
                    $enum::$name(expr)
                }
            }
        )+

        impl $enum {
            /// The nftables name of the wrapped expression.
            pub fn get_name(&self) -> &'static str {
                match self {
                    $( $enum::$name(_) => $name::get_name(), )+
                }
            }
        }
    };
}

create_expr_variant!(
    ExpressionVariant,
    [
        Bitwise, Cmp, Conntrack, Counter, Immediate, Log, Lookup, Masquerade, Meta, Nat, Payload,
        Range, Verdict,
    ]
);

/// A type that can be converted into the byte buffer of a cmp, bitwise or
/// immediate expression.
pub trait ToSlice {
    /// Returns the data this type represents.
    fn to_slice(&self) -> Cow<'_, [u8]>;
}

impl<'a> ToSlice for &'a [u8] {
    fn to_slice(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl ToSlice for Vec<u8> {
    fn to_slice(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self[..])
    }
}

impl<const N: usize> ToSlice for [u8; N] {
    fn to_slice(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self[..])
    }
}

impl ToSlice for u8 {
    fn to_slice(&self) -> Cow<'_, [u8]> {
        Cow::Owned(vec![*self])
    }
}

impl ToSlice for Ipv4Addr {
    fn to_slice(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.octets().to_vec())
    }
}

impl<'a> ToSlice for &'a str {
    fn to_slice(&self) -> Cow<'_, [u8]> {
        Cow::from(self.as_bytes())
    }
}
