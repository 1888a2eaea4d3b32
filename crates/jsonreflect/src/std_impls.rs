//! [`Reflect`] implementations for standard library types.
//!
//! Integer and float widths carry the `OpenAPI` format registry names
//! (`int32`, `uint64`, `double`, ...). Widths without a registered format
//! (`i128`, `isize`, `u128`, `usize`) are plain integers.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use jsonreflect_core::PrimitiveKind;

use crate::descriptor::{Reflect, TypeDescriptor, TypeRef};

macro_rules! primitive {
    ($($ty:ty => $kind:ident $(, $format:literal)?;)*) => {
        $(
            impl Reflect for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::primitive(stringify!($ty), PrimitiveKind::$kind)
                        $(.with_format($format))?
                }
            }
        )*
    };
}

primitive! {
    bool => Boolean;
    i8 => Integer, "int8";
    i16 => Integer, "int16";
    i32 => Integer, "int32";
    i64 => Integer, "int64";
    i128 => Integer;
    isize => Integer;
    u8 => Integer, "uint8";
    u16 => Integer, "uint16";
    u32 => Integer, "uint32";
    u64 => Integer, "uint64";
    u128 => Integer;
    usize => Integer;
    f32 => Number, "float";
    f64 => Number, "double";
    char => String, "char";
    String => String;
    str => String;
    PathBuf => String;
    IpAddr => String;
    Ipv4Addr => String, "ipv4";
    Ipv6Addr => String, "ipv6";
}

impl Reflect for () {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::primitive("null", PrimitiveKind::Null)
    }
}

impl Reflect for serde_json::Value {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::any("Value").with_module("serde_json")
    }
}

impl<T: Reflect + 'static> Reflect for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional(TypeRef::of::<T>())
    }
}

macro_rules! indirect {
    ($($wrapper:ident),*) => {
        $(
            impl<T: Reflect + ?Sized + 'static> Reflect for $wrapper<T> {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::indirect(TypeRef::of::<T>())
                }
            }
        )*
    };
}

indirect!(Box, Rc, Arc);

impl<T: Reflect + ?Sized + 'static> Reflect for &T {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::indirect(TypeRef::of::<T>())
    }
}

macro_rules! sequence {
    ($($name:literal => $ty:ty),*) => {
        $(
            impl<T: Reflect + 'static> Reflect for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::sequence($name, TypeRef::of::<T>())
                }
            }
        )*
    };
}

sequence! {
    "Vec" => Vec<T>,
    "Vec" => [T],
    "VecDeque" => VecDeque<T>,
    "BTreeSet" => BTreeSet<T>
}

impl<T: Reflect + 'static, const N: usize> Reflect for [T; N] {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::sequence("Vec", TypeRef::of::<T>())
    }
}

impl<T: Reflect + 'static, S: 'static> Reflect for HashSet<T, S> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::sequence("HashSet", TypeRef::of::<T>())
    }
}

impl<K: Reflect + 'static, V: Reflect + 'static, S: 'static> Reflect for HashMap<K, V, S> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map("HashMap", TypeRef::of::<K>(), TypeRef::of::<V>())
    }
}

impl<K: Reflect + 'static, V: Reflect + 'static> Reflect for BTreeMap<K, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map("BTreeMap", TypeRef::of::<K>(), TypeRef::of::<V>())
    }
}
