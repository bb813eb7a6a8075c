use std::{
    any::{Any, TypeId},
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

use crate::error::{Error, Result};

/// Runtime identity of a static type. Two tags are equal iff they
/// describe the same type; the name is only kept for messages.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl PartialOrd for TypeTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An immutable, dynamically typed datum. Cloning is cheap.
#[derive(Clone)]
pub struct Value {
    tag: TypeTag,
    inner: Rc<dyn Any>,
}

impl Value {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            inner: Rc::new(value),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Reads the value as a `T`. Fails if the value holds anything else;
    /// there is no conversion between types.
    pub fn read<T: Any + Clone>(&self) -> Result<T> {
        self.downcast_ref::<T>()
            .cloned()
            .ok_or(Error::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: self.tag.name(),
            })
    }
}

macro_rules! debug_as {
    ($val:expr, $f:expr, $($ty:ty),*) => {
        $(
            if let Some(x) = $val.downcast_ref::<$ty>() {
                return write!($f, "{x:?}");
            }
        )*
    };
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_as!(self, f, bool, i32, i64, u32, u64, usize, f32, f64, String, &'static str);

        write!(f, "<{}>", self.tag.name())
    }
}

macro_rules! value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(x: $ty) -> Self {
                    Value::new(x)
                }
            }
        )*
    };
}

value_from!(bool, i32, i64, f64, String);

impl From<&str> for Value {
    fn from(x: &str) -> Self {
        Value::new(x.to_string())
    }
}
